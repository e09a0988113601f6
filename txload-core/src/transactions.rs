//! Task driver for the `/api/transactions` REST API.
//!
//! Each simulated user keeps the ids it created in a private [`KnownIds`] set and targets
//! update/delete/get requests at them. HTTP failures never stop a user: they are recorded in
//! the run statistics, logged, and at most skip the bookkeeping step.

use std::sync::Arc;

use crate::runner::{TaskFuture, TaskSet, UserBehavior, UserContext};

mod id;
mod known_ids;
mod options;
mod payload;

pub use id::TransactionId;
pub use known_ids::KnownIds;
pub use options::{DriverOptions, ScriptVariant, TaskWeights};
pub use payload::{AccountId, Amount, TransactionRecord};

pub const PATH_TRANSACTIONS: &str = "/api/transactions";

/// Request names used for statistics grouping.
pub const NAME_LIST: &str = "/api/transactions?page&size";
pub const NAME_COLLECTION: &str = "/api/transactions";
pub const NAME_ITEM: &str = "/api/transactions/{id}";

pub const TASK_LIST: &str = "list_transactions";
pub const TASK_CREATE: &str = "create_transaction";
pub const TASK_UPDATE: &str = "update_transaction";
pub const TASK_DELETE: &str = "delete_transaction";
pub const TASK_GET: &str = "get_transaction_by_id";

/// What a create attempt did to the session's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 201 with an id; the id is now known.
    Created(TransactionId),
    /// Any status other than 201.
    Rejected { status: u16 },
    /// 201 without a usable id.
    MissingId { status: u16 },
    /// No response (connect error, timeout, ...).
    Failed,
}

impl CreateOutcome {
    pub fn id(&self) -> Option<&TransactionId> {
        match self {
            Self::Created(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionsBehavior {
    options: Arc<DriverOptions>,
}

impl TransactionsBehavior {
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

impl UserBehavior for TransactionsBehavior {
    type Session = TransactionSession;

    fn tasks(&self) -> TaskSet<TransactionSession> {
        let w = self.options.weights;
        let set = TaskSet::new()
            .register(TASK_LIST, w.list, list_task)
            .register(TASK_CREATE, w.create, create_task)
            .register(TASK_UPDATE, w.update, update_task)
            .register(TASK_DELETE, w.delete, delete_task);

        if self.options.variant.has_get_by_id() {
            set.register(TASK_GET, w.get, get_task)
        } else {
            set
        }
    }

    fn on_start(&self, _ctx: &mut UserContext) -> TransactionSession {
        TransactionSession::new(self.options.clone())
    }

    fn on_stop(&self, session: TransactionSession, ctx: &mut UserContext) {
        tracing::debug!(
            user_id = ctx.user_id(),
            known_ids = session.known_ids.len(),
            "session finished"
        );
    }
}

/// One simulated user's private state.
#[derive(Debug, Clone)]
pub struct TransactionSession {
    options: Arc<DriverOptions>,
    known_ids: KnownIds,
}

impl TransactionSession {
    pub fn new(options: Arc<DriverOptions>) -> Self {
        Self {
            options,
            known_ids: KnownIds::new(),
        }
    }

    pub fn known_ids(&self) -> &KnownIds {
        &self.known_ids
    }

    pub fn known_ids_mut(&mut self) -> &mut KnownIds {
        &mut self.known_ids
    }

    pub async fn list_transactions(&mut self, ctx: &mut UserContext) {
        let path = format!(
            "{PATH_TRANSACTIONS}?page={}&size={}",
            self.options.page, self.options.size
        );
        let _ = ctx.get(&path, NAME_LIST).await;
    }

    pub async fn create_transaction(&mut self, ctx: &mut UserContext) -> CreateOutcome {
        let variant = self.options.variant;
        let record = TransactionRecord::random(variant, ctx.rng());

        let Some(res) = ctx
            .post_json(PATH_TRANSACTIONS, NAME_COLLECTION, &record)
            .await
        else {
            tracing::warn!(user_id = ctx.user_id(), "create transaction request failed");
            return CreateOutcome::Failed;
        };

        if res.status != 201 {
            match variant {
                ScriptVariant::Extended => tracing::warn!(
                    user_id = ctx.user_id(),
                    status = res.status,
                    "create transaction failed with status code {}",
                    res.status
                ),
                ScriptVariant::Basic => tracing::debug!(
                    user_id = ctx.user_id(),
                    status = res.status,
                    "create transaction not accepted"
                ),
            }
            return CreateOutcome::Rejected { status: res.status };
        }

        match TransactionId::extract(&res.body) {
            Some(id) => {
                if self.known_ids.insert(id.clone()) {
                    tracing::info!(user_id = ctx.user_id(), %id, "created transaction");
                }
                CreateOutcome::Created(id)
            }
            None => {
                tracing::warn!(
                    user_id = ctx.user_id(),
                    status = res.status,
                    "failed to get transaction id from response"
                );
                CreateOutcome::MissingId { status: res.status }
            }
        }
    }

    pub async fn update_transaction(&mut self, ctx: &mut UserContext) {
        let Some(id) = self.target_id(ctx).await else {
            return;
        };

        let record =
            TransactionRecord::random(self.options.variant, ctx.rng()).with_id(id.clone());
        let path = format!("{PATH_TRANSACTIONS}/{id}");
        let _ = ctx.put_json(&path, NAME_ITEM, &record).await;
    }

    /// Deletes a known id and forgets it, whatever the server answered.
    pub async fn delete_transaction(&mut self, ctx: &mut UserContext) {
        let Some(id) = self.target_id(ctx).await else {
            return;
        };

        let path = format!("{PATH_TRANSACTIONS}/{id}");
        let _ = ctx.delete(&path, NAME_ITEM).await;
        self.known_ids.remove(&id);
    }

    pub async fn get_transaction_by_id(&mut self, ctx: &mut UserContext) {
        let Some(id) = self.target_id(ctx).await else {
            return;
        };

        let path = format!("{PATH_TRANSACTIONS}/{id}");
        let _ = ctx.get(&path, NAME_ITEM).await;
    }

    /// Pick the id an update/delete/get should target, creating one first when the variant
    /// bootstraps and too few ids are known.
    async fn target_id(&mut self, ctx: &mut UserContext) -> Option<TransactionId> {
        let below_threshold = self.known_ids.len() < self.options.bootstrap_below;
        if self.options.variant.bootstraps() && below_threshold {
            tracing::debug!(
                user_id = ctx.user_id(),
                known_ids = self.known_ids.len(),
                "bootstrapping with a create"
            );
            self.create_transaction(ctx).await;
        }

        self.known_ids.choose(ctx.rng()).cloned()
    }
}

fn list_task<'a>(s: &'a mut TransactionSession, ctx: &'a mut UserContext) -> TaskFuture<'a> {
    Box::pin(s.list_transactions(ctx))
}

fn create_task<'a>(s: &'a mut TransactionSession, ctx: &'a mut UserContext) -> TaskFuture<'a> {
    Box::pin(async move {
        s.create_transaction(ctx).await;
    })
}

fn update_task<'a>(s: &'a mut TransactionSession, ctx: &'a mut UserContext) -> TaskFuture<'a> {
    Box::pin(s.update_transaction(ctx))
}

fn delete_task<'a>(s: &'a mut TransactionSession, ctx: &'a mut UserContext) -> TaskFuture<'a> {
    Box::pin(s.delete_transaction(ctx))
}

fn get_task<'a>(s: &'a mut TransactionSession, ctx: &'a mut UserContext) -> TaskFuture<'a> {
    Box::pin(s.get_transaction_by_id(ctx))
}
