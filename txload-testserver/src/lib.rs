use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const PATH_TRANSACTIONS: &str = "/api/transactions";
pub const PATH_TRANSACTION: &str = "/api/transactions/{id}";

/// How successful responses are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// The resource itself, e.g. `{"id": 1, ...}`.
    #[default]
    Flat,
    /// `{"code": 0, "msg": "success", "data": {...}}`.
    Envelope,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    list: Arc<AtomicU64>,
    create: Arc<AtomicU64>,
    update: Arc<AtomicU64>,
    delete: Arc<AtomicU64>,
    get: Arc<AtomicU64>,
    not_found: Arc<AtomicU64>,
    bad_request: Arc<AtomicU64>,
    last_list_query: Arc<Mutex<Option<(u32, u32)>>>,
}

fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl TestServerStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn list(&self) -> u64 {
        self.list.load(Ordering::Relaxed)
    }

    pub fn create(&self) -> u64 {
        self.create.load(Ordering::Relaxed)
    }

    pub fn update(&self) -> u64 {
        self.update.load(Ordering::Relaxed)
    }

    pub fn delete(&self) -> u64 {
        self.delete.load(Ordering::Relaxed)
    }

    pub fn get(&self) -> u64 {
        self.get.load(Ordering::Relaxed)
    }

    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    pub fn bad_request(&self) -> u64 {
        self.bad_request.load(Ordering::Relaxed)
    }

    /// `(page, size)` of the most recent list request.
    pub fn last_list_query(&self) -> Option<(u32, u32)> {
        *self
            .last_list_query
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fault injection knobs, adjustable while the server runs.
#[derive(Debug, Clone, Default)]
pub struct TestServerControl {
    create_status: Arc<AtomicU16>,
    delete_status: Arc<AtomicU16>,
    omit_create_id: Arc<AtomicBool>,
}

impl TestServerControl {
    /// Answer every create with `status` (and no resource). `None` restores normal behavior.
    pub fn force_create_status(&self, status: Option<u16>) {
        self.create_status
            .store(status.unwrap_or(0), Ordering::Relaxed);
    }

    /// Answer every delete with `status` without touching the store.
    pub fn force_delete_status(&self, status: Option<u16>) {
        self.delete_status
            .store(status.unwrap_or(0), Ordering::Relaxed);
    }

    /// Reply 201 to creates but leave the `id` out of the body.
    pub fn omit_create_id(&self, omit: bool) {
        self.omit_create_id.store(omit, Ordering::Relaxed);
    }

    fn forced(slot: &AtomicU16) -> Option<StatusCode> {
        match slot.load(Ordering::Relaxed) {
            0 => None,
            code => StatusCode::from_u16(code).ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub id: i64,
    pub transaction_no: String,
    pub source_account_id: Value,
    pub target_account_id: Value,
    pub amount: String,
    pub description: String,
    pub create_time: u64,
    pub update_time: u64,
}

#[derive(Debug, Clone)]
struct AppState {
    store: Arc<Mutex<BTreeMap<i64, StoredTransaction>>>,
    next_id: Arc<AtomicI64>,
    shape: ResponseShape,
    stats: TestServerStats,
    control: TestServerControl,
}

impl AppState {
    fn store(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, StoredTransaction>> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ok(&self, status: StatusCode, data: Value) -> Response {
        let body = match self.shape {
            ResponseShape::Flat => data,
            ResponseShape::Envelope => json!({ "code": 0, "msg": "success", "data": data }),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn fail(status: StatusCode, code: i32, msg: impl Into<String>) -> Response {
    let msg: String = msg.into();
    (status, axum::Json(json!({ "code": code, "msg": msg }))).into_response()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Validated request body, following the backend's DTO rules.
struct TransactionInput {
    transaction_no: Option<String>,
    source_account_id: Value,
    target_account_id: Value,
    amount: Decimal,
    description: String,
}

fn parse_input(body: &[u8]) -> Result<TransactionInput, String> {
    let v: Value = serde_json::from_slice(body).map_err(|e| format!("malformed json: {e}"))?;

    let account = |key: &str| match v.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Value::String(s.clone())),
        Some(id @ Value::Number(_)) => Ok(id.clone()),
        _ => Err(format!("{key} must not be empty")),
    };
    let source_account_id = account("sourceAccountId")?;
    let target_account_id = account("targetAccountId")?;

    let amount_text = match v.get("amount") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err("amount must not be empty".to_string()),
    };
    let amount = amount_text
        .parse::<Decimal>()
        .map_err(|_| format!("amount is not a decimal: {amount_text}"))?;
    if amount.scale() > 2 {
        return Err("amount must have at most two decimal places".to_string());
    }
    if amount <= Decimal::new(1, 2) {
        return Err("amount must be greater than 0.01".to_string());
    }

    let description = v
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "description must not be blank".to_string())?;
    let len = description.chars().count();
    if !(2..=30).contains(&len) {
        return Err("description length must be between 2 and 30".to_string());
    }

    let transaction_no = v
        .get("transactionNo")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(TransactionInput {
        transaction_no,
        source_account_id,
        target_account_id,
        amount,
        description: description.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    size: Option<u32>,
}

async fn handle_list(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    inc(&state.stats.requests_total);
    inc(&state.stats.list);

    let page = q.page.unwrap_or(1);
    let size = q.size.unwrap_or(10).clamp(1, 1000);
    *state
        .stats
        .last_list_query
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((page, size));

    // Pages are 1-based; page 0 is treated as the first page.
    let skip = (page.saturating_sub(1) as usize).saturating_mul(size as usize);
    let (content, total): (Vec<StoredTransaction>, usize) = {
        let store = state.store();
        let content = store
            .values()
            .rev()
            .skip(skip)
            .take(size as usize)
            .cloned()
            .collect();
        (content, store.len())
    };

    state.ok(
        StatusCode::OK,
        json!({ "content": content, "page": page, "size": size, "total": total }),
    )
}

async fn handle_create(State(state): State<AppState>, body: Bytes) -> Response {
    inc(&state.stats.requests_total);
    inc(&state.stats.create);

    if let Some(status) = TestServerControl::forced(&state.control.create_status) {
        return fail(status, 1002, "injected create failure");
    }

    let input = match parse_input(&body) {
        Ok(v) => v,
        Err(msg) => {
            inc(&state.stats.bad_request);
            return fail(StatusCode::BAD_REQUEST, 1001, msg);
        }
    };

    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    let now = now_millis();
    let stored = StoredTransaction {
        id,
        transaction_no: input.transaction_no.unwrap_or_else(|| format!("TX{id}")),
        source_account_id: input.source_account_id,
        target_account_id: input.target_account_id,
        amount: input.amount.to_string(),
        description: input.description,
        create_time: now,
        update_time: now,
    };
    state.store().insert(id, stored.clone());

    let mut data = serde_json::to_value(&stored).unwrap_or(Value::Null);
    if state.control.omit_create_id.load(Ordering::Relaxed)
        && let Some(obj) = data.as_object_mut()
    {
        obj.remove("id");
    }
    state.ok(StatusCode::CREATED, data)
}

async fn handle_get(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    inc(&state.stats.requests_total);
    inc(&state.stats.get);

    let found = state.store().get(&id).cloned();
    match found {
        Some(t) => state.ok(StatusCode::OK, serde_json::to_value(&t).unwrap_or(Value::Null)),
        None => {
            inc(&state.stats.not_found);
            fail(StatusCode::NOT_FOUND, 1002, format!("transaction {id} not found"))
        }
    }
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response {
    inc(&state.stats.requests_total);
    inc(&state.stats.update);

    let input = match parse_input(&body) {
        Ok(v) => v,
        Err(msg) => {
            inc(&state.stats.bad_request);
            return fail(StatusCode::BAD_REQUEST, 1001, msg);
        }
    };

    let updated = {
        let mut store = state.store();
        store.get_mut(&id).map(|t| {
            if let Some(no) = input.transaction_no {
                t.transaction_no = no;
            }
            t.source_account_id = input.source_account_id;
            t.target_account_id = input.target_account_id;
            t.amount = input.amount.to_string();
            t.description = input.description;
            t.update_time = now_millis();
            t.clone()
        })
    };

    match updated {
        Some(t) => state.ok(StatusCode::OK, serde_json::to_value(&t).unwrap_or(Value::Null)),
        None => {
            inc(&state.stats.not_found);
            fail(StatusCode::NOT_FOUND, 1002, format!("transaction {id} not found"))
        }
    }
}

async fn handle_delete(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    inc(&state.stats.requests_total);
    inc(&state.stats.delete);

    if let Some(status) = TestServerControl::forced(&state.control.delete_status) {
        return fail(status, 1002, "injected delete failure");
    }

    let removed = state.store().remove(&id);
    match removed {
        Some(_) => state.ok(StatusCode::OK, Value::Null),
        None => {
            inc(&state.stats.not_found);
            fail(StatusCode::NOT_FOUND, 1002, format!("transaction {id} not found"))
        }
    }
}

pub fn router(shape: ResponseShape, stats: TestServerStats, control: TestServerControl) -> Router {
    let state = AppState {
        store: Arc::new(Mutex::new(BTreeMap::new())),
        next_id: Arc::new(AtomicI64::new(1)),
        shape,
        stats,
        control,
    };

    Router::new()
        .route(PATH_TRANSACTIONS, get(handle_list).post(handle_create))
        .route(
            PATH_TRANSACTION,
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .with_state(state)
}

pub struct TestServer {
    base_url: String,
    stats: TestServerStats,
    control: TestServerControl,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(ResponseShape::Flat).await
    }

    pub async fn start_with(shape: ResponseShape) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let control = TestServerControl::default();
        let app = router(shape, stats.clone(), control.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            stats,
            control,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub fn control(&self) -> &TestServerControl {
        &self.control
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
