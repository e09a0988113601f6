use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::http::{HttpClient, HttpRequest, HttpResponse, join_url};

use super::stats::{RequestMeta, RunStats};
use super::task::TaskSet;

/// A kind of simulated user: its task registry and session lifecycle hooks.
///
/// Each spawned user owns one `Session`, created by [`UserBehavior::on_start`] and handed to
/// every task it runs. Sessions are never shared between users.
pub trait UserBehavior: Send + Sync + 'static {
    type Session: Send + 'static;

    fn tasks(&self) -> TaskSet<Self::Session>;

    fn on_start(&self, ctx: &mut UserContext) -> Self::Session;

    fn on_stop(&self, session: Self::Session, ctx: &mut UserContext) {
        let _ = (session, ctx);
    }
}

/// Per-user handle on the run: identity, randomness, and the shared HTTP client.
#[derive(Debug)]
pub struct UserContext {
    user_id: u64,
    base_url: Arc<str>,
    client: Arc<HttpClient>,
    stats: Arc<RunStats>,
    timeout: Option<Duration>,
    rng: ChaCha8Rng,
}

/// Seeded runs give every user its own reproducible stream.
pub fn rng_for_user(seed: Option<u64>, user_id: u64) -> ChaCha8Rng {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(user_id);
            rng
        }
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

impl UserContext {
    pub fn new(
        user_id: u64,
        base_url: Arc<str>,
        client: Arc<HttpClient>,
        stats: Arc<RunStats>,
        timeout: Option<Duration>,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            user_id,
            base_url,
            client,
            stats,
            timeout,
            rng,
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn stats(&self) -> &Arc<RunStats> {
        &self.stats
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub async fn get(&self, path: &str, name: &str) -> Option<HttpResponse> {
        let url = join_url(&self.base_url, path);
        self.send(name, Ok(HttpRequest::get(url))).await
    }

    pub async fn delete(&self, path: &str, name: &str) -> Option<HttpResponse> {
        let url = join_url(&self.base_url, path);
        self.send(name, Ok(HttpRequest::delete(url))).await
    }

    pub async fn post_json<T: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        name: &str,
        body: &T,
    ) -> Option<HttpResponse> {
        let url = join_url(&self.base_url, path);
        self.send(name, HttpRequest::post_json(url, body)).await
    }

    pub async fn put_json<T: Serialize + ?Sized + Sync>(
        &self,
        path: &str,
        name: &str,
        body: &T,
    ) -> Option<HttpResponse> {
        let url = join_url(&self.base_url, path);
        self.send(name, HttpRequest::put_json(url, body)).await
    }

    /// Issue a request and record it under `name`.
    ///
    /// Transport failures are recorded and logged, then surface as `None`: a task never has to
    /// handle them to keep the user alive.
    pub async fn send(
        &self,
        name: &str,
        req: crate::http::Result<HttpRequest>,
    ) -> Option<HttpResponse> {
        let req = match req {
            Ok(req) => req.with_timeout(self.timeout),
            Err(err) => {
                tracing::debug!(
                    user_id = self.user_id,
                    request = name,
                    %err,
                    "failed to build request"
                );
                self.stats.record_request(RequestMeta {
                    method: "-",
                    name,
                    status: None,
                    transport_error_kind: Some(err.transport_kind()),
                    elapsed: Duration::ZERO,
                });
                return None;
            }
        };

        let method = req.method.clone();
        let started = Instant::now();
        let res = self.client.request(req).await;
        let elapsed = started.elapsed();

        match res {
            Ok(res) => {
                self.stats.record_request(RequestMeta {
                    method: method.as_str(),
                    name,
                    status: Some(res.status),
                    transport_error_kind: None,
                    elapsed,
                });
                Some(res)
            }
            Err(err) => {
                tracing::debug!(
                    user_id = self.user_id,
                    %method,
                    request = name,
                    %err,
                    "request failed"
                );
                self.stats.record_request(RequestMeta {
                    method: method.as_str(),
                    name,
                    status: None,
                    transport_error_kind: Some(err.transport_kind()),
                    elapsed,
                });
                None
            }
        }
    }
}
