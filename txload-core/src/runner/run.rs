use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::http::HttpClient;

use super::config::RunConfig;
use super::error::Result;
use super::gate::TaskGate;
use super::progress::{ProgressFn, ProgressUpdate};
use super::stats::{RunStats, RunSummary};
use super::task::{TaskPicker, TaskSet};
use super::user::{UserBehavior, UserContext, rng_for_user};
use super::wait::WaitTime;

/// Run `cfg.users` simulated users of `behavior` until the gate closes.
///
/// Users are started at `cfg.spawn_rate` per second (all at once when unset). Each one runs
/// `on_start`, then repeatedly claims a slot from the gate, runs one weighted-random task and
/// pauses for the configured wait time. Ctrl-C closes the gate.
pub async fn run_users<B: UserBehavior>(
    behavior: Arc<B>,
    cfg: RunConfig,
    progress: Option<ProgressFn>,
) -> Result<RunSummary> {
    cfg.validate()?;

    let tasks = Arc::new(behavior.tasks());
    let picker = Arc::new(tasks.picker()?);

    let client = Arc::new(HttpClient::default());
    let stats = Arc::new(RunStats::default());
    let gate = Arc::new(TaskGate::new(cfg.iterations, cfg.duration));
    let base_url: Arc<str> = Arc::from(cfg.host.as_str());

    let started = Instant::now();
    gate.start_at(started);

    tracing::info!(
        host = %cfg.host,
        users = cfg.users,
        tasks = ?tasks.names(),
        "starting run"
    );

    let interrupt_handle = {
        let gate = gate.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, stopping users");
                gate.stop();
            }
        })
    };

    let progress_handle = progress.map(|progress| {
        tokio::spawn(report_progress(
            progress,
            stats.clone(),
            started,
            cfg.duration,
            cfg.users,
        ))
    });

    let spawn_interval = cfg.spawn_interval();

    let mut handles = Vec::with_capacity(usize::try_from(cfg.users).unwrap_or(usize::MAX));
    for user_id in 1..=cfg.users {
        if user_id > 1
            && let Some(interval) = spawn_interval
            && !gate.wait(interval).await
        {
            break;
        }
        if gate.is_stopped() {
            break;
        }

        let ctx = UserContext::new(
            user_id,
            base_url.clone(),
            client.clone(),
            stats.clone(),
            cfg.timeout,
            rng_for_user(cfg.seed, user_id),
        );

        handles.push(tokio::spawn(run_user(
            behavior.clone(),
            tasks.clone(),
            picker.clone(),
            gate.clone(),
            cfg.wait_time,
            ctx,
        )));
    }

    let mut join_result = Ok(());
    for h in handles {
        if let Err(err) = h.await
            && join_result.is_ok()
        {
            gate.stop();
            join_result = Err(err);
        }
    }

    gate.stop();
    interrupt_handle.abort();
    if let Some(h) = progress_handle {
        h.abort();
    }

    join_result?;

    let summary = stats.summarize(started.elapsed());
    tracing::info!(
        requests = summary.requests_total,
        failures = summary.failures_total,
        tasks = summary.tasks_total,
        "run finished"
    );
    Ok(summary)
}

async fn run_user<B: UserBehavior>(
    behavior: Arc<B>,
    tasks: Arc<TaskSet<B::Session>>,
    picker: Arc<TaskPicker>,
    gate: Arc<TaskGate>,
    wait_time: WaitTime,
    mut ctx: UserContext,
) {
    ctx.stats().user_started();
    tracing::debug!(user_id = ctx.user_id(), "user started");

    let mut session = behavior.on_start(&mut ctx);

    while gate.next() {
        let idx = picker.pick(ctx.rng());
        let Some((name, handler)) = tasks.get(idx).map(|t| (t.name(), t.handler())) else {
            break;
        };

        handler(&mut session, &mut ctx).await;
        ctx.stats().record_task(name);

        let pause = wait_time.sample(ctx.rng());
        if !gate.wait(pause).await {
            break;
        }
    }

    behavior.on_stop(session, &mut ctx);
    ctx.stats().user_stopped();
    tracing::debug!(user_id = ctx.user_id(), "user stopped");
}

async fn report_progress(
    progress: ProgressFn,
    stats: Arc<RunStats>,
    started: Instant,
    total_duration: Option<Duration>,
    target_users: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    let mut tick: u64 = 0;
    let mut last_at = Instant::now();
    let mut last_requests = stats.requests_total();
    let mut last_failures = stats.failures_total();

    loop {
        interval.tick().await;
        tick += 1;

        let now = Instant::now();
        let dt = now.duration_since(last_at);
        last_at = now;

        let requests_total = stats.requests_total();
        let failures_total = stats.failures_total();
        let secs = dt.as_secs_f64().max(1e-9);
        let rps_now = (requests_total.saturating_sub(last_requests) as f64) / secs;
        let failed_rps_now = (failures_total.saturating_sub(last_failures) as f64) / secs;
        last_requests = requests_total;
        last_failures = failures_total;

        stats.record_rps_sample(rps_now);

        (progress)(ProgressUpdate {
            tick,
            elapsed: now.duration_since(started),
            interval: dt,
            total_duration,
            active_users: stats.active_users(),
            target_users,
            requests_total,
            failures_total,
            tasks_total: stats.tasks_total(),
            rps_now,
            failed_rps_now,
        });
    }
}
