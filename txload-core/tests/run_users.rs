use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use txload_core::runner::{ProgressFn, RunConfig, WaitTime, run_users};
use txload_core::transactions::{
    DriverOptions, NAME_COLLECTION, ScriptVariant, TASK_CREATE, TASK_DELETE, TASK_GET,
    TASK_LIST, TASK_UPDATE, TransactionsBehavior,
};
use txload_testserver::TestServer;

fn config(server: &TestServer) -> RunConfig {
    RunConfig {
        host: server.base_url().to_string(),
        users: 4,
        wait_time: WaitTime::constant(Duration::ZERO),
        timeout: Some(Duration::from_secs(5)),
        seed: Some(7),
        ..RunConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn iterations_bound_total_task_executions() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let behavior = Arc::new(TransactionsBehavior::default());

    let cfg = RunConfig {
        iterations: Some(200),
        ..config(&server)
    };
    let summary = run_users(behavior, cfg, None).await?;

    assert_eq!(summary.tasks_total, 200);
    let per_task: u64 = [TASK_LIST, TASK_CREATE, TASK_UPDATE, TASK_DELETE, TASK_GET]
        .iter()
        .map(|t| summary.task_count(t))
        .sum();
    assert_eq!(per_task, 200);
    assert_eq!(summary.users_started, 4);
    assert_eq!(summary.failures_total, 0);
    assert_eq!(summary.requests_total, server.stats().requests_total());
    assert!(summary.task_count(TASK_CREATE) > 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_only_weights_run_only_creates() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let mut options = DriverOptions::for_variant(ScriptVariant::Basic);
    options.weights.list = 0;
    options.weights.update = 0;
    options.weights.delete = 0;
    let behavior = Arc::new(TransactionsBehavior::new(options));

    let cfg = RunConfig {
        iterations: Some(25),
        ..config(&server)
    };
    let summary = run_users(behavior, cfg, None).await?;

    assert_eq!(summary.task_count(TASK_CREATE), 25);
    assert_eq!(server.stats().create(), 25);
    assert_eq!(
        summary.request("POST", NAME_COLLECTION).map(|r| r.count),
        Some(25)
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duration_bound_run_reports_progress() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let behavior = Arc::new(TransactionsBehavior::default());

    let ticks = Arc::new(AtomicU64::new(0));
    let progress: ProgressFn = {
        let ticks = ticks.clone();
        Arc::new(move |update| {
            assert_eq!(update.target_users, 2);
            ticks.fetch_add(1, Ordering::Relaxed);
        })
    };

    let cfg = RunConfig {
        users: 2,
        duration: Some(Duration::from_millis(2_500)),
        wait_time: WaitTime::constant(Duration::from_millis(10)),
        ..config(&server)
    };
    let summary = run_users(behavior, cfg, Some(progress)).await?;

    assert!(summary.elapsed >= Duration::from_secs(2));
    assert!(summary.elapsed < Duration::from_secs(10));
    assert!(summary.tasks_total > 0);
    assert!(ticks.load(Ordering::Relaxed) >= 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_host_counts_failures_without_aborting() -> anyhow::Result<()> {
    let behavior = Arc::new(TransactionsBehavior::default());
    let cfg = RunConfig {
        host: "http://127.0.0.1:1".to_string(),
        users: 1,
        iterations: Some(5),
        wait_time: WaitTime::constant(Duration::ZERO),
        timeout: Some(Duration::from_secs(2)),
        seed: Some(3),
        ..RunConfig::default()
    };

    let summary = run_users(behavior, cfg, None).await?;
    assert_eq!(summary.tasks_total, 5);
    assert!(summary.failures_total > 0);
    assert_eq!(summary.failures_total, summary.requests_total);
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected_before_running() {
    let behavior = Arc::new(TransactionsBehavior::default());
    let cfg = RunConfig {
        host: "ftp://example.com".to_string(),
        ..RunConfig::default()
    };
    assert!(run_users(behavior, cfg, None).await.is_err());
}

#[tokio::test]
async fn tiny_spawn_rate_is_rejected_before_running() {
    let behavior = Arc::new(TransactionsBehavior::default());
    let cfg = RunConfig {
        host: "http://127.0.0.1:1".to_string(),
        spawn_rate: Some(1e-30),
        iterations: Some(1),
        ..RunConfig::default()
    };
    assert!(run_users(behavior, cfg, None).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn huge_duration_still_stops_on_iterations() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let behavior = Arc::new(TransactionsBehavior::default());

    let cfg = RunConfig {
        users: 2,
        duration: Some(Duration::MAX),
        iterations: Some(20),
        ..config(&server)
    };
    let summary = run_users(behavior, cfg, None).await?;
    assert_eq!(summary.tasks_total, 20);

    server.shutdown().await;
    Ok(())
}
