use std::sync::Arc;
use std::time::Duration;

use txload_core::HttpClient;
use txload_core::runner::{RunStats, UserContext, rng_for_user};
use txload_core::transactions::{
    CreateOutcome, DriverOptions, NAME_COLLECTION, NAME_ITEM, NAME_LIST, ScriptVariant,
    TransactionId, TransactionSession,
};
use txload_testserver::{ResponseShape, TestServer};

fn context(server: &TestServer, stats: Arc<RunStats>) -> UserContext {
    UserContext::new(
        1,
        Arc::from(server.base_url()),
        Arc::new(HttpClient::default()),
        stats,
        Some(Duration::from_secs(5)),
        rng_for_user(Some(42), 1),
    )
}

fn session(variant: ScriptVariant) -> TransactionSession {
    TransactionSession::new(Arc::new(DriverOptions::for_variant(variant)))
}

#[tokio::test]
async fn create_remembers_returned_id_once() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());
    let mut s = session(ScriptVariant::Extended);

    let outcome = s.create_transaction(&mut ctx).await;
    let id = outcome.id().cloned().ok_or_else(|| anyhow::anyhow!("{outcome:?}"))?;
    assert_eq!(id, TransactionId::Number(1));
    assert_eq!(s.known_ids().len(), 1);
    assert!(s.known_ids().contains(&id));

    assert_eq!(server.stats().create(), 1);
    assert_eq!(server.stats().bad_request(), 0);
    assert_eq!(stats.failures_total(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn basic_payload_is_accepted_by_backend_validation() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());
    let mut s = session(ScriptVariant::Basic);

    for _ in 0..20 {
        let outcome = s.create_transaction(&mut ctx).await;
        assert!(matches!(outcome, CreateOutcome::Created(_)), "{outcome:?}");
    }
    assert_eq!(s.known_ids().len(), 20);
    assert_eq!(server.stats().bad_request(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn rejected_create_leaves_known_ids_unchanged() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());
    let mut s = session(ScriptVariant::Extended);

    assert!(s.create_transaction(&mut ctx).await.id().is_some());

    server.control().force_create_status(Some(500));
    let outcome = s.create_transaction(&mut ctx).await;
    assert_eq!(outcome, CreateOutcome::Rejected { status: 500 });
    assert_eq!(s.known_ids().len(), 1);

    server.control().force_create_status(Some(200));
    let outcome = s.create_transaction(&mut ctx).await;
    assert_eq!(outcome, CreateOutcome::Rejected { status: 200 });
    assert_eq!(s.known_ids().len(), 1);

    let summary = stats.summarize(Duration::from_secs(1));
    let create = summary
        .request("POST", NAME_COLLECTION)
        .ok_or_else(|| anyhow::anyhow!("missing create stats"))?;
    assert_eq!(create.count, 3);
    assert_eq!(create.failures, 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn created_without_id_is_reported() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats);
    let mut s = session(ScriptVariant::Extended);

    server.control().omit_create_id(true);
    let outcome = s.create_transaction(&mut ctx).await;
    assert_eq!(outcome, CreateOutcome::MissingId { status: 201 });
    assert!(s.known_ids().is_empty());

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn envelope_response_ids_are_extracted() -> anyhow::Result<()> {
    let server = TestServer::start_with(ResponseShape::Envelope).await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats);
    let mut s = session(ScriptVariant::Extended);

    let outcome = s.create_transaction(&mut ctx).await;
    assert_eq!(outcome, CreateOutcome::Created(TransactionId::Number(1)));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn delete_forgets_id_even_when_server_fails() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());
    let mut s = session(ScriptVariant::Basic);

    assert!(s.create_transaction(&mut ctx).await.id().is_some());
    server.control().force_delete_status(Some(503));

    s.delete_transaction(&mut ctx).await;
    assert!(s.known_ids().is_empty());
    assert_eq!(server.stats().delete(), 1);
    assert_eq!(stats.failures_total(), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn delete_forgets_id_when_host_is_unreachable() {
    let stats = Arc::new(RunStats::default());
    let mut ctx = UserContext::new(
        1,
        Arc::from("http://127.0.0.1:1"),
        Arc::new(HttpClient::default()),
        stats.clone(),
        Some(Duration::from_secs(2)),
        rng_for_user(Some(42), 1),
    );
    let mut s = session(ScriptVariant::Basic);
    s.known_ids_mut().insert(TransactionId::Number(7));

    s.delete_transaction(&mut ctx).await;
    assert!(s.known_ids().is_empty());
    assert_eq!(stats.requests_total(), 1);
    assert_eq!(stats.failures_total(), 1);
}

#[tokio::test]
async fn basic_variant_skips_targeted_tasks_without_ids() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());
    let mut s = session(ScriptVariant::Basic);

    s.update_transaction(&mut ctx).await;
    s.delete_transaction(&mut ctx).await;
    s.get_transaction_by_id(&mut ctx).await;

    assert_eq!(stats.requests_total(), 0);
    assert_eq!(server.stats().requests_total(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn extended_variant_bootstraps_an_id_first() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());

    let mut s = session(ScriptVariant::Extended);
    s.update_transaction(&mut ctx).await;
    assert_eq!(server.stats().create(), 1);
    assert_eq!(server.stats().update(), 1);
    assert_eq!(server.stats().not_found(), 0);
    assert_eq!(s.known_ids().len(), 1);

    let mut s = session(ScriptVariant::Extended);
    s.get_transaction_by_id(&mut ctx).await;
    assert_eq!(server.stats().create(), 2);
    assert_eq!(server.stats().get(), 1);

    let mut s = session(ScriptVariant::Extended);
    s.delete_transaction(&mut ctx).await;
    assert_eq!(server.stats().create(), 3);
    assert_eq!(server.stats().delete(), 1);
    assert!(s.known_ids().is_empty());

    assert_eq!(server.stats().not_found(), 0);
    let summary = stats.summarize(Duration::from_secs(1));
    assert_eq!(summary.failures_total, 0);
    assert_eq!(
        summary.request("PUT", NAME_ITEM).map(|r| r.count),
        Some(1)
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn extended_bootstrap_threshold_is_configurable() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats);

    let mut options = DriverOptions::for_variant(ScriptVariant::Extended);
    options.bootstrap_below = 3;
    let mut s = TransactionSession::new(Arc::new(options));

    for _ in 0..5 {
        s.get_transaction_by_id(&mut ctx).await;
    }
    assert_eq!(server.stats().create(), 3);
    assert_eq!(server.stats().get(), 5);
    assert_eq!(s.known_ids().len(), 3);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn list_uses_variant_page() -> anyhow::Result<()> {
    let server = TestServer::start().await?;
    let stats = Arc::new(RunStats::default());
    let mut ctx = context(&server, stats.clone());

    session(ScriptVariant::Basic).list_transactions(&mut ctx).await;
    assert_eq!(server.stats().last_list_query(), Some((0, 10)));

    session(ScriptVariant::Extended)
        .list_transactions(&mut ctx)
        .await;
    assert_eq!(server.stats().last_list_query(), Some((1, 10)));
    assert_eq!(server.stats().list(), 2);

    let summary = stats.summarize(Duration::from_secs(1));
    assert_eq!(summary.request("GET", NAME_LIST).map(|r| r.count), Some(2));

    server.shutdown().await;
    Ok(())
}
