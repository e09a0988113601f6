use std::net::SocketAddr;

use tokio::net::TcpListener;
use txload_testserver::{ResponseShape, TestServerControl, TestServerStats};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut shape = ResponseShape::Flat;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--bind" => {
                let addr = args.next().ok_or_else(|| {
                    anyhow::anyhow!("--bind requires an address, e.g. 127.0.0.1:0")
                })?;
                bind_addr = addr.parse()?;
            }
            "--envelope" => shape = ResponseShape::Envelope,
            "-h" | "--help" => {
                eprintln!(
                    "txload-testserver\n\nUSAGE:\n  txload-testserver [--bind 127.0.0.1:0] [--envelope]\n\nOUTPUT:\n  Prints HTTP_URL=<url> to stdout once ready."
                );
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = txload_testserver::router(
        shape,
        TestServerStats::default(),
        TestServerControl::default(),
    );

    println!("HTTP_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
