use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use engine_client::{EngineAnalyzer, SessionConfig};
use uci_protocol::DEFAULT_ENGINE_ADDR;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("engine_client=debug".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let fen = args
        .next()
        .context("Usage: engine-client <FEN> [engine-addr]")?;
    let addr = args
        .next()
        .or_else(|| std::env::var("ENGINE_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_ENGINE_ADDR.to_string());

    info!("Evaluating position against engine at {}", addr);

    let analyzer = EngineAnalyzer::with_config(SessionConfig::new(addr));

    let version = analyzer.engine_version().await?;
    info!("Engine version: {}", version);

    let evaluation = analyzer.evaluate_fen(&fen).await?;
    analyzer.disconnect().await;

    println!("{}", serde_json::to_string_pretty(&evaluation)?);

    Ok(())
}
