use clap::{Parser, Subcommand};
use tahrir_common::Config;
use tahrir_orchestrator::CoreContext;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tahrir", about = "Editorial intelligence core")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run workers, reaper, and tick loops until interrupted (default).
    Serve,
    /// One scout + router pass, then exit.
    PipelineOnce,
    /// One trend scan, then exit.
    TrendsOnce,
    /// One published-quality scan, then exit.
    MonitorOnce,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let context = CoreContext::start(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!("Serving until SIGINT");
            tokio::signal::ctrl_c().await?;
        }
        Command::PipelineOnce => {
            let scout_stats = context.scout.run().await?;
            info!("{scout_stats}");
            let router_stats = context.router.process_batch().await?;
            info!(
                processed = router_stats.processed,
                candidates = router_stats.candidates,
                ai_calls = router_stats.ai_calls,
                "Router pass complete"
            );
        }
        Command::TrendsOnce => {
            let alerts = context.trend_radar.scan().await?;
            info!(alerts = alerts.len(), "Trend scan complete");
        }
        Command::MonitorOnce => {
            let report = context.published_monitor.scan(None, None).await?;
            info!(
                weak_items = report["weak_items_count"].as_i64().unwrap_or(0),
                "Published monitor scan complete"
            );
        }
    }

    context.stop().await;
    Ok(())
}
