use chat_relay::{build_router, AppState, RelayConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-relay",
    about = "Stateless HTTP relay that normalizes chat completions across LLM providers",
    version
)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Directory holding the static UI asset (index.html)
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Request/error audit log file (JSONL)
    #[arg(long, default_value = "chat-relay.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env();
    let logger = SharedLogger::new(&cli.log_file)?;

    let configured = config.configured_providers();
    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Port:       {}", cli.port);
    info!("  Static dir: {}", cli.static_dir.display());
    info!("  Log file:   {}", cli.log_file.display());
    if configured.is_empty() {
        info!("  Providers:  none configured (set provider API keys in the environment)");
    } else {
        info!("  Providers:  {}", configured.join(", "));
    }

    logger.info(
        "startup",
        format!("Starting chat-relay port={} providers={:?}", cli.port, configured),
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let state = Arc::new(AppState {
        config,
        client,
        logger,
        static_dir: cli.static_dir,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
