use finance_intake_service::{Config, config::LogFormat, create_app};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing: structured JSON by default, human-readable with `LOG_FORMAT=pretty`
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "finance_intake_service=debug,page_flow=debug,tower_http=debug".into()
    });

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    if config.groq_api_key.is_none() {
        warn!("GROQ_API_KEY not set; advisory replies will report the missing key");
    }

    let app = create_app(&config)?;
    let listener = TcpListener::bind(&config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("Finance intake service running on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
