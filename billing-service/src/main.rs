use billing_service::{BillingServer, Config};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Billing service starting...");

    // Load configuration
    let config = Config::load()?;

    info!(
        "Configuration loaded - gRPC address: {}, accounts: {}",
        config.grpc_listen_addr,
        config.population.len()
    );

    // Create and start server
    let server = BillingServer::new(config)?;

    info!("Billing service initialized successfully");

    server.start().await?;

    Ok(())
}
