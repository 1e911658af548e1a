use dreampay_core::{AppState, config, create_app, db, gateway::PaymentsClient, services::SesionService};
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Payments service client
    let payments = PaymentsClient::new(
        config.payments_service_url.clone(),
        config.operating_wallet.clone(),
    );
    tracing::info!(
        url = %config.payments_service_url,
        "Payments client initialized"
    );

    let sesiones = SesionService::new(pool.clone(), config.session_ttl_hours);

    let app_state = AppState {
        db: pool,
        payments,
        sesiones,
        config: config.clone(),
    };
    let app = create_app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
