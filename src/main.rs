use course_market::{
    api::{self, AppState},
    cache::CatalogCache,
    config::{self, Settings, database},
    core::user,
    errors::{Error, Result},
    gateway::{MockGateway, PaymentGateway, StripeGateway},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Settings from the environment, static data from config.toml
    let settings = Settings::from_env()?;
    let marketplace = config::marketplace::load_config(&settings.config_path)
        .inspect_err(|e| error!("Failed to load {}: {}", settings.config_path, e))?;
    info!(
        seller_share_percent = marketplace.marketplace.seller_share_percent,
        mentors = marketplace.mentors.len(),
        "Loaded marketplace configuration"
    );

    // 4. Database
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    if let (Some(email), Some(password)) = (&settings.admin_email, &settings.admin_password) {
        user::ensure_admin(&db, email, password).await?;
    }

    // 5. Payment gateway
    let gateway: Arc<dyn PaymentGateway> = match &settings.stripe_secret_key {
        Some(key) => Arc::new(StripeGateway::new(key.clone())),
        None => {
            warn!("Using the in-memory payment gateway; every intent confirms on verification");
            Arc::new(MockGateway::auto_confirming())
        }
    };
    if settings.stripe_webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET not set, webhook deliveries will be rejected");
    }

    // 6. Serve
    let bind_addr = settings.bind_addr.clone();
    let state = AppState {
        db,
        gateway,
        settings: Arc::new(settings),
        marketplace: Arc::new(marketplace),
        catalog_cache: CatalogCache::new(),
    };
    let app = api::router(state)?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_addr, e))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
