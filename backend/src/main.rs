//! Pharmacy back-office server
//!
//! Values purchase receipts, commits them to the configured receipt store,
//! and keeps batch stock in step. Batch stock always lives in Postgres; the
//! receipt store may be Postgres or the receipts API.

use pharmacy_backend::{
    config::{Config, StoreBackend},
    create_app,
    external::ReceiptApiClient,
    services::{
        PgLedgerStore, PgReceiptStore, PurchaseReceiptAssembler, ReceiptStore, StockLedger,
    },
    AppState,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pharmacy_server=debug,pharmacy_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Pharmacy Back-Office Server");
    tracing::info!("Environment: {}", config.environment);

    let db_pool = connect_database(&config).await?;
    let ledger = StockLedger::load(Arc::new(PgLedgerStore::new(db_pool.clone()))).await?;
    let store = build_store(&config, db_pool)?;

    if config.ledger.include_free_quantity {
        tracing::info!("Free quantities are added to batch stock on commit");
    }

    // Create application state
    let state = AppState {
        receipts: PurchaseReceiptAssembler::new(
            store,
            ledger.clone(),
            config.ledger.include_free_quantity,
        ),
        ledger,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect to Postgres, running migrations in development
async fn connect_database(config: &Config) -> anyhow::Result<PgPool> {
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    // Run migrations in development
    if config.environment == "development" {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    Ok(db_pool)
}

/// Pick the configured receipt store
fn build_store(config: &Config, db_pool: PgPool) -> anyhow::Result<Arc<dyn ReceiptStore>> {
    match config.store.backend {
        StoreBackend::Postgres => Ok(Arc::new(PgReceiptStore::new(db_pool))),
        StoreBackend::Http => {
            tracing::info!("Using receipts API at {}", config.api.base_url);
            let client = ReceiptApiClient::new(
                config.api.base_url.clone(),
                Duration::from_secs(config.api.timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
    }
}
