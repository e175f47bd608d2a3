use std::sync::Arc;

use frota::config::AppConfig;
use frota::db::init_pool;
use frota::engine::build_engine;
use frota::error::EngineError;
use frota::routes::create_router;
use frota::state::AppState;
use frota::store::sqlite::SqliteTripStore;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), EngineError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(EngineError::Other(err.into()));
    }

    let store = Arc::new(SqliteTripStore::new(db.clone()));
    let (lifecycle, sweeper) = build_engine(store.clone(), store.clone());

    let state = AppState::new(config.clone(), db, store, lifecycle, sweeper);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,frota=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
