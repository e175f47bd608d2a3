use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::engine::ghost::GhostSweeper;
use crate::engine::lifecycle::TripLifecycle;
use crate::store::TripStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub store: Arc<dyn TripStore>,
    pub lifecycle: Arc<TripLifecycle>,
    pub sweeper: Arc<GhostSweeper>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        store: Arc<dyn TripStore>,
        lifecycle: Arc<TripLifecycle>,
        sweeper: Arc<GhostSweeper>,
    ) -> Self {
        Self {
            config,
            db,
            store,
            lifecycle,
            sweeper,
        }
    }
}
