use std::sync::Arc;

use shared_config::AppConfig;
use shared_store::{SchedulingStore, SlotLocks};

/// Shared application state. The store and the slot lock map are built once
/// at startup and must outlive any single request; services are cheap
/// per-request views over them.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SchedulingStore>,
    pub locks: Arc<SlotLocks>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn SchedulingStore>) -> Self {
        Self {
            config,
            store,
            locks: Arc::new(SlotLocks::new()),
        }
    }
}
