use std::sync::Arc;

/// Shared state for the HTTP surface.
///
/// The engine owns the run guard; `AppState` only wires the long-lived pieces
/// (store, config, browser pool) together so every handler sees one instance.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<crate::core::config::PilotConfig>,
    pub store: Arc<crate::store::KvStore>,
    pub engine: Arc<crate::engine::Engine>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store_path", &self.store.path())
            .field("target_url", &self.config.resolve_target_url())
            .finish()
    }
}

impl AppState {
    pub fn new() -> Self {
        let config = Arc::new(crate::core::config::load_pilot_config());
        let store = Arc::new(crate::store::KvStore::open_default());
        let engine = Arc::new(crate::engine::Engine::new(
            Arc::clone(&config),
            Arc::clone(&store),
        ));
        Self {
            config,
            store,
            engine,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
