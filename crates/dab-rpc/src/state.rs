//! Shared application state.

use std::sync::Arc;

use dab_backend::DaBackend;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub backend: Arc<DaBackend>,
}

impl AppState {
    pub fn new(backend: DaBackend) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}
