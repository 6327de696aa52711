//! Application state shared across handlers

use super::ServerConfig;
use crate::inference::ModelCache;
use crate::lookup::LookupCache;

pub struct AppState {
    pub config: ServerConfig,
    pub model: ModelCache,
    pub lookup: LookupCache,
}

impl AppState {
    /// Caches are empty until the first request that needs them.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            model: ModelCache::new(&config.model_path),
            lookup: LookupCache::new(&config.lookup_csv),
            config,
        }
    }
}
