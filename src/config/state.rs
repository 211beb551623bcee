// Application state module
// Holds the loaded configuration and the route table shared by every connection

use super::types::Config;
use crate::routing::RouteTable;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Read-only after startup, no locking needed
    pub routes: RouteTable,
}

impl AppState {
    pub fn new(config: &Config, routes: RouteTable) -> Self {
        Self {
            config: config.clone(),
            routes,
        }
    }
}
