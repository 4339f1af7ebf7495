//! Server state and configuration.

use tokio::sync::Mutex;

use crate::config::Config;
use crate::dispatch::Router;
use crate::document::Compositor;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: Config,
    /// One router for the whole server, so one job reaches the printer at a time.
    pub router: Mutex<Router>,
    pub compositor: Compositor,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let router = Router::from_config(&config);
        Self::with_router(config, router)
    }

    pub fn with_router(config: Config, router: Router) -> Self {
        let compositor = Compositor::load(config.template_path.as_deref());
        Self {
            config,
            router: Mutex::new(router),
            compositor,
        }
    }
}
