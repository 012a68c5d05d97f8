use app_config::AppConfig;

/// Shared by every request; `store` opens the per-request sessions.
#[derive(Clone)]
pub struct AppState<S> {
    pub config: AppConfig,
    pub store: S,
}

impl<S> AppState<S> {
    pub fn new(config: AppConfig, store: S) -> Self {
        Self { config, store }
    }
}
