use std::sync::Arc;

use crate::application::SessionController;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(controller: SessionController, config: AppConfig) -> Self {
        Self {
            controller: Arc::new(controller),
            config: Arc::new(config),
        }
    }
}
