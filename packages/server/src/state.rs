use crate::config::AppConfig;
use crate::documents::DocumentCoordinator;

#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentCoordinator,
    pub config: AppConfig,
}
