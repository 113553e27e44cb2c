mod v1;

use utoipa_axum::router::OpenApiRouter;

use crate::config::UploadConfig;
use crate::state::AppState;

pub fn api_routes(upload: &UploadConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes(upload))
}
