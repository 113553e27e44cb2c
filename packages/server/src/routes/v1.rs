use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::UploadConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(upload: &UploadConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().merge(document_routes(upload))
}

fn document_routes(upload: &UploadConfig) -> OpenApiRouter<AppState> {
    let read = OpenApiRouter::new()
        .routes(routes!(handlers::document::list_documents))
        .routes(routes!(
            handlers::document::download_document,
            handlers::document::delete_document
        ));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::document::upload_document))
        .layer(handlers::document::document_upload_body_limit(
            upload.max_size,
        ));

    read.merge(upload)
}
