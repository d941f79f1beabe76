//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the service,
//! including the REST API, the bus WebSocket endpoint, and OpenAPI documentation.

use crate::{
    bus::ws_handler,
    handlers,
    models::{ErrorResponse, PendingSummary, StatusResponse, WordPayload},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::{path::Path, sync::Arc};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_status,
        handlers::submit_word,
        handlers::request_test,
        handlers::request_stop,
    ),
    components(
        schemas(StatusResponse, PendingSummary, WordPayload, ErrorResponse)
    ),
    tags(
        (name = "CoWriter Interaction", description = "Control surface of the handwriting tutoring interaction")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the service.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/words", post(handlers::submit_word))
        .route("/test", post(handlers::request_test))
        .route("/stop", post(handlers::request_stop))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

/// Serialises [`ApiDoc`] as pretty JSON into `path`.
pub fn write_openapi(path: &Path) -> anyhow::Result<()> {
    let json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in ["/status", "/words", "/test", "/stop"] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }

    #[test]
    fn written_document_is_the_served_one() {
        let path = std::env::temp_dir()
            .join(format!("cowriter-openapi-{}.json", uuid::Uuid::new_v4()));
        write_openapi(&path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        let served = serde_json::to_value(ApiDoc::openapi()).unwrap();
        assert_eq!(written, served);
        assert!(written["paths"]["/words"]["post"].is_object());
    }
}
