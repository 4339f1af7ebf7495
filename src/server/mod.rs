//! # JSON HTTP API
//!
//! Exposes validation, encoding, dispatch, batch printing and discovery over
//! HTTP.
//!
//! ## Usage
//!
//! ```bash
//! etiqueta serve --listen 0.0.0.0:8080 --config etiqueta.json
//! ```
//!
//! ## Routes
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/api/validate` | `{document, allowDangerous}` | inspection report |
//! | POST | `/api/encode` | `{barcode, po, sequence, targetLength}` | `{payload}` |
//! | POST | `/api/dispatch` | `{document, transport?, copies?, allowDangerous?}` | delivery |
//! | POST | `/api/batch` | `{items, transport?, targetLength?, allowDangerous?}` | batch report |
//! | GET | `/api/transports/:kind/discover` | | endpoints |
//!
//! Errors come back as `{"success": false, "code": ..., "error": ...}`.

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::EtiquetaError;

/// Build the API router over shared state.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/validate", post(handlers::labels::validate))
        .route("/api/encode", post(handlers::labels::encode))
        .route("/api/dispatch", post(handlers::print::dispatch))
        .route("/api/batch", post(handlers::print::batch))
        .route(
            "/api/transports/:kind/discover",
            get(handlers::transports::discover),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use etiqueta::config::Config;
/// use etiqueta::server::{serve, AppState, ServerConfig};
///
/// # async fn example() -> Result<(), etiqueta::error::EtiquetaError> {
/// let server = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
/// };
///
/// serve(server, AppState::new(Config::default())).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig, state: AppState) -> Result<(), EtiquetaError> {
    info!(
        listen = %config.listen_addr,
        printer = %state.config.printer_name,
        transport = %state.config.default_transport,
        template = ?state.compositor.source(),
        "etiqueta HTTP server starting"
    );

    let app = app(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            EtiquetaError::Config(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::dispatch::Router as DispatchRouter;
    use crate::transport::TransportKind;

    fn test_app() -> Router {
        let config = Config {
            template_path: None,
            pacing_ms: 0,
            ..Config::default()
        };
        // No transports registered: anything that reaches a printer fails.
        let router = DispatchRouter::new(TransportKind::Network);
        app(Arc::new(AppState::with_router(config, router)))
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validate_reports_dangerous_commands() {
        let (status, body) = post_json(
            "/api/validate",
            json!({"document": "^XA^RFW,H,2,12,1^FD123^FS^XZ"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], json!(false));
        assert_eq!(body["safetyLevel"], json!("DANGEROUS"));
        assert_eq!(body["dangerousCommandsFound"], json!(["^RFW"]));
    }

    #[tokio::test]
    async fn test_encode_returns_payload() {
        let (status, body) = post_json(
            "/api/encode",
            json!({"barcode": "789643610064", "po": "0464", "sequence": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payload"], json!("789643610064046410000000"));
    }

    #[tokio::test]
    async fn test_encode_rejects_letters() {
        let (status, body) = post_json("/api/encode", json!({"barcode": "ABC"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("InvalidPayload"));
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_dispatch_blocks_dangerous_document() {
        let (status, body) = post_json(
            "/api/dispatch",
            json!({"document": "^XA^RFW,H^FD1^FS^XZ", "transport": "network"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("DangerousCommandBlocked"));
    }

    #[tokio::test]
    async fn test_dispatch_without_transport_is_bad_gateway() {
        let (status, body) = post_json(
            "/api/dispatch",
            json!({"document": "^XA^FDhi^FS^XZ", "transport": "network"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], json!("ConnectionError"));
    }

    #[tokio::test]
    async fn test_batch_records_failures() {
        let (status, body) = post_json(
            "/api/batch",
            json!({
                "items": [{"VPM": "L458-JASM-11.0-SILV-1885", "BARCODE": "789643610064", "QTY": 2}],
                "allowDangerous": true
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], json!(1));
        assert_eq!(body["totalCopies"], json!(2));
        assert_eq!(body["successCount"], json!(0));
        assert_eq!(body["results"][1]["copyIndex"], json!(2));
        assert_eq!(body["results"][0]["payload"], json!("789643610064458100000000"));
    }

    #[tokio::test]
    async fn test_encode_rejects_oversized_target_length() {
        let (status, body) = post_json(
            "/api/encode",
            json!({"barcode": "789643610064", "targetLength": 18446744073709551615u64}),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("InvalidPayload"));
    }

    #[tokio::test]
    async fn test_batch_rejects_oversized_target_length() {
        let (status, body) = post_json(
            "/api/batch",
            json!({
                "items": [{"BARCODE": "789643610064", "QTY": 1}],
                "targetLength": 1000
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], json!("InvalidPayload"));
    }

    #[tokio::test]
    async fn test_discover_unknown_kind_is_rejected() {
        let request = Request::get("/api/transports/bluetooth/discover")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_discover_unregistered_kind_is_empty() {
        let request = Request::get("/api/transports/os-copy/discover")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), json!([]));
    }
}
