use crate::handlers::{analyze_receipt, health_check, AppState};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

pub struct AppBuilder {
    app: Router,
}

impl AppBuilder {
    /// Routes of the receipt API. Uploads larger than `max_upload_bytes` are refused.
    pub fn new(state: AppState, max_upload_bytes: usize) -> Self {
        let app = Router::new()
            .route("/health", get(health_check))
            .route(
                "/analyze-receipt",
                post(analyze_receipt).layer(DefaultBodyLimit::max(max_upload_bytes)),
            )
            .with_state(state);
        Self { app }
    }

    pub fn with_trace_layer(self) -> Self {
        Self {
            app: self.app.layer(TraceLayer::new_for_http()),
        }
    }

    /// Any origin may call the API.
    pub fn with_cors_layer(self) -> Self {
        let cors_layer = if cfg!(debug_assertions) {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any)
        };
        Self {
            app: self.app.layer(cors_layer),
        }
    }

    pub fn build(self) -> Router {
        self.app
    }
}

/// Serve `app` on `addr` until Ctrl-C.
#[instrument(skip(app))]
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Receipt API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::ocr::ReceiptRecognizer;
    use crate::types::AnalyzeResult;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tower_service::Service;

    struct Unused;

    #[async_trait]
    impl ReceiptRecognizer for Unused {
        async fn analyze_receipt(&self, _: Bytes) -> Result<AnalyzeResult, AnalysisError> {
            Err(AnalysisError::Service("not expected".to_string()))
        }
    }

    fn app() -> Router {
        AppBuilder::new(AppState { recognizer: Arc::new(Unused) }, 1024)
            .with_trace_layer()
            .with_cors_layer()
            .build()
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/analyze-receipt")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_requires_get() {
        let request = Request::builder()
            .method("POST")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
