//! # Dashboard HTTP Server
//!
//! Serves the rendered page at `GET /` and the unified tide table at
//! `GET /api/tides`. Every request runs a fresh [`Pipeline::load`]; the
//! pipeline itself is the only state shared between requests.
//!
//! A failed load never produces a partial page. The handler answers
//! `502 Bad Gateway` (or `500` for configuration problems) with an error
//! page, or with an [`ApiError`] body on the JSON route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::DashError;
use crate::pipeline::Pipeline;
use crate::renderer;
use crate::source::JsonSource;

/// JSON error body for `/api/tides`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Failing external call, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<String>,
}

impl From<&DashError> for ApiError {
    fn from(err: &DashError) -> Self {
        let code = match err {
            DashError::Fetch { .. } => "FETCH_FAILED",
            DashError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            DashError::DataShape { .. } => "DATA_SHAPE",
            DashError::Config(_) => "CONFIG_ERROR",
        };
        ApiError {
            code: code.to_string(),
            message: err.to_string(),
            call: err.call().map(|call| call.name().to_string()),
        }
    }
}

/// Status code for a failed load.
pub fn status_for(err: &DashError) -> StatusCode {
    match err {
        DashError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// Routes bound to a shared pipeline.
pub fn router<S: JsonSource + 'static>(pipeline: Arc<Pipeline<S>>) -> Router {
    Router::new()
        .route("/", get(index::<S>))
        .route("/api/tides", get(tides::<S>))
        .with_state(pipeline)
}

async fn index<S: JsonSource + 'static>(State(pipeline): State<Arc<Pipeline<S>>>) -> Response {
    match pipeline.load(Utc::now()).await {
        Ok(dashboard) => Html(renderer::render_page(&dashboard)).into_response(),
        Err(err) => {
            log::error!("Dashboard load failed: {}", err);
            (status_for(&err), Html(renderer::render_error_page(&err))).into_response()
        }
    }
}

async fn tides<S: JsonSource + 'static>(State(pipeline): State<Arc<Pipeline<S>>>) -> Response {
    match pipeline.load(Utc::now()).await {
        Ok(dashboard) => Json(dashboard.rows).into_response(),
        Err(err) => {
            log::error!("Tide table load failed: {}", err);
            (status_for(&err), Json(ApiError::from(&err))).into_response()
        }
    }
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve<S: JsonSource + 'static>(addr: SocketAddr, pipeline: Arc<Pipeline<S>>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    log::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiCall;
    use crate::tests::fixtures::{self, Reply, StubSource};
    use axum::body::to_bytes;

    fn shared(source: StubSource) -> Arc<Pipeline<StubSource>> {
        Arc::new(Pipeline::new(fixtures::config(), source).unwrap())
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        let fetch = DashError::Fetch {
            call: ApiCall::WaterLevel,
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(status_for(&fetch), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&DashError::Config("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_names_call() {
        let err = DashError::MalformedResponse {
            call: ApiCall::WeatherForecast,
            detail: "missing field `pressure` at list[2].main".to_string(),
        };
        let body = ApiError::from(&err);
        assert_eq!(body.code, "MALFORMED_RESPONSE");
        assert_eq!(body.call.as_deref(), Some("weather forecast"));
        assert!(body.message.contains("list[2]"));
    }

    #[tokio::test]
    async fn test_index_renders_page() {
        let response = index(State(shared(StubSource::healthy()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Maxwelton Beach Weather Dashboard"));
        assert_eq!(html.matches("<svg").count(), 2);
    }

    #[tokio::test]
    async fn test_index_failure_is_error_page() {
        let source = StubSource::healthy().with(ApiCall::TidePredictions, Reply::Fail("HTTP 500".to_string()));
        let response = index(State(shared(source))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let html = body_text(response).await;
        assert!(html.contains("Could not load tide predictions data"));
        assert!(!html.contains("<svg"));
    }

    #[tokio::test]
    async fn test_tides_returns_rows() {
        let response = tides(State(shared(StubSource::healthy()))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["predicted_height"], 10.0);
        assert!(rows[1]["measured_height"].is_null());
    }

    #[tokio::test]
    async fn test_tides_failure_is_json_error() {
        let source = StubSource::healthy().with(ApiCall::AirPressure, Reply::Fail("connection reset".to_string()));
        let response = tides(State(shared(source))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: ApiError = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.code, "FETCH_FAILED");
        assert_eq!(body.call.as_deref(), Some("air pressure"));
    }

    #[test]
    fn test_router_builds() {
        let _router = router(shared(StubSource::healthy()));
    }
}
