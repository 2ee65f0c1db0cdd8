//! HTTP surface: the workflow metrics endpoint and a health check.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use serde_json::json;
use tokio::net::TcpListener;

use crate::error::ActionLensError;
use crate::metrics::WorkflowMetricsReport;
use crate::providers::GitHubProvider;

/// Body sent for every failed collection, whatever went wrong upstream.
pub const GENERIC_FAILURE: &str = "Failed to fetch GitHub Actions data";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    provider: Arc<GitHubProvider>,
}

impl AppState {
    pub fn new(provider: GitHubProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

/// Collection failure as seen by HTTP clients.
///
/// The detailed error is logged; the client only gets the generic message.
pub struct MetricsError(ActionLensError);

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        error!("Error fetching GitHub Actions data: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": GENERIC_FAILURE })),
        )
            .into_response()
    }
}

pub fn router(state: AppState, route: &str) -> Router {
    Router::new()
        .route(route, get(get_workflows))
        .route("/health", get(health))
        .with_state(state)
}

async fn get_workflows(
    State(state): State<AppState>,
) -> Result<Json<WorkflowMetricsReport>, MetricsError> {
    let report = state.provider.collect_metrics().await.map_err(MetricsError)?;
    info!(
        "Served metrics for {} workflows ({} runs)",
        report.workflows.len(),
        report.metrics.total_runs
    );
    Ok(Json(report))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Binds `address` and serves until Ctrl+C or SIGTERM.
pub async fn serve(address: &str, route: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = address
        .parse()
        .with_context(|| format!("Invalid server address: {address}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Serving workflow metrics on http://{addr}{route}");

    axum::serve(listener, router(state, route))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::Value;
    use tower::ServiceExt;

    const ROUTE: &str = "/api/github-actions/workflows";

    fn app(server: &ServerGuard) -> Router {
        let mut config = Config::default();
        config.github.base_url = server.url();
        config.github.owner = Some("octo".to_string());
        config.github.repo = Some("demo".to_string());

        let provider = GitHubProvider::from_config(&config).unwrap();
        router(AppState::new(provider), ROUTE)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_empty_repository_response_shape() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/demo/actions/workflows")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total_count":0,"workflows":[]}"#)
            .create_async()
            .await;

        let (status, body) = get_json(app(&server), ROUTE).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workflows"], json!([]));
        let metrics = &body["metrics"];
        assert_eq!(metrics["avgRunTime"], "0s");
        assert_eq!(metrics["avgQueueTime"], "0s");
        assert_eq!(metrics["failureRate"], "0%");
        assert_eq!(metrics["failedJobMinutes"], "0.0");
        assert_eq!(metrics["totalMinutes"], "0.0");
        assert_eq!(metrics["totalRuns"], 0);
        assert!(metrics["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_generic_500() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/octo/demo/actions/workflows")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"message":"API rate limit exceeded"}"#)
            .create_async()
            .await;

        let (status, body) = get_json(app(&server), ROUTE).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch GitHub Actions data" }));
    }

    #[tokio::test]
    async fn test_health() {
        let server = Server::new_async().await;
        let (status, body) = get_json(app(&server), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
