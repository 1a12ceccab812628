// Workbench Gate - HTTP Bridge
//
// Thin REST surface over the same gateway the MCP transport uses:
// GET /tools lists the catalog, POST /call_tool dispatches one call.
// Handlers run in blocking tasks because dispatch does filesystem,
// process, and SQLite work.

use crate::errors::GateError;
use crate::gateway::{CallRequest, CallResult, Gateway};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/call_tool", post(call_tool))
        .with_state(gateway)
}

/// Bind and serve until the process is stopped.
pub async fn serve(gateway: Arc<Gateway>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("HTTP bridge listening on http://{}", addr);
    axum::serve(listener, router(gateway))
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn list_tools(State(gateway): State<Arc<Gateway>>) -> Json<Value> {
    let tools: Vec<Value> = gateway
        .registry()
        .list()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.qualified_name,
                "description": tool.description,
                "inputSchema": tool.input_schema(),
            })
        })
        .collect();
    Json(json!({ "tools": tools }))
}

async fn call_tool(
    State(gateway): State<Arc<Gateway>>,
    body: Result<Json<CallRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("malformed request body: {}", e) })),
            )
                .into_response();
        }
    };

    let result = tokio::task::spawn_blocking(move || gateway.dispatch(&request)).await;

    match result {
        Ok(CallResult::Success(payload)) => (StatusCode::OK, Json(payload)).into_response(),
        Ok(CallResult::Failure(e)) => {
            let status = status_for(&e);
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(join_err) => {
            log::error!("dispatch task failed: {}", join_err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal dispatch failure" })),
            )
                .into_response()
        }
    }
}

/// Map the failure class to an HTTP status. Caller faults are 4xx,
/// everything the tool side broke is 500.
fn status_for(error: &GateError) -> StatusCode {
    match error {
        GateError::InvalidParameters(_)
        | GateError::SandboxViolation(_)
        | GateError::CommandNotAllowed(_) => StatusCode::BAD_REQUEST,
        GateError::ToolNotFound(_) => StatusCode::NOT_FOUND,
        GateError::CommandTimeout(_) | GateError::CommandFailure(_) | GateError::Handler(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkbenchConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn app_in(dir: &std::path::Path) -> Router {
        let config = WorkbenchConfig {
            workspace_root: dir.to_path_buf(),
            ..WorkbenchConfig::default()
        };
        router(Arc::new(Gateway::new(config).unwrap()))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn tools_endpoint_lists_the_catalog() {
        let dir = tempdir().unwrap();
        let app = app_in(dir.path());
        let response = app
            .oneshot(Request::get("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"FS: read_file"));
        assert!(names.contains(&"DB: run_query"));
    }

    #[tokio::test]
    async fn successful_call_returns_the_payload_directly() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let app = app_in(dir.path());
        let request = Request::post("/call_tool")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "FS: read_file", "params": {"path": "a.txt"}}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["content"], "hi");
    }

    #[tokio::test]
    async fn unknown_tool_is_404() {
        let dir = tempdir().unwrap();
        let app = app_in(dir.path());
        let request = Request::post("/call_tool")
            .header("content-type", "application/json")
            .body(Body::from(json!({"name": "nope"}).to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn caller_faults_are_400() {
        let dir = tempdir().unwrap();
        let app = app_in(dir.path());
        // Sandbox escape attempt
        let request = Request::post("/call_tool")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "FS: read_file", "params": {"path": "../etc/passwd"}}).to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let dir = tempdir().unwrap();
        let app = app_in(dir.path());
        let request = Request::post("/call_tool")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
