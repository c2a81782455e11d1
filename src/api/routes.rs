//! REST endpoints for running turns and inspecting sessions.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::error::ApiError;

use super::service::TurnService;
use super::wire::{HealthResponse, RunRequest, RunResponse};

const SERVICE_NAME: &str = "Neta Social Assistant";

/// Shared state for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TurnService>,
    pub assistant_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(e) => {
                error!(error = %e, "Session store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// An empty body is an empty request.
fn parse_run_request(body: &[u8]) -> Result<RunRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        assistant_id: state.assistant_id.clone(),
    })
}

/// POST /runs
///
/// Runs a turn for the session named in `input`, or starts a new one.
async fn create_run(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunResponse>, ApiError> {
    let request = parse_run_request(&body)?;
    let out = state.service.run(None, request).await?;
    Ok(Json(RunResponse::completed(&out)))
}

/// POST /threads/{thread_id}/runs
async fn create_thread_run(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
    body: Bytes,
) -> Result<Json<RunResponse>, ApiError> {
    let request = parse_run_request(&body)?;
    let out = state.service.run(Some(thread_id), request).await?;
    Ok(Json(RunResponse::completed(&out)))
}

/// GET /threads/{thread_id}/state
///
/// Returns the stored conversation state, or 404 if the thread is unknown.
async fn get_thread_state(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.service.get_state(&thread_id).await?;
    Ok(Json(stored))
}

/// Build the API routes, with permissive CORS for browser clients.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/runs", post(create_run))
        .route("/threads/{thread_id}/runs", post(create_thread_run))
        .route("/threads/{thread_id}/state", get(get_thread_state))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::error::DatabaseError;
    use crate::store::InMemorySessionStore;
    use crate::workflow::handler::HandlerSet;
    use crate::workflow::orchestrator::Orchestrator;
    use crate::workflow::steps::Collaborators;

    fn app() -> Router {
        let service = TurnService::new(
            Arc::new(InMemorySessionStore::new()),
            Orchestrator::new(HandlerSet::standard(&Collaborators::default())),
        );
        api_routes(AppState {
            service: Arc::new(service),
            assistant_id: "neta-social-assistant".to_string(),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn blank_body_parses_as_default() {
        assert!(parse_run_request(b"").unwrap().input.is_none());
        assert!(parse_run_request(b"  \n").is_ok());
        assert!(matches!(parse_run_request(b"{nope"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::SessionNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Store(DatabaseError::Query("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn health_reports_service() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert_eq!(json["assistant_id"], "neta-social-assistant");
    }

    #[tokio::test]
    async fn stateless_run_with_snapshot() {
        let body = serde_json::json!({
            "assistant_id": "neta-social-assistant",
            "input": {"business_name": "Mike's Pizza", "current_step": "greeting"}
        });
        let response = app()
            .oneshot(
                Request::post("/runs")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "completed");
        assert_eq!(json["output"]["current_step"], "social_discovery");
        assert_eq!(json["output"]["data_bag"]["social_discovery_completed"], true);
        assert_eq!(json["output"]["discovered_resources"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let response = app()
            .oneshot(
                Request::post("/threads/t1/runs")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_thread_state_is_not_found() {
        let response = app()
            .oneshot(Request::get("/threads/nope/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
