//! HTTP surface of the itinerary flow

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    CompassError, VERSION,
    client::Plugin,
    flow::ItineraryFlow,
    models::{ItineraryFlowInput, ItineraryFlowOutput},
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub flow: Arc<ItineraryFlow>,
    pub project_id: String,
    pub plugins: Vec<Plugin>,
}

/// Flow invocation body: `{"data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct FlowRequest<T> {
    pub data: T,
}

/// Flow result body: `{"result": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct FlowResponse<T> {
    pub result: T,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub project_id: String,
    pub plugins: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/itineraryFlow", post(itinerary_flow))
        .route("/health", get(health))
        .with_state(state)
}

async fn itinerary_flow(
    State(state): State<AppState>,
    payload: Result<Json<FlowRequest<ItineraryFlowInput>>, JsonRejection>,
) -> Result<Json<FlowResponse<ItineraryFlowOutput>>, ApiError> {
    let Json(FlowRequest { data }) =
        payload.map_err(|rejection| CompassError::validation(rejection.body_text()))?;

    let result = state.flow.run(&data).await?;
    Ok(Json(FlowResponse { result }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        project_id: state.project_id,
        plugins: state.plugins.iter().map(|p| p.name().to_string()).collect(),
    })
}

/// Flow failure rendered as `{"error": {"status", "message"}}`
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self.0.downcast_ref::<CompassError>() {
            Some(CompassError::Validation { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT")
            }
            Some(CompassError::RateLimit { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RESOURCE_EXHAUSTED")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }

    fn message(&self) -> String {
        self.0
            .downcast_ref::<CompassError>()
            .map_or_else(|| "Internal error".to_string(), CompassError::user_message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            error!("Itinerary flow failed: {:#}", self.0);
        } else {
            warn!("Itinerary flow rejected: {:#}", self.0);
        }

        let body = json!({ "error": { "status": code, "message": self.message() } });
        (status, Json(body)).into_response()
    }
}
