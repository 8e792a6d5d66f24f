//! Invocation endpoint
//!
//! POST /invoke - Run the pipeline for one `{s3_uri, s3_bucket_name}` event

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::AppState;
use crate::error::PipelineError;
use crate::pipeline::{InvocationRequest, InvocationResponse};

/// Build the invoke router
pub fn router() -> Router<AppState> {
    Router::new().route("/invoke", post(invoke))
}

/// Error body returned when an invocation fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultResponse {
    #[serde(rename = "errorType")]
    pub error_type: String,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

impl From<&PipelineError> for FaultResponse {
    fn from(e: &PipelineError) -> Self {
        Self {
            error_type: e.kind().to_string(),
            error_message: e.to_string(),
        }
    }
}

fn fault(e: PipelineError) -> Response {
    let status = if matches!(e, PipelineError::InvalidRequest(_)) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(FaultResponse::from(&e))).into_response()
}

async fn invoke(
    State(state): State<AppState>,
    body: Result<Json<InvocationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return fault(PipelineError::InvalidRequest(rejection.body_text()));
        }
    };

    match state.pipeline.invoke(&request).await {
        Ok(_) => Json(InvocationResponse::ok()).into_response(),
        Err(e) => {
            error!(kind = e.kind(), "Invocation failed: {}", e);
            fault(e)
        }
    }
}
