//! Inbound control surface
//!
//! HTTP endpoints the scheduling center drives: `/run` starts a job,
//! `/kill` cancels one, `/log` pages execution logs. Every endpoint
//! decodes a JSON request and answers with an [`ApiResponse`]; a payload
//! that fails to decode gets an explicit failure response rather than
//! being treated as a zero-valued request.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::warn;

use crate::error::Error;
use crate::executor::Executor;
use crate::protocol::{ApiResponse, KillRequest, LogRequest, LogResponse, RunRequest};

/// Build the control-surface router
pub fn router(executor: Arc<Executor>) -> Router {
    Router::new()
        .route("/run", post(run_job))
        .route("/kill", post(kill_job))
        .route("/log", post(job_log))
        .with_state(executor)
}

async fn run_job(
    State(executor): State<Arc<Executor>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    match payload {
        Ok(Json(request)) => Json(executor.start_job(request)),
        Err(rejection) => Json(decode_failure("/run", rejection)),
    }
}

async fn kill_job(
    State(executor): State<Arc<Executor>>,
    payload: Result<Json<KillRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    match payload {
        Ok(Json(request)) => Json(executor.kill_job(request)),
        Err(rejection) => Json(decode_failure("/kill", rejection)),
    }
}

async fn job_log(
    State(executor): State<Arc<Executor>>,
    payload: Result<Json<LogRequest>, JsonRejection>,
) -> Json<ApiResponse<LogResponse>> {
    match payload {
        Ok(Json(request)) => Json(executor.read_log(request)),
        Err(rejection) => Json(decode_failure("/log", rejection)),
    }
}

fn decode_failure<T>(endpoint: &str, rejection: JsonRejection) -> ApiResponse<T> {
    let err = Error::Decode(rejection.body_text());
    warn!(endpoint, error = %err, "Rejected undecodable request");
    ApiResponse::failure(err.to_string())
}
