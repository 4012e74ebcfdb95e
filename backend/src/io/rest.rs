//! # REST API
//!
//! Two endpoints carry every operation: `POST /api/query` and
//! `POST /api/mutation`. Failures come back as a non-2xx status with a
//! [`shared::RemoteFailure`] body.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info, warn};

use shared::{FailureCode, MutationRequest, QueryRequest};

use crate::domain::DomainError;
use crate::io::OperationDispatcher;

pub async fn run_query(
    State(dispatcher): State<OperationDispatcher>,
    Json(request): Json<QueryRequest>,
) -> Response {
    info!("POST /api/query - {} as {}", request.operation, request.session.role);

    match dispatcher.run_query(&request.session, request.operation, request.variables) {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => failure_response(e),
    }
}

pub async fn run_mutation(
    State(dispatcher): State<OperationDispatcher>,
    Json(request): Json<MutationRequest>,
) -> Response {
    info!("POST /api/mutation - {} as {}", request.mutation, request.session.role);

    match dispatcher.run_mutation(&request.session, request.mutation, request.input) {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => failure_response(e),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn failure_response(err: DomainError) -> Response {
    let failure = err.to_failure();
    let status = match failure.code {
        FailureCode::ValidationFailed => StatusCode::BAD_REQUEST,
        FailureCode::NotFound => StatusCode::NOT_FOUND,
        FailureCode::AbsenceNotPending | FailureCode::InvalidStatusTransition => StatusCode::CONFLICT,
        FailureCode::Unauthorized => StatusCode::FORBIDDEN,
        FailureCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", failure);
    } else {
        warn!("Request rejected: {}", failure);
    }
    (status, Json(failure)).into_response()
}
