//! Inbound upstream events.
//!
//! POST /api/events/exceptions      exception reported by an interface service
//! POST /api/events/retry-outcomes  result of a retry executed elsewhere
//!
//! Callers are service accounts: a bearer token carrying the ADMIN role.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::common::Role;
use crate::domains::exceptions::actions::{self, IngestEvent, RetryOutcome};
use crate::domains::exceptions::errors::{ErrorCategory, ErrorCode, MutationError};
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub async fn ingest_handler(
    Extension(state): Extension<AxumAppState>,
    auth_user: Option<Extension<AuthUser>>,
    Json(event): Json<IngestEvent>,
) -> Response {
    if let Err(rejection) = require_service(auth_user.as_ref().map(|e| &e.0)) {
        return rejection;
    }

    match actions::ingest_exception(event, &state.deps).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(outcome)).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub async fn retry_outcome_handler(
    Extension(state): Extension<AxumAppState>,
    auth_user: Option<Extension<AuthUser>>,
    Json(outcome): Json<RetryOutcome>,
) -> Response {
    if let Err(rejection) = require_service(auth_user.as_ref().map(|e| &e.0)) {
        return rejection;
    }

    match actions::complete_retry(outcome, &state.deps).await {
        Ok(exception) => (StatusCode::OK, Json(exception)).into_response(),
        Err(e) => error_response(e),
    }
}

fn require_service(user: Option<&AuthUser>) -> Result<(), Response> {
    match user {
        None => Err((StatusCode::UNAUTHORIZED, "Authentication required").into_response()),
        Some(user) if user.highest_role() == Some(Role::Admin) => Ok(()),
        Some(user) => {
            warn!(user = %user.user_id, "Inbound event rejected: ADMIN role required");
            Err((StatusCode::FORBIDDEN, "Admin access required").into_response())
        }
    }
}

fn error_response(error: MutationError) -> Response {
    let status = match (error.code, error.category) {
        (ErrorCode::ExceptionNotFound, _) => StatusCode::NOT_FOUND,
        (ErrorCode::OperationTimeout, _) => StatusCode::GATEWAY_TIMEOUT,
        (_, ErrorCategory::Validation) => StatusCode::BAD_REQUEST,
        (_, ErrorCategory::BusinessRule) => StatusCode::CONFLICT,
        (_, ErrorCategory::Authorization) => StatusCode::FORBIDDEN,
        (_, ErrorCategory::System) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(error)).into_response()
}
