use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::DomainError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_stock", message)
        }
        DomainError::StockOverflow { .. } => json_error(StatusCode::CONFLICT, "stock_overflow", message),
        DomainError::InvalidStateTransition(_) => {
            json_error(StatusCode::CONFLICT, "invalid_state_transition", message)
        }
        DomainError::InactiveProduct(_) => json_error(StatusCode::CONFLICT, "inactive_product", message),
        DomainError::ActiveOrderConflict(_) => {
            json_error(StatusCode::CONFLICT, "active_order_conflict", message)
        }
        DomainError::ConcurrencyConflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::Store(_) => {
            tracing::error!(error = %message, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
