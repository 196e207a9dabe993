use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use invoicer_infra::GatewayError;
use invoicer_invoicing::InvoiceId;

use crate::app::dto::ApiResponse;

/// Map a gateway failure to status + envelope. `action` completes "failed to …" for store errors.
pub fn gateway_error_to_response(err: GatewayError, action: &str) -> Response {
    match err {
        GatewayError::Validation(e) => json_error(StatusCode::BAD_REQUEST, e.to_string()),
        GatewayError::NotFound => json_error(StatusCode::NOT_FOUND, "Invoice not found"),
        GatewayError::Store(e) => {
            tracing::error!(error = %e, "failed to {action}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("failed to {action}"))
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::message(false, message))).into_response()
}

pub fn body_rejection(rejection: JsonRejection) -> Response {
    json_error(
        StatusCode::BAD_REQUEST,
        format!("invalid request body: {}", rejection.body_text()),
    )
}

pub fn parse_invoice_id(raw: &str) -> Result<InvoiceId, Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid invoice id"))
}
