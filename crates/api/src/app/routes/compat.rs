//! `/api/invoice`: the single-path shape the web client calls.
//!
//! Ids travel in the query string (GET, DELETE) or the body (PUT).

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::Response,
    Json,
};

use invoicer_invoicing::InvoiceDraft;

use crate::app::dto::{InvoiceIdQuery, UpdateInvoiceRequest};
use crate::app::errors;
use crate::app::routes::invoices;
use crate::app::services::AppServices;

/// Without `?id=` this lists every invoice.
pub async fn fetch(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<InvoiceIdQuery>,
) -> Response {
    match query.id.as_deref() {
        None | Some("") => invoices::list_response(&services).await,
        Some(raw) => match errors::parse_invoice_id(raw) {
            Ok(id) => invoices::get_response(&services, id).await,
            Err(resp) => resp,
        },
    }
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<InvoiceDraft>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(draft)) => invoices::create_response(&services, draft).await,
        Err(rejection) => errors::body_rejection(rejection),
    }
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };
    let Some(raw) = body.id.as_deref() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid invoice id");
    };
    match errors::parse_invoice_id(raw) {
        Ok(id) => invoices::update_response(&services, id, body.draft).await,
        Err(resp) => resp,
    }
}

pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<InvoiceIdQuery>,
) -> Response {
    let raw = query.id.unwrap_or_default();
    match errors::parse_invoice_id(&raw) {
        Ok(id) => invoices::delete_response(&services, id).await,
        Err(resp) => resp,
    }
}
