use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use invoicer_invoicing::{InvoiceDraft, InvoiceId};

use crate::app::dto::{ApiResponse, UpdateInvoiceRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
}

pub async fn list_invoices(Extension(services): Extension<Arc<AppServices>>) -> Response {
    list_response(&services).await
}

pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<InvoiceDraft>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(draft)) => create_response(&services, draft).await,
        Err(rejection) => errors::body_rejection(rejection),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match errors::parse_invoice_id(&id) {
        Ok(id) => get_response(&services, id).await,
        Err(resp) => resp,
    }
}

pub async fn update_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> Response {
    let id = match errors::parse_invoice_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return errors::body_rejection(rejection),
    };

    if let Some(body_id) = body.id.as_deref() {
        match errors::parse_invoice_id(body_id) {
            Ok(body_id) if body_id == id => {}
            Ok(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invoice id in body does not match path",
                );
            }
            Err(resp) => return resp,
        }
    }

    update_response(&services, id, body.draft).await
}

pub async fn delete_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match errors::parse_invoice_id(&id) {
        Ok(id) => delete_response(&services, id).await,
        Err(resp) => resp,
    }
}

// Shared with the compatibility routes.

pub(crate) async fn list_response(services: &AppServices) -> Response {
    match services.list().await {
        Ok(invoices) => Json(ApiResponse::ok("Fetched successfully", invoices)).into_response(),
        Err(e) => errors::gateway_error_to_response(e, "fetch invoices"),
    }
}

pub(crate) async fn get_response(services: &AppServices, id: InvoiceId) -> Response {
    match services.get(id).await {
        Ok(invoice) => Json(ApiResponse::ok("Fetched successfully", invoice)).into_response(),
        Err(e) => errors::gateway_error_to_response(e, "fetch invoice"),
    }
}

pub(crate) async fn create_response(services: &AppServices, draft: InvoiceDraft) -> Response {
    match services.create(draft).await {
        Ok(invoice) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok("Invoice created successfully", invoice)),
        )
            .into_response(),
        Err(e) => errors::gateway_error_to_response(e, "create invoice"),
    }
}

pub(crate) async fn update_response(services: &AppServices, id: InvoiceId, draft: InvoiceDraft) -> Response {
    match services.update(id, draft).await {
        Ok(invoice) => Json(ApiResponse::ok("Invoice updated successfully", invoice)).into_response(),
        Err(e) => errors::gateway_error_to_response(e, "update invoice"),
    }
}

pub(crate) async fn delete_response(services: &AppServices, id: InvoiceId) -> Response {
    match services.delete(id).await {
        Ok(()) => Json(ApiResponse::message(true, "Invoice deleted successfully")).into_response(),
        Err(e) => errors::gateway_error_to_response(e, "delete invoice"),
    }
}
