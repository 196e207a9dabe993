use serde::{Deserialize, Serialize};

use invoicer_invoicing::InvoiceDraft;

/// Response envelope shared by every invoice endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            data: None,
        }
    }
}

/// Update body. `id` is optional on `PUT /invoices/:id` and required on `PUT /api/invoice`.
#[derive(Debug, Deserialize)]
pub struct UpdateInvoiceRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub draft: InvoiceDraft,
}

/// `?id=` on the compatibility route.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceIdQuery {
    pub id: Option<String>,
}
