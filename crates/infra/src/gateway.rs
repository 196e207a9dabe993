//! Invoice write/read orchestration.
//!
//! The gateway is the only path to an `InvoiceStore` from the outside:
//!
//! ```text
//! create: draft -> Invoice (fresh ids) -> validate -> store.insert
//! update: draft + id -> Invoice (fresh child ids) -> validate -> store.replace
//! get / list / delete: straight to the store, no validation
//! ```
//!
//! Validation always runs before the store is touched, so a rejected request
//! writes nothing.

use thiserror::Error;
use tracing::{info, instrument, warn};

use invoicer_core::AggregateRoot;
use invoicer_invoicing::{validate_invoice, Invoice, InvoiceDraft, InvoiceId, ValidationError};

use crate::invoice_store::{InvoiceStore, StoreError};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The invoice broke a validation rule. Display is the user-facing message.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invoice not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Validates invoices before handing them to the store.
#[derive(Debug, Clone)]
pub struct InvoiceGateway<S> {
    store: S,
}

impl<S> InvoiceGateway<S>
where
    S: InvoiceStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a new invoice with a freshly allocated id.
    #[instrument(skip(self, draft), fields(invoice_number = draft.header.invoice_number))]
    pub async fn create(&self, draft: InvoiceDraft) -> Result<Invoice, GatewayError> {
        let invoice = Invoice::from_draft(InvoiceId::generate(), draft);
        check(&invoice)?;

        self.store.insert(&invoice).await?;

        info!(
            invoice_id = %invoice.id_typed(),
            children = invoice.child_count(),
            "invoice created"
        );
        Ok(invoice)
    }

    /// Overwrite an existing invoice.
    ///
    /// Items and bill sundries are replaced wholesale and receive new ids;
    /// ids from the previous version are gone after this returns.
    #[instrument(skip(self, draft), fields(invoice_id = %id))]
    pub async fn update(&self, id: InvoiceId, draft: InvoiceDraft) -> Result<Invoice, GatewayError> {
        let invoice = Invoice::from_draft(id, draft);
        check(&invoice)?;

        if !self.store.replace(&invoice).await? {
            return Err(GatewayError::NotFound);
        }

        info!(children = invoice.child_count(), "invoice updated");
        Ok(invoice)
    }

    pub async fn get(&self, id: InvoiceId) -> Result<Invoice, GatewayError> {
        self.store.get(id).await?.ok_or(GatewayError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<Invoice>, GatewayError> {
        Ok(self.store.list().await?)
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn delete(&self, id: InvoiceId) -> Result<(), GatewayError> {
        if !self.store.delete(id).await? {
            return Err(GatewayError::NotFound);
        }
        info!("invoice deleted");
        Ok(())
    }
}

fn check(invoice: &Invoice) -> Result<(), GatewayError> {
    validate_invoice(invoice).map_err(|e| {
        warn!(rule = e.rule(), invoice_id = %invoice.id_typed(), "invoice rejected: {e}");
        GatewayError::Validation(e)
    })
}
