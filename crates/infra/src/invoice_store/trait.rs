use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use invoicer_invoicing::{Invoice, InvoiceId};

/// Invoice store operation error.
///
/// These are **infrastructure errors** as opposed to domain errors
/// (validation, not-found decisions).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached (pool closed, timeout, IO).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into an invoice.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for invoice aggregates.
///
/// ## Write semantics
///
/// - `insert` writes the parent and every child in one atomic unit.
/// - `replace` overwrites the parent's scalar fields and **replaces** both
///   child sets (delete all, then insert all) in one atomic unit. Child
///   identifiers therefore do not survive an update.
/// - `delete` removes the parent and cascades to its children.
///
/// A failed write must leave previously stored data untouched.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError>;

    /// Returns `false` when no invoice with that id exists (nothing written).
    async fn replace(&self, invoice: &Invoice) -> Result<bool, StoreError>;

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// All invoices, oldest first.
    async fn list(&self) -> Result<Vec<Invoice>, StoreError>;

    /// Returns `false` when no invoice with that id exists.
    async fn delete(&self, id: InvoiceId) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S> InvoiceStore for Arc<S>
where
    S: InvoiceStore + ?Sized,
{
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError> {
        (**self).insert(invoice).await
    }

    async fn replace(&self, invoice: &Invoice) -> Result<bool, StoreError> {
        (**self).replace(invoice).await
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<Invoice>, StoreError> {
        (**self).list().await
    }

    async fn delete(&self, id: InvoiceId) -> Result<bool, StoreError> {
        (**self).delete(id).await
    }
}
