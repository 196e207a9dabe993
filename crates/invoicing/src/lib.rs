//! Invoicing domain module.
//!
//! This crate contains the invoice aggregate and the rules every invoice must
//! satisfy before it is written, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod invoice;
pub mod validation;

pub use invoice::{
    BillSundryDraft, BillSundryId, Invoice, InvoiceBillSundry, InvoiceDraft, InvoiceHeader,
    InvoiceId, InvoiceItem, InvoiceItemDraft, InvoiceItemId,
};
pub use validation::{validate_invoice, validate_invoice_item, ValidationError};
