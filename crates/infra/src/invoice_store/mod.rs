//! Invoice persistence boundary.
//!
//! Stores hold already-validated invoices. They never call the validator;
//! that is the gateway's job.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInvoiceStore;
pub use postgres::PostgresInvoiceStore;
pub use r#trait::{InvoiceStore, StoreError};
