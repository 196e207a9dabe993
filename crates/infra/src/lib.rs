//! Infrastructure layer: invoice storage, the validating gateway in front of
//! it, and configuration.

pub mod config;
pub mod gateway;
pub mod invoice_store;

pub use config::{AppConfig, ConfigError, StorageConfig};
pub use gateway::{GatewayError, InvoiceGateway};
pub use invoice_store::{InMemoryInvoiceStore, InvoiceStore, PostgresInvoiceStore, StoreError};
