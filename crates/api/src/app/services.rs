use std::sync::Arc;

use invoicer_infra::{
    AppConfig, GatewayError, InMemoryInvoiceStore, InvoiceGateway, PostgresInvoiceStore,
    StorageConfig, StoreError,
};
use invoicer_invoicing::{Invoice, InvoiceDraft, InvoiceId};

/// The gateway the handlers talk to, backed by whichever store was configured.
#[derive(Clone)]
pub enum AppServices {
    InMemory {
        gateway: InvoiceGateway<Arc<InMemoryInvoiceStore>>,
    },
    Persistent {
        gateway: InvoiceGateway<Arc<PostgresInvoiceStore>>,
    },
}

macro_rules! with_gateway {
    ($services:expr, |$gw:ident| $body:expr) => {
        match $services {
            AppServices::InMemory { gateway: $gw } => $body,
            AppServices::Persistent { gateway: $gw } => $body,
        }
    };
}

impl AppServices {
    /// In-memory wiring (dev/test).
    pub fn in_memory() -> Self {
        AppServices::InMemory {
            gateway: InvoiceGateway::new(Arc::new(InMemoryInvoiceStore::new())),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            AppServices::InMemory { .. } => "in_memory",
            AppServices::Persistent { .. } => "postgres",
        }
    }

    pub async fn create(&self, draft: InvoiceDraft) -> Result<Invoice, GatewayError> {
        with_gateway!(self, |gw| gw.create(draft).await)
    }

    pub async fn update(&self, id: InvoiceId, draft: InvoiceDraft) -> Result<Invoice, GatewayError> {
        with_gateway!(self, |gw| gw.update(id, draft).await)
    }

    pub async fn get(&self, id: InvoiceId) -> Result<Invoice, GatewayError> {
        with_gateway!(self, |gw| gw.get(id).await)
    }

    pub async fn list(&self) -> Result<Vec<Invoice>, GatewayError> {
        with_gateway!(self, |gw| gw.list().await)
    }

    pub async fn delete(&self, id: InvoiceId) -> Result<(), GatewayError> {
        with_gateway!(self, |gw| gw.delete(id).await)
    }
}

/// Build services from configuration, connecting (and migrating) Postgres when selected.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    match &config.storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory invoice store");
            Ok(AppServices::in_memory())
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
            run_migrations,
        } => {
            let store = PostgresInvoiceStore::connect(database_url, *max_connections).await?;
            if *run_migrations {
                store.run_migrations().await?;
                tracing::info!("database migrations applied");
            }
            tracing::info!(max_connections = *max_connections, "using postgres invoice store");
            Ok(AppServices::Persistent {
                gateway: InvoiceGateway::new(Arc::new(store)),
            })
        }
    }
}
