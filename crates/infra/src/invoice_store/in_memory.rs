use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use invoicer_core::has_distinct_ids;
use invoicer_invoicing::{Invoice, InvoiceId};

use super::r#trait::{InvoiceStore, StoreError};

/// In-memory invoice store.
///
/// Intended for tests/dev. Each write happens under a single write-lock
/// acquisition, so readers never observe a parent without its children.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("invoice map lock poisoned".to_string())
}

// Child ids are primary keys in the relational schema; hold the same line here.
fn check_child_ids(invoice: &Invoice) -> Result<(), StoreError> {
    if has_distinct_ids(invoice.items()) && has_distinct_ids(invoice.bill_sundries()) {
        Ok(())
    } else {
        Err(StoreError::Backend(format!(
            "invoice {} has duplicate child ids",
            invoice.id_typed()
        )))
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError> {
        check_child_ids(invoice)?;
        let mut map = self.invoices.write().map_err(|_| poisoned())?;
        let id = invoice.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::Backend(format!("invoice {id} already exists")));
        }
        map.insert(id, invoice.clone());
        Ok(())
    }

    async fn replace(&self, invoice: &Invoice) -> Result<bool, StoreError> {
        check_child_ids(invoice)?;
        let mut map = self.invoices.write().map_err(|_| poisoned())?;
        match map.get_mut(&invoice.id_typed()) {
            Some(existing) => {
                *existing = invoice.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let map = self.invoices.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Invoice>, StoreError> {
        let map = self.invoices.read().map_err(|_| poisoned())?;
        let mut all: Vec<Invoice> = map.values().cloned().collect();
        // UUIDv7 ids sort by creation time.
        all.sort_by_key(|inv| *inv.id_typed().0.as_uuid());
        Ok(all)
    }

    async fn delete(&self, id: InvoiceId) -> Result<bool, StoreError> {
        let mut map = self.invoices.write().map_err(|_| poisoned())?;
        Ok(map.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use invoicer_invoicing::{InvoiceDraft, InvoiceHeader, InvoiceItemDraft};

    fn sample(number: i64) -> Invoice {
        Invoice::from_draft(
            InvoiceId::generate(),
            InvoiceDraft {
                header: InvoiceHeader {
                    date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                    invoice_number: number,
                    customer_name: "Jane Smith".to_string(),
                    billing_address: String::new(),
                    shipping_address: String::new(),
                    gstin: String::new(),
                    total_amount: Decimal::from(100),
                },
                invoice_items: vec![InvoiceItemDraft {
                    item_name: "Widget".to_string(),
                    quantity: 2,
                    price: Decimal::from(50),
                    amount: Decimal::from(100),
                }],
                bill_sundries: vec![],
            },
        )
    }

    #[tokio::test]
    async fn insert_get_list_delete() {
        let store = InMemoryInvoiceStore::new();
        let a = sample(1);
        let b = sample(2);

        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        assert_eq!(store.get(a.id_typed()).await.unwrap(), Some(a.clone()));
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&a) && listed.contains(&b));

        assert!(store.delete(a.id_typed()).await.unwrap());
        assert!(!store.delete(a.id_typed()).await.unwrap());
        assert_eq!(store.get(a.id_typed()).await.unwrap(), None);
        assert_eq!(store.list().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_and_keeps_original() {
        let store = InMemoryInvoiceStore::new();
        let a = sample(1);
        store.insert(&a).await.unwrap();

        let err = store.insert(&a).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_missing_invoice_writes_nothing() {
        let store = InMemoryInvoiceStore::new();
        assert!(!store.replace(&sample(1)).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_child_ids_are_rejected() {
        let store = InMemoryInvoiceStore::new();
        let a = sample(1);
        let item = a.items()[0].clone();
        let twice = Invoice::restore(
            a.id_typed(),
            a.header().clone(),
            vec![item.clone(), item],
            vec![],
        );

        assert!(matches!(store.insert(&twice).await, Err(StoreError::Backend(_))));
        assert!(store.list().await.unwrap().is_empty());

        store.insert(&a).await.unwrap();
        assert!(matches!(store.replace(&twice).await, Err(StoreError::Backend(_))));
        assert_eq!(store.get(a.id_typed()).await.unwrap(), Some(a));
    }
}
