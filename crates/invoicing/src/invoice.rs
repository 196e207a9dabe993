use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use invoicer_core::{AggregateId, AggregateRoot, DomainError, EntityId, OwnedEntity};

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// Allocate a fresh identifier (UUIDv7).
    pub fn generate() -> Self {
        Self(AggregateId::new())
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for InvoiceId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AggregateId>().map(Self)
    }
}

/// Invoice item identifier. Only meaningful inside the owning invoice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceItemId(pub EntityId);

/// Bill sundry identifier. Only meaningful inside the owning invoice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillSundryId(pub EntityId);

/// Scalar attributes of an invoice (the parent row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub date: NaiveDate,
    /// Human-facing sequential number. Uniqueness is expected but not enforced.
    pub invoice_number: i64,
    pub customer_name: String,
    #[serde(default)]
    pub billing_address: String,
    #[serde(default)]
    pub shipping_address: String,
    /// Tax identifier of the customer.
    #[serde(default)]
    pub gstin: String,
    pub total_amount: Decimal,
}

/// A purchased line: `quantity` units at `price` each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub item_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub amount: Decimal,
}

impl InvoiceItem {
    /// `quantity * price`, or `None` when the product leaves the decimal range.
    pub fn expected_amount(&self) -> Option<Decimal> {
        line_amount(self.quantity, self.price)
    }
}

impl OwnedEntity for InvoiceItem {
    type Id = InvoiceItemId;

    fn id(&self) -> InvoiceItemId {
        self.id
    }
}

/// A flat charge or adjustment (freight, rounding, discount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBillSundry {
    pub id: BillSundryId,
    pub bill_sundry_name: String,
    pub amount: Decimal,
}

impl OwnedEntity for InvoiceBillSundry {
    type Id = BillSundryId;

    fn id(&self) -> BillSundryId {
        self.id
    }
}

/// Client-submitted line item. Any `id` sent by the client is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemDraft {
    #[serde(default)]
    pub item_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub amount: Decimal,
}

/// Client-submitted bill sundry. Any `id` sent by the client is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSundryDraft {
    #[serde(default)]
    pub bill_sundry_name: String,
    pub amount: Decimal,
}

/// Decoded request payload: everything needed to build an [`Invoice`] except identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    #[serde(flatten)]
    pub header: InvoiceHeader,
    #[serde(default)]
    pub invoice_items: Vec<InvoiceItemDraft>,
    #[serde(default)]
    pub bill_sundries: Vec<BillSundryDraft>,
}

/// Aggregate root: Invoice.
///
/// Items and bill sundries are owned by composition. They are never patched
/// individually: every write replaces the whole set, and every build from a
/// draft allocates fresh child identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    #[serde(flatten)]
    header: InvoiceHeader,
    invoice_items: Vec<InvoiceItem>,
    bill_sundries: Vec<InvoiceBillSundry>,
}

impl Invoice {
    /// Build an invoice from a client draft, assigning new identifiers to every child.
    pub fn from_draft(id: InvoiceId, draft: InvoiceDraft) -> Self {
        let invoice_items = draft
            .invoice_items
            .into_iter()
            .map(|d| InvoiceItem {
                id: InvoiceItemId(EntityId::new()),
                item_name: d.item_name,
                quantity: d.quantity,
                price: d.price,
                amount: d.amount,
            })
            .collect();

        let bill_sundries = draft
            .bill_sundries
            .into_iter()
            .map(|d| InvoiceBillSundry {
                id: BillSundryId(EntityId::new()),
                bill_sundry_name: d.bill_sundry_name,
                amount: d.amount,
            })
            .collect();

        Self {
            id,
            header: draft.header,
            invoice_items,
            bill_sundries,
        }
    }

    /// Reassemble an already-persisted invoice (storage adapters only).
    pub fn restore(
        id: InvoiceId,
        header: InvoiceHeader,
        invoice_items: Vec<InvoiceItem>,
        bill_sundries: Vec<InvoiceBillSundry>,
    ) -> Self {
        Self {
            id,
            header,
            invoice_items,
            bill_sundries,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn header(&self) -> &InvoiceHeader {
        &self.header
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.invoice_items
    }

    pub fn bill_sundries(&self) -> &[InvoiceBillSundry] {
        &self.bill_sundries
    }

    pub fn total_amount(&self) -> Decimal {
        self.header.total_amount
    }

    /// Sum of all item amounts (as stated, not recomputed).
    pub fn items_total(&self) -> Option<Decimal> {
        checked_sum(self.invoice_items.iter().map(|i| i.amount))
    }

    /// Sum of all bill sundry amounts.
    pub fn sundries_total(&self) -> Option<Decimal> {
        checked_sum(self.bill_sundries.iter().map(|s| s.amount))
    }

    /// The total the invoice must carry: items plus sundries.
    pub fn computed_total(&self) -> Option<Decimal> {
        self.items_total()?.checked_add(self.sundries_total()?)
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn child_count(&self) -> usize {
        self.invoice_items.len() + self.bill_sundries.len()
    }
}

fn line_amount(quantity: i64, price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(price)
}

fn checked_sum(amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.fold(Some(Decimal::ZERO), |acc, a| acc?.checked_add(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft_json() -> serde_json::Value {
        json!({
            "id": "ignored-on-create",
            "date": "2024-07-01",
            "invoiceNumber": 1001,
            "customerName": "John Doe",
            "billingAddress": "1 Main St",
            "shippingAddress": "2 Side St",
            "gstin": "22AAAAA0000A1Z5",
            "invoiceItems": [
                { "id": "1720000000000", "itemName": "Widget", "quantity": 2, "price": 50, "amount": 100 }
            ],
            "billSundries": [
                { "billSundryName": "Freight", "amount": "10.50" }
            ],
            "totalAmount": 110.5
        })
    }

    #[test]
    fn draft_decodes_from_client_payload() {
        let draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        assert_eq!(draft.header.invoice_number, 1001);
        assert_eq!(draft.header.date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(draft.invoice_items.len(), 1);
        assert_eq!(draft.invoice_items[0].amount, Decimal::from(100));
        assert_eq!(draft.bill_sundries[0].amount, Decimal::new(1050, 2));
        assert_eq!(draft.header.total_amount, Decimal::new(1105, 1));
    }

    #[test]
    fn from_draft_assigns_fresh_child_ids() {
        let draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        let id = InvoiceId::generate();

        let first = Invoice::from_draft(id, draft.clone());
        let second = Invoice::from_draft(id, draft);

        assert_eq!(first.id_typed(), id);
        assert_eq!(first.header(), second.header());
        assert_ne!(first.items()[0].id, second.items()[0].id);
        assert_ne!(first.bill_sundries()[0].id, second.bill_sundries()[0].id);
    }

    #[test]
    fn children_get_distinct_ids() {
        let mut draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        draft.invoice_items.extend(draft.invoice_items.clone());
        draft.invoice_items.extend(draft.invoice_items.clone());

        let invoice = Invoice::from_draft(InvoiceId::generate(), draft);
        assert_eq!(invoice.child_count(), 5);
        assert!(invoicer_core::has_distinct_ids(invoice.items()));
        assert!(invoicer_core::has_distinct_ids(invoice.bill_sundries()));
        assert_eq!(AggregateRoot::id(&invoice), invoice.id_typed());
    }

    #[test]
    fn computed_total_sums_items_and_sundries() {
        let draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        let invoice = Invoice::from_draft(InvoiceId::generate(), draft);

        assert_eq!(invoice.items_total(), Some(Decimal::from(100)));
        assert_eq!(invoice.sundries_total(), Some(Decimal::new(1050, 2)));
        assert_eq!(invoice.computed_total(), Some(Decimal::new(11050, 2)));
    }

    fn single_line(quantity: i64, price: Decimal, amount: Decimal) -> InvoiceItem {
        let mut draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        draft.invoice_items = vec![InvoiceItemDraft {
            item_name: "Bolt".to_string(),
            quantity,
            price,
            amount,
        }];
        Invoice::from_draft(InvoiceId::generate(), draft).items()[0].clone()
    }

    #[test]
    fn expected_amount_is_exact_for_decimal_prices() {
        let item = single_line(3, Decimal::new(210, 2), Decimal::new(630, 2));
        assert_eq!(item.expected_amount(), Some(item.amount));
    }

    #[test]
    fn expected_amount_overflow_is_none() {
        let item = single_line(i64::MAX, Decimal::MAX, Decimal::MAX);
        assert_eq!(item.expected_amount(), None);
    }

    #[test]
    fn invoice_serializes_with_camel_case_flattened_header() {
        let draft: InvoiceDraft = serde_json::from_value(draft_json()).unwrap();
        let invoice = Invoice::from_draft(InvoiceId::generate(), draft);
        let v = serde_json::to_value(&invoice).unwrap();

        assert_eq!(v["id"], invoice.id_typed().to_string());
        assert_eq!(v["invoiceNumber"], 1001);
        assert_eq!(v["customerName"], "John Doe");
        assert_eq!(v["date"], "2024-07-01");
        assert_eq!(v["invoiceItems"][0]["itemName"], "Widget");
        assert_eq!(v["billSundries"][0]["billSundryName"], "Freight");
        assert!(v.get("header").is_none());
    }
}
