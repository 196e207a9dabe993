//! Pre-write guard for invoices.
//!
//! Both checks are pure and fail fast: the first violated rule is returned and
//! nothing else is inspected. Equality is exact; amounts are base-10 decimals,
//! so `3 x 2.10 == 6.30` holds without any tolerance.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::invoice::{Invoice, InvoiceItem};

/// A violated invoice rule. The display text is what callers show to users.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Quantity, Price, and Amount must be greater than zero.")]
    NonPositiveValues,

    #[error("Amount must be equal to Quantity x Price.")]
    AmountMismatch,

    #[error("TotalAmount must be equal to the sum of InvoiceItems and BillSundries amounts.")]
    TotalMismatch,
}

impl ValidationError {
    /// Stable rule name for structured logs.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::NonPositiveValues => "item_non_positive",
            ValidationError::AmountMismatch => "item_amount_mismatch",
            ValidationError::TotalMismatch => "total_mismatch",
        }
    }
}

/// Check a single line: positive quantity, price and amount, then `amount == quantity x price`.
pub fn validate_invoice_item(item: &InvoiceItem) -> Result<(), ValidationError> {
    if item.quantity <= 0 || item.price <= Decimal::ZERO || item.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveValues);
    }

    match item.expected_amount() {
        Some(expected) if expected == item.amount => Ok(()),
        _ => Err(ValidationError::AmountMismatch),
    }
}

/// Check every item in order, then `totalAmount == items + sundries`.
pub fn validate_invoice(invoice: &Invoice) -> Result<(), ValidationError> {
    for item in invoice.items() {
        validate_invoice_item(item)?;
    }

    match invoice.computed_total() {
        Some(expected) if expected == invoice.total_amount() => Ok(()),
        _ => Err(ValidationError::TotalMismatch),
    }
}
