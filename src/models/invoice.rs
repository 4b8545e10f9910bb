use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::appointment::AppointmentKey;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: i64,
    pub invoice_date: NaiveDate,
    pub insurance_id: i64,
    /// Derived aggregate: sum of the attached line items' costs.
    pub total_cost: Decimal,
}

/// Per-visit charge, owned by exactly one invoice and 1:1 with its
/// appointment through the shared composite key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub invoice_id: i64,
    pub key: AppointmentKey,
    pub cost: Decimal,
}
