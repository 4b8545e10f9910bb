use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Composite natural key shared by an appointment and its invoice line item.
///
/// Used as a value type everywhere the two tables are joined, never as a
/// positional tuple or concatenated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentKey {
    pub patient_id: i64,
    pub facility_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: NaiveDateTime,
}

impl AppointmentKey {
    /// Calendar date the visit bills under.
    pub fn billing_date(&self) -> NaiveDate {
        self.scheduled_at.date()
    }
}

impl std::fmt::Display for AppointmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "patient={} facility={} doctor={} at={}",
            self.patient_id, self.facility_id, self.doctor_id, self.scheduled_at
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub key: AppointmentKey,
    pub description: String,
}

/// An appointment joined to its visit charge, as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentCharge {
    pub key: AppointmentKey,
    pub description: String,
    pub cost: rust_decimal::Decimal,
}
