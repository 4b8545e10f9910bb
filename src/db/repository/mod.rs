//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed connection; multi-row writes (subtype
//! inserts) open their own transaction, and the billing layer composes
//! several of these inside one enclosing transaction.

mod appointment;
mod employee;
mod facility;
mod insurance;
mod invoice;
mod patient;

use rust_decimal::Decimal;

use super::DatabaseError;

pub use appointment::*;
pub use employee::*;
pub use facility::*;
pub use insurance::*;
pub use invoice::*;
pub use patient::*;

/// Parse a stored money column (canonical decimal text) back into `Decimal`.
pub(crate) fn parse_money(raw: &str) -> Result<Decimal, DatabaseError> {
    raw.parse::<Decimal>()
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad money value {raw:?}: {e}")))
}
