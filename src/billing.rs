//! Appointment booking and invoice reconciliation.
//!
//! Every write here keeps the pairing invariant: each appointment has exactly
//! one visit charge, filed on its insurer's invoice for the visit's calendar
//! date. Multi-step writes run inside a single transaction so a failure at
//! any step leaves no partial state.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::repository::{
    delete_line_item, ensure_treats, find_or_create_invoice, get_line_item, insert_appointment,
    insert_line_item, patient_insurance_id, recompute_invoice_total, update_appointment,
    update_line_item_cost,
};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentKey, InvoiceLineItem};

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The request is well-formed but cannot be billed, e.g. an uninsured
    /// patient.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type BillingResult<T> = Result<T, BillingError>;

fn insurer_for_patient(conn: &Connection, patient_id: i64) -> BillingResult<i64> {
    patient_insurance_id(conn, patient_id)?.ok_or_else(|| {
        BillingError::Validation(format!("no insurance found for patient {patient_id}"))
    })
}

/// Book an appointment.
///
/// Resolves the patient's insurer, files the invoice bucket for the visit
/// date, writes the appointment, records the treatment link, and opens the
/// visit charge at zero cost. One transaction covers all of it.
pub fn create_appointment(conn: &Connection, appointment: &Appointment) -> BillingResult<()> {
    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;

    let insurance_id = insurer_for_patient(&tx, appointment.key.patient_id)?;
    let invoice_id = find_or_create_invoice(&tx, insurance_id, appointment.key.billing_date())?;

    insert_appointment(&tx, appointment)?;
    ensure_treats(&tx, appointment.key.patient_id, appointment.key.doctor_id)?;
    insert_line_item(
        &tx,
        &InvoiceLineItem {
            invoice_id,
            key: appointment.key.clone(),
            cost: Decimal::ZERO,
        },
    )?;

    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(
        appointment = %appointment.key,
        invoice_id,
        "Appointment booked"
    );
    Ok(())
}

/// Set the cost of a visit and bring its invoice total back in line.
///
/// The total is re-aggregated from all line items, so setting the same cost
/// twice is a no-op on the stored total.
pub fn update_appointment_cost(
    conn: &Connection,
    key: &AppointmentKey,
    new_cost: Decimal,
) -> BillingResult<()> {
    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;

    let item = get_line_item(&tx, key)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "InvoiceLineItem".into(),
        id: key.to_string(),
    })?;

    update_line_item_cost(&tx, key, new_cost)?;
    let total = recompute_invoice_total(&tx, item.invoice_id)?;

    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(
        appointment = %key,
        invoice_id = item.invoice_id,
        %new_cost,
        %total,
        "Visit cost updated"
    );
    Ok(())
}

/// Reschedule or otherwise rekey an appointment, keeping its charge filed on
/// the right invoice.
///
/// If the calendar date is unchanged the appointment row is rewritten in
/// place and the charge follows the key. If the date moves, the charge is
/// lifted off the old invoice, the bucket for the new date is found or
/// created, and the charge is refiled there at its existing cost. Both
/// affected invoice totals are re-aggregated.
pub fn reschedule_appointment(
    conn: &Connection,
    original: &AppointmentKey,
    updated: &Appointment,
) -> BillingResult<()> {
    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;

    if original.billing_date() == updated.key.billing_date() {
        let changed = update_appointment(&tx, original, updated)?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity_type: "Appointment".into(),
                id: original.to_string(),
            }
            .into());
        }
        // The composite FK cascades the key change onto the line item, and
        // the invoice bucket is unchanged, so the total stands.
        tx.commit().map_err(DatabaseError::from)?;
        tracing::info!(appointment = %updated.key, "Appointment updated in place");
        return Ok(());
    }

    let item = get_line_item(&tx, original)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "InvoiceLineItem".into(),
        id: original.to_string(),
    })?;
    let old_invoice_id = item.invoice_id;

    delete_line_item(&tx, original)?;

    let insurance_id = insurer_for_patient(&tx, updated.key.patient_id)?;
    let new_invoice_id = find_or_create_invoice(&tx, insurance_id, updated.key.billing_date())?;

    let changed = update_appointment(&tx, original, updated)?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: original.to_string(),
        }
        .into());
    }

    insert_line_item(
        &tx,
        &InvoiceLineItem {
            invoice_id: new_invoice_id,
            key: updated.key.clone(),
            cost: item.cost,
        },
    )?;

    recompute_invoice_total(&tx, old_invoice_id)?;
    recompute_invoice_total(&tx, new_invoice_id)?;

    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!(
        from = %original,
        to = %updated.key,
        old_invoice_id,
        new_invoice_id,
        "Appointment rescheduled across invoices"
    );
    Ok(())
}
