use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use super::parse_money;
use crate::db::DatabaseError;
use crate::models::{AppointmentKey, Invoice, InvoiceLineItem};

/// Find the invoice for the (insurer, calendar date) bucket, creating a
/// zero-total one if absent. Returns the invoice id.
///
/// Idempotent: repeated calls for the same bucket return the same id, and the
/// UNIQUE (insurance_id, invoice_date) constraint backstops races. An
/// existing invoice is returned untouched; its total is never reset here.
pub fn find_or_create_invoice(
    conn: &Connection,
    insurance_id: i64,
    invoice_date: NaiveDate,
) -> Result<i64, DatabaseError> {
    let insurer = conn.query_row(
        "SELECT 1 FROM insurance_companies WHERE insurance_id = ?1",
        params![insurance_id],
        |_| Ok(()),
    );
    match insurer {
        Ok(()) => {}
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(DatabaseError::NotFound {
                entity_type: "InsuranceCompany".into(),
                id: insurance_id.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    let existing = conn.query_row(
        "SELECT invoice_id FROM invoices WHERE insurance_id = ?1 AND invoice_date = ?2",
        params![insurance_id, invoice_date],
        |row| row.get::<_, i64>(0),
    );

    match existing {
        Ok(invoice_id) => Ok(invoice_id),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            conn.execute(
                "INSERT INTO invoices (invoice_date, insurance_id, total_cost) VALUES (?1, ?2, '0')",
                params![invoice_date, insurance_id],
            )?;
            let invoice_id = conn.last_insert_rowid();
            tracing::debug!(invoice_id, insurance_id, %invoice_date, "Invoice bucket created");
            Ok(invoice_id)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_invoice(conn: &Connection, invoice_id: i64) -> Result<Option<Invoice>, DatabaseError> {
    let result = conn.query_row(
        "SELECT invoice_id, invoice_date, insurance_id, total_cost
         FROM invoices WHERE invoice_id = ?1",
        params![invoice_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, NaiveDate>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((invoice_id, invoice_date, insurance_id, total_cost)) => Ok(Some(Invoice {
            invoice_id,
            invoice_date,
            insurance_id,
            total_cost: parse_money(&total_cost)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_line_item(conn: &Connection, item: &InvoiceLineItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO invoice_details (invoice_id, cost, patient_id, facility_id, doctor_id, scheduled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            item.invoice_id,
            item.cost.to_string(),
            item.key.patient_id,
            item.key.facility_id,
            item.key.doctor_id,
            item.key.scheduled_at,
        ],
    )?;
    Ok(())
}

pub fn get_line_item(
    conn: &Connection,
    key: &AppointmentKey,
) -> Result<Option<InvoiceLineItem>, DatabaseError> {
    let result = conn.query_row(
        "SELECT invoice_id, cost FROM invoice_details
         WHERE patient_id = ?1 AND facility_id = ?2 AND doctor_id = ?3 AND scheduled_at = ?4",
        params![key.patient_id, key.facility_id, key.doctor_id, key.scheduled_at],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    );

    match result {
        Ok((invoice_id, cost)) => Ok(Some(InvoiceLineItem {
            invoice_id,
            key: key.clone(),
            cost: parse_money(&cost)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Delete the line item at the composite key. Returns rows removed (0 or 1).
pub fn delete_line_item(conn: &Connection, key: &AppointmentKey) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM invoice_details
         WHERE patient_id = ?1 AND facility_id = ?2 AND doctor_id = ?3 AND scheduled_at = ?4",
        params![key.patient_id, key.facility_id, key.doctor_id, key.scheduled_at],
    )?;
    Ok(deleted)
}

/// Set the cost on the line item at the composite key. Returns rows touched.
pub fn update_line_item_cost(
    conn: &Connection,
    key: &AppointmentKey,
    new_cost: Decimal,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE invoice_details SET cost = ?1
         WHERE patient_id = ?2 AND facility_id = ?3 AND doctor_id = ?4 AND scheduled_at = ?5",
        params![
            new_cost.to_string(),
            key.patient_id,
            key.facility_id,
            key.doctor_id,
            key.scheduled_at,
        ],
    )?;
    Ok(updated)
}

pub fn line_items_for_invoice(
    conn: &Connection,
    invoice_id: i64,
) -> Result<Vec<InvoiceLineItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT cost, patient_id, facility_id, doctor_id, scheduled_at
         FROM invoice_details WHERE invoice_id = ?1
         ORDER BY patient_id, facility_id, doctor_id, scheduled_at",
    )?;

    let rows = stmt.query_map(params![invoice_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            AppointmentKey {
                patient_id: row.get(1)?,
                facility_id: row.get(2)?,
                doctor_id: row.get(3)?,
                scheduled_at: row.get(4)?,
            },
        ))
    })?;

    let mut items = Vec::new();
    for row in rows {
        let (cost, key) = row?;
        items.push(InvoiceLineItem {
            invoice_id,
            key,
            cost: parse_money(&cost)?,
        });
    }
    Ok(items)
}

/// Recompute an invoice's total as the exact sum of its current line items.
///
/// Always a full re-aggregation, never an incremental add, so repeated cost
/// edits cannot drift the stored total. An invoice left with no line items
/// re-aggregates to zero.
pub fn recompute_invoice_total(
    conn: &Connection,
    invoice_id: i64,
) -> Result<Decimal, DatabaseError> {
    let mut stmt = conn.prepare("SELECT cost FROM invoice_details WHERE invoice_id = ?1")?;
    let costs = stmt.query_map(params![invoice_id], |row| row.get::<_, String>(0))?;

    let mut total = Decimal::ZERO;
    for cost in costs {
        total += parse_money(&cost?)?;
    }
    drop(stmt);

    let updated = conn.execute(
        "UPDATE invoices SET total_cost = ?1 WHERE invoice_id = ?2",
        params![total.to_string(), invoice_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Invoice".into(),
            id: invoice_id.to_string(),
        });
    }

    Ok(total)
}
