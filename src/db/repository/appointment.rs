use rusqlite::{params, Connection, ToSql};

use super::parse_money;
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentCharge, AppointmentFilter, AppointmentKey};

/// Insert an appointment row. The paired line item is written by the billing
/// layer inside the same transaction.
pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (patient_id, facility_id, doctor_id, scheduled_at, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            appointment.key.patient_id,
            appointment.key.facility_id,
            appointment.key.doctor_id,
            appointment.key.scheduled_at,
            appointment.description,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(
    conn: &Connection,
    key: &AppointmentKey,
) -> Result<Option<Appointment>, DatabaseError> {
    let result = conn.query_row(
        "SELECT description FROM appointments
         WHERE patient_id = ?1 AND facility_id = ?2 AND doctor_id = ?3 AND scheduled_at = ?4",
        params![key.patient_id, key.facility_id, key.doctor_id, key.scheduled_at],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(description) => Ok(Some(Appointment {
            key: key.clone(),
            description,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Rewrite an appointment row under a new composite key and description,
/// matched by the original key. Returns the number of rows touched.
pub fn update_appointment(
    conn: &Connection,
    original: &AppointmentKey,
    updated: &Appointment,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET patient_id = ?1, facility_id = ?2, doctor_id = ?3, scheduled_at = ?4, description = ?5
         WHERE patient_id = ?6 AND facility_id = ?7 AND doctor_id = ?8 AND scheduled_at = ?9",
        params![
            updated.key.patient_id,
            updated.key.facility_id,
            updated.key.doctor_id,
            updated.key.scheduled_at,
            updated.description,
            original.patient_id,
            original.facility_id,
            original.doctor_id,
            original.scheduled_at,
        ],
    )?;
    Ok(changed)
}

/// Search appointments joined to their visit charges.
///
/// Filters are conjunctive; an empty filter returns everything, ordered by
/// the composite key for deterministic output.
pub fn search_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentCharge>, DatabaseError> {
    let mut sql = String::from(
        "SELECT a.patient_id, a.facility_id, a.doctor_id, a.scheduled_at, a.description, d.cost
         FROM appointments a
         JOIN invoice_details d
           ON a.patient_id = d.patient_id
          AND a.facility_id = d.facility_id
          AND a.doctor_id = d.doctor_id
          AND a.scheduled_at = d.scheduled_at
         WHERE 1=1",
    );
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(patient_id) = filter.patient_id {
        sql.push_str(&format!(" AND a.patient_id = ?{}", args.len() + 1));
        args.push(Box::new(patient_id));
    }
    if let Some(doctor_id) = filter.doctor_id {
        sql.push_str(&format!(" AND a.doctor_id = ?{}", args.len() + 1));
        args.push(Box::new(doctor_id));
    }
    if let Some(facility_id) = filter.facility_id {
        sql.push_str(&format!(" AND a.facility_id = ?{}", args.len() + 1));
        args.push(Box::new(facility_id));
    }
    if let Some(date_from) = filter.date_from {
        sql.push_str(&format!(" AND date(a.scheduled_at) >= ?{}", args.len() + 1));
        args.push(Box::new(date_from));
    }
    if let Some(date_to) = filter.date_to {
        sql.push_str(&format!(" AND date(a.scheduled_at) <= ?{}", args.len() + 1));
        args.push(Box::new(date_to));
    }
    sql.push_str(" ORDER BY a.patient_id, a.facility_id, a.doctor_id, a.scheduled_at");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();

    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((
            AppointmentKey {
                patient_id: row.get(0)?,
                facility_id: row.get(1)?,
                doctor_id: row.get(2)?,
                scheduled_at: row.get(3)?,
            },
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut charges = Vec::new();
    for row in rows {
        let (key, description, cost) = row?;
        charges.push(AppointmentCharge {
            key,
            description,
            cost: parse_money(&cost)?,
        });
    }
    Ok(charges)
}
