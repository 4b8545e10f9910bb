use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{NewPatient, Patient};

/// Insert a patient and return the assigned id.
pub fn insert_patient(conn: &Connection, patient: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (first_name, last_name, primary_doctor_id, insurance_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            patient.first_name,
            patient.last_name,
            patient.primary_doctor_id,
            patient.insurance_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, patient_id: i64) -> Result<Option<Patient>, DatabaseError> {
    let result = conn.query_row(
        "SELECT patient_id, first_name, last_name, primary_doctor_id, insurance_id
         FROM patients WHERE patient_id = ?1",
        params![patient_id],
        |row| {
            Ok(Patient {
                patient_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                primary_doctor_id: row.get(3)?,
                insurance_id: row.get(4)?,
            })
        },
    );

    match result {
        Ok(patient) => Ok(Some(patient)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT patient_id, first_name, last_name, primary_doctor_id, insurance_id
         FROM patients ORDER BY patient_id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Patient {
            patient_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            primary_doctor_id: row.get(3)?,
            insurance_id: row.get(4)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients
         SET first_name = ?1, last_name = ?2, primary_doctor_id = ?3, insurance_id = ?4
         WHERE patient_id = ?5",
        params![
            patient.first_name,
            patient.last_name,
            patient.primary_doctor_id,
            patient.insurance_id,
            patient.patient_id,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.patient_id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, patient_id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM patients WHERE patient_id = ?1",
        params![patient_id],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

/// Insurer the patient bills under, if any.
///
/// Returns `Ok(None)` both for an unknown patient and for a patient without
/// coverage; the billing layer turns either into a validation failure.
pub fn patient_insurance_id(
    conn: &Connection,
    patient_id: i64,
) -> Result<Option<i64>, DatabaseError> {
    let result = conn.query_row(
        "SELECT insurance_id FROM patients WHERE patient_id = ?1",
        params![patient_id],
        |row| row.get::<_, Option<i64>>(0),
    );

    match result {
        Ok(insurance_id) => Ok(insurance_id),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
