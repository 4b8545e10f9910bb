use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::FacilityType;
use crate::models::{Facility, FacilityKind, NewFacility};

/// Insert a facility plus its subtype row as one atomic unit.
///
/// Returns the assigned facility id. Either both rows are written or
/// neither is.
pub fn insert_facility(conn: &Connection, facility: &NewFacility) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO facilities (address, size, ftype) VALUES (?1, ?2, ?3)",
        params![
            facility.address,
            facility.size,
            facility.kind.facility_type().as_str(),
        ],
    )?;
    let facility_id = tx.last_insert_rowid();

    match &facility.kind {
        FacilityKind::Office { office_count } => {
            tx.execute(
                "INSERT INTO offices (facility_id, office_count) VALUES (?1, ?2)",
                params![facility_id, office_count],
            )?;
        }
        FacilityKind::OutpatientSurgery {
            room_count,
            description,
            procedure_code,
        } => {
            tx.execute(
                "INSERT INTO outpatient_surgeries (facility_id, room_count, description, procedure_code)
                 VALUES (?1, ?2, ?3, ?4)",
                params![facility_id, room_count, description, procedure_code],
            )?;
        }
    }

    tx.commit()?;
    tracing::debug!(facility_id, ftype = facility.kind.facility_type().as_str(), "Facility created");
    Ok(facility_id)
}

// Internal row type for facility mapping
struct FacilityRow {
    facility_id: i64,
    address: String,
    size: i64,
    ftype: String,
    office_count: Option<i64>,
    room_count: Option<i64>,
    description: Option<String>,
    procedure_code: Option<String>,
}

fn facility_from_row(row: FacilityRow) -> Result<Facility, DatabaseError> {
    let kind = match FacilityType::from_str(&row.ftype)? {
        FacilityType::Office => FacilityKind::Office {
            office_count: row.office_count.ok_or_else(|| {
                DatabaseError::ConstraintViolation(format!(
                    "facility {} tagged office without an offices row",
                    row.facility_id
                ))
            })?,
        },
        FacilityType::OutpatientSurgery => FacilityKind::OutpatientSurgery {
            room_count: row.room_count.ok_or_else(|| {
                DatabaseError::ConstraintViolation(format!(
                    "facility {} tagged outpatient_surgery without a surgeries row",
                    row.facility_id
                ))
            })?,
            description: row.description.unwrap_or_default(),
            procedure_code: row.procedure_code.unwrap_or_default(),
        },
    };

    Ok(Facility {
        facility_id: row.facility_id,
        address: row.address,
        size: row.size,
        kind,
    })
}

const FACILITY_SELECT: &str = "
    SELECT f.facility_id, f.address, f.size, f.ftype,
           o.office_count,
           s.room_count, s.description, s.procedure_code
    FROM facilities f
    LEFT JOIN offices o ON f.facility_id = o.facility_id
    LEFT JOIN outpatient_surgeries s ON f.facility_id = s.facility_id";

pub fn get_facility(conn: &Connection, facility_id: i64) -> Result<Option<Facility>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{FACILITY_SELECT} WHERE f.facility_id = ?1"))?;

    let result = stmt.query_row(params![facility_id], |row| {
        Ok(FacilityRow {
            facility_id: row.get(0)?,
            address: row.get(1)?,
            size: row.get(2)?,
            ftype: row.get(3)?,
            office_count: row.get(4)?,
            room_count: row.get(5)?,
            description: row.get(6)?,
            procedure_code: row.get(7)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(facility_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_facilities(conn: &Connection) -> Result<Vec<Facility>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{FACILITY_SELECT} ORDER BY f.facility_id"))?;

    let rows = stmt.query_map([], |row| {
        Ok(FacilityRow {
            facility_id: row.get(0)?,
            address: row.get(1)?,
            size: row.get(2)?,
            ftype: row.get(3)?,
            office_count: row.get(4)?,
            room_count: row.get(5)?,
            description: row.get(6)?,
            procedure_code: row.get(7)?,
        })
    })?;

    let mut facilities = Vec::new();
    for row in rows {
        facilities.push(facility_from_row(row?)?);
    }
    Ok(facilities)
}

/// Update a facility's mutable attributes. The subtype itself is immutable:
/// passing a kind of the other variant fails with a constraint violation.
pub fn update_facility(conn: &Connection, facility: &Facility) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let stored_type: String = tx
        .query_row(
            "SELECT ftype FROM facilities WHERE facility_id = ?1",
            params![facility.facility_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Facility".into(),
                id: facility.facility_id.to_string(),
            },
            other => other.into(),
        })?;

    if stored_type != facility.kind.facility_type().as_str() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "facility {} is a {stored_type}; its subtype cannot change",
            facility.facility_id
        )));
    }

    tx.execute(
        "UPDATE facilities SET address = ?1, size = ?2 WHERE facility_id = ?3",
        params![facility.address, facility.size, facility.facility_id],
    )?;

    match &facility.kind {
        FacilityKind::Office { office_count } => {
            tx.execute(
                "UPDATE offices SET office_count = ?1 WHERE facility_id = ?2",
                params![office_count, facility.facility_id],
            )?;
        }
        FacilityKind::OutpatientSurgery {
            room_count,
            description,
            procedure_code,
        } => {
            tx.execute(
                "UPDATE outpatient_surgeries
                 SET room_count = ?1, description = ?2, procedure_code = ?3
                 WHERE facility_id = ?4",
                params![room_count, description, procedure_code, facility.facility_id],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Delete a facility and its subtype row.
pub fn delete_facility(conn: &Connection, facility_id: i64) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    // Subtype rows cascade, but delete explicitly so a partial pair
    // (subtype row without base) also gets cleaned up.
    tx.execute("DELETE FROM offices WHERE facility_id = ?1", params![facility_id])?;
    tx.execute(
        "DELETE FROM outpatient_surgeries WHERE facility_id = ?1",
        params![facility_id],
    )?;
    let deleted = tx.execute(
        "DELETE FROM facilities WHERE facility_id = ?1",
        params![facility_id],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Facility".into(),
            id: facility_id.to_string(),
        });
    }

    tx.commit()?;
    Ok(())
}
