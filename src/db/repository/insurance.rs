use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{InsuranceCompany, NewInsuranceCompany};

/// Insert an insurance company and return its assigned id.
pub fn insert_insurance_company(
    conn: &Connection,
    company: &NewInsuranceCompany,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO insurance_companies (name, address) VALUES (?1, ?2)",
        params![company.name, company.address],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_insurance_company(
    conn: &Connection,
    insurance_id: i64,
) -> Result<Option<InsuranceCompany>, DatabaseError> {
    let result = conn.query_row(
        "SELECT insurance_id, name, address FROM insurance_companies WHERE insurance_id = ?1",
        params![insurance_id],
        |row| {
            Ok(InsuranceCompany {
                insurance_id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
            })
        },
    );

    match result {
        Ok(company) => Ok(Some(company)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_insurance_companies(
    conn: &Connection,
) -> Result<Vec<InsuranceCompany>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT insurance_id, name, address FROM insurance_companies ORDER BY insurance_id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(InsuranceCompany {
            insurance_id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_insurance_company(
    conn: &Connection,
    company: &InsuranceCompany,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE insurance_companies SET name = ?1, address = ?2 WHERE insurance_id = ?3",
        params![company.name, company.address, company.insurance_id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "InsuranceCompany".into(),
            id: company.insurance_id.to_string(),
        });
    }
    Ok(())
}
