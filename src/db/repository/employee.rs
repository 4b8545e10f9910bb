use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::parse_money;
use crate::db::DatabaseError;
use crate::models::enums::JobClass;
use crate::models::{DoctorInfo, Employee, JobRole, NewEmployee};

/// Insert an employee plus its job-class subtype row as one atomic unit.
///
/// Returns the assigned employee id.
pub fn insert_employee(conn: &Connection, employee: &NewEmployee) -> Result<i64, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO employees (ssn, first_name, last_name, salary, hire_date, job_class, address, facility_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            employee.ssn,
            employee.first_name,
            employee.last_name,
            employee.salary.to_string(),
            employee.hire_date,
            employee.role.job_class().as_str(),
            employee.address,
            employee.facility_id,
        ],
    )?;
    let employee_id = tx.last_insert_rowid();

    match &employee.role {
        JobRole::Doctor {
            speciality,
            board_certified,
        } => {
            tx.execute(
                "INSERT INTO doctors (employee_id, speciality, board_certified) VALUES (?1, ?2, ?3)",
                params![employee_id, speciality, board_certified],
            )?;
        }
        JobRole::Nurse { certification } => {
            tx.execute(
                "INSERT INTO nurses (employee_id, certification) VALUES (?1, ?2)",
                params![employee_id, certification],
            )?;
        }
        JobRole::Admin { job_title } => {
            tx.execute(
                "INSERT INTO admins (employee_id, job_title) VALUES (?1, ?2)",
                params![employee_id, job_title],
            )?;
        }
        JobRole::OtherHcp { job_title } => {
            tx.execute(
                "INSERT INTO other_hcps (employee_id, job_title) VALUES (?1, ?2)",
                params![employee_id, job_title],
            )?;
        }
    }

    tx.commit()?;
    tracing::debug!(
        employee_id,
        job_class = employee.role.job_class().as_str(),
        "Employee created"
    );
    Ok(employee_id)
}

// Internal row type for the employees base table
struct EmployeeRow {
    employee_id: i64,
    ssn: String,
    first_name: String,
    last_name: String,
    salary: String,
    hire_date: NaiveDate,
    job_class: String,
    address: String,
    facility_id: i64,
}

fn read_role(
    conn: &Connection,
    employee_id: i64,
    job_class: JobClass,
) -> Result<JobRole, DatabaseError> {
    let missing = || {
        DatabaseError::ConstraintViolation(format!(
            "employee {employee_id} tagged {} without a subtype row",
            job_class.as_str()
        ))
    };

    let result = match job_class {
        JobClass::Doctor => conn.query_row(
            "SELECT speciality, board_certified FROM doctors WHERE employee_id = ?1",
            params![employee_id],
            |row| {
                Ok(JobRole::Doctor {
                    speciality: row.get(0)?,
                    board_certified: row.get(1)?,
                })
            },
        ),
        JobClass::Nurse => conn.query_row(
            "SELECT certification FROM nurses WHERE employee_id = ?1",
            params![employee_id],
            |row| {
                Ok(JobRole::Nurse {
                    certification: row.get(0)?,
                })
            },
        ),
        JobClass::Admin => conn.query_row(
            "SELECT job_title FROM admins WHERE employee_id = ?1",
            params![employee_id],
            |row| {
                Ok(JobRole::Admin {
                    job_title: row.get(0)?,
                })
            },
        ),
        JobClass::OtherHcp => conn.query_row(
            "SELECT job_title FROM other_hcps WHERE employee_id = ?1",
            params![employee_id],
            |row| {
                Ok(JobRole::OtherHcp {
                    job_title: row.get(0)?,
                })
            },
        ),
    };

    match result {
        Ok(role) => Ok(role),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(missing()),
        Err(e) => Err(e.into()),
    }
}

fn employee_from_row(conn: &Connection, row: EmployeeRow) -> Result<Employee, DatabaseError> {
    let job_class = JobClass::from_str(&row.job_class)?;
    let role = read_role(conn, row.employee_id, job_class)?;

    Ok(Employee {
        employee_id: row.employee_id,
        ssn: row.ssn,
        first_name: row.first_name,
        last_name: row.last_name,
        salary: parse_money(&row.salary)?,
        hire_date: row.hire_date,
        address: row.address,
        facility_id: row.facility_id,
        role,
    })
}

const EMPLOYEE_SELECT: &str = "
    SELECT employee_id, ssn, first_name, last_name, salary, hire_date, job_class, address, facility_id
    FROM employees";

pub fn get_employee(conn: &Connection, employee_id: i64) -> Result<Option<Employee>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{EMPLOYEE_SELECT} WHERE employee_id = ?1"))?;

    let result = stmt.query_row(params![employee_id], |row| {
        Ok(EmployeeRow {
            employee_id: row.get(0)?,
            ssn: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            salary: row.get(4)?,
            hire_date: row.get(5)?,
            job_class: row.get(6)?,
            address: row.get(7)?,
            facility_id: row.get(8)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(employee_from_row(conn, row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_employees(conn: &Connection) -> Result<Vec<Employee>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{EMPLOYEE_SELECT} ORDER BY employee_id"))?;

    let rows = stmt.query_map([], |row| {
        Ok(EmployeeRow {
            employee_id: row.get(0)?,
            ssn: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            salary: row.get(4)?,
            hire_date: row.get(5)?,
            job_class: row.get(6)?,
            address: row.get(7)?,
            facility_id: row.get(8)?,
        })
    })?;

    let base_rows: Vec<EmployeeRow> = rows.collect::<Result<_, _>>()?;
    drop(stmt);

    let mut employees = Vec::new();
    for row in base_rows {
        employees.push(employee_from_row(conn, row)?);
    }
    Ok(employees)
}

/// Doctors only, for scheduling selectors.
pub fn list_doctors(conn: &Connection) -> Result<Vec<DoctorInfo>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT e.employee_id, e.first_name, e.last_name, d.speciality
         FROM employees e
         JOIN doctors d ON e.employee_id = d.employee_id
         ORDER BY e.employee_id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(DoctorInfo {
            employee_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            speciality: row.get(3)?,
        })
    })?;

    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Update base attributes and the matching subtype row. The job class is
/// immutable once assigned.
pub fn update_employee(conn: &Connection, employee: &Employee) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let stored_class: String = tx
        .query_row(
            "SELECT job_class FROM employees WHERE employee_id = ?1",
            params![employee.employee_id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Employee".into(),
                id: employee.employee_id.to_string(),
            },
            other => other.into(),
        })?;

    if stored_class != employee.role.job_class().as_str() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "employee {} is a {stored_class}; the job class cannot change",
            employee.employee_id
        )));
    }

    tx.execute(
        "UPDATE employees
         SET ssn = ?1, first_name = ?2, last_name = ?3, salary = ?4,
             hire_date = ?5, address = ?6, facility_id = ?7
         WHERE employee_id = ?8",
        params![
            employee.ssn,
            employee.first_name,
            employee.last_name,
            employee.salary.to_string(),
            employee.hire_date,
            employee.address,
            employee.facility_id,
            employee.employee_id,
        ],
    )?;

    match &employee.role {
        JobRole::Doctor {
            speciality,
            board_certified,
        } => {
            tx.execute(
                "UPDATE doctors SET speciality = ?1, board_certified = ?2 WHERE employee_id = ?3",
                params![speciality, board_certified, employee.employee_id],
            )?;
        }
        JobRole::Nurse { certification } => {
            tx.execute(
                "UPDATE nurses SET certification = ?1 WHERE employee_id = ?2",
                params![certification, employee.employee_id],
            )?;
        }
        JobRole::Admin { job_title } => {
            tx.execute(
                "UPDATE admins SET job_title = ?1 WHERE employee_id = ?2",
                params![job_title, employee.employee_id],
            )?;
        }
        JobRole::OtherHcp { job_title } => {
            tx.execute(
                "UPDATE other_hcps SET job_title = ?1 WHERE employee_id = ?2",
                params![job_title, employee.employee_id],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Delete an employee; the subtype row cascades.
pub fn delete_employee(conn: &Connection, employee_id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM employees WHERE employee_id = ?1",
        params![employee_id],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Employee".into(),
            id: employee_id.to_string(),
        });
    }
    Ok(())
}

/// Ensure the patient↔doctor treatment link exists. Idempotent.
pub fn ensure_treats(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO treats (patient_id, doctor_id) VALUES (?1, ?2)",
        params![patient_id, doctor_id],
    )?;
    Ok(())
}
