use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::JobClass;

/// Job-class subtype. Each variant carries only its own fields; dispatch is
/// an exhaustive match on the variant, never a string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job_class", rename_all = "snake_case")]
pub enum JobRole {
    Doctor {
        speciality: String,
        board_certified: NaiveDate,
    },
    Nurse {
        certification: String,
    },
    Admin {
        job_title: String,
    },
    OtherHcp {
        job_title: String,
    },
}

impl JobRole {
    pub fn job_class(&self) -> JobClass {
        match self {
            Self::Doctor { .. } => JobClass::Doctor,
            Self::Nurse { .. } => JobClass::Nurse,
            Self::Admin { .. } => JobClass::Admin,
            Self::OtherHcp { .. } => JobClass::OtherHcp,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: i64,
    pub ssn: String,
    pub first_name: String,
    pub last_name: String,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
    pub address: String,
    pub facility_id: i64,
    pub role: JobRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub ssn: String,
    pub first_name: String,
    pub last_name: String,
    pub salary: Decimal,
    pub hire_date: NaiveDate,
    pub address: String,
    pub facility_id: i64,
    pub role: JobRole,
}

/// Minimal doctor row for scheduling selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorInfo {
    pub employee_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub speciality: String,
}
