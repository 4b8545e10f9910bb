use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub primary_doctor_id: Option<i64>,
    pub insurance_id: Option<i64>,
}

/// Patient fields for insertion; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub primary_doctor_id: Option<i64>,
    pub insurance_id: Option<i64>,
}
