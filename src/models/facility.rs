use serde::{Deserialize, Serialize};

use super::enums::FacilityType;

/// Facility subtype, chosen at creation and immutable in type thereafter.
/// Only the variant's own attributes mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacilityKind {
    Office {
        office_count: i64,
    },
    OutpatientSurgery {
        room_count: i64,
        description: String,
        procedure_code: String,
    },
}

impl FacilityKind {
    pub fn facility_type(&self) -> FacilityType {
        match self {
            Self::Office { .. } => FacilityType::Office,
            Self::OutpatientSurgery { .. } => FacilityType::OutpatientSurgery,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub facility_id: i64,
    pub address: String,
    pub size: i64,
    pub kind: FacilityKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFacility {
    pub address: String,
    pub size: i64,
    pub kind: FacilityKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_with_type_tag() {
        let kind = FacilityKind::Office { office_count: 3 };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "office");
        assert_eq!(json["office_count"], 3);

        let back: FacilityKind =
            serde_json::from_value(serde_json::json!({"type": "office", "office_count": 3}))
                .unwrap();
        assert_eq!(back, kind);
    }
}
