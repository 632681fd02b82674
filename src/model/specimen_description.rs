use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{parse, FieldKind, FieldSpec, Id, Schema};

pub const SPECIMEN_DESCRIPTION_SCHEMA: Schema = Schema {
    name: "SpecimenDescription",
    fields: &[
        FieldSpec::optional("id", FieldKind::Id),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("units", FieldKind::String),
        FieldSpec::required("anatomicalSourceType", FieldKind::String),
        FieldSpec::required("preservationType", FieldKind::String),
        FieldSpec::required("preservationTemperature", FieldKind::String),
        FieldSpec::required("specimenType", FieldKind::String),
        FieldSpec::required("maxCount", FieldKind::Integer),
        FieldSpec::required("amount", FieldKind::Number),
    ],
};

/// Specimens expected to be collected with a collection event type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub units: String,
    pub anatomical_source_type: String,
    pub preservation_type: String,
    pub preservation_temperature: String,
    pub specimen_type: String,
    pub max_count: u32,
    pub amount: f64,
}

impl SpecimenDescription {
    pub fn create(raw: &Value) -> Result<Self> {
        parse(&SPECIMEN_DESCRIPTION_SCHEMA, raw)
    }
}
