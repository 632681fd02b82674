use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{parse, FieldKind, FieldSpec, Id, Schema};

pub const LOCATION_SCHEMA: Schema = Schema {
    name: "Location",
    fields: &[
        FieldSpec::optional("id", FieldKind::Id),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("street", FieldKind::String),
        FieldSpec::required("city", FieldKind::String),
        FieldSpec::required("province", FieldKind::String),
        FieldSpec::required("postalCode", FieldKind::String),
        FieldSpec::optional("poBoxNumber", FieldKind::String),
        FieldSpec::required("countryIsoCode", FieldKind::String),
    ],
};

/// A street address owned by a centre
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_box_number: Option<String>,
    pub country_iso_code: String,
}

impl Location {
    pub fn create(raw: &Value) -> Result<Self> {
        parse(&LOCATION_SCHEMA, raw)
    }
}
