use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{parse, FieldKind, FieldSpec, Id, Schema};

pub const ENTITY_INFO_SCHEMA: Schema = Schema {
    name: "EntityInfo",
    fields: &[
        FieldSpec::required("id", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
    ],
};

/// Id and name of another entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: Id,
    pub name: String,
}

impl EntityInfo {
    pub fn create(raw: &Value) -> Result<Self> {
        parse(&ENTITY_INFO_SCHEMA, raw)
    }
}
