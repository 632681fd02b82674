use serde_json::Value;
use thiserror::Error;

/// Expected JSON type of a single field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    /// A string that identifies another entity; must not be empty
    Id,
    Integer,
    Number,
    Boolean,
    Any,
    Object(&'static Schema),
    Array(&'static FieldKind),
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Id => "non-empty string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Any => "any",
            FieldKind::Object(_) => "object",
            FieldKind::Array(_) => "array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
        }
    }

    /// Optional fields may also be `null`.
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: true,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }
}

/// Declarative shape of a raw server object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        validate(self, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("must be a map")]
    NotAMap,

    #[error("Missing required property: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Invalid type at {path}: expected {expected}, got {actual}")]
    InvalidType {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{field}: {source}")]
    Nested {
        field: String,
        source: Box<SchemaError>,
    },
}

/// Check `value` against `schema`: map check, then required keys, then field types
/// (recursing into nested objects and arrays).
pub fn validate(schema: &Schema, value: &Value) -> Result<(), SchemaError> {
    let obj = value.as_object().ok_or(SchemaError::NotAMap)?;

    let missing: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.required && !obj.contains_key(f.name))
        .map(|f| f.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingRequired(missing));
    }

    for field in schema.fields {
        if let Some(field_value) = obj.get(field.name) {
            check_kind(field.name.to_string(), &field.kind, field.nullable, field_value)?;
        }
    }
    Ok(())
}

fn check_kind(path: String, kind: &FieldKind, nullable: bool, value: &Value) -> Result<(), SchemaError> {
    if value.is_null() {
        if nullable || *kind == FieldKind::Any {
            return Ok(());
        }
        return Err(type_error(path, kind, value));
    }

    let matches = match kind {
        FieldKind::Any => true,
        FieldKind::String => value.is_string(),
        FieldKind::Id => value.as_str().map(|s| !s.is_empty()).unwrap_or(false),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Object(schema) => {
            if !value.is_object() {
                return Err(type_error(path, kind, value));
            }
            return validate(schema, value).map_err(|e| SchemaError::Nested {
                field: path,
                source: Box::new(e),
            });
        }
        FieldKind::Array(inner) => {
            let items = match value.as_array() {
                Some(items) => items,
                None => return Err(type_error(path, kind, value)),
            };
            for (index, item) in items.iter().enumerate() {
                check_kind(format!("{}[{}]", path, index), inner, false, item)?;
            }
            return Ok(());
        }
    };

    if matches {
        Ok(())
    } else {
        Err(type_error(path, kind, value))
    }
}

fn type_error(path: String, kind: &FieldKind, value: &Value) -> SchemaError {
    SchemaError::InvalidType {
        path,
        expected: kind.label(),
        actual: json_type(value),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(s) if s.is_empty() => "empty string",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
