use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{parse, FieldKind, FieldSpec, Id, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationValueType {
    Text,
    Number,
    DateTime,
    Select,
}

pub const ANNOTATION_TYPE_SCHEMA: Schema = Schema {
    name: "AnnotationType",
    fields: &[
        FieldSpec::optional("id", FieldKind::Id),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("valueType", FieldKind::String),
        FieldSpec::optional("maxValueCount", FieldKind::Integer),
        FieldSpec::optional("options", FieldKind::Array(&FieldKind::String)),
        FieldSpec::required("required", FieldKind::Boolean),
    ],
};

/// Definition of a custom field a study attaches to participants or collection events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value_type: AnnotationValueType,
    /// 1 for single select, 2 for multiple select; only set for `select` types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value_count: Option<u32>,
    #[serde(default)]
    pub options: Vec<String>,
    pub required: bool,
}

impl AnnotationType {
    pub fn new(name: impl Into<String>, value_type: AnnotationValueType) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            value_type,
            max_value_count: None,
            options: Vec::new(),
            required: false,
        }
    }

    pub fn create(raw: &Value) -> Result<Self> {
        parse(&ANNOTATION_TYPE_SCHEMA, raw)
    }

    pub fn is_value_type_select(&self) -> bool {
        self.value_type == AnnotationValueType::Select
    }

    pub fn is_single_select(&self) -> bool {
        self.is_value_type_select() && self.max_value_count == Some(1)
    }

    pub fn is_multiple_select(&self) -> bool {
        self.is_value_type_select() && self.max_value_count == Some(2)
    }
}

const SELECTED_VALUES: FieldKind = FieldKind::Array(&FieldKind::String);

pub const ANNOTATION_SCHEMA: Schema = Schema {
    name: "Annotation",
    fields: &[
        FieldSpec::required("annotationTypeId", FieldKind::Id),
        FieldSpec::optional("stringValue", FieldKind::String),
        FieldSpec::optional("numberValue", FieldKind::String),
        FieldSpec::optional("selectedValues", SELECTED_VALUES),
    ],
};

/// A value recorded against an annotation type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub annotation_type_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_value: Option<String>,
    #[serde(default)]
    pub selected_values: Vec<String>,
    /// Copied from the owning type's annotation-type data; never sent to the server
    #[serde(skip)]
    pub required: bool,
}

impl Annotation {
    pub fn create(raw: &Value) -> Result<Self> {
        parse(&ANNOTATION_SCHEMA, raw)
    }

    /// An empty annotation for `annotation_type`.
    pub fn for_type(annotation_type_id: impl Into<Id>, required: bool) -> Self {
        Self {
            annotation_type_id: annotation_type_id.into(),
            required,
            ..Default::default()
        }
    }

    pub fn has_value(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);
        filled(&self.string_value) || filled(&self.number_value) || !self.selected_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_annotation_type_from_server() {
        let at = AnnotationType::create(&json!({
            "id": "at1",
            "name": "Colour",
            "description": null,
            "valueType": "select",
            "maxValueCount": 2,
            "options": ["red", "blue"],
            "required": true
        }))
        .unwrap();
        assert!(at.is_multiple_select());
        assert!(!at.is_single_select());
        assert_eq!(at.options.len(), 2);
    }

    #[test]
    fn test_annotation_type_with_unknown_value_type() {
        let err = AnnotationType::create(&json!({
            "name": "x",
            "valueType": "colour",
            "required": false
        }))
        .unwrap_err();
        assert!(err.message().starts_with("invalid object from server"));
    }

    #[test]
    fn test_annotation_has_value() {
        let mut annotation = Annotation::for_type("at1", true);
        assert!(!annotation.has_value());
        annotation.string_value = Some("  ".to_string());
        assert!(!annotation.has_value());
        annotation.selected_values = vec!["red".to_string()];
        assert!(annotation.has_value());
    }

    #[test]
    fn test_annotation_required_flag_is_not_serialized() {
        let annotation = Annotation::for_type("at1", true);
        assert_eq!(
            serde_json::to_value(&annotation).unwrap(),
            json!({"annotationTypeId": "at1", "selectedValues": []})
        );
    }

    #[test]
    fn test_annotation_with_invalid_keys() {
        let err = Annotation::create(&json!({"tmp": 1})).unwrap_err();
        assert_eq!(
            err.message(),
            "invalid object from server: Missing required property: annotationTypeId"
        );
    }
}
