use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    fetch, list_paged, post_command, put_command, to_command, uri, validate, version_segment, Annotation,
    CollectionEventType, ConcurrencySafeEntity, DomainEntity, FieldKind, FieldSpec, Id, ListOptions, PagedResult,
    Schema, ANNOTATION_SCHEMA,
};
use crate::store::traits::BiobankApi;

const ANNOTATION_OBJECT: FieldKind = FieldKind::Object(&ANNOTATION_SCHEMA);

pub const COLLECTION_EVENT_SCHEMA: Schema = Schema {
    name: "CollectionEvent",
    fields: &[
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("participantId", FieldKind::Id),
        FieldSpec::required("collectionEventTypeId", FieldKind::Id),
        FieldSpec::required("timeCompleted", FieldKind::String),
        FieldSpec::required("visitNumber", FieldKind::Integer),
        FieldSpec::optional("annotations", FieldKind::Array(&ANNOTATION_OBJECT)),
    ],
};

/// A participant's visit, recorded against a collection event type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEvent {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    #[serde(default)]
    pub participant_id: Id,
    #[serde(default)]
    pub collection_event_type_id: Id,
    #[serde(default)]
    pub time_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visit_number: u32,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl DomainEntity for CollectionEvent {
    const SCHEMA: &'static Schema = &COLLECTION_EVENT_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

/// `/participants/<participantId>/cevents[/<rest>...]`
fn collection_uri(participant_id: &str, rest: &[&str]) -> Result<String> {
    if participant_id.is_empty() {
        return Err(DomainError::InvalidArgument("participant id not specified".to_string()));
    }
    let mut parts = vec!["participants", participant_id, "cevents"];
    parts.extend_from_slice(rest);
    Ok(uri(&parts))
}

impl CollectionEvent {
    /// Build an event bound to `event_type`.
    ///
    /// `raw` may be a draft without identity. Annotations for every annotation type of
    /// `event_type` are present afterwards, with `required` taken from the type.
    pub fn for_type(raw: &Value, event_type: &CollectionEventType) -> Result<Self> {
        if let Some(annotations) = raw.get("annotations").and_then(Value::as_array) {
            for annotation in annotations {
                validate(&ANNOTATION_SCHEMA, annotation)
                    .map_err(|e| DomainError::Validation(format!("invalid annotation object from server: {}", e)))?;
            }
        }
        let mut event: CollectionEvent = serde_json::from_value(raw.clone()).map_err(DomainError::invalid_object)?;

        let type_id = event_type.entity.persisted_id()?;
        if event.collection_event_type_id.is_empty() {
            event.collection_event_type_id = type_id.clone();
        } else if &event.collection_event_type_id != type_id {
            return Err(DomainError::Validation("invalid collection event type".to_string()));
        }

        let foreign = event
            .annotations
            .iter()
            .filter(|a| event_type.annotation_type_by_id(&a.annotation_type_id).is_none())
            .map(|a| a.annotation_type_id.as_str())
            .join(", ");
        if !foreign.is_empty() {
            return Err(DomainError::InvalidArgument(format!(
                "annotations with invalid annotation type IDs found: {}",
                foreign
            )));
        }

        for annotation_type in &event_type.annotation_types {
            let Some(at_id) = annotation_type.id.as_deref() else {
                continue;
            };
            match event.annotations.iter_mut().find(|a| a.annotation_type_id == at_id) {
                Some(annotation) => annotation.required = annotation_type.required,
                None => event
                    .annotations
                    .push(Annotation::for_type(at_id, annotation_type.required)),
            }
        }
        Ok(event)
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, participant_id: &str, id: &str) -> Result<Self> {
        let path = collection_uri(participant_id, &[])?;
        fetch(api, &path, &[("ceventId".to_string(), id.to_string())]).await
    }

    pub async fn get_by_visit_number<A: BiobankApi + ?Sized>(
        api: &A,
        participant_id: &str,
        visit_number: u32,
    ) -> Result<Self> {
        let path = collection_uri(participant_id, &["visitNumber", &visit_number.to_string()])?;
        fetch(api, &path, &[]).await
    }

    pub async fn list<A: BiobankApi + ?Sized>(
        api: &A,
        participant_id: &str,
        options: &ListOptions,
    ) -> Result<PagedResult<Self>> {
        let path = collection_uri(participant_id, &["list"])?;
        list_paged(api, &path, options, "collection events", Self::create).await
    }

    /// The first required annotation without a value, if any.
    pub fn missing_required_annotation(&self) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.required && !a.has_value())
    }

    fn add_command(&self) -> Result<Value> {
        Ok(json!({
            "participantId": self.participant_id,
            "collectionEventTypeId": self.collection_event_type_id,
            "timeCompleted": self.time_completed,
            "visitNumber": self.visit_number,
            "annotations": to_command(&self.annotations)?,
        }))
    }

    pub async fn add_or_update<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if let Some(annotation) = self.missing_required_annotation() {
            return Err(DomainError::InvalidState(format!(
                "required annotation has no value: {}",
                annotation.annotation_type_id
            )));
        }
        match &self.entity.id {
            None => post_command(api, &collection_uri(&self.participant_id, &[])?, self.add_command()?).await,
            Some(id) => {
                let mut fields = self.add_command()?;
                fields["id"] = json!(id);
                let cmd = self.entity.update_command(fields)?;
                put_command(api, &collection_uri(&self.participant_id, &[id])?, cmd).await
            }
        }
    }

    pub async fn remove<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<()> {
        let id = self.entity.persisted_id()?;
        let path = collection_uri(&self.participant_id, &[id, &version_segment(&self.entity)])?;
        api.delete(&path).await?;
        Ok(())
    }
}
