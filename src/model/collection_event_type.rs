use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    delete_command, fetch, fetch_all, merge_fields, post_command, put_command, to_command, update_field, uri,
    version_segment, AnnotationType, ConcurrencySafeEntity, DomainEntity, FieldKind, FieldSpec, Id, Schema,
    SpecimenDescription, ANNOTATION_TYPE_SCHEMA, SPECIMEN_DESCRIPTION_SCHEMA,
};
use crate::store::traits::BiobankApi;

const COLLECTION: &str = "studies/cetypes";
const SPECIMEN_DESCRIPTIONS: &str = "studies/cetypes/spcdesc";
const ANNOTATION_TYPES: &str = "studies/cetypes/annottype";

const SPECIMEN_DESCRIPTION_OBJECT: FieldKind = FieldKind::Object(&SPECIMEN_DESCRIPTION_SCHEMA);
const ANNOTATION_TYPE_OBJECT: FieldKind = FieldKind::Object(&ANNOTATION_TYPE_SCHEMA);

pub const COLLECTION_EVENT_TYPE_SCHEMA: Schema = Schema {
    name: "CollectionEventType",
    fields: &[
        FieldSpec::required("studyId", FieldKind::Id),
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("recurring", FieldKind::Boolean),
        FieldSpec::optional("specimenDescriptions", FieldKind::Array(&SPECIMEN_DESCRIPTION_OBJECT)),
        FieldSpec::optional("annotationTypes", FieldKind::Array(&ANNOTATION_TYPE_OBJECT)),
    ],
};

/// Template for a visit: the specimens collected and the annotations recorded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEventType {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    pub study_id: Id,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub recurring: bool,
    #[serde(default)]
    pub specimen_descriptions: Vec<SpecimenDescription>,
    #[serde(default)]
    pub annotation_types: Vec<AnnotationType>,
}

impl DomainEntity for CollectionEventType {
    const SCHEMA: &'static Schema = &COLLECTION_EVENT_TYPE_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

/// `/<route>/<studyId>[/<rest>...]`
fn study_uri(route: &str, study_id: &str, rest: &[&str]) -> Result<String> {
    if study_id.is_empty() {
        return Err(DomainError::InvalidArgument("study id not specified".to_string()));
    }
    let mut parts = vec![route, study_id];
    parts.extend_from_slice(rest);
    Ok(uri(&parts))
}

impl CollectionEventType {
    pub fn new(study_id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            study_id: study_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn has_annotation_types(&self) -> bool {
        !self.annotation_types.is_empty()
    }

    pub fn annotation_type_by_id(&self, annotation_type_id: &str) -> Option<&AnnotationType> {
        self.annotation_types
            .iter()
            .find(|at| at.id.as_deref() == Some(annotation_type_id))
    }

    pub fn specimen_description_by_id(&self, specimen_description_id: &str) -> Option<&SpecimenDescription> {
        self.specimen_descriptions
            .iter()
            .find(|sd| sd.id.as_deref() == Some(specimen_description_id))
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, study_id: &str, id: &str) -> Result<Self> {
        fetch(api, &study_uri(COLLECTION, study_id, &[])?, &[("cetId".to_string(), id.to_string())]).await
    }

    pub async fn list<A: BiobankApi + ?Sized>(api: &A, study_id: &str) -> Result<Vec<Self>> {
        fetch_all(api, &study_uri(COLLECTION, study_id, &[])?, &[], Self::create).await
    }

    fn add_command(&self) -> Value {
        let mut cmd = json!({
            "studyId": self.study_id,
            "name": self.name,
            "recurring": self.recurring,
        });
        if let Some(description) = &self.description {
            cmd["description"] = json!(description);
        }
        cmd
    }

    /// `fields` plus the owning study and the expected version.
    fn study_command(&self, fields: Value) -> Result<Value> {
        self.entity
            .update_command(merge_fields(fields, json!({ "studyId": self.study_id })))
    }

    pub async fn add_or_update<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        match &self.entity.id {
            None => post_command(api, &study_uri(COLLECTION, &self.study_id, &[])?, self.add_command()).await,
            Some(id) => {
                let mut fields = self.add_command();
                fields["id"] = json!(id);
                let cmd = self.entity.update_command(fields)?;
                put_command(api, &study_uri(COLLECTION, &self.study_id, &[id])?, cmd).await
            }
        }
    }

    pub async fn remove<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<()> {
        let id = self.entity.persisted_id()?;
        let path = study_uri(COLLECTION, &self.study_id, &[id, &version_segment(&self.entity)])?;
        api.delete(&path).await?;
        Ok(())
    }

    pub async fn update_name<A: BiobankApi + ?Sized>(&self, api: &A, name: &str) -> Result<Self> {
        let fields = merge_fields(json!({ "name": name }), json!({ "studyId": self.study_id }));
        update_field(api, self, COLLECTION, "name", fields).await
    }

    pub async fn update_description<A: BiobankApi + ?Sized>(&self, api: &A, description: Option<&str>) -> Result<Self> {
        let mut fields = json!({ "studyId": self.study_id });
        if let Some(description) = description {
            fields["description"] = json!(description);
        }
        update_field(api, self, COLLECTION, "description", fields).await
    }

    pub async fn update_recurring<A: BiobankApi + ?Sized>(&self, api: &A, recurring: bool) -> Result<Self> {
        let fields = json!({ "studyId": self.study_id, "recurring": recurring });
        update_field(api, self, COLLECTION, "recurring", fields).await
    }

    pub async fn add_specimen_description<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        specimen_description: &SpecimenDescription,
    ) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let mut fields = to_command(specimen_description)?;
        if let Some(obj) = fields.as_object_mut() {
            obj.remove("id");
        }
        let cmd = self.study_command(fields)?;
        post_command(api, &uri(&[SPECIMEN_DESCRIPTIONS, id]), cmd).await
    }

    pub async fn update_specimen_description<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        specimen_description: &SpecimenDescription,
    ) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let sd_id = specimen_description
            .id
            .as_deref()
            .filter(|sd_id| self.specimen_description_by_id(sd_id).is_some())
            .ok_or_else(|| DomainError::NotFound("specimen description does not exist".to_string()))?;
        let cmd = self.study_command(to_command(specimen_description)?)?;
        put_command(api, &uri(&[SPECIMEN_DESCRIPTIONS, id, sd_id]), cmd).await
    }

    pub async fn remove_specimen_description<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        specimen_description: &SpecimenDescription,
    ) -> Result<Self> {
        let sd_id = specimen_description
            .id
            .as_deref()
            .filter(|sd_id| self.specimen_description_by_id(sd_id).is_some())
            .ok_or_else(|| DomainError::NotFound("specimen description does not exist".to_string()))?;
        let id = self.entity.persisted_id()?;
        let path = study_uri(
            SPECIMEN_DESCRIPTIONS,
            &self.study_id,
            &[id, &version_segment(&self.entity), sd_id],
        )?;
        delete_command(api, &path).await
    }

    pub async fn add_annotation_type<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        annotation_type: &AnnotationType,
    ) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let mut fields = to_command(annotation_type)?;
        if let Some(obj) = fields.as_object_mut() {
            obj.remove("id");
        }
        let cmd = self.study_command(fields)?;
        post_command(api, &uri(&[ANNOTATION_TYPES, id]), cmd).await
    }

    pub async fn update_annotation_type<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        annotation_type: &AnnotationType,
    ) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let at_id = self.owned_annotation_type_id(annotation_type)?;
        let cmd = self.study_command(to_command(annotation_type)?)?;
        put_command(api, &uri(&[ANNOTATION_TYPES, id, at_id]), cmd).await
    }

    pub async fn remove_annotation_type<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        annotation_type: &AnnotationType,
    ) -> Result<Self> {
        let at_id = self.owned_annotation_type_id(annotation_type)?;
        let id = self.entity.persisted_id()?;
        let path = study_uri(
            ANNOTATION_TYPES,
            &self.study_id,
            &[id, &version_segment(&self.entity), at_id],
        )?;
        delete_command(api, &path).await
    }

    fn owned_annotation_type_id<'a>(&self, annotation_type: &'a AnnotationType) -> Result<&'a str> {
        annotation_type
            .id
            .as_deref()
            .filter(|at_id| self.annotation_type_by_id(at_id).is_some())
            .ok_or_else(|| DomainError::NotFound("annotation type does not exist".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Factory;
    use crate::store::mock::{Method, MockApi};

    #[test]
    fn test_annotation_type_lookup() {
        let mut factory = Factory::new();
        let at = factory.annotation_type(json!({}));
        let at_id = at["id"].as_str().unwrap().to_string();
        let cet = CollectionEventType::create(&factory.collection_event_type_with(
            "study-1",
            json!({ "annotationTypes": [at] }),
        ))
        .unwrap();

        assert!(cet.has_annotation_types());
        assert!(cet.annotation_type_by_id(&at_id).is_some());
        assert!(cet.annotation_type_by_id("other").is_none());
    }

    #[test]
    fn test_nested_specimen_description_is_validated() {
        let mut factory = Factory::new();
        let raw = factory.collection_event_type_with("study-1", json!({ "specimenDescriptions": [{ "name": "x" }] }));
        let err = CollectionEventType::create(&raw).unwrap_err();
        assert!(err.message().starts_with("invalid object from server: specimenDescriptions[0]"));
        assert!(err.message().contains("Missing required property"));
    }

    #[tokio::test]
    async fn test_update_recurring_carries_study_id() {
        let mut factory = Factory::new();
        let raw = factory.collection_event_type("study-1");
        let cet = CollectionEventType::create(&raw).unwrap();
        let id = cet.id().cloned().unwrap();

        let api = MockApi::new();
        api.expect(Method::Put, &format!("/studies/cetypes/recurring/{}", id))
            .with_body(json!({ "studyId": "study-1", "recurring": true, "expectedVersion": 0 }))
            .respond(factory.merge(&raw, json!({ "recurring": true, "version": 1 })));

        let updated = cet.update_recurring(&api, true).await.unwrap();
        assert!(updated.recurring);
        assert_eq!(updated.version(), 1);
        api.verify_no_outstanding_expectation();
    }

    #[tokio::test]
    async fn test_remove_specimen_description_path() {
        let mut factory = Factory::new();
        let sd = factory.specimen_description();
        let raw = factory.collection_event_type_with("study-1", json!({ "specimenDescriptions": [sd], "version": 2 }));
        let cet = CollectionEventType::create(&raw).unwrap();
        let id = cet.id().cloned().unwrap();
        let sd = cet.specimen_descriptions[0].clone();
        let sd_id = sd.id.clone().unwrap();

        let api = MockApi::new();
        api.expect(
            Method::Delete,
            &format!("/studies/cetypes/spcdesc/study-1/{}/2/{}", id, sd_id),
        )
        .respond(factory.merge(&raw, json!({ "specimenDescriptions": [], "version": 3 })));

        let updated = cet.remove_specimen_description(&api, &sd).await.unwrap();
        assert!(updated.specimen_descriptions.is_empty());
        assert_eq!(cet.specimen_descriptions.len(), 1);
        api.verify_no_outstanding_expectation();
    }

    #[tokio::test]
    async fn test_missing_study_id_fails_before_request() {
        let api = MockApi::new();
        let draft = CollectionEventType::new("", "visit");

        let err = draft.add_or_update(&api).await.unwrap_err();
        assert_eq!(err, DomainError::InvalidArgument("study id not specified".to_string()));

        let err = CollectionEventType::list(&api, "").await.unwrap_err();
        assert_eq!(err, DomainError::InvalidArgument("study id not specified".to_string()));
        assert_eq!(api.request_count(), 0);
    }
}
