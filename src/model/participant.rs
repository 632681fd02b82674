use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    delete_command, fetch, post_command, put_command, to_command, update_field, uri, version_segment, Annotation,
    ConcurrencySafeEntity, DomainEntity, FieldKind, FieldSpec, Id, Schema, ANNOTATION_SCHEMA,
};
use crate::store::traits::BiobankApi;

const COLLECTION: &str = "participants";
const ANNOTATIONS: &str = "participants/annot";

const ANNOTATION_OBJECT: FieldKind = FieldKind::Object(&ANNOTATION_SCHEMA);

pub const PARTICIPANT_SCHEMA: Schema = Schema {
    name: "Participant",
    fields: &[
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("studyId", FieldKind::Id),
        FieldSpec::required("uniqueId", FieldKind::String),
        FieldSpec::optional("annotations", FieldKind::Array(&ANNOTATION_OBJECT)),
    ],
};

/// A person enrolled in a study
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    pub study_id: Id,
    pub unique_id: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl DomainEntity for Participant {
    const SCHEMA: &'static Schema = &PARTICIPANT_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

impl Participant {
    pub fn new(study_id: impl Into<Id>, unique_id: impl Into<String>) -> Self {
        Self {
            study_id: study_id.into(),
            unique_id: unique_id.into(),
            ..Default::default()
        }
    }

    pub fn annotation_by_type_id(&self, annotation_type_id: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.annotation_type_id == annotation_type_id)
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, study_id: &str, id: &str) -> Result<Self> {
        fetch(api, &uri(&[COLLECTION, study_id, id]), &[]).await
    }

    pub async fn get_by_unique_id<A: BiobankApi + ?Sized>(api: &A, study_id: &str, unique_id: &str) -> Result<Self> {
        fetch(api, &uri(&[COLLECTION, "uniqueId", study_id, unique_id]), &[]).await
    }

    fn add_command(&self) -> Result<Value> {
        Ok(json!({
            "studyId": self.study_id,
            "uniqueId": self.unique_id,
            "annotations": to_command(&self.annotations)?,
        }))
    }

    pub async fn add_or_update<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.study_id.is_empty() {
            return Err(DomainError::InvalidArgument("study id not specified".to_string()));
        }
        match &self.entity.id {
            None => post_command(api, &uri(&[COLLECTION, &self.study_id]), self.add_command()?).await,
            Some(id) => {
                let mut fields = self.add_command()?;
                fields["id"] = json!(id);
                let cmd = self.entity.update_command(fields)?;
                put_command(api, &uri(&[COLLECTION, &self.study_id, id]), cmd).await
            }
        }
    }

    pub async fn remove<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<()> {
        let id = self.entity.persisted_id()?;
        if self.study_id.is_empty() {
            return Err(DomainError::InvalidArgument("study id not specified".to_string()));
        }
        api.delete(&uri(&[COLLECTION, &self.study_id, id, &version_segment(&self.entity)]))
            .await?;
        Ok(())
    }

    pub async fn update_unique_id<A: BiobankApi + ?Sized>(&self, api: &A, unique_id: &str) -> Result<Self> {
        update_field(api, self, COLLECTION, "uniqueId", json!({ "uniqueId": unique_id })).await
    }

    /// Adds the annotation, or replaces the one already recorded for its type.
    pub async fn add_annotation<A: BiobankApi + ?Sized>(&self, api: &A, annotation: &Annotation) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let cmd = self.entity.update_command(to_command(annotation)?)?;
        post_command(api, &uri(&[ANNOTATIONS, id]), cmd).await
    }

    pub async fn remove_annotation<A: BiobankApi + ?Sized>(&self, api: &A, annotation_type_id: &str) -> Result<Self> {
        if self.annotation_by_type_id(annotation_type_id).is_none() {
            return Err(DomainError::NotFound("annotation does not exist".to_string()));
        }
        let id = self.entity.persisted_id()?;
        let path = uri(&[ANNOTATIONS, id, &version_segment(&self.entity), annotation_type_id]);
        delete_command(api, &path).await
    }
}
