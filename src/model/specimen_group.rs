use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    fetch, fetch_all, post_command, put_command, uri, version_segment, ConcurrencySafeEntity, DomainEntity,
    FieldKind, FieldSpec, Id, Schema,
};
use crate::store::traits::BiobankApi;

pub const SPECIMEN_GROUP_SCHEMA: Schema = Schema {
    name: "SpecimenGroup",
    fields: &[
        FieldSpec::required("studyId", FieldKind::Id),
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("units", FieldKind::String),
        FieldSpec::required("anatomicalSourceType", FieldKind::String),
        FieldSpec::required("preservationType", FieldKind::String),
        FieldSpec::required("preservationTemperature", FieldKind::String),
        FieldSpec::required("specimenType", FieldKind::String),
    ],
};

/// Units label used when no specimen group is selected.
pub const DEFAULT_UNITS: &str = "Amount";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenGroup {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    #[serde(default)]
    pub study_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub units: String,
    pub anatomical_source_type: String,
    pub preservation_type: String,
    pub preservation_temperature: String,
    pub specimen_type: String,
}

impl DomainEntity for SpecimenGroup {
    const SCHEMA: &'static Schema = &SPECIMEN_GROUP_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

/// `/studies/<studyId>/sgroups[/<rest>...]`
fn collection_uri(study_id: Option<&str>, rest: &[&str]) -> Result<String> {
    let study_id = study_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DomainError::InvalidArgument("study id not specified".to_string()))?;
    let mut parts = vec!["studies", study_id, "sgroups"];
    parts.extend_from_slice(rest);
    Ok(uri(&parts))
}

impl SpecimenGroup {
    pub fn new(study_id: impl Into<Id>) -> Self {
        Self {
            study_id: Some(study_id.into()),
            ..Default::default()
        }
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, study_id: &str, id: &str) -> Result<Self> {
        let path = collection_uri(Some(study_id), &[])?;
        fetch(api, &path, &[("sgId".to_string(), id.to_string())]).await
    }

    pub async fn list<A: BiobankApi + ?Sized>(api: &A, study_id: &str) -> Result<Vec<Self>> {
        let path = collection_uri(Some(study_id), &[])?;
        fetch_all(api, &path, &[], Self::create).await
    }

    fn add_command(&self) -> Value {
        let mut cmd = json!({
            "studyId": self.study_id,
            "name": self.name,
            "units": self.units,
            "anatomicalSourceType": self.anatomical_source_type,
            "preservationType": self.preservation_type,
            "preservationTemperature": self.preservation_temperature,
            "specimenType": self.specimen_type,
        });
        if let Some(description) = &self.description {
            cmd["description"] = json!(description);
        }
        cmd
    }

    pub async fn add_or_update<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        let study_id = self.study_id.as_deref();
        match &self.entity.id {
            None => post_command(api, &collection_uri(study_id, &[])?, self.add_command()).await,
            Some(id) => {
                let mut fields = self.add_command();
                fields["id"] = json!(id);
                let cmd = self.entity.update_command(fields)?;
                put_command(api, &collection_uri(study_id, &[id])?, cmd).await
            }
        }
    }

    pub async fn remove<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<()> {
        let id = self.entity.persisted_id()?;
        let path = collection_uri(self.study_id.as_deref(), &[id, &version_segment(&self.entity)])?;
        api.delete(&path).await?;
        Ok(())
    }

    /// Units of the group with `id` among `groups`.
    pub fn get_units<'a>(groups: &'a [SpecimenGroup], id: Option<&str>) -> Result<&'a str> {
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => return Ok(DEFAULT_UNITS),
        };
        groups
            .iter()
            .find(|sg| sg.entity.id.as_deref() == Some(id))
            .map(|sg| sg.units.as_str())
            .ok_or_else(|| DomainError::NotFound(format!("specimen group ID not found: {}", id)))
    }
}
