use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    change_state, delete_command, fetch, list_paged, post_command, put_command, to_command, update_field, uri,
    version_segment, ConcurrencySafeEntity, DomainEntity, FieldKind, FieldSpec, Id, ListOptions, Location,
    PagedResult, Schema, StateAction, StudyName, ENTITY_NAME_SCHEMA, LOCATION_SCHEMA,
};
use crate::model::state::{invalid_state, CentreState};
use crate::store::traits::BiobankApi;

const COLLECTION: &str = "centres";

const LOCATION_OBJECT: FieldKind = FieldKind::Object(&LOCATION_SCHEMA);
const STUDY_NAME_OBJECT: FieldKind = FieldKind::Object(&ENTITY_NAME_SCHEMA);

pub const CENTRE_SCHEMA: Schema = Schema {
    name: "Centre",
    fields: &[
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("state", FieldKind::String),
        FieldSpec::optional("locations", FieldKind::Array(&LOCATION_OBJECT)),
        FieldSpec::optional("studyNames", FieldKind::Array(&STUDY_NAME_OBJECT)),
    ],
};

/// A site where specimens are collected, processed or stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Centre {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub state: CentreState,

    #[serde(default)]
    pub locations: Vec<Location>,

    /// Studies this centre participates in, referenced by id
    #[serde(default)]
    pub study_names: Vec<StudyName>,
}

impl DomainEntity for Centre {
    const SCHEMA: &'static Schema = &CENTRE_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

impl Centre {
    pub const REST_API_URL: &'static str = "/centres";

    /// A draft centre that has not been sent to the server yet.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == CentreState::Enabled
    }

    pub fn is_disabled(&self) -> bool {
        self.state == CentreState::Disabled
    }

    pub fn location_by_id(&self, location_id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id.as_deref() == Some(location_id))
    }

    pub fn has_study(&self, study_id: &str) -> bool {
        self.study_names.iter().any(|s| s.id == study_id)
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, id: &str) -> Result<Self> {
        fetch(api, &uri(&[COLLECTION, id]), &[]).await
    }

    /// One page of centres, filtered and sorted server-side.
    pub async fn list<A: BiobankApi + ?Sized>(api: &A, options: &ListOptions) -> Result<PagedResult<Self>> {
        list_paged(api, Self::REST_API_URL, options, COLLECTION, Self::create).await
    }

    /// Creatable fields only; never `id` or `version`.
    fn add_command(&self) -> Value {
        let mut cmd = json!({ "name": self.name });
        if let Some(description) = &self.description {
            cmd["description"] = json!(description);
        }
        cmd
    }

    /// POST a new centre, or PUT an existing one with its expected version.
    pub async fn add_or_update<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        match &self.entity.id {
            None => post_command(api, Self::REST_API_URL, self.add_command()).await,
            Some(id) => {
                let mut fields = self.add_command();
                fields["id"] = json!(id);
                let cmd = self.entity.update_command(fields)?;
                put_command(api, &uri(&[COLLECTION, id]), cmd).await
            }
        }
    }

    pub async fn remove<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<()> {
        let id = self.entity.persisted_id()?;
        api.delete(&uri(&[COLLECTION, id, &version_segment(&self.entity)])).await?;
        Ok(())
    }

    pub async fn update_name<A: BiobankApi + ?Sized>(&self, api: &A, name: &str) -> Result<Self> {
        update_field(api, self, COLLECTION, "name", json!({ "name": name })).await
    }

    /// `None` clears the description; the field is then left out of the command.
    pub async fn update_description<A: BiobankApi + ?Sized>(&self, api: &A, description: Option<&str>) -> Result<Self> {
        let fields = match description {
            Some(description) => json!({ "description": description }),
            None => json!({}),
        };
        update_field(api, self, COLLECTION, "description", fields).await
    }

    pub async fn enable<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.is_enabled() {
            return Err(DomainError::InvalidState("already enabled".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Enable.as_str()).await
    }

    pub async fn disable<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.is_disabled() {
            return Err(DomainError::InvalidState("already disabled".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Disable.as_str()).await
    }

    /// Dispatch a state change by name. Centres can only be enabled or disabled.
    pub async fn change_state<A: BiobankApi + ?Sized>(&self, api: &A, name: &str) -> Result<Self> {
        match StateAction::parse(name)? {
            StateAction::Enable => self.enable(api).await,
            StateAction::Disable => self.disable(api).await,
            StateAction::Retire | StateAction::Unretire => Err(invalid_state(name)),
        }
    }

    pub async fn add_location<A: BiobankApi + ?Sized>(&self, api: &A, location: &Location) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let mut fields = to_command(location)?;
        if let Some(obj) = fields.as_object_mut() {
            obj.remove("id");
        }
        let cmd = self.entity.update_command(fields)?;
        post_command(api, &uri(&[COLLECTION, "locations", id]), cmd).await
    }

    pub async fn update_location<A: BiobankApi + ?Sized>(&self, api: &A, location: &Location) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let location_id = location
            .id
            .as_deref()
            .filter(|location_id| self.location_by_id(location_id).is_some())
            .ok_or_else(|| DomainError::NotFound("location does not exist".to_string()))?;
        let cmd = self.entity.update_command(to_command(location)?)?;
        put_command(api, &uri(&[COLLECTION, "locations", id, location_id]), cmd).await
    }

    /// Fails without contacting the server when the location is not one of this centre's.
    pub async fn remove_location<A: BiobankApi + ?Sized>(&self, api: &A, location: &Location) -> Result<Self> {
        let location_id = location
            .id
            .as_deref()
            .filter(|location_id| self.location_by_id(location_id).is_some())
            .ok_or_else(|| DomainError::NotFound("location does not exist".to_string()))?;
        let id = self.entity.persisted_id()?;
        let path = uri(&[COLLECTION, "locations", id, &version_segment(&self.entity), location_id]);
        delete_command(api, &path).await
    }

    pub async fn add_study<A: BiobankApi + ?Sized>(&self, api: &A, study_id: &Id) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let cmd = self.entity.update_command(json!({ "studyId": study_id }))?;
        post_command(api, &uri(&[COLLECTION, "studies", id]), cmd).await
    }

    /// Fails without contacting the server when the study is not linked to this centre.
    pub async fn remove_study<A: BiobankApi + ?Sized>(&self, api: &A, study_id: &Id) -> Result<Self> {
        if !self.has_study(study_id) {
            return Err(DomainError::NotFound(format!("study ID not present: {}", study_id)));
        }
        let id = self.entity.persisted_id()?;
        let path = uri(&[COLLECTION, "studies", id, &version_segment(&self.entity), study_id]);
        delete_command(api, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Factory;

    #[test]
    fn test_new_centre_has_default_values() {
        let centre = Centre::default();
        assert!(centre.is_new());
        assert_eq!(centre.version(), 0);
        assert!(centre.time_added().is_none());
        assert!(centre.time_modified().is_none());
        assert!(centre.name.is_empty());
        assert!(centre.description.is_none());
        assert!(centre.locations.is_empty());
        assert!(centre.study_names.is_empty());
        assert_eq!(centre.state, CentreState::Disabled);
    }

    #[test]
    fn test_state_predicates() {
        let mut factory = Factory::new();
        for state in ["disabled", "enabled"] {
            let centre = Centre::create(&factory.centre_with(json!({ "state": state }))).unwrap();
            assert_eq!(centre.is_disabled(), state == "disabled");
            assert_eq!(centre.is_enabled(), state == "enabled");
        }
    }

    #[test]
    fn test_add_command_omits_identity() {
        let centre = Centre::new("CBSR", Some("Canadian BioSample Repository".to_string()));
        assert_eq!(
            centre.add_command(),
            json!({"name": "CBSR", "description": "Canadian BioSample Repository"})
        );
    }
}
