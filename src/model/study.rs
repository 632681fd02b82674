use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{DomainError, Result};
use crate::model::{
    change_state, delete_command, fetch, list_paged, post_command, put_command, to_command, update_field, uri,
    version_segment, AnnotationType, ConcurrencySafeEntity, DomainEntity, FieldKind, FieldSpec, ListOptions,
    PagedResult, Schema, StateAction, StudyState, ANNOTATION_TYPE_SCHEMA,
};
use crate::store::traits::BiobankApi;

const COLLECTION: &str = "studies";
const ANNOTATION_TYPES: &str = "studies/pannottypes";

const ANNOTATION_TYPE_OBJECT: FieldKind = FieldKind::Object(&ANNOTATION_TYPE_SCHEMA);

pub const STUDY_SCHEMA: Schema = Schema {
    name: "Study",
    fields: &[
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("version", FieldKind::Integer),
        FieldSpec::required("timeAdded", FieldKind::String),
        FieldSpec::optional("timeModified", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("description", FieldKind::String),
        FieldSpec::required("state", FieldKind::String),
        FieldSpec::optional("annotationTypes", FieldKind::Array(&ANNOTATION_TYPE_OBJECT)),
    ],
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    #[serde(flatten)]
    pub entity: ConcurrencySafeEntity,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub state: StudyState,

    /// Participant annotation types
    #[serde(default)]
    pub annotation_types: Vec<AnnotationType>,
}

impl DomainEntity for Study {
    const SCHEMA: &'static Schema = &STUDY_SCHEMA;

    fn entity(&self) -> &ConcurrencySafeEntity {
        &self.entity
    }
}

impl Study {
    pub const REST_API_URL: &'static str = "/studies";

    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == StudyState::Enabled
    }

    pub fn is_disabled(&self) -> bool {
        self.state == StudyState::Disabled
    }

    pub fn is_retired(&self) -> bool {
        self.state == StudyState::Retired
    }

    pub fn annotation_type_by_id(&self, annotation_type_id: &str) -> Option<&AnnotationType> {
        self.annotation_types
            .iter()
            .find(|at| at.id.as_deref() == Some(annotation_type_id))
    }

    pub async fn get<A: BiobankApi + ?Sized>(api: &A, id: &str) -> Result<Self> {
        fetch(api, &uri(&[COLLECTION, id]), &[]).await
    }

    pub async fn list<A: BiobankApi + ?Sized>(api: &A, options: &ListOptions) -> Result<PagedResult<Self>> {
        list_paged(api, Self::REST_API_URL, options, COLLECTION, Self::create).await
    }

    fn add_command(&self) -> Value {
        let mut cmd = json!({ "name": self.name });
        if let Some(description) = &self.description {
            cmd["description"] = json!(description);
        }
        cmd
    }

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

    pub async fn update_description<A: BiobankApi + ?Sized>(&self, api: &A, description: Option<&str>) -> Result<Self> {
        let fields = match description {
            Some(description) => json!({ "description": description }),
            None => json!({}),
        };
        update_field(api, self, COLLECTION, "description", fields).await
    }

    /// A retired study has to be unretired before it can be enabled.
    pub async fn enable<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.is_enabled() {
            return Err(DomainError::InvalidState("already enabled".to_string()));
        }
        if self.is_retired() {
            return Err(DomainError::InvalidState("study is retired".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Enable.as_str()).await
    }

    pub async fn disable<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.is_disabled() {
            return Err(DomainError::InvalidState("already disabled".to_string()));
        }
        if self.is_retired() {
            return Err(DomainError::InvalidState("study is retired".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Disable.as_str()).await
    }

    /// Only disabled studies can be retired.
    pub async fn retire<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if self.is_retired() {
            return Err(DomainError::InvalidState("already retired".to_string()));
        }
        if self.is_enabled() {
            return Err(DomainError::InvalidState("study is enabled".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Retire.as_str()).await
    }

    pub async fn unretire<A: BiobankApi + ?Sized>(&self, api: &A) -> Result<Self> {
        if !self.is_retired() {
            return Err(DomainError::InvalidState("not retired".to_string()));
        }
        change_state(api, self, COLLECTION, StateAction::Unretire.as_str()).await
    }

    pub async fn change_state<A: BiobankApi + ?Sized>(&self, api: &A, name: &str) -> Result<Self> {
        match StateAction::parse(name)? {
            StateAction::Enable => self.enable(api).await,
            StateAction::Disable => self.disable(api).await,
            StateAction::Retire => self.retire(api).await,
            StateAction::Unretire => self.unretire(api).await,
        }
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
        let cmd = self.entity.update_command(fields)?;
        post_command(api, &uri(&[ANNOTATION_TYPES, id]), cmd).await
    }

    pub async fn update_annotation_type<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        annotation_type: &AnnotationType,
    ) -> Result<Self> {
        let id = self.entity.persisted_id()?;
        let annotation_type_id = self.owned_annotation_type_id(annotation_type)?;
        let cmd = self.entity.update_command(to_command(annotation_type)?)?;
        put_command(api, &uri(&[ANNOTATION_TYPES, id, annotation_type_id]), cmd).await
    }

    pub async fn remove_annotation_type<A: BiobankApi + ?Sized>(
        &self,
        api: &A,
        annotation_type: &AnnotationType,
    ) -> Result<Self> {
        let annotation_type_id = self.owned_annotation_type_id(annotation_type)?;
        let id = self.entity.persisted_id()?;
        let path = uri(&[ANNOTATION_TYPES, id, &version_segment(&self.entity), annotation_type_id]);
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
    use crate::model::AnnotationValueType;
    use crate::seed::Factory;
    use crate::store::mock::{Method, MockApi};

    fn study_in(factory: &mut Factory, state: &str) -> Study {
        Study::create(&factory.study_with(json!({ "state": state }))).unwrap()
    }

    #[test]
    fn test_state_predicates() {
        let mut factory = Factory::new();
        let retired = study_in(&mut factory, "retired");
        assert!(retired.is_retired());
        assert!(!retired.is_enabled());
        assert!(!retired.is_disabled());
    }

    #[tokio::test]
    async fn test_state_preconditions_fail_without_request() {
        let mut factory = Factory::new();
        let api = MockApi::new();

        let enabled = study_in(&mut factory, "enabled");
        assert_eq!(enabled.enable(&api).await.unwrap_err().message(), "already enabled");
        assert_eq!(enabled.retire(&api).await.unwrap_err().message(), "study is enabled");
        assert_eq!(enabled.unretire(&api).await.unwrap_err().message(), "not retired");

        let retired = study_in(&mut factory, "retired");
        assert_eq!(retired.retire(&api).await.unwrap_err().message(), "already retired");
        assert_eq!(retired.enable(&api).await.unwrap_err().message(), "study is retired");

        let disabled = study_in(&mut factory, "disabled");
        assert_eq!(disabled.disable(&api).await.unwrap_err().message(), "already disabled");

        assert_eq!(api.request_count(), 0);
    }

    #[tokio::test]
    async fn test_retire_disabled_study() {
        let mut factory = Factory::new();
        let api = MockApi::new();
        let study = study_in(&mut factory, "disabled");
        let id = study.id().cloned().unwrap();

        let reply = factory.merge(
            &serde_json::to_value(&study).unwrap(),
            json!({ "state": "retired", "version": study.version() + 1 }),
        );
        api.expect(Method::Post, &format!("/studies/retire/{}", id))
            .with_body(json!({ "expectedVersion": study.version() }))
            .respond(reply);

        let retired = study.change_state(&api, "retire").await.unwrap();
        assert!(retired.is_retired());
        assert_eq!(retired.version(), study.version() + 1);
        assert!(study.is_disabled());
        api.verify_no_outstanding_expectation();
    }

    #[tokio::test]
    async fn test_remove_unknown_annotation_type() {
        let mut factory = Factory::new();
        let api = MockApi::new();
        let study = study_in(&mut factory, "disabled");
        let mut annotation_type = AnnotationType::new("Colour", AnnotationValueType::Text);
        annotation_type.id = Some("not-there".to_string());

        let err = study.remove_annotation_type(&api, &annotation_type).await.unwrap_err();
        assert_eq!(err, DomainError::NotFound("annotation type does not exist".to_string()));
        assert_eq!(api.request_count(), 0);
    }
}
