use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::model::{
    fetch_all, parse, CentreState, EntityStatus, FieldKind, FieldSpec, Id, ListOptions, Schema, StudyState,
};
use crate::store::traits::BiobankApi;

pub const ENTITY_NAME_SCHEMA: Schema = Schema {
    name: "EntityName",
    fields: &[
        FieldSpec::required("id", FieldKind::Id),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("state", FieldKind::String),
    ],
};

/// Id, name and state of an entity, as returned by the `names` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityName<S> {
    pub id: Id,
    pub name: String,
    pub state: S,
}

pub type CentreName = EntityName<CentreState>;
pub type StudyName = EntityName<StudyState>;

impl<S: DeserializeOwned + EntityStatus> EntityName<S> {
    pub fn create(raw: &Value) -> Result<Self> {
        parse(&ENTITY_NAME_SCHEMA, raw)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    pub fn is_disabled(&self) -> bool {
        self.state.is_disabled()
    }
}

impl EntityName<CentreState> {
    pub const REST_API_URL: &'static str = "/centres/names";

    pub async fn list<A: BiobankApi + ?Sized>(api: &A, options: &ListOptions) -> Result<Vec<Self>> {
        fetch_all(api, Self::REST_API_URL, &options.to_query(), Self::create).await
    }
}

impl EntityName<StudyState> {
    pub const REST_API_URL: &'static str = "/studies/names";

    pub async fn list<A: BiobankApi + ?Sized>(api: &A, options: &ListOptions) -> Result<Vec<Self>> {
        fetch_all(api, Self::REST_API_URL, &options.to_query(), Self::create).await
    }

    pub fn is_retired(&self) -> bool {
        self.state.is_retired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{Method, MockApi};
    use serde_json::json;

    #[test]
    fn test_state_predicates() {
        let name = CentreName::create(&json!({"id": "c1", "name": "CBSR", "state": "enabled"})).unwrap();
        assert!(name.is_enabled());
        assert!(!name.is_disabled());
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let err = StudyName::create(&json!({"id": "s1", "name": "BBPSP", "state": "paused"})).unwrap_err();
        assert!(err.message().starts_with("invalid object from server"));
    }

    #[tokio::test]
    async fn test_list_centre_names() {
        let api = MockApi::new();
        api.expect(Method::Get, "/centres/names")
            .with_query(vec![("filter".to_string(), "name:like:C".to_string())])
            .respond(json!([
                {"id": "c1", "name": "CBSR", "state": "enabled"},
                {"id": "c2", "name": "Calgary", "state": "disabled"}
            ]));

        let names = CentreName::list(&api, &ListOptions::new().with_filter("name:like:C"))
            .await
            .unwrap();
        assert_eq!(names.len(), 2);
        assert!(names[1].is_disabled());
        api.verify_no_outstanding_expectation();
    }
}
