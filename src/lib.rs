pub mod config;
pub mod error;
pub mod model;
pub mod seed;
pub mod store;

pub use error::{DomainError, Result};

// Export all model types
pub use model::*;

// Export fixtures
pub use seed::*;

// Export transports
pub use store::{BiobankApi, HttpApi, MockApi};

/// Build an HTTP client from `.env`, the config file and the environment.
pub fn client_from_env() -> anyhow::Result<HttpApi> {
    dotenvy::dotenv().ok();

    let config = crate::config::AppConfig::load()?;
    let api = HttpApi::from_config(&config.effective_api())?;
    log::info!("using biobank server at {}", api.base_url());

    Ok(api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Every required field of `create(raw)` carries the value given in `raw`.
    fn round_trip<T: DomainEntity + serde::Serialize + PartialEq + std::fmt::Debug>(raw: &Value) {
        let entity = T::create(raw).unwrap();
        let serialized = serde_json::to_value(&entity).unwrap();

        for key in T::SCHEMA.required_keys() {
            let (expected, actual) = (&raw[key], &serialized[key]);
            match (as_timestamp(expected), as_timestamp(actual)) {
                (Some(expected), Some(actual)) => assert_eq!(expected, actual, "{}", key),
                _ => assert_eq!(expected, actual, "{}", key),
            }
        }

        let again = T::create(&serialized).unwrap();
        assert_eq!(entity, again);
    }

    fn as_timestamp(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
        value.as_str()?.parse().ok()
    }

    /// Every required key is reported when it is missing.
    fn assert_required_keys<T: DomainEntity + std::fmt::Debug>(raw: &Value) {
        for key in T::SCHEMA.required_keys() {
            let mut partial = raw.clone();
            partial.as_object_mut().unwrap().remove(key);
            let err = T::create(&partial).unwrap_err();
            assert!(
                err.message().starts_with("invalid object from server: Missing required property"),
                "{}: {}",
                key,
                err
            );
            assert!(err.message().contains(key));
        }
    }

    #[test]
    fn test_entities_survive_a_round_trip() {
        let mut factory = Factory::new();

        let location = factory.location();
        let study = factory.study();
        let centre = factory.centre_with(json!({
            "locations": [location],
            "studyNames": [factory.name_dto(&study)]
        }));
        round_trip::<Centre>(&centre);

        let at = factory.annotation_type(json!({ "valueType": "select", "maxValueCount": 1, "options": ["a"] }));
        round_trip::<Study>(&factory.study_with(json!({ "annotationTypes": [at.clone()] })));
        round_trip::<SpecimenGroup>(&factory.specimen_group("s1"));

        let sd = factory.specimen_description();
        let cet = factory.collection_event_type_with("s1", json!({ "specimenDescriptions": [sd], "annotationTypes": [at] }));
        round_trip::<CollectionEventType>(&cet);

        let annotation = factory.annotation("at-1", json!({ "stringValue": "abc" }));
        round_trip::<Participant>(&factory.participant("s1", json!({ "annotations": [annotation.clone()] })));
        round_trip::<CollectionEvent>(&factory.collection_event("p1", "cet-1", json!({ "annotations": [annotation] })));
    }

    #[test]
    fn test_missing_required_keys_are_reported() {
        let mut factory = Factory::new();
        assert_required_keys::<Centre>(&factory.centre());
        assert_required_keys::<Study>(&factory.study());
        assert_required_keys::<SpecimenGroup>(&factory.specimen_group("s1"));
        assert_required_keys::<CollectionEventType>(&factory.collection_event_type("s1"));
        assert_required_keys::<Participant>(&factory.participant("s1", json!({})));
        assert_required_keys::<CollectionEvent>(&factory.collection_event("p1", "cet-1", json!({})));
    }

    #[test]
    fn test_create_fails_for_non_objects() {
        for raw in [json!(1), json!("centre"), json!(null), json!([])] {
            let err = Centre::create(&raw).unwrap_err();
            assert_eq!(err.message(), "invalid object from server: must be a map");
        }
    }

    #[test]
    fn test_study_names_must_be_objects() {
        let mut factory = Factory::new();
        let err = Centre::create(&factory.centre_with(json!({ "studyNames": ["abc"] }))).unwrap_err();
        assert!(err.message().contains("Invalid type at studyNames[0]: expected object"));

        let err = Centre::create(&factory.centre_with(json!({ "studyNames": [{ "id": null, "name": "x", "state": "enabled" }] })))
            .unwrap_err();
        assert!(err.message().contains("expected non-empty string, got null"));
    }
}
