use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::model::{generate_id, merge_fields};

/// Builds raw server-shaped JSON for every entity.
///
/// Names are sequential per factory (`centre_0`, `centre_1`, ...) so tests can
/// tell fixtures apart; ids are fresh UUIDs.
#[derive(Debug, Default)]
pub struct Factory {
    counter: u64,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Identity fields of a freshly persisted entity
fn persisted() -> Value {
    json!({
        "id": generate_id(),
        "version": 0,
        "timeAdded": now(),
        "timeModified": null
    })
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string_next(&mut self, prefix: &str) -> String {
        let value = format!("{}_{}", prefix, self.counter);
        self.counter += 1;
        value
    }

    /// `base` with the keys of `overrides` replaced.
    pub fn merge(&self, base: &Value, overrides: Value) -> Value {
        merge_fields(base.clone(), overrides)
    }

    /// `base` without `keys`, e.g. a draft without its `id`.
    pub fn omit(&self, base: &Value, keys: &[&str]) -> Value {
        let mut value = base.clone();
        if let Some(obj) = value.as_object_mut() {
            for key in keys {
                obj.remove(*key);
            }
        }
        value
    }

    pub fn location(&mut self) -> Value {
        json!({
            "id": generate_id(),
            "name": self.string_next("location"),
            "street": self.string_next("street"),
            "city": self.string_next("city"),
            "province": self.string_next("province"),
            "postalCode": self.string_next("postal"),
            "poBoxNumber": null,
            "countryIsoCode": "CA"
        })
    }

    pub fn centre(&mut self) -> Value {
        self.centre_with(json!({}))
    }

    pub fn centre_with(&mut self, overrides: Value) -> Value {
        let base = merge_fields(
            persisted(),
            json!({
                "name": self.string_next("centre"),
                "description": self.string_next("description"),
                "state": "disabled",
                "locations": [],
                "studyNames": []
            }),
        );
        merge_fields(base, overrides)
    }

    pub fn study(&mut self) -> Value {
        self.study_with(json!({}))
    }

    pub fn study_with(&mut self, overrides: Value) -> Value {
        let base = merge_fields(
            persisted(),
            json!({
                "name": self.string_next("study"),
                "description": self.string_next("description"),
                "state": "disabled",
                "annotationTypes": []
            }),
        );
        merge_fields(base, overrides)
    }

    /// The `{id, name, state}` form of a raw study or centre.
    pub fn name_dto(&self, raw: &Value) -> Value {
        json!({
            "id": raw["id"],
            "name": raw["name"],
            "state": raw["state"]
        })
    }

    pub fn entity_info(&mut self) -> Value {
        json!({
            "id": generate_id(),
            "name": self.string_next("entity")
        })
    }

    pub fn annotation_type(&mut self, overrides: Value) -> Value {
        let base = json!({
            "id": generate_id(),
            "name": self.string_next("annotation_type"),
            "description": null,
            "valueType": "text",
            "options": [],
            "required": false
        });
        merge_fields(base, overrides)
    }

    pub fn annotation(&mut self, annotation_type_id: &str, overrides: Value) -> Value {
        let base = json!({
            "annotationTypeId": annotation_type_id,
            "selectedValues": []
        });
        merge_fields(base, overrides)
    }

    pub fn specimen_description(&mut self) -> Value {
        json!({
            "id": generate_id(),
            "name": self.string_next("specimen_description"),
            "description": null,
            "units": "mL",
            "anatomicalSourceType": "Blood",
            "preservationType": "Fresh Specimen",
            "preservationTemperature": "4 C",
            "specimenType": "Buffy coat",
            "maxCount": 1,
            "amount": 0.5
        })
    }

    pub fn specimen_group(&mut self, study_id: &str) -> Value {
        merge_fields(
            persisted(),
            json!({
                "studyId": study_id,
                "name": self.string_next("specimen_group"),
                "description": null,
                "units": "mL",
                "anatomicalSourceType": "Blood",
                "preservationType": "Frozen Specimen",
                "preservationTemperature": "-80 C",
                "specimenType": "Plasma"
            }),
        )
    }

    pub fn collection_event_type(&mut self, study_id: &str) -> Value {
        self.collection_event_type_with(study_id, json!({}))
    }

    pub fn collection_event_type_with(&mut self, study_id: &str, overrides: Value) -> Value {
        let base = merge_fields(
            persisted(),
            json!({
                "studyId": study_id,
                "name": self.string_next("collection_event_type"),
                "description": null,
                "recurring": false,
                "specimenDescriptions": [],
                "annotationTypes": []
            }),
        );
        merge_fields(base, overrides)
    }

    pub fn participant(&mut self, study_id: &str, overrides: Value) -> Value {
        let base = merge_fields(
            persisted(),
            json!({
                "studyId": study_id,
                "uniqueId": self.string_next("participant"),
                "annotations": []
            }),
        );
        merge_fields(base, overrides)
    }

    pub fn collection_event(&mut self, participant_id: &str, collection_event_type_id: &str, overrides: Value) -> Value {
        self.counter += 1;
        let base = merge_fields(
            persisted(),
            json!({
                "participantId": participant_id,
                "collectionEventTypeId": collection_event_type_id,
                "timeCompleted": now(),
                "visitNumber": self.counter,
                "annotations": []
            }),
        );
        merge_fields(base, overrides)
    }

    /// A paged reply holding `items`, as the list endpoints return it.
    pub fn paged_result(&self, items: Vec<Value>, page: u32, limit: u32, total: u64) -> Value {
        let max_pages = if limit == 0 {
            0
        } else {
            (total + u64::from(limit) - 1) / u64::from(limit)
        };
        json!({
            "items": items,
            "page": page,
            "limit": limit,
            "total": total,
            "maxPages": max_pages
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Centre, CollectionEventType, DomainEntity, Participant, SpecimenGroup, Study};

    #[test]
    fn test_fixtures_pass_schema_validation() {
        let mut factory = Factory::new();
        assert!(Centre::create(&factory.centre()).is_ok());
        assert!(Study::create(&factory.study()).is_ok());
        assert!(SpecimenGroup::create(&factory.specimen_group("s1")).is_ok());
        assert!(CollectionEventType::create(&factory.collection_event_type("s1")).is_ok());
        assert!(Participant::create(&factory.participant("s1", json!({}))).is_ok());
    }

    #[test]
    fn test_names_are_sequential() {
        let mut factory = Factory::new();
        assert_eq!(factory.string_next("x"), "x_0");
        assert_eq!(factory.string_next("x"), "x_1");
    }

    #[test]
    fn test_omit_and_merge() {
        let factory = Factory::new();
        let raw = json!({"id": "a", "name": "b"});
        assert_eq!(factory.omit(&raw, &["id"]), json!({"name": "b"}));
        assert_eq!(factory.merge(&raw, json!({"name": "c"})), json!({"id": "a", "name": "c"}));
    }
}
