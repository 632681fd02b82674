use biobank_client::store::{Method, MockApi};
use biobank_client::{
    AnnotationType, AnnotationValueType, DomainEntity, DomainError, Factory, ListOptions, Study, StudyName,
    StudyState,
};
use serde_json::{json, Value};

fn study_at_version(factory: &mut Factory, overrides: Value) -> (Value, Study) {
    let raw = factory.study_with(overrides);
    let study = Study::create(&raw).unwrap();
    (raw, study)
}

#[tokio::test]
async fn test_add_new_study() {
    let mut factory = Factory::new();
    let raw = factory.study();
    let draft = Study::new(raw["name"].as_str().unwrap(), None);

    let api = MockApi::new();
    api.expect(Method::Post, "/studies")
        .with_body(json!({ "name": raw["name"] }))
        .respond(raw.clone());

    let study = draft.add_or_update(&api).await.unwrap();
    assert!(!study.is_new());
    assert_eq!(study.state, StudyState::Disabled);
    api.verify_no_outstanding_expectation();
}

#[tokio::test]
async fn test_state_transitions() {
    let mut factory = Factory::new();
    let (raw, study) = study_at_version(&mut factory, json!({ "version": 1 }));
    let id = study.id().cloned().unwrap();

    let api = MockApi::new();
    api.expect(Method::Post, &format!("/studies/enable/{}", id))
        .with_body(json!({ "expectedVersion": 1 }))
        .respond(factory.merge(&raw, json!({ "state": "enabled", "version": 2 })));
    api.expect(Method::Post, &format!("/studies/disable/{}", id))
        .with_body(json!({ "expectedVersion": 2 }))
        .respond(factory.merge(&raw, json!({ "state": "disabled", "version": 3 })));
    api.expect(Method::Post, &format!("/studies/retire/{}", id))
        .with_body(json!({ "expectedVersion": 3 }))
        .respond(factory.merge(&raw, json!({ "state": "retired", "version": 4 })));
    api.expect(Method::Post, &format!("/studies/unretire/{}", id))
        .with_body(json!({ "expectedVersion": 4 }))
        .respond(factory.merge(&raw, json!({ "state": "disabled", "version": 5 })));

    let enabled = study.enable(&api).await.unwrap();
    assert!(enabled.is_enabled());
    let disabled = enabled.disable(&api).await.unwrap();
    assert!(disabled.is_disabled());
    let retired = disabled.change_state(&api, "retire").await.unwrap();
    assert!(retired.is_retired());
    let unretired = retired.change_state(&api, "unretire").await.unwrap();
    assert!(unretired.is_disabled());
    assert_eq!(unretired.version(), 5);

    assert_eq!(study.version(), 1);
    api.verify_no_outstanding_expectation();
}

#[tokio::test]
async fn test_unknown_state_name() {
    let mut factory = Factory::new();
    let (_, study) = study_at_version(&mut factory, json!({}));
    let api = MockApi::new();

    let err = study.change_state(&api, "archive").await.unwrap_err();
    assert_eq!(err, DomainError::InvalidArgument("invalid state: archive".to_string()));
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_annotation_types() {
    let mut factory = Factory::new();
    let existing = factory.annotation_type(json!({ "valueType": "number" }));
    let existing_id = existing["id"].as_str().unwrap().to_string();
    let (raw, study) = study_at_version(&mut factory, json!({ "annotationTypes": [existing.clone()], "version": 2 }));
    let id = study.id().cloned().unwrap();

    let mut colour = AnnotationType::new("Colour", AnnotationValueType::Select);
    colour.max_value_count = Some(1);
    colour.options = vec!["red".to_string(), "blue".to_string()];

    let mut updated_type = study.annotation_type_by_id(&existing_id).cloned().unwrap();
    updated_type.required = true;

    let api = MockApi::new();
    api.expect(Method::Post, &format!("/studies/pannottypes/{}", id))
        .with_body(json!({
            "name": "Colour",
            "description": null,
            "valueType": "select",
            "maxValueCount": 1,
            "options": ["red", "blue"],
            "required": false,
            "expectedVersion": 2
        }))
        .respond(factory.merge(&raw, json!({ "version": 3 })));
    api.expect(Method::Put, &format!("/studies/pannottypes/{}/{}", id, existing_id))
        .respond(factory.merge(&raw, json!({ "version": 3 })));
    api.expect(Method::Delete, &format!("/studies/pannottypes/{}/2/{}", id, existing_id))
        .respond(factory.merge(&raw, json!({ "annotationTypes": [], "version": 3 })));

    assert_eq!(study.add_annotation_type(&api, &colour).await.unwrap().version(), 3);
    assert_eq!(study.update_annotation_type(&api, &updated_type).await.unwrap().version(), 3);
    let removed = study.remove_annotation_type(&api, &updated_type).await.unwrap();
    assert!(removed.annotation_types.is_empty());

    let requests = api.requests();
    assert_eq!(requests[1].body.as_ref().unwrap()["required"], json!(true));
    api.verify_no_outstanding_expectation();
}

#[tokio::test]
async fn test_list_studies_by_status() {
    let mut factory = Factory::new();
    let items = vec![factory.study_with(json!({ "state": "retired" }))];

    let api = MockApi::new();
    api.expect(Method::Get, "/studies")
        .with_query(vec![
            ("status".to_string(), "retired".to_string()),
            ("limit".to_string(), "1".to_string()),
        ])
        .respond(factory.paged_result(items, 1, 1, 3));

    let options = ListOptions::from_json(&json!({ "state": "retired", "pageSize": 1 })).unwrap();
    let page = Study::list(&api, &options).await.unwrap();
    assert!(page.items[0].is_retired());
    assert_eq!(page.max_pages, 3);
    assert!(page.has_next_page());
    api.verify_no_outstanding_expectation();
}

#[tokio::test]
async fn test_study_names() {
    let mut factory = Factory::new();
    let retired = factory.study_with(json!({ "state": "retired" }));

    let api = MockApi::new();
    api.expect(Method::Get, "/studies/names")
        .respond(json!([factory.name_dto(&retired)]));

    let names = StudyName::list(&api, &ListOptions::new()).await.unwrap();
    assert!(names[0].is_retired());
    assert!(!names[0].is_enabled());
    api.verify_no_outstanding_expectation();
}
