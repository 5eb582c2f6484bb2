use serde_json::{Value, json};

use form_rules::{
    Answers, FieldError, FieldOption, FormDefinition, FormProperty, PropertyType,
    coerce_and_validate, evaluate_visibility, field_error, is_form_submittable,
    prepare_submission, sanitize_answers, validate_form,
};

fn property(id: &str, kind: PropertyType, label: &str, required: bool) -> FormProperty {
    FormProperty {
        id: id.into(),
        key: id.into(),
        kind,
        label: label.into(),
        description: None,
        placeholder: None,
        required,
        options: None,
    }
}

fn with_options(mut property: FormProperty, values: &[&str]) -> FormProperty {
    property.options = Some(
        values
            .iter()
            .map(|value| FieldOption {
                id: value.to_string(),
                label: value.to_uppercase(),
                value: value.to_string(),
            })
            .collect(),
    );
    property
}

fn coerce(property: &FormProperty, value: Value) -> Result<Value, FieldError> {
    coerce_and_validate(property, Some(&value))
}

fn message(result: Result<Value, FieldError>) -> String {
    result.expect_err("should fail").to_string()
}

fn answers(value: Value) -> Answers {
    value.as_object().cloned().expect("answers object")
}

#[test]
fn text_is_trimmed() {
    let name = property("name", PropertyType::Text, "Name", true);
    assert_eq!(coerce(&name, json!("John Doe")), Ok(json!("John Doe")));
    assert_eq!(coerce(&name, json!("  John Doe  ")), Ok(json!("John Doe")));
    assert!(message(coerce(&name, json!(""))).contains("required"));
    assert!(message(coerce(&name, json!(123))).contains("must be text"));
}

#[test]
fn required_rejects_every_empty_shape() {
    for kind in [
        PropertyType::Text,
        PropertyType::Email,
        PropertyType::Number,
        PropertyType::Select,
        PropertyType::MultiSelect,
        PropertyType::Date,
        PropertyType::Files,
        PropertyType::Url,
        PropertyType::Phone,
        PropertyType::Unknown,
    ] {
        let field = property("f", kind, "Defibrillator ID", true);
        for raw in [None, Some(Value::Null), Some(json!(""))] {
            let error = coerce_and_validate(&field, raw.as_ref()).expect_err("required");
            let text = error.to_string();
            assert!(text.contains("Defibrillator ID"), "{kind}: {text}");
            assert!(text.contains("required"), "{kind}: {text}");
            assert_eq!(error.code(), "required");
        }
    }
}

#[test]
fn optional_empty_values_become_null() {
    let website = property("website", PropertyType::Url, "Website", false);
    assert_eq!(coerce(&website, json!("")), Ok(Value::Null));
    assert_eq!(coerce_and_validate(&website, None), Ok(Value::Null));
}

#[test]
fn email_must_look_like_an_address() {
    let email = property("email", PropertyType::Email, "Email", true);
    assert_eq!(coerce(&email, json!(" test@example.com ")), Ok(json!("test@example.com")));
    assert!(message(coerce(&email, json!("invalid-email"))).contains("valid email"));
    assert!(message(coerce(&email, json!("a@b"))).contains("valid email"));
    assert!(message(coerce(&email, json!(42))).contains("valid email"));
}

#[test]
fn numbers_parse_from_strings() {
    let age = property("age", PropertyType::Number, "Age", true);
    assert_eq!(coerce(&age, json!(25)), Ok(json!(25)));
    assert_eq!(coerce(&age, json!("25")), Ok(json!(25)));
    assert_eq!(coerce(&age, json!("2.5")), Ok(json!(2.5)));
    assert!(message(coerce(&age, json!("not-a-number"))).contains("valid number"));
    assert!(message(coerce(&age, json!("Infinity"))).contains("valid number"));
}

#[test]
fn urls_need_http_scheme() {
    let website = property("website", PropertyType::Url, "Website", false);
    assert_eq!(coerce(&website, json!("https://example.com")), Ok(json!("https://example.com")));
    assert!(coerce(&website, json!("http://example.com")).is_ok());
    assert!(message(coerce(&website, json!("not-a-url"))).contains("valid URL"));
    assert!(message(coerce(&website, json!("ftp://example.com"))).contains("http://"));
}

#[test]
fn phone_numbers_allow_common_punctuation() {
    let phone = property("phone", PropertyType::Phone, "Phone", true);
    for good in ["+1234567890", "(555) 123-4567", "555-123-4567", "+44 20 7946 0958"] {
        assert_eq!(coerce(&phone, json!(good)), Ok(json!(good)), "{good}");
    }
    assert!(message(coerce(&phone, json!("abc123"))).contains("valid phone"));
    assert!(message(coerce(&phone, json!("12+34"))).contains("valid phone"));
}

#[test]
fn phone_digits_must_be_ascii() {
    let phone = property("phone", PropertyType::Phone, "Phone", true);
    for bad in ["٠١٢٣٤٥", "+٤٤ ٢٠", "１２３４５"] {
        assert!(message(coerce(&phone, json!(bad))).contains("valid phone"), "{bad}");
    }
}

#[test]
fn dates_keep_their_original_text() {
    let birthday = property("birthday", PropertyType::Date, "Birthday", true);
    assert_eq!(coerce(&birthday, json!("2023-12-25")), Ok(json!("2023-12-25")));
    assert!(message(coerce(&birthday, json!("not-a-date"))).contains("valid date"));
    assert!(message(coerce(&birthday, json!("32/13/2023"))).contains("valid date"));
    assert!(message(coerce(&birthday, json!(20231225))).contains("valid date"));
}

#[test]
fn select_must_match_an_option() {
    let plan = with_options(property("plan", PropertyType::Select, "Plan", true), &["free", "pro"]);
    assert_eq!(coerce(&plan, json!("pro")), Ok(json!("pro")));
    assert!(message(coerce(&plan, json!("enterprise"))).contains("available options"));
    assert!(message(coerce(&plan, json!(123))).contains("valid selection"));
}

#[test]
fn multi_select_rejects_the_whole_list_on_one_bad_item() {
    let features = with_options(
        property("features", PropertyType::MultiSelect, "Features", false),
        &["feature1", "feature2", "feature3"],
    );
    assert_eq!(
        coerce(&features, json!(["feature1", "feature3"])),
        Ok(json!(["feature1", "feature3"]))
    );
    assert_eq!(coerce(&features, json!([])), Ok(json!([])));
    assert!(message(coerce(&features, json!(["feature1", "invalid"]))).contains("invalid selections"));
    assert!(message(coerce(&features, json!(["feature1", 2]))).contains("invalid selections"));
    assert!(message(coerce(&features, json!("feature1"))).contains("list of selections"));
}

#[test]
fn files_require_a_collection() {
    let documents = property("documents", PropertyType::Files, "Documents", true);
    let files = json!([
        { "name": "file1.txt", "type": "text/plain", "size": 8 },
        { "name": "file2.txt", "type": "text/plain", "size": 8 }
    ]);
    assert_eq!(coerce(&documents, files.clone()), Ok(files));
    assert!(message(coerce(&documents, json!([]))).contains("at least one file"));
    assert!(message(coerce(&documents, json!("not-files"))).contains("valid file"));

    let optional = property("documents", PropertyType::Files, "Documents", false);
    assert_eq!(coerce(&optional, json!([])), Ok(json!([])));
}

#[test]
fn unknown_types_always_fail() {
    let field = property("sig", PropertyType::Unknown, "Signature", false);
    let error = coerce(&field, json!("scribble")).expect_err("unknown");
    assert_eq!(error, FieldError::UnknownType("Signature".into()));
    assert!(error.to_string().contains("unknown field type"));
}

fn contact_properties() -> Vec<FormProperty> {
    vec![
        property("name", PropertyType::Text, "Name", true),
        property("email", PropertyType::Email, "Email", true),
        property("age", PropertyType::Number, "Age", false),
    ]
}

fn all_visible(properties: &[FormProperty]) -> form_rules::VisibleFields {
    properties.iter().map(|property| property.id.clone()).collect()
}

#[test]
fn validate_form_passes_complete_answers() {
    let properties = contact_properties();
    let answers = answers(json!({ "name": "John Doe", "email": "john@example.com", "age": "30" }));
    let result = validate_form(&properties, &answers, &all_visible(&properties));
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert!(is_form_submittable(&properties, &answers, &all_visible(&properties)));
}

#[test]
fn validate_form_reports_errors_in_property_order() {
    let properties = contact_properties();
    let answers = answers(json!({ "name": "", "email": "invalid-email", "age": "old" }));
    let result = validate_form(&properties, &answers, &all_visible(&properties));

    assert!(!result.is_valid);
    let ids: Vec<&str> = result.errors.iter().map(|e| e.field_id.as_str()).collect();
    assert_eq!(ids, vec!["name", "email", "age"]);
    assert_eq!(result.errors[0].code, "required");
    assert!(field_error(&result.errors, "email").is_some_and(|m| m.contains("valid email")));
    assert!(!is_form_submittable(&properties, &answers, &all_visible(&properties)));
}

#[test]
fn validate_form_skips_hidden_fields() {
    let properties = contact_properties();
    let answers = answers(json!({ "name": "John Doe" }));
    let visible = ["name".to_string()].into_iter().collect();
    let result = validate_form(&properties, &answers, &visible);
    assert!(result.is_valid);
}

#[test]
fn sanitize_coerces_and_filters() {
    let properties = contact_properties();
    let raw = answers(json!({
        "name": "  John Doe  ",
        "email": "john@example.com",
        "age": "25",
        "unknown": "dropped"
    }));
    let sanitized = sanitize_answers(&properties, &raw, &all_visible(&properties));
    assert_eq!(
        Value::Object(sanitized),
        json!({ "name": "John Doe", "email": "john@example.com", "age": 25 })
    );

    let visible = ["name".to_string(), "email".to_string()].into_iter().collect();
    let sanitized = sanitize_answers(&properties, &raw, &visible);
    assert!(!sanitized.contains_key("age"));

    let invalid = answers(json!({ "name": "John", "email": "nope" }));
    let sanitized = sanitize_answers(&properties, &invalid, &all_visible(&properties));
    assert!(!sanitized.contains_key("email"));
    assert_eq!(sanitized.get("age"), Some(&Value::Null));
}

fn plan_form() -> FormDefinition {
    serde_json::from_value(json!({
        "id": "plan",
        "title": "Plan",
        "allowAnonymous": true,
        "properties": [
            { "id": "plan", "key": "plan", "type": "select", "label": "Plan", "required": true,
              "options": [
                  { "id": "free", "label": "Free", "value": "free" },
                  { "id": "pro", "label": "Pro", "value": "pro" },
                  { "id": "business", "label": "Business", "value": "business" }
              ] },
            { "id": "teamSize", "key": "teamSize", "type": "number", "label": "Team Size", "required": false }
        ],
        "visibility": [{
            "fieldId": "teamSize",
            "groups": [
                { "predicates": [{ "whenFieldId": "plan", "comparator": "equals", "value": "pro" }] },
                { "predicates": [{ "whenFieldId": "plan", "comparator": "equals", "value": "business" }] }
            ]
        }]
    }))
    .expect("deserialize")
}

#[test]
fn stale_hidden_answers_never_reach_the_payload() {
    let definition = plan_form();
    let answers = answers(json!({ "plan": "free", "teamSize": "12" }));

    let visible = evaluate_visibility(&definition, &answers);
    assert!(!visible.contains("teamSize"));

    let validation = validate_form(&definition.properties, &answers, &visible);
    assert!(validation.is_valid);

    let sanitized = sanitize_answers(&definition.properties, &answers, &visible);
    assert_eq!(Value::Object(sanitized), json!({ "plan": "free" }));
}

#[test]
fn prepare_submission_runs_the_whole_pipeline() {
    let definition = plan_form();

    let submission = prepare_submission(
        &definition,
        &answers(json!({ "plan": "business", "teamSize": "40" })),
        Some("tech-17"),
    )
    .expect("valid submission");
    assert_eq!(submission.form_id, "plan");
    assert_eq!(Value::Object(submission.answers), json!({ "plan": "business", "teamSize": 40 }));
    assert_eq!(submission.meta.user_id.as_deref(), Some("tech-17"));
    assert!(!submission.meta.anonymous);
    assert!(submission.meta.ts > 0);

    let error = prepare_submission(&definition, &answers(json!({ "plan": "gold" })), None)
        .expect_err("invalid plan");
    let form_rules::SubmissionError::Invalid(errors) = error;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field_id, "plan");
}
