//! JSON string boundary over the form rule engine.
//!
//! Every export takes JSON text and returns JSON text; failures come back as
//! `{ "error": "..." }` instead of panicking across the host boundary.

use serde_json::{Map, Value, json};
use thiserror::Error;

use form_rules::{
    Answers, FormDefinition, FormProperty, PropertyType, SubmissionError, answers_schema,
    coerce_and_validate, evaluate_visibility, prepare_submission, sanitize_answers,
    validate_form, validate_visibility_graph,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse form definition: {0}")]
    DefinitionParse(#[source] serde_json::Error),
    #[error("failed to parse property: {0}")]
    PropertyParse(#[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("{0}")]
    UnknownType(String),
    #[error("submission rejected: {0}")]
    Submission(#[from] SubmissionError),
}

fn load_definition(definition_json: &str) -> Result<FormDefinition, ComponentError> {
    serde_json::from_str(definition_json).map_err(ComponentError::DefinitionParse)
}

fn parse_answers(answers_json: &str) -> Answers {
    match serde_json::from_str(answers_json) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

/// Structural and rule-graph report for a definition, plus the comparators
/// each field offers to the rule editor.
pub fn describe(definition_json: &str) -> String {
    respond(load_definition(definition_json).and_then(|definition| {
        let comparators: Map<String, Value> = definition
            .properties
            .iter()
            .map(|property| {
                let names: Vec<&str> = property
                    .kind
                    .available_comparators()
                    .iter()
                    .map(|comparator| comparator.as_str())
                    .collect();
                (property.id.clone(), json!(names))
            })
            .collect();
        let structure_error = definition.check_structure().err().map(|err| err.to_string());
        Ok(json!({
            "id": definition.id,
            "title": definition.title,
            "structureError": structure_error,
            "graph": encode(&validate_visibility_graph(&definition))?,
            "comparators": comparators,
        }))
    }))
}

/// Visible and hidden field ids for the answers, with validation of the visible ones.
pub fn evaluate(definition_json: &str, answers_json: &str) -> String {
    respond(load_definition(definition_json).and_then(|definition| {
        let answers = parse_answers(answers_json);
        let visible = evaluate_visibility(&definition, &answers);
        let hidden: Vec<&str> = definition
            .property_ids()
            .filter(|id| !visible.contains(*id))
            .collect();
        let validation = validate_form(&definition.properties, &answers, &visible);
        Ok(json!({
            "visible": visible,
            "hidden": hidden,
            "validation": encode(&validation)?,
        }))
    }))
}

pub fn get_answer_schema(definition_json: &str, answers_json: &str) -> String {
    respond(load_definition(definition_json).map(|definition| {
        let answers = parse_answers(answers_json);
        let visible = evaluate_visibility(&definition, &answers);
        answers_schema(&definition, &visible)
    }))
}

/// Best-effort payload: coerced values of visible fields that pass validation.
pub fn sanitize(definition_json: &str, answers_json: &str) -> String {
    respond(load_definition(definition_json).map(|definition| {
        let answers = parse_answers(answers_json);
        let visible = evaluate_visibility(&definition, &answers);
        Value::Object(sanitize_answers(&definition.properties, &answers, &visible))
    }))
}

/// Full submit path; `user_id` is empty for anonymous respondents.
pub fn submit(definition_json: &str, answers_json: &str, user_id: &str) -> String {
    respond(load_definition(definition_json).and_then(|definition| {
        let answers = parse_answers(answers_json);
        let user_id = Some(user_id).filter(|id| !id.is_empty());
        let submission = prepare_submission(&definition, &answers, user_id)?;
        encode(&submission)
    }))
}

/// Coerces one raw value for one property: `{ "ok": true, "value": .. }` or
/// `{ "ok": false, "error": .., "code": .. }`.
pub fn coerce_field(property_json: &str, value_json: &str) -> String {
    let result = serde_json::from_str::<FormProperty>(property_json)
        .map_err(ComponentError::PropertyParse)
        .map(|property| {
            let raw: Option<Value> = serde_json::from_str(value_json).ok();
            match coerce_and_validate(&property, raw.as_ref()) {
                Ok(value) => json!({ "ok": true, "value": value }),
                Err(error) => json!({ "ok": false, "error": error.to_string(), "code": error.code() }),
            }
        });
    respond(result)
}

pub fn comparators(field_type: &str) -> String {
    let result = field_type
        .parse::<PropertyType>()
        .map_err(ComponentError::UnknownType)
        .map(|kind| {
            let names: Vec<&str> = kind
                .available_comparators()
                .iter()
                .map(|comparator| comparator.as_str())
                .collect();
            json!(names)
        });
    respond(result)
}
