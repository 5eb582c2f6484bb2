use serde_json::{Map, Value, json};

use crate::spec::form::FormDefinition;
use crate::spec::property::{FormProperty, PropertyType};
use crate::visibility::VisibleFields;

/// JSON Schema (draft 2020-12) of the answers payload for the visible fields.
pub fn generate(definition: &FormDefinition, visible: &VisibleFields) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for property in &definition.properties {
        if !visible.contains(&property.id) {
            continue;
        }
        properties.insert(property.key.clone(), property_schema(property));
        if property.required {
            required.push(Value::String(property.key.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": definition.title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn property_schema(property: &FormProperty) -> Value {
    let options: Vec<&str> = property.option_values().collect();
    let mut schema = match property.kind {
        PropertyType::Text | PropertyType::Phone => json!({ "type": "string" }),
        PropertyType::Email => json!({ "type": "string", "format": "email" }),
        PropertyType::Url => json!({ "type": "string", "format": "uri" }),
        PropertyType::Date => json!({ "type": "string", "format": "date" }),
        PropertyType::Number => json!({ "type": "number" }),
        PropertyType::Select => json!({ "type": "string", "enum": options }),
        PropertyType::MultiSelect => json!({
            "type": "array",
            "items": { "type": "string", "enum": options },
        }),
        PropertyType::Files => json!({ "type": "array" }),
        PropertyType::Unknown => json!({}),
    };

    if let Some(map) = schema.as_object_mut() {
        map.insert("title".into(), Value::String(property.label.clone()));
        if let Some(description) = &property.description {
            map.insert("description".into(), Value::String(description.clone()));
        }
    }
    schema
}
