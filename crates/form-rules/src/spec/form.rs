use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::property::FormProperty;
use crate::spec::rule::FieldVisibility;

/// What the client shows after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SuccessBehavior {
    Message { message: String },
    Redirect { url: String },
}

impl Default for SuccessBehavior {
    fn default() -> Self {
        SuccessBehavior::Message {
            message: "Thank you!".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotifyChannel {
    Email,
    Slack,
}

/// Post-submission automation, carried through untouched by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationAction {
    SetProperty {
        key: String,
        value: Value,
    },
    AssignOwner {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Webhook {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Map<String, Value>>,
    },
    Notify {
        channel: NotifyChannel,
        to: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        template: Option<String>,
    },
}

/// Top-level form definition: ordered properties plus their visibility graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default = "default_submit_text")]
    pub submit_text: String,
    #[serde(default)]
    pub success: SuccessBehavior,
    #[serde(default)]
    pub allow_anonymous: bool,
    pub properties: Vec<FormProperty>,
    #[serde(default)]
    pub visibility: Vec<FieldVisibility>,
    #[serde(default)]
    pub backing_collection_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub automations: Vec<AutomationAction>,
}

fn default_submit_text() -> String {
    "Submit".into()
}

/// Structural defects that make a definition unusable regardless of its rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("property id '{0}' is used more than once")]
    DuplicatePropertyId(String),
    #[error("property key '{0}' is used more than once")]
    DuplicateKey(String),
    #[error("field '{0}' is a selection but defines no options")]
    MissingOptions(String),
    #[error("field '{0}' has more than one visibility entry")]
    DuplicateVisibility(String),
}

impl FormDefinition {
    pub fn property(&self, id: &str) -> Option<&FormProperty> {
        self.properties.iter().find(|property| property.id == id)
    }

    pub fn property_by_key(&self, key: &str) -> Option<&FormProperty> {
        self.properties.iter().find(|property| property.key == key)
    }

    pub fn property_ids(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|property| property.id.as_str())
    }

    pub fn property_keys(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|property| property.key.clone())
            .collect()
    }

    /// Checks identity, key and option invariants, returning the first violation.
    pub fn check_structure(&self) -> Result<(), DefinitionError> {
        let mut ids = BTreeSet::new();
        let mut keys = BTreeSet::new();
        for property in &self.properties {
            if !ids.insert(property.id.as_str()) {
                return Err(DefinitionError::DuplicatePropertyId(property.id.clone()));
            }
            if !keys.insert(property.key.as_str()) {
                return Err(DefinitionError::DuplicateKey(property.key.clone()));
            }
            let has_options = property
                .options
                .as_ref()
                .is_some_and(|options| !options.is_empty());
            if property.kind.requires_options() && !has_options {
                return Err(DefinitionError::MissingOptions(property.id.clone()));
            }
        }

        let mut targets = BTreeSet::new();
        for rule in &self.visibility {
            if !targets.insert(rule.field_id.as_str()) {
                return Err(DefinitionError::DuplicateVisibility(rule.field_id.clone()));
            }
        }
        Ok(())
    }
}
