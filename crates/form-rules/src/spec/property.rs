use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::rule::Comparator;

/// Input kinds a form property can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Text,
    Email,
    Number,
    Select,
    MultiSelect,
    Date,
    Files,
    Url,
    Phone,
    /// Any type string this engine does not know about.
    #[serde(other)]
    Unknown,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Text => "text",
            PropertyType::Email => "email",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Date => "date",
            PropertyType::Files => "files",
            PropertyType::Url => "url",
            PropertyType::Phone => "phone",
            PropertyType::Unknown => "unknown",
        }
    }

    /// Whether the type only accepts values from `options`.
    pub fn requires_options(&self) -> bool {
        matches!(self, PropertyType::Select | PropertyType::MultiSelect)
    }

    /// Comparators a rule editor may offer for predicates on a field of this type.
    ///
    /// This is a capability list; `includes` against a value that is neither
    /// an array nor a string still evaluates false.
    pub fn available_comparators(&self) -> Vec<Comparator> {
        let mut comparators = vec![
            Comparator::Equals,
            Comparator::NotEquals,
            Comparator::IsSet,
            Comparator::IsNotSet,
        ];
        match self {
            PropertyType::Number => comparators.extend([
                Comparator::Gt,
                Comparator::Gte,
                Comparator::Lt,
                Comparator::Lte,
            ]),
            PropertyType::Select
            | PropertyType::MultiSelect
            | PropertyType::Text
            | PropertyType::Email
            | PropertyType::Url
            | PropertyType::Phone => comparators.push(Comparator::Includes),
            PropertyType::Date | PropertyType::Files | PropertyType::Unknown => {}
        }
        comparators
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "text" => Ok(PropertyType::Text),
            "email" => Ok(PropertyType::Email),
            "number" => Ok(PropertyType::Number),
            "select" => Ok(PropertyType::Select),
            "multi_select" => Ok(PropertyType::MultiSelect),
            "date" => Ok(PropertyType::Date),
            "files" => Ok(PropertyType::Files),
            "url" => Ok(PropertyType::Url),
            "phone" => Ok(PropertyType::Phone),
            other => Err(format!("unknown property type '{other}'")),
        }
    }
}

/// One selectable choice of a select or multi-select property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub id: String,
    pub label: String,
    pub value: String,
}

/// A single field of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormProperty {
    /// Stable identity referenced by visibility rules.
    pub id: String,
    /// Name the answer is stored and submitted under.
    pub key: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
}

impl FormProperty {
    /// Iterates the `value` of every configured option.
    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .flatten()
            .map(|option| option.value.as_str())
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.option_values().any(|candidate| candidate == value)
    }
}
