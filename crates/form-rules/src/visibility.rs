use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::answers::Answers;
use crate::spec::form::FormDefinition;
use crate::spec::rule::FieldValues;

/// Ids of the fields currently shown.
pub type VisibleFields = BTreeSet<String>;

/// Answers addressed by field id through the definition's id to key mapping.
///
/// Ids that match no property are looked up verbatim.
pub struct KeyedAnswers<'a> {
    answers: &'a Answers,
    keys: HashMap<&'a str, &'a str>,
}

impl<'a> KeyedAnswers<'a> {
    pub fn new(definition: &'a FormDefinition, answers: &'a Answers) -> Self {
        let keys = definition
            .properties
            .iter()
            .map(|property| (property.id.as_str(), property.key.as_str()))
            .collect();
        Self { answers, keys }
    }
}

impl FieldValues for KeyedAnswers<'_> {
    fn field_value(&self, field_id: &str) -> Option<&Value> {
        let key = self.keys.get(field_id).copied().unwrap_or(field_id);
        self.answers.get(key)
    }
}

/// Computes which fields are visible for the given answers.
///
/// Every property starts visible; each visibility entry with at least one
/// group hides its field unless one of the groups holds.
pub fn evaluate_visibility(definition: &FormDefinition, answers: &Answers) -> VisibleFields {
    let values = KeyedAnswers::new(definition, answers);
    let mut visible: VisibleFields = definition
        .property_ids()
        .map(str::to_string)
        .collect();

    for rule in &definition.visibility {
        if !rule.evaluate(&values) {
            visible.remove(&rule.field_id);
        }
    }

    debug!(
        form = %definition.id,
        visible = visible.len(),
        total = definition.properties.len(),
        "evaluated visibility"
    );
    visible
}

/// Translates visible field ids into the keys their answers are stored under.
pub fn visible_keys(definition: &FormDefinition, visible: &VisibleFields) -> BTreeSet<String> {
    definition
        .properties
        .iter()
        .filter(|property| visible.contains(&property.id))
        .map(|property| property.key.clone())
        .collect()
}

/// Returns a copy of `answers` without the keys of hidden fields.
///
/// Keys listed in `all_keys` but missing from `visible_keys` are dropped;
/// keys the form does not know about are kept.
pub fn clear_hidden_field_values(
    answers: &Answers,
    visible_keys: &BTreeSet<String>,
    all_keys: &[String],
) -> Answers {
    let mut cleared = answers.clone();
    for key in all_keys {
        if !visible_keys.contains(key) {
            cleared.remove(key);
        }
    }
    cleared
}
