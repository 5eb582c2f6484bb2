use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    NotEquals,
    Includes,
    Gt,
    Gte,
    Lt,
    Lte,
    IsSet,
    IsNotSet,
    /// Unrecognised comparator names; never satisfied.
    #[serde(other)]
    Unknown,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Equals => "equals",
            Comparator::NotEquals => "not_equals",
            Comparator::Includes => "includes",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::IsSet => "is_set",
            Comparator::IsNotSet => "is_not_set",
            Comparator::Unknown => "unknown",
        }
    }
}

/// Source of current field values for rule evaluation, addressed by field id.
pub trait FieldValues {
    fn field_value(&self, field_id: &str) -> Option<&Value>;
}

impl FieldValues for Map<String, Value> {
    fn field_value(&self, field_id: &str) -> Option<&Value> {
        self.get(field_id)
    }
}

/// A single test against another field's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub when_field_id: String,
    pub comparator: Comparator,
    /// `None` when the rule carries no `value` key; an explicit `null` is `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Value>")]
    pub value: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Predicate {
    /// Tests `field_value` (`None` when the field has no answer) against this predicate.
    pub fn test(&self, field_value: Option<&Value>) -> bool {
        let expected = self.value.as_ref();
        match self.comparator {
            Comparator::Equals => strict_equals(field_value, expected),
            Comparator::NotEquals => !strict_equals(field_value, expected),
            Comparator::Includes => match (field_value, expected) {
                (Some(Value::Array(items)), Some(needle)) => {
                    items.iter().any(|item| values_equal(item, needle))
                }
                (Some(Value::String(haystack)), Some(Value::String(needle))) => {
                    haystack.contains(needle.as_str())
                }
                _ => false,
            },
            Comparator::Gt => compare_numbers(field_value, expected, |left, right| left > right),
            Comparator::Gte => compare_numbers(field_value, expected, |left, right| left >= right),
            Comparator::Lt => compare_numbers(field_value, expected, |left, right| left < right),
            Comparator::Lte => compare_numbers(field_value, expected, |left, right| left <= right),
            Comparator::IsSet => is_set(field_value),
            Comparator::IsNotSet => !is_set(field_value),
            Comparator::Unknown => false,
        }
    }

    pub fn evaluate(&self, values: &impl FieldValues) -> bool {
        self.test(values.field_value(&self.when_field_id))
    }
}

/// Predicates that must all hold (AND).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct RuleGroup {
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl RuleGroup {
    /// An empty group is vacuously satisfied.
    pub fn evaluate(&self, values: &impl FieldValues) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.evaluate(values))
    }
}

/// Visibility rules of one field, in disjunctive normal form (OR of groups).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldVisibility {
    pub field_id: String,
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

impl FieldVisibility {
    /// A field without groups is always visible.
    pub fn evaluate(&self, values: &impl FieldValues) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|group| group.evaluate(values))
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.groups.iter().flat_map(|group| group.predicates.iter())
    }
}

fn strict_equals(left: Option<&Value>, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => values_equal(left, right),
        _ => false,
    }
}

/// Identity-style equality: scalars by value, numbers numerically, and
/// arrays or objects never equal to anything.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => left == right,
    }
}

fn compare_numbers(
    field_value: Option<&Value>,
    expected: Option<&Value>,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    match (
        field_value.and_then(Value::as_f64),
        expected.and_then(Value::as_f64),
    ) {
        (Some(left), Some(right)) => cmp(left, right),
        _ => false,
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}
