use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::answers::{Answers, ValidationError, ValidationResult};
use crate::spec::property::{FormProperty, PropertyType};
use crate::visibility::VisibleFields;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://.+").expect("url pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\s()-]+$").expect("phone pattern"));

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
/// ISO date-times whose offset follows the minutes directly.
const OFFSET_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%#z", "%Y-%m-%d %H:%M%#z"];

/// Why a raw answer was rejected. Every message names the field label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Required(String),
    #[error("{0} must be text")]
    NotText(String),
    #[error("{0} must be a valid email")]
    NotEmail(String),
    #[error("{0} must be a valid email address")]
    InvalidEmail(String),
    #[error("{0} must be a valid number")]
    InvalidNumber(String),
    #[error("{0} must be a valid URL")]
    NotUrl(String),
    #[error("{0} must be a valid URL starting with http:// or https://")]
    InvalidUrl(String),
    #[error("{0} must be a valid phone number")]
    InvalidPhone(String),
    #[error("{0} must be a valid date")]
    InvalidDate(String),
    #[error("{0} must be a valid selection")]
    NotSelection(String),
    #[error("{0} must be one of the available options")]
    UnknownOption(String),
    #[error("{0} must be a list of selections")]
    NotSelectionList(String),
    #[error("{0} contains invalid selections")]
    InvalidSelections(String),
    #[error("{0} requires at least one file")]
    NoFiles(String),
    #[error("{0} must be valid file(s)")]
    InvalidFiles(String),
    #[error("{0} has an unknown field type")]
    UnknownType(String),
}

impl FieldError {
    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::Required(_) => "required",
            FieldError::NotText(_) => "not_text",
            FieldError::NotEmail(_) | FieldError::InvalidEmail(_) => "invalid_email",
            FieldError::InvalidNumber(_) => "invalid_number",
            FieldError::NotUrl(_) | FieldError::InvalidUrl(_) => "invalid_url",
            FieldError::InvalidPhone(_) => "invalid_phone",
            FieldError::InvalidDate(_) => "invalid_date",
            FieldError::NotSelection(_) | FieldError::NotSelectionList(_) => "not_selection",
            FieldError::UnknownOption(_) | FieldError::InvalidSelections(_) => "unknown_option",
            FieldError::NoFiles(_) => "no_files",
            FieldError::InvalidFiles(_) => "invalid_files",
            FieldError::UnknownType(_) => "unknown_type",
        }
    }
}

/// Coerces a raw answer into the property's type or explains why it cannot.
///
/// `None`, `null` and `""` count as empty: rejected when required, otherwise
/// accepted as `null`.
pub fn coerce_and_validate(
    property: &FormProperty,
    raw: Option<&Value>,
) -> Result<Value, FieldError> {
    let label = || property.label.clone();
    let value = match raw {
        None | Some(Value::Null) => return empty(property),
        Some(Value::String(text)) if text.is_empty() => return empty(property),
        Some(value) => value,
    };

    match property.kind {
        PropertyType::Text => match value {
            Value::String(text) => Ok(Value::String(text.trim().to_string())),
            _ => Err(FieldError::NotText(label())),
        },
        PropertyType::Email => {
            let email = value.as_str().ok_or_else(|| FieldError::NotEmail(label()))?.trim();
            if EMAIL.is_match(email) {
                Ok(Value::String(email.to_string()))
            } else {
                Err(FieldError::InvalidEmail(label()))
            }
        }
        PropertyType::Number => {
            let number = match value {
                Value::Number(number) => number.as_f64(),
                Value::String(text) => text.trim().parse::<f64>().ok(),
                _ => None,
            };
            number
                .filter(|number| number.is_finite())
                .map(number_value)
                .ok_or_else(|| FieldError::InvalidNumber(label()))
        }
        PropertyType::Url => {
            let url = value.as_str().ok_or_else(|| FieldError::NotUrl(label()))?.trim();
            if URL.is_match(url) {
                Ok(Value::String(url.to_string()))
            } else {
                Err(FieldError::InvalidUrl(label()))
            }
        }
        PropertyType::Phone => {
            let phone = value
                .as_str()
                .ok_or_else(|| FieldError::InvalidPhone(label()))?
                .trim();
            if PHONE.is_match(phone) {
                Ok(Value::String(phone.to_string()))
            } else {
                Err(FieldError::InvalidPhone(label()))
            }
        }
        PropertyType::Date => match value {
            Value::String(text) if is_calendar_date(text) => Ok(value.clone()),
            _ => Err(FieldError::InvalidDate(label())),
        },
        PropertyType::Select => {
            let choice = value
                .as_str()
                .ok_or_else(|| FieldError::NotSelection(label()))?;
            if property.has_option(choice) {
                Ok(value.clone())
            } else {
                Err(FieldError::UnknownOption(label()))
            }
        }
        PropertyType::MultiSelect => {
            let items = value
                .as_array()
                .ok_or_else(|| FieldError::NotSelectionList(label()))?;
            let all_known = items
                .iter()
                .all(|item| item.as_str().is_some_and(|choice| property.has_option(choice)));
            if all_known {
                Ok(value.clone())
            } else {
                Err(FieldError::InvalidSelections(label()))
            }
        }
        PropertyType::Files => {
            let files = value
                .as_array()
                .ok_or_else(|| FieldError::InvalidFiles(label()))?;
            if files.is_empty() && property.required {
                Err(FieldError::NoFiles(label()))
            } else {
                Ok(Value::Array(files.clone()))
            }
        }
        PropertyType::Unknown => Err(FieldError::UnknownType(label())),
    }
}

fn empty(property: &FormProperty) -> Result<Value, FieldError> {
    if property.required {
        Err(FieldError::Required(property.label.clone()))
    } else {
        Ok(Value::Null)
    }
}

/// Integral values become JSON integers so `"25"` coerces to `25`.
fn number_value(number: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

fn is_calendar_date(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_rfc2822(text).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|format| NaiveDate::parse_from_str(text, format).is_ok())
        || DATE_TIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
        || OFFSET_DATE_TIME_FORMATS
            .iter()
            .any(|format| DateTime::parse_from_str(text, format).is_ok())
        || is_year_month(text)
}

/// `YYYY-MM`, read as the first day of that month.
fn is_year_month(text: &str) -> bool {
    text.len() == 7 && NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d").is_ok()
}

/// Validates every visible property, reporting failures in property order.
pub fn validate_form(
    properties: &[FormProperty],
    answers: &Answers,
    visible: &VisibleFields,
) -> ValidationResult {
    let errors: Vec<ValidationError> = properties
        .iter()
        .filter(|property| visible.contains(&property.id))
        .filter_map(|property| {
            coerce_and_validate(property, answers.get(&property.key))
                .err()
                .map(|error| ValidationError {
                    field_id: property.id.clone(),
                    message: error.to_string(),
                    code: error.code().to_string(),
                })
        })
        .collect();

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Builds the submission payload: coerced values of visible, valid fields.
///
/// Invalid fields are dropped silently; callers gate on [`validate_form`] first.
pub fn sanitize_answers(
    properties: &[FormProperty],
    answers: &Answers,
    visible: &VisibleFields,
) -> Answers {
    properties
        .iter()
        .filter(|property| visible.contains(&property.id))
        .filter_map(|property| {
            coerce_and_validate(property, answers.get(&property.key))
                .ok()
                .map(|value| (property.key.clone(), value))
        })
        .collect()
}

/// First error message reported for `field_id`.
pub fn field_error<'a>(errors: &'a [ValidationError], field_id: &str) -> Option<&'a str> {
    errors
        .iter()
        .find(|error| error.field_id == field_id)
        .map(|error| error.message.as_str())
}

pub fn is_form_submittable(
    properties: &[FormProperty],
    answers: &Answers,
    visible: &VisibleFields,
) -> bool {
    validate_form(properties, answers, visible).is_valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn property(kind: PropertyType, required: bool) -> FormProperty {
        FormProperty {
            id: "field".into(),
            key: "field".into(),
            kind,
            label: "Serial Number".into(),
            description: None,
            placeholder: None,
            required,
            options: None,
        }
    }

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(number_value(25.0), json!(25));
        assert_eq!(number_value(-3.0), json!(-3));
        assert_eq!(number_value(2.5), json!(2.5));
    }

    #[test]
    fn number_strings_are_trimmed_before_parsing() {
        let field = property(PropertyType::Number, true);
        assert_eq!(coerce_and_validate(&field, Some(&json!(" 7.25 "))), Ok(json!(7.25)));
        for bad in [json!("inf"), json!("NaN"), json!("seven"), json!(true)] {
            assert_eq!(
                coerce_and_validate(&field, Some(&bad)),
                Err(FieldError::InvalidNumber("Serial Number".into())),
                "{bad}"
            );
        }
    }

    #[test]
    fn date_formats_are_accepted_verbatim() {
        let field = property(PropertyType::Date, true);
        for good in ["2023-12-25", "2023-12-25T10:30:00Z", "2023-12-25T10:30", "12/25/2023"] {
            assert_eq!(coerce_and_validate(&field, Some(&json!(good))), Ok(json!(good)));
        }
        for bad in ["not-a-date", "32/13/2023", "2023-02-30"] {
            assert!(coerce_and_validate(&field, Some(&json!(bad))).is_err(), "{bad}");
        }
    }

    #[test]
    fn short_iso_offsets_month_precision_and_written_dates_are_accepted() {
        let field = property(PropertyType::Date, true);
        for good in [
            "2023-12-25T10:30Z",
            "2023-12-25T10:30+02:00",
            "2023-12",
            "Dec 25, 2023",
            "December 25, 2023",
        ] {
            assert_eq!(coerce_and_validate(&field, Some(&json!(good))), Ok(json!(good)), "{good}");
        }
        for bad in ["2023-13", "2023-1", "2023-12-25T25:30Z", "Dec 32, 2023"] {
            assert!(coerce_and_validate(&field, Some(&json!(bad))).is_err(), "{bad}");
        }
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(FieldError::Required("x".into()).code(), "required");
        assert_eq!(FieldError::InvalidSelections("x".into()).code(), "unknown_option");
    }

    #[test]
    fn field_error_returns_first_message() {
        let errors = vec![
            ValidationError {
                field_id: "a".into(),
                message: "first".into(),
                code: "required".into(),
            },
            ValidationError {
                field_id: "a".into(),
                message: "second".into(),
                code: "required".into(),
            },
        ];
        assert_eq!(field_error(&errors, "a"), Some("first"));
        assert_eq!(field_error(&errors, "b"), None);
    }
}
