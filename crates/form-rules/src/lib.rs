#![allow(missing_docs)]

pub mod answers;
pub mod answers_schema;
pub mod graph;
pub mod repository;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;

pub use answers::{Answers, Submission, SubmissionMeta, ValidationError, ValidationResult};
pub use answers_schema::generate as answers_schema;
pub use graph::{DiagnosticKind, GraphValidation, RuleDiagnostic, Severity, validate_visibility_graph};
pub use repository::{FormRepository, FormSummary, InMemoryFormRepository, RepositoryError};
pub use spec::{
    Comparator, DefinitionError, FieldOption, FieldVisibility, FormDefinition, FormProperty,
    Predicate, PropertyType, RuleGroup,
};
pub use submission::{SubmissionError, prepare_submission};
pub use validate::{
    FieldError, coerce_and_validate, field_error, is_form_submittable, sanitize_answers,
    validate_form,
};
pub use visibility::{VisibleFields, clear_hidden_field_values, evaluate_visibility, visible_keys};

/// Comparators offered for predicates on a field of `field_type`.
pub fn available_comparators(field_type: PropertyType) -> Vec<Comparator> {
    field_type.available_comparators()
}
