use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::answers::{Answers, Submission, ValidationError};
use crate::graph::{GraphValidation, RuleDiagnostic, validate_visibility_graph};
use crate::spec::form::{DefinitionError, FormDefinition};
use crate::submission::{SubmissionError, prepare_submission};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("form '{0}' is not available")]
    NotFound(String),
    #[error("form definition is malformed: {0}")]
    Structure(#[from] DefinitionError),
    #[error("visibility rules contain {} error(s)", .0.len())]
    InvalidGraph(Vec<RuleDiagnostic>),
    #[error("submission has {} invalid field(s)", .0.len())]
    InvalidSubmission(Vec<ValidationError>),
    #[error("form '{0}' does not accept anonymous submissions")]
    AnonymousNotAllowed(String),
    #[error("repository lock poisoned")]
    Poisoned,
}

impl From<SubmissionError> for RepositoryError {
    fn from(error: SubmissionError) -> Self {
        match error {
            SubmissionError::Invalid(errors) => RepositoryError::InvalidSubmission(errors),
        }
    }
}

/// Listing entry for a stored form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: String,
    pub title: String,
}

/// Storage seam for form definitions and their submissions.
pub trait FormRepository {
    /// Every stored form, ordered by id.
    fn list_forms(&self) -> Result<Vec<FormSummary>, RepositoryError>;

    fn get_form(&self, form_id: &str) -> Result<FormDefinition, RepositoryError>;

    /// Stores the definition when its structure and rule graph are sound.
    /// The returned validation carries any remaining warnings.
    fn save_form(&self, definition: FormDefinition) -> Result<GraphValidation, RepositoryError>;

    /// Validates and sanitizes `answers`, then records the submission.
    /// `user_id` is `None` for anonymous respondents.
    fn create_submission(
        &self,
        form_id: &str,
        answers: &Answers,
        user_id: Option<&str>,
    ) -> Result<Submission, RepositoryError>;

    fn submissions(&self, form_id: &str) -> Result<Vec<Submission>, RepositoryError>;
}

/// Process-local repository, mostly for tests and previews.
#[derive(Debug, Default)]
pub struct InMemoryFormRepository {
    forms: RwLock<HashMap<String, FormDefinition>>,
    submissions: RwLock<HashMap<String, Vec<Submission>>>,
}

impl InMemoryFormRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormRepository for InMemoryFormRepository {
    fn list_forms(&self) -> Result<Vec<FormSummary>, RepositoryError> {
        let forms = self.forms.read().map_err(|_| RepositoryError::Poisoned)?;
        let mut summaries: Vec<FormSummary> = forms
            .values()
            .map(|definition| FormSummary {
                id: definition.id.clone(),
                title: definition.title.clone(),
            })
            .collect();
        summaries.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(summaries)
    }

    fn get_form(&self, form_id: &str) -> Result<FormDefinition, RepositoryError> {
        let forms = self.forms.read().map_err(|_| RepositoryError::Poisoned)?;
        forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(form_id.to_string()))
    }

    fn save_form(&self, definition: FormDefinition) -> Result<GraphValidation, RepositoryError> {
        definition.check_structure()?;
        let validation = validate_visibility_graph(&definition);
        if !validation.is_valid {
            let errors: Vec<RuleDiagnostic> = validation.errors().cloned().collect();
            warn!(form = %definition.id, errors = errors.len(), "rejected form definition");
            return Err(RepositoryError::InvalidGraph(errors));
        }

        let mut forms = self.forms.write().map_err(|_| RepositoryError::Poisoned)?;
        info!(
            form = %definition.id,
            warnings = validation.diagnostics.len(),
            "saved form definition"
        );
        forms.insert(definition.id.clone(), definition);
        Ok(validation)
    }

    fn create_submission(
        &self,
        form_id: &str,
        answers: &Answers,
        user_id: Option<&str>,
    ) -> Result<Submission, RepositoryError> {
        let definition = self.get_form(form_id)?;
        if user_id.is_none() && !definition.allow_anonymous {
            return Err(RepositoryError::AnonymousNotAllowed(form_id.to_string()));
        }

        let submission = prepare_submission(&definition, answers, user_id)?;
        let mut submissions = self
            .submissions
            .write()
            .map_err(|_| RepositoryError::Poisoned)?;
        submissions
            .entry(form_id.to_string())
            .or_default()
            .push(submission.clone());
        info!(
            form = %form_id,
            submission = %submission.id,
            anonymous = submission.meta.anonymous,
            "recorded submission"
        );
        Ok(submission)
    }

    fn submissions(&self, form_id: &str) -> Result<Vec<Submission>, RepositoryError> {
        let submissions = self
            .submissions
            .read()
            .map_err(|_| RepositoryError::Poisoned)?;
        Ok(submissions.get(form_id).cloned().unwrap_or_default())
    }
}
