use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::answers::{Answers, Submission, SubmissionMeta, ValidationError};
use crate::spec::form::FormDefinition;
use crate::validate::{sanitize_answers, validate_form};
use crate::visibility::evaluate_visibility;

static SUBMISSION_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<ValidationError>),
}

/// Evaluates visibility, validates the visible fields and, when all pass,
/// returns the sanitized submission.
pub fn prepare_submission(
    definition: &FormDefinition,
    answers: &Answers,
    user_id: Option<&str>,
) -> Result<Submission, SubmissionError> {
    let visible = evaluate_visibility(definition, answers);
    let validation = validate_form(&definition.properties, answers, &visible);
    if !validation.is_valid {
        debug!(form = %definition.id, errors = validation.errors.len(), "submission rejected");
        return Err(SubmissionError::Invalid(validation.errors));
    }

    let ts = Utc::now().timestamp_millis();
    let seq = SUBMISSION_SEQ.fetch_add(1, Ordering::Relaxed);
    Ok(Submission {
        id: format!("submission-{ts}-{seq}"),
        form_id: definition.id.clone(),
        answers: sanitize_answers(&definition.properties, answers, &visible),
        meta: SubmissionMeta {
            anonymous: user_id.is_none(),
            user_id: user_id.map(str::to_string),
            ts,
        },
    })
}
