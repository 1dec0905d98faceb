use crate::sample::SampleStatus;
use crate::submission::SubmissionDecision;

#[derive(Debug, thiserror::Error)]
pub enum LimsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] lims_types::TextError),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("parameter is not editable: {0}")]
    ParameterNotEditable(String),
    #[error("result set already submitted: {0}")]
    AlreadySubmitted(String),
    #[error("submission rejected: {0}")]
    SubmissionRejected(SubmissionDecision),

    #[error("unknown verification check: {0}")]
    UnknownCheck(String),
    #[error("sample acceptance rejected, outstanding check: {0}")]
    AcceptanceRejected(String),
    #[error("invalid sample transition from {from} to {to}")]
    InvalidTransition { from: SampleStatus, to: SampleStatus },

    #[error("stale result set version: expected {expected}, actual {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("not found: {0}")]
    NotFound(String),

    #[error("result set document schema mismatch at {path}: {message}")]
    Document { path: String, message: String },
    #[error("failed to render result set document: {0}")]
    Render(String),
}

pub type LimsResult<T> = std::result::Result<T, LimsError>;
