use std::time::Duration;

use thiserror::Error;

/// Failures that can occur while classifying a complaint.
///
/// None of these ever reach the caller of
/// [`Classifier::classify_and_summarize`](crate::Classifier::classify_and_summarize);
/// they are absorbed into the fallback record and only show up in logs.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Model call exceeded the {0:?} deadline")]
    Timeout(Duration),

    #[error("Model reply contained no parseable JSON object")]
    UnparseableReply,

    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Failed to send HTTP request: {0}")]
    Http(String),

    #[error("Model server error: {0}")]
    Model(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl ClassifyError {
    /// Expected degradations (slow or chatty model) as opposed to real faults.
    #[must_use]
    pub fn is_degradation(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::UnparseableReply)
    }
}
