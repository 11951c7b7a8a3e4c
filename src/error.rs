use thiserror::Error;

/// Failures surfaced by the market gateway. Revert reasons are forwarded
/// verbatim, never parsed.
#[derive(Clone, Debug, Error)]
pub enum GatewayError {
    #[error("submission failed: {reason}")]
    Submission { reason: String },

    #[error("read failed: {0}")]
    Read(String),

    #[error("bind rejected: {0}")]
    Bind(String),

    #[error("transaction timed out")]
    TimedOut,
}

impl GatewayError {
    pub fn submission(reason: impl Into<String>) -> Self {
        GatewayError::Submission {
            reason: reason.into(),
        }
    }

    pub fn is_submission(&self) -> bool {
        matches!(self, GatewayError::Submission { .. })
    }

    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            GatewayError::Submission { reason } => Some(reason),
            _ => None,
        }
    }
}
