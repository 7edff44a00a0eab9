use thiserror::Error;

use crate::api_connection::ApiConnectionError;
use crate::credits::RefundReason;
use crate::data_store::DataStoreError;

/// Failure of a credit-gated generation job, with a stable code for callers.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Not enough credit. Nothing was spent; the caller should top up rather than retry.
    #[error("insufficient credits (balance: {remaining_balance})")]
    AdmissionDenied { remaining_balance: i64 },
    /// Rejected before admission; no credit was taken.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("the model returned no usable response")]
    NoResponse,
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error("the meal plan could not be saved")]
    PersistenceFailure,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl GenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::AdmissionDenied { .. } => "insufficient_credits",
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::NoResponse => "no_response",
            GenerationError::InvalidResponse(_) => "invalid_response",
            GenerationError::PersistenceFailure => "persistence_failure",
            GenerationError::Unexpected(_) => "unexpected_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            GenerationError::AdmissionDenied { .. } => 402,
            GenerationError::InvalidRequest(_) => 400,
            GenerationError::NoResponse | GenerationError::InvalidResponse(_) => 422,
            GenerationError::PersistenceFailure | GenerationError::Unexpected(_) => 500,
        }
    }

    /// Reason recorded on the compensating refund. `None` when no credit was taken.
    pub fn refund_reason(&self) -> Option<RefundReason> {
        match self {
            GenerationError::AdmissionDenied { .. } | GenerationError::InvalidRequest(_) => None,
            GenerationError::NoResponse => Some(RefundReason::NoResponse),
            GenerationError::InvalidResponse(_) => Some(RefundReason::InvalidResponse),
            GenerationError::PersistenceFailure | GenerationError::Unexpected(_) => {
                Some(RefundReason::UnexpectedError)
            }
        }
    }
}

impl From<DataStoreError> for GenerationError {
    fn from(err: DataStoreError) -> Self {
        GenerationError::Unexpected(err.to_string())
    }
}

impl From<ApiConnectionError> for GenerationError {
    fn from(err: ApiConnectionError) -> Self {
        GenerationError::Unexpected(err.to_string())
    }
}
