use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier timed out after {0} ms")]
    Timeout(u64),

    #[error("classifier request failed: {0}")]
    Http(String),

    #[error("classifier returned a malformed response: {0}")]
    InvalidResponse(String),

    #[error("no root-cause signal found in the grievance text")]
    NoSignal,

    #[error("classifier is disabled")]
    Disabled,
}
