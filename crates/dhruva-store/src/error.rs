use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Core(#[from] dhruva_core::error::CoreError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("repository not found (searched upward from {0})")]
    RepositoryNotFound(String),

    #[error("repository already exists at {0}")]
    RepositoryExists(String),

    #[error("case not found: {0}")]
    CaseNotFound(String),

    #[error("case already exists: {0}")]
    CaseExists(String),

    #[error("case file {path} is unreadable: {source}")]
    CorruptCase {
        path: String,
        source: serde_json::Error,
    },

    #[error("reference file {file} is invalid: {source}")]
    ReferenceFile {
        file: String,
        source: serde_json::Error,
    },

    #[error("lock file conflict: {0}")]
    LockConflict(String),

    #[error("case {case_id} changed underneath us: expected version {expected}, found {found}")]
    VersionConflict {
        case_id: String,
        expected: u64,
        found: u64,
    },

    #[error("concurrent update conflict on case {case_id} after {attempts} attempts, try again")]
    ConcurrentUpdateConflict { case_id: String, attempts: u32 },
}

impl StoreError {
    /// Conflicts that a fresh read-modify-write may get past.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::LockConflict(_))
    }
}
