use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid case id '{0}': {1}")]
    InvalidCaseId(String, String),

    #[error("invalid root cause '{0}': expected upper-case code like MISSING_INFORMATION")]
    InvalidRootCause(String),

    #[error("invalid template key '{0}': expected lower-case letters and underscores")]
    InvalidTemplateKey(String),

    #[error("invalid action code '{0}': expected upper-case code like NOTIFY_CITIZEN")]
    InvalidActionCode(String),

    #[error(
        "no resolution template for {root_cause} (department '{department}', category '{category}'), generic fallback missing"
    )]
    NoTemplateFound {
        root_cause: String,
        department: String,
        category: String,
    },

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("unknown question id: {0}")]
    UnknownQuestion(u32),

    #[error("invalid answer for question {question_id}: {reason}")]
    InvalidAnswer { question_id: u32, reason: String },

    #[error("case {case_id} is {status} and cannot {action}")]
    InvalidTransition {
        case_id: String,
        status: String,
        action: String,
    },

    #[error("no executor accepts action {0}")]
    NoExecutor(String),
}
