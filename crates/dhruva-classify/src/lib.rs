//! Root-cause classification for incoming grievances.
//!
//! A [`Classifier`] turns free text into a department, root cause and
//! confidence. The [`adapter::ClassifierAdapter`] wraps one and decides
//! whether the verdict can be used or the case goes to manual routing.

pub mod adapter;
pub mod error;
pub mod http;
pub mod keyword;

use dhruva_core::taxonomy::{Language, RootCause};
use error::ClassifyError;
use serde::Serialize;

/// A classifier's verdict on one grievance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub root_cause: RootCause,
    pub confidence: f64,
}

pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, text: &str, language: Language) -> Result<ClassifierOutput, ClassifyError>;
}

/// Always fails, so every case is routed by hand.
pub struct DisabledClassifier;

impl Classifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    fn classify(&self, _text: &str, _language: Language) -> Result<ClassifierOutput, ClassifyError> {
        Err(ClassifyError::Disabled)
    }
}
