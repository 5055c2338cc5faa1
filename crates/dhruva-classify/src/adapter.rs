use crate::error::ClassifyError;
use crate::http::HttpClassifier;
use crate::keyword::KeywordClassifier;
use crate::{Classifier, ClassifierOutput, DisabledClassifier};
use dhruva_core::config::{ClassifierBackend, ClassifierConfig};
use dhruva_core::taxonomy::Language;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a case could not be classified automatically.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ManualReason {
    LowConfidence { confidence: f64, threshold: f64 },
    Timeout { after_ms: u64 },
    Unavailable { detail: String },
    Malformed { detail: String },
    NoSignal,
    Disabled,
}

impl fmt::Display for ManualReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowConfidence {
                confidence,
                threshold,
            } => write!(f, "confidence {:.2} below threshold {:.2}", confidence, threshold),
            Self::Timeout { after_ms } => write!(f, "classifier timed out after {} ms", after_ms),
            Self::Unavailable { detail } => write!(f, "classifier unavailable: {}", detail),
            Self::Malformed { detail } => write!(f, "malformed classifier response: {}", detail),
            Self::NoSignal => f.write_str("no root-cause signal in the text"),
            Self::Disabled => f.write_str("classifier disabled"),
        }
    }
}

/// Where a newly filed case goes next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "routing", rename_all = "snake_case")]
pub enum Routing {
    Auto(ClassifierOutput),
    Manual {
        #[serde(flatten)]
        reason: ManualReason,
        /// The verdict, when one came back but was not trusted.
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<ClassifierOutput>,
    },
}

/// Applies the confidence threshold and turns every classifier failure
/// into manual routing.
pub struct ClassifierAdapter {
    classifier: Box<dyn Classifier>,
    threshold: f64,
}

impl ClassifierAdapter {
    pub fn new(classifier: Box<dyn Classifier>, threshold: f64) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        let classifier: Box<dyn Classifier> = match config.backend {
            ClassifierBackend::Http => Box::new(HttpClassifier::new(
                &config.endpoint,
                Duration::from_millis(config.timeout_ms),
            )?),
            ClassifierBackend::Keyword => Box::new(KeywordClassifier),
            ClassifierBackend::Disabled => Box::new(DisabledClassifier),
        };
        Ok(Self::new(classifier, config.confidence_threshold))
    }

    pub fn backend(&self) -> &str {
        self.classifier.name()
    }

    pub fn route(&self, text: &str, language: Language) -> Routing {
        let output = match self.classifier.classify(text, language) {
            Ok(output) => output,
            Err(e) => {
                let reason = match e {
                    ClassifyError::Timeout(ms) => ManualReason::Timeout { after_ms: ms },
                    ClassifyError::Http(detail) => ManualReason::Unavailable { detail },
                    ClassifyError::InvalidResponse(detail) => ManualReason::Malformed { detail },
                    ClassifyError::NoSignal => ManualReason::NoSignal,
                    ClassifyError::Disabled => ManualReason::Disabled,
                };
                tracing::warn!(backend = self.backend(), %reason, "classification failed closed");
                return Routing::Manual {
                    reason,
                    suggestion: None,
                };
            }
        };

        if !(0.0..=1.0).contains(&output.confidence) {
            let reason = ManualReason::Malformed {
                detail: format!("confidence {} outside 0..=1", output.confidence),
            };
            tracing::warn!(backend = self.backend(), %reason, "classification failed closed");
            return Routing::Manual {
                reason,
                suggestion: None,
            };
        }

        if output.confidence < self.threshold {
            tracing::info!(
                backend = self.backend(),
                root_cause = %output.root_cause,
                confidence = output.confidence,
                "low confidence, routing to manual classification"
            );
            return Routing::Manual {
                reason: ManualReason::LowConfidence {
                    confidence: output.confidence,
                    threshold: self.threshold,
                },
                suggestion: Some(output),
            };
        }

        Routing::Auto(output)
    }
}
