use crate::error::CoreError;
use crate::taxonomy::RootCause;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Unique key of a resolution template, e.g. `duplicate_merge`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TemplateKey(String);

impl TemplateKey {
    pub fn parse(key: &str) -> Result<Self, CoreError> {
        let key = key.trim();
        if key.is_empty()
            || key.len() > 100
            || !key.chars().all(|c| c.is_ascii_lowercase() || c == '_')
        {
            return Err(CoreError::InvalidTemplateKey(key.to_string()));
        }
        Ok(Self(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TemplateKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TemplateKey> for String {
    fn from(value: TemplateKey) -> Self {
        value.0
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Action code of a template step, e.g. `NOTIFY_CITIZEN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionCode(String);

impl ActionCode {
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        let code = code.trim();
        let well_formed = !code.is_empty()
            && code.starts_with(|c: char| c.is_ascii_uppercase())
            && code.chars().all(|c| c.is_ascii_uppercase() || c == '_');
        if !well_formed {
            return Err(CoreError::InvalidActionCode(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActionCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ActionCode> for String {
    fn from(value: ActionCode) -> Self {
        value.0
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    pub step: u32,
    pub action: ActionCode,
    pub description: String,
}

/// A pre-built resolution workflow for a (department, category, root cause) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTemplate {
    pub key: TemplateKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub root_cause: RootCause,
    pub title: String,
    pub description: String,
    pub action_steps: Vec<ActionStep>,
    /// Percentage of past applications that resolved the case, 0.00..=100.00.
    pub success_rate: Decimal,
    pub avg_resolution_hours: u32,
    #[serde(default)]
    pub similar_cases_resolved: u32,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl ResolutionTemplate {
    /// Check shape constraints that JSON typing alone cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.success_rate < Decimal::ZERO || self.success_rate > Decimal::ONE_HUNDRED {
            return Err(CoreError::Configuration(format!(
                "template {}: success_rate {} outside 0..=100",
                self.key, self.success_rate
            )));
        }
        if self.action_steps.is_empty() {
            return Err(CoreError::Configuration(format!(
                "template {}: no action steps",
                self.key
            )));
        }
        for pair in self.action_steps.windows(2) {
            if pair[1].step <= pair[0].step {
                return Err(CoreError::Configuration(format!(
                    "template {}: step {} listed after step {}",
                    self.key, pair[1].step, pair[0].step
                )));
            }
        }
        Ok(())
    }

    /// Ranking among candidates of equal specificity; `Less` sorts first.
    ///
    /// Higher success rate, then fewer average hours, then more similar
    /// cases resolved, then template key.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .success_rate
            .cmp(&self.success_rate)
            .then_with(|| self.avg_resolution_hours.cmp(&other.avg_resolution_hours))
            .then_with(|| other.similar_cases_resolved.cmp(&self.similar_cases_resolved))
            .then_with(|| self.key.cmp(&other.key))
    }
}
