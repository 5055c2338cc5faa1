use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Department value used by seed data for department-agnostic rows.
pub const GENERIC_DEPARTMENT: &str = "General";
/// Category value that marks the generic fallback template set.
pub const GENERIC_CATEGORY: &str = "All";

/// Root causes the classifier and seed data are known to use.
pub const KNOWN_ROOT_CAUSES: [&str; 10] = [
    "WRONG_DEPARTMENT",
    "MISSING_INFORMATION",
    "DUPLICATE_CASE",
    "OUTSIDE_JURISDICTION",
    "NEEDS_FIELD_VISIT",
    "EXTERNAL_DEPENDENCY",
    "CITIZEN_UNREACHABLE",
    "POLICY_LIMITATION",
    "RESOURCE_CONSTRAINT",
    "OFFICER_OVERLOAD",
];

/// A coded reason why a grievance cannot currently be resolved.
///
/// Codes are upper-case ASCII with underscores. Unknown but well-formed
/// codes are accepted so new root causes only need new reference rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RootCause(String);

impl RootCause {
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        let code = code.trim();
        let well_formed = !code.is_empty()
            && code.starts_with(|c: char| c.is_ascii_uppercase())
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if !well_formed {
            return Err(CoreError::InvalidRootCause(code.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        KNOWN_ROOT_CAUSES.contains(&self.0.as_str())
    }
}

impl TryFrom<String> for RootCause {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RootCause> for String {
    fn from(value: RootCause) -> Self {
        value.0
    }
}

impl FromStr for RootCause {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Citizen-facing language for bilingual text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Te,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Te => "te",
        }
    }
}

impl FromStr for Language {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "te" | "telugu" => Ok(Self::Te),
            other => Err(CoreError::Configuration(format!(
                "unsupported language '{}' (expected en or te)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    Text,
    SingleChoice,
    MultipleChoice,
    Photo,
    Date,
    Number,
}

/// A clarifying question asked of the citizen for one root cause.
///
/// `department`/`category` of `None` mean the question applies to every
/// department (or every category of its department).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionQuestion {
    pub id: u32,
    pub root_cause: RootCause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub text_en: String,
    pub text_te: String,
    #[serde(default = "default_order")]
    pub order: u32,
    pub response_type: ResponseType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_order() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// A typed answer to an [`InterventionQuestion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    PhotoUrl(String),
    Date(NaiveDate),
    Number(Decimal),
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) | Self::PhotoUrl(s) => f.write_str(s),
            Self::Choices(items) => f.write_str(&items.join(", ")),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

impl InterventionQuestion {
    pub fn text(&self, language: Language) -> &str {
        match language {
            Language::En => &self.text_en,
            Language::Te => &self.text_te,
        }
    }

    /// Parse a raw answer according to this question's response type.
    ///
    /// Multiple-choice answers are comma separated.
    pub fn validate_answer(&self, raw: &str) -> Result<AnswerValue, CoreError> {
        let raw = raw.trim();
        let invalid = |reason: String| CoreError::InvalidAnswer {
            question_id: self.id,
            reason,
        };
        if raw.is_empty() {
            return Err(invalid("answer is empty".into()));
        }
        match self.response_type {
            ResponseType::Text => Ok(AnswerValue::Text(raw.to_string())),
            ResponseType::Photo => {
                if raw.len() > 500 {
                    return Err(invalid("photo url longer than 500 characters".into()));
                }
                Ok(AnswerValue::PhotoUrl(raw.to_string()))
            }
            ResponseType::Number => Decimal::from_str(raw)
                .map(AnswerValue::Number)
                .map_err(|_| invalid(format!("'{}' is not a number", raw))),
            ResponseType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(AnswerValue::Date)
                .map_err(|_| invalid(format!("'{}' is not a YYYY-MM-DD date", raw))),
            ResponseType::SingleChoice => {
                let choice = self.match_choice(raw).ok_or_else(|| {
                    invalid(format!(
                        "'{}' is not one of: {}",
                        raw,
                        self.choices.join(", ")
                    ))
                })?;
                Ok(AnswerValue::Choice(choice))
            }
            ResponseType::MultipleChoice => {
                let mut picked = Vec::new();
                for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let choice = self.match_choice(part).ok_or_else(|| {
                        invalid(format!(
                            "'{}' is not one of: {}",
                            part,
                            self.choices.join(", ")
                        ))
                    })?;
                    if !picked.contains(&choice) {
                        picked.push(choice);
                    }
                }
                if picked.is_empty() {
                    return Err(invalid("no choices selected".into()));
                }
                Ok(AnswerValue::Choices(picked))
            }
        }
    }

    fn match_choice(&self, raw: &str) -> Option<String> {
        self.choices
            .iter()
            .find(|c| c.eq_ignore_ascii_case(raw))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(response_type: ResponseType, choices: Vec<&str>) -> InterventionQuestion {
        InterventionQuestion {
            id: 7,
            root_cause: RootCause::parse("MISSING_INFORMATION").unwrap(),
            department: Some("Revenue".into()),
            category: None,
            text_en: "Survey Number?".into(),
            text_te: "సర్వే నంబర్?".into(),
            order: 1,
            response_type,
            choices: choices.into_iter().map(String::from).collect(),
            required: true,
            active: true,
        }
    }

    #[test]
    fn root_cause_accepts_codes() {
        let rc = RootCause::parse(" DUPLICATE_CASE ").unwrap();
        assert_eq!(rc.as_str(), "DUPLICATE_CASE");
        assert!(rc.is_known());
        assert!(!RootCause::parse("NEW_CAUSE_2").unwrap().is_known());
    }

    #[test]
    fn root_cause_rejects_malformed() {
        for bad in ["", "missing_information", "_LEADING", "HAS SPACE", "DASH-CODE"] {
            assert!(RootCause::parse(bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn root_cause_deserialize_validates() {
        let ok: Result<RootCause, _> = serde_json::from_str("\"WRONG_DEPARTMENT\"");
        assert!(ok.is_ok());
        let bad: Result<RootCause, _> = serde_json::from_str("\"wrong\"");
        assert!(bad.is_err());
    }

    #[test]
    fn number_answers_parse() {
        let q = question(ResponseType::Number, vec![]);
        assert_eq!(
            q.validate_answer("4821").unwrap(),
            AnswerValue::Number(Decimal::new(4821, 0))
        );
        assert!(q.validate_answer("four").is_err());
    }

    #[test]
    fn date_answers_need_iso_format() {
        let q = question(ResponseType::Date, vec![]);
        assert!(matches!(q.validate_answer("2025-11-03").unwrap(), AnswerValue::Date(_)));
        assert!(q.validate_answer("03/11/2025").is_err());
    }

    #[test]
    fn single_choice_matches_case_insensitively() {
        let q = question(ResponseType::SingleChoice, vec!["Yes", "No"]);
        assert_eq!(q.validate_answer("yes").unwrap(), AnswerValue::Choice("Yes".into()));
        assert!(q.validate_answer("Maybe").is_err());
    }

    #[test]
    fn multiple_choice_dedupes() {
        let q = question(ResponseType::MultipleChoice, vec!["Aadhaar", "Ration Card", "Passbook"]);
        let v = q.validate_answer("aadhaar, Passbook, AADHAAR").unwrap();
        assert_eq!(
            v,
            AnswerValue::Choices(vec!["Aadhaar".into(), "Passbook".into()])
        );
        assert!(q.validate_answer(" , ").is_err());
    }

    #[test]
    fn empty_answers_rejected() {
        let q = question(ResponseType::Text, vec![]);
        let err = q.validate_answer("   ").unwrap_err();
        assert!(err.to_string().contains("question 7"));
    }

    #[test]
    fn text_by_language() {
        let q = question(ResponseType::Text, vec![]);
        assert_eq!(q.text(Language::En), "Survey Number?");
        assert_eq!(q.text(Language::Te), "సర్వే నంబర్?");
    }
}
