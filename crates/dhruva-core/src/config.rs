use crate::error::CoreError;
use crate::sla::{SlaTarget, DEFAULT_BREACH_PERCENT};
use crate::taxonomy::GENERIC_DEPARTMENT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SLA window used when no department/category entry exists (30 days).
pub const DEFAULT_SLA_HOURS: u32 = 720;

/// Longest SLA window accepted from config (10 years).
pub const MAX_SLA_HOURS: u32 = 87_600;

/// Settings read from `.dhruva/config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.confidence_threshold) {
            return Err(CoreError::Configuration(format!(
                "classifier.confidence_threshold {} outside 0..=1",
                c.confidence_threshold
            )));
        }
        if c.timeout_ms == 0 {
            return Err(CoreError::Configuration(
                "classifier.timeout_ms must be positive".into(),
            ));
        }
        if c.backend == ClassifierBackend::Http && c.endpoint.trim().is_empty() {
            return Err(CoreError::Configuration(
                "classifier.endpoint is required for the http backend".into(),
            ));
        }
        check_sla_hours("sla.default_hours", self.sla.default_hours)?;
        for (dept, d) in &self.sla.departments {
            if let Some(hours) = d.hours {
                check_sla_hours(&format!("sla.departments.{}.hours", dept), hours)?;
            }
            for (category, hours) in &d.categories {
                check_sla_hours(
                    &format!("sla.departments.{}.categories.{}", dept, category),
                    *hours,
                )?;
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Configuration(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn check_sla_hours(key: &str, hours: u32) -> Result<(), CoreError> {
    if hours == 0 || hours > MAX_SLA_HOURS {
        return Err(CoreError::Configuration(format!(
            "{} must be between 1 and {} hours, got {}",
            key, MAX_SLA_HOURS, hours
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    Http,
    #[default]
    Keyword,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub confidence_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::default(),
            endpoint: "http://localhost:8000".into(),
            timeout_ms: 3000,
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    pub default_hours: u32,
    pub breach_percent: u32,
    pub departments: BTreeMap<String, DepartmentSla>,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            default_hours: DEFAULT_SLA_HOURS,
            breach_percent: DEFAULT_BREACH_PERCENT,
            departments: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSla {
    #[serde(default)]
    pub hours: Option<u32>,
    #[serde(default)]
    pub categories: BTreeMap<String, u32>,
}

impl SlaConfig {
    /// SLA hours for a department/category: category entry, then
    /// department entry, then the default with a warning.
    pub fn target_for(&self, department: Option<&str>, category: Option<&str>) -> SlaTarget {
        let dept = department
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case(GENERIC_DEPARTMENT))
            .and_then(|d| lookup(&self.departments, d));
        if let Some(d) = dept {
            let category = category
                .map(str::trim)
                .and_then(|c| lookup(&d.categories, c));
            if let Some(hours) = category {
                return SlaTarget {
                    hours: *hours,
                    defaulted: false,
                };
            }
            if let Some(hours) = d.hours {
                return SlaTarget {
                    hours,
                    defaulted: false,
                };
            }
        }
        tracing::warn!(
            department = department.unwrap_or("-"),
            category = category.unwrap_or("-"),
            hours = self.default_hours,
            "no SLA configured, using default"
        );
        SlaTarget {
            hours: self.default_hours,
            defaulted: true,
        }
    }
}

/// Department and category names match regardless of ASCII case, as in
/// template lookup.
fn lookup<'m, V>(map: &'m BTreeMap<String, V>, key: &str) -> Option<&'m V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Compare-and-swap attempts before a concurrent update is reported.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[classifier]
backend = "http"
endpoint = "http://nlp.internal:8000"
timeout_ms = 1500

[sla]
default_hours = 480

[sla.departments.Pension]
hours = 360

[sla.departments.Pension.categories]
"Pension Delay" = 240

[retry]
max_attempts = 5
"#;

    #[test]
    fn empty_config_uses_defaults() {
        let c = Config::from_toml_str("").unwrap();
        assert_eq!(c.classifier.backend, ClassifierBackend::Keyword);
        assert_eq!(c.classifier.timeout_ms, 3000);
        assert_eq!(c.classifier.confidence_threshold, 0.5);
        assert_eq!(c.sla.default_hours, DEFAULT_SLA_HOURS);
        assert_eq!(c.sla.breach_percent, 100);
        assert_eq!(c.retry.max_attempts, 3);
    }

    #[test]
    fn parses_sections() {
        let c = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(c.classifier.backend, ClassifierBackend::Http);
        assert_eq!(c.classifier.timeout_ms, 1500);
        assert_eq!(c.classifier.confidence_threshold, 0.5);
        assert_eq!(c.retry.max_attempts, 5);
    }

    #[test]
    fn sla_target_prefers_category_then_department() {
        let c = Config::from_toml_str(SAMPLE).unwrap();
        let t = c.sla.target_for(Some("Pension"), Some("Pension Delay"));
        assert_eq!(t, SlaTarget { hours: 240, defaulted: false });
        let t = c.sla.target_for(Some("Pension"), Some("Other"));
        assert_eq!(t, SlaTarget { hours: 360, defaulted: false });
    }

    #[test]
    fn sla_lookup_ignores_case() {
        let c = Config::from_toml_str(SAMPLE).unwrap();
        let t = c.sla.target_for(Some("pension"), None);
        assert_eq!(t, SlaTarget { hours: 360, defaulted: false });
        let t = c.sla.target_for(Some("PENSION "), Some("pension delay"));
        assert_eq!(t, SlaTarget { hours: 240, defaulted: false });
    }

    #[test]
    fn rejects_sla_hours_out_of_range() {
        assert!(Config::from_toml_str("[sla]\ndefault_hours = 4000000000").is_err());
        assert!(Config::from_toml_str("[sla]\ndefault_hours = 0").is_err());
        assert!(Config::from_toml_str("[sla.departments.Pension]\nhours = 87601").is_err());
        let err = Config::from_toml_str(
            "[sla.departments.Pension.categories]\n\"Pension Delay\" = 1000000",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Pension Delay"));
        assert!(Config::from_toml_str("[sla]\ndefault_hours = 87600").is_ok());
    }

    #[test]
    fn missing_sla_falls_back_to_default() {
        let c = Config::from_toml_str(SAMPLE).unwrap();
        let t = c.sla.target_for(Some("Revenue"), None);
        assert_eq!(t, SlaTarget { hours: 480, defaulted: true });
        let t = c.sla.target_for(None, None);
        assert!(t.defaulted);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_toml_str("[classifier]\nconfidence_threshold = 1.5").is_err());
        assert!(Config::from_toml_str("[retry]\nmax_attempts = 0").is_err());
        assert!(Config::from_toml_str("[classifier]\nbackend = \"http\"\nendpoint = \"\"").is_err());
        assert!(Config::from_toml_str("[unknown]\nx = 1").is_err());
    }
}
