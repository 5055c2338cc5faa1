use crate::error::CoreError;
use crate::hash::Fingerprint;
use crate::notification::{TriggerConfig, TriggerType};
use crate::serialize::fingerprint_sections;
use crate::taxonomy::{InterventionQuestion, ResponseType, RootCause, GENERIC_CATEGORY, GENERIC_DEPARTMENT};
use crate::template::ResolutionTemplate;
use std::collections::{BTreeMap, BTreeSet};

/// Read-only access to reference data.
///
/// Implemented by [`ReferenceCatalog`]; tests supply in-memory fixtures.
pub trait ReferenceSource: Send + Sync {
    fn questions(&self) -> &[InterventionQuestion];
    fn templates(&self) -> &[ResolutionTemplate];
    fn triggers(&self) -> &[TriggerConfig];
}

/// Validated, immutable reference data shared by every component.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    questions: Vec<InterventionQuestion>,
    templates: Vec<ResolutionTemplate>,
    triggers: Vec<TriggerConfig>,
    fingerprint: Fingerprint,
}

impl ReferenceCatalog {
    /// Normalize and validate reference rows.
    ///
    /// Fails when ids or keys repeat, a template is malformed, a choice
    /// question has no choices, a trigger type appears twice, or a root
    /// cause in use has no generic fallback template.
    pub fn new(
        mut questions: Vec<InterventionQuestion>,
        mut templates: Vec<ResolutionTemplate>,
        mut triggers: Vec<TriggerConfig>,
    ) -> Result<Self, CoreError> {
        for q in &mut questions {
            q.department = normalize_department(q.department.take());
            q.category = q
                .category
                .take()
                .filter(|c| !c.trim().is_empty() && c != GENERIC_CATEGORY);
        }
        for t in &mut templates {
            t.department = normalize_department(t.department.take());
            t.category = t.category.take().filter(|c| !c.trim().is_empty());
        }

        questions.sort_by_key(|q| q.id);
        templates.sort_by(|a, b| a.key.cmp(&b.key));
        triggers.sort_by_key(|t| t.trigger_type);

        validate_questions(&questions)?;
        validate_templates(&templates)?;
        validate_triggers(&triggers)?;
        validate_generic_coverage(&questions, &templates)?;

        let fingerprint = fingerprint_sections(&[
            ("questions", serde_json::to_value(&questions)?),
            ("templates", serde_json::to_value(&templates)?),
            ("triggers", serde_json::to_value(&triggers)?),
        ])?;

        tracing::debug!(
            questions = questions.len(),
            templates = templates.len(),
            triggers = triggers.len(),
            fingerprint = %fingerprint,
            "reference catalog loaded"
        );

        Ok(Self {
            questions,
            templates,
            triggers,
            fingerprint,
        })
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn question(&self, id: u32) -> Option<&InterventionQuestion> {
        self.questions
            .binary_search_by_key(&id, |q| q.id)
            .ok()
            .map(|i| &self.questions[i])
    }

    pub fn template(&self, key: &str) -> Option<&ResolutionTemplate> {
        self.templates.iter().find(|t| t.key.as_str() == key)
    }

    pub fn trigger(&self, trigger_type: TriggerType) -> Option<&TriggerConfig> {
        self.triggers.iter().find(|t| t.trigger_type == trigger_type)
    }

    /// Root causes referenced by any active row, sorted.
    pub fn root_causes(&self) -> BTreeSet<RootCause> {
        self.questions
            .iter()
            .filter(|q| q.active)
            .map(|q| q.root_cause.clone())
            .chain(
                self.templates
                    .iter()
                    .filter(|t| t.active)
                    .map(|t| t.root_cause.clone()),
            )
            .collect()
    }
}

impl ReferenceSource for ReferenceCatalog {
    fn questions(&self) -> &[InterventionQuestion] {
        &self.questions
    }

    fn templates(&self) -> &[ResolutionTemplate] {
        &self.templates
    }

    fn triggers(&self) -> &[TriggerConfig] {
        &self.triggers
    }
}

/// `"General"` and empty strings mean "any department".
fn normalize_department(department: Option<String>) -> Option<String> {
    department.filter(|d| !d.trim().is_empty() && d != GENERIC_DEPARTMENT)
}

/// True for rows in the department-agnostic fallback set.
pub fn is_generic(template: &ResolutionTemplate) -> bool {
    template.department.is_none()
        && template
            .category
            .as_deref()
            .map_or(true, |c| c == GENERIC_CATEGORY)
}

fn validate_questions(questions: &[InterventionQuestion]) -> Result<(), CoreError> {
    let mut seen = BTreeSet::new();
    for q in questions {
        if !seen.insert(q.id) {
            return Err(CoreError::Configuration(format!(
                "duplicate question id {}",
                q.id
            )));
        }
        if q.text_en.trim().is_empty() || q.text_te.trim().is_empty() {
            return Err(CoreError::Configuration(format!(
                "question {} needs both English and Telugu text",
                q.id
            )));
        }
        let needs_choices = matches!(
            q.response_type,
            ResponseType::SingleChoice | ResponseType::MultipleChoice
        );
        if needs_choices && q.choices.is_empty() {
            return Err(CoreError::Configuration(format!(
                "question {} is a choice question without choices",
                q.id
            )));
        }
    }
    Ok(())
}

fn validate_templates(templates: &[ResolutionTemplate]) -> Result<(), CoreError> {
    let mut seen = BTreeSet::new();
    for t in templates {
        if !seen.insert(t.key.as_str()) {
            return Err(CoreError::Configuration(format!(
                "duplicate template key {}",
                t.key
            )));
        }
        t.validate()?;
    }
    Ok(())
}

fn validate_triggers(triggers: &[TriggerConfig]) -> Result<(), CoreError> {
    let mut seen = BTreeSet::new();
    for t in triggers {
        if !seen.insert(t.trigger_type) {
            return Err(CoreError::Configuration(format!(
                "trigger {} configured twice",
                t.trigger_type
            )));
        }
        let in_range = match t.trigger_type {
            TriggerType::Sla50Percent | TriggerType::SlaApproaching => {
                (1..100).contains(&t.threshold_value)
            }
            TriggerType::NoUpdateNDays => t.threshold_value >= 1,
        };
        if !in_range {
            return Err(CoreError::Configuration(format!(
                "trigger {} has out-of-range threshold {}",
                t.trigger_type, t.threshold_value
            )));
        }
    }
    Ok(())
}

/// Every root cause in use must reach a generic template.
fn validate_generic_coverage(
    questions: &[InterventionQuestion],
    templates: &[ResolutionTemplate],
) -> Result<(), CoreError> {
    let mut covered: BTreeMap<&RootCause, bool> = BTreeMap::new();
    for q in questions.iter().filter(|q| q.active) {
        covered.entry(&q.root_cause).or_insert(false);
    }
    for t in templates.iter().filter(|t| t.active) {
        let generic = is_generic(t);
        let entry = covered.entry(&t.root_cause).or_insert(false);
        *entry |= generic;
    }
    let missing: Vec<&str> = covered
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(rc, _)| rc.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::Configuration(format!(
            "no generic ({}/{}) template for root cause(s): {}",
            GENERIC_DEPARTMENT,
            GENERIC_CATEGORY,
            missing.join(", ")
        )));
    }
    Ok(())
}
