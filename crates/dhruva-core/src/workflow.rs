//! Case lifecycle transitions.
//!
//! Every function takes a working copy of a case; the caller persists it
//! with a compare-and-swap write.

use crate::action::{ActionContext, ActionOutcome, ExecutorRegistry};
use crate::case::{
    CaseEvent, CaseStatus, Classification, ClassificationSource, GrievanceCase, QueueReason,
    RecordedAnswer, TemplateApplication,
};
use crate::catalog::ReferenceCatalog;
use crate::error::CoreError;
use crate::recommend::{Recommendation, Recommender};
use crate::taxonomy::RootCause;
use crate::template::ResolutionTemplate;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of matching a classified case against the reference data.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Triage {
    Recommended(Recommendation),
    NoTemplate { reason: String },
}

/// Record a classifier or operator verdict on the case.
pub fn classify(
    case: &mut GrievanceCase,
    department: Option<String>,
    root_cause: RootCause,
    confidence: f64,
    source: ClassificationSource,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    case.ensure_open("be classified")?;
    let department = department.filter(|d| !d.trim().is_empty());
    if department.is_some() && case.department.is_none() {
        case.department = department.clone();
    }
    let detail = format!(
        "{} ({:?}, confidence {:.2})",
        root_cause, source, confidence
    );
    case.root_cause = Some(root_cause.clone());
    case.classification = Some(Classification {
        department,
        root_cause,
        confidence,
        source,
        classified_at: now,
    });
    case.clear_queue(QueueReason::ManualClassification);
    case.record(CaseEvent::Classified, detail, now);
    case.touch(now);
    tracing::info!(case = %case.id, source = ?source, confidence, "case classified");
    Ok(())
}

/// Send an unclassifiable case to the manual routing queue.
pub fn route_to_manual(case: &mut GrievanceCase, reason: &str, now: DateTime<Utc>) {
    tracing::warn!(case = %case.id, %reason, "case routed to manual classification");
    case.queue_for_operator(QueueReason::ManualClassification, reason, now);
}

/// Pick the template and pending questions for a classified case and set
/// its status.
///
/// Questions pending or no template: Clarifying. Otherwise InProgress.
/// Escalated cases keep their status. A missing template queues the case
/// for an operator instead of failing.
pub fn triage(
    case: &mut GrievanceCase,
    recommender: &Recommender<'_>,
    now: DateTime<Utc>,
) -> Result<Triage, CoreError> {
    case.ensure_open("be triaged")?;
    let root_cause = case.root_cause.clone().ok_or_else(|| CoreError::InvalidTransition {
        case_id: case.id.to_string(),
        status: "unclassified".into(),
        action: "be triaged".into(),
    })?;
    let result = recommender.recommend(
        case.department.as_deref(),
        case.category.as_deref(),
        &root_cause,
        &case.answered_ids(),
    );
    match result {
        Ok(rec) => {
            let next = if rec.questions.is_empty() {
                CaseStatus::InProgress
            } else {
                CaseStatus::Clarifying
            };
            set_status(case, next, now);
            case.clear_queue(QueueReason::NoTemplateFound);
            Ok(Triage::Recommended(rec))
        }
        Err(e @ CoreError::NoTemplateFound { .. }) => {
            let reason = e.to_string();
            set_status(case, CaseStatus::Clarifying, now);
            if !case.queued_for(QueueReason::NoTemplateFound) {
                case.queue_for_operator(QueueReason::NoTemplateFound, reason.clone(), now);
            }
            Ok(Triage::NoTemplate { reason })
        }
        Err(e) => Err(e),
    }
}

/// Validate and record one clarification answer, replacing any earlier
/// answer to the same question.
pub fn answer(
    case: &mut GrievanceCase,
    catalog: &ReferenceCatalog,
    question_id: u32,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<RecordedAnswer, CoreError> {
    case.ensure_open("take answers")?;
    let question = catalog
        .question(question_id)
        .filter(|q| q.active)
        .ok_or(CoreError::UnknownQuestion(question_id))?;
    if case.root_cause.as_ref() != Some(&question.root_cause) {
        return Err(CoreError::InvalidAnswer {
            question_id,
            reason: format!(
                "question is for {}, case root cause is {}",
                question.root_cause,
                case.root_cause
                    .as_ref()
                    .map_or("unclassified", |r| r.as_str())
            ),
        });
    }
    let value = question.validate_answer(raw)?;
    let recorded = RecordedAnswer {
        question_id,
        value,
        answered_at: now,
    };
    case.answers.retain(|a| a.question_id != question_id);
    case.answers.push(recorded.clone());
    case.record(
        CaseEvent::Answered,
        format!("question {}: {}", question_id, recorded.value),
        now,
    );
    case.touch(now);
    Ok(recorded)
}

/// Run a template's action steps and record the application.
pub fn apply_template(
    case: &mut GrievanceCase,
    template: &ResolutionTemplate,
    registry: &ExecutorRegistry,
    officer: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ActionOutcome>, CoreError> {
    case.ensure_open("have a template applied")?;
    if !template.active {
        return Err(CoreError::TemplateNotFound(template.key.to_string()));
    }
    let ctx = ActionContext {
        case_id: case.id.clone(),
        template_key: template.key.clone(),
        officer: officer.to_string(),
    };
    let outcomes = registry.run(&ctx, template);
    case.applied_templates.push(TemplateApplication {
        template_key: template.key.clone(),
        officer: officer.to_string(),
        actions: outcomes.clone(),
        applied_at: now,
    });
    case.record(
        CaseEvent::TemplateApplied,
        format!("{} by {}", template.key, officer),
        now,
    );
    set_status(case, CaseStatus::InProgress, now);
    case.clear_queue(QueueReason::NoTemplateFound);
    case.touch(now);
    Ok(outcomes)
}

pub fn resolve(case: &mut GrievanceCase, officer: &str, note: &str, now: DateTime<Utc>) -> Result<(), CoreError> {
    case.ensure_open("be resolved")?;
    case.status = CaseStatus::Resolved;
    case.operator_queue = None;
    let detail = if note.trim().is_empty() {
        format!("resolved by {}", officer)
    } else {
        format!("resolved by {}: {}", officer, note.trim())
    };
    case.record(CaseEvent::Resolved, detail, now);
    case.touch(now);
    tracing::info!(case = %case.id, %officer, "case resolved");
    Ok(())
}

/// Escalated stays Escalated; Resolved is handled by `ensure_open`.
fn set_status(case: &mut GrievanceCase, next: CaseStatus, now: DateTime<Utc>) {
    if case.status == CaseStatus::Escalated || case.status == next {
        return;
    }
    tracing::info!(case = %case.id, from = %case.status, to = %next, "status changed");
    case.status = next;
    case.updated_at = now;
}
