use crate::action::ActionOutcome;
use crate::error::CoreError;
use crate::sla::{SlaProgress, SlaTarget};
use crate::taxonomy::{AnswerValue, Language, RootCause};
use crate::template::TemplateKey;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A repeat filing within this many days counts as a duplicate.
pub const DUPLICATE_WINDOW_DAYS: i64 = 30;

/// Confidence recorded when a case is classified as a repeat filing.
pub const DUPLICATE_CONFIDENCE: f64 = 0.95;

/// Case identifier such as `PGRS-2025-GTR-00001`.
///
/// Used as a file name by the case store, so only ASCII letters, digits,
/// `-` and `_` are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    pub fn parse(id: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidCaseId(id.to_string(), reason.to_string());
        if id.is_empty() {
            return Err(invalid("case id cannot be empty"));
        }
        if id.len() > 64 {
            return Err(invalid("case id longer than 64 characters"));
        }
        if id.starts_with('-') || id.starts_with('_') {
            return Err(invalid("case id must start with a letter or digit"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("only letters, digits, '-' and '_' are allowed"));
        }
        Ok(Self(id.to_string()))
    }

    /// Build the standard `PGRS-<year>-<district>-<seq>` form.
    pub fn standard(year: i32, district: &str, seq: u32) -> Result<Self, CoreError> {
        Self::parse(&format!("PGRS-{}-{}-{:05}", year, district.to_uppercase(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CaseId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CaseId> for String {
    fn from(value: CaseId) -> Self {
        value.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Registered,
    Clarifying,
    InProgress,
    Resolved,
    Escalated,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Clarifying => "clarifying",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
        }
    }

    /// The coarse status shown to citizens.
    pub fn public_status(&self) -> PublicStatus {
        match self {
            Self::Registered => PublicStatus::Registered,
            Self::Clarifying | Self::InProgress => PublicStatus::InProgress,
            Self::Resolved => PublicStatus::Resolved,
            Self::Escalated => PublicStatus::Escalated,
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "registered" => Ok(Self::Registered),
            "clarifying" => Ok(Self::Clarifying),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "escalated" => Ok(Self::Escalated),
            other => Err(CoreError::Configuration(format!(
                "unknown case status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicStatus {
    Registered,
    InProgress,
    Resolved,
    Escalated,
}

impl PublicStatus {
    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Registered, Language::En) => "Registered",
            (Self::InProgress, Language::En) => "In Progress",
            (Self::Resolved, Language::En) => "Resolved",
            (Self::Escalated, Language::En) => "Escalated",
            (Self::Registered, Language::Te) => "నమోదు చేయబడింది",
            (Self::InProgress, Language::Te) => "పురోగతిలో ఉంది",
            (Self::Resolved, Language::Te) => "పరిష్కరించబడింది",
            (Self::Escalated, Language::Te) => "ఉన్నతాధికారులకు పంపబడింది",
        }
    }
}

/// Administrative level currently responsible for a case.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityTier {
    #[default]
    Mandal,
    Division,
    District,
    State,
}

impl AuthorityTier {
    /// One tier up; State is the ceiling.
    pub fn next(self) -> Self {
        match self {
            Self::Mandal => Self::Division,
            Self::Division => Self::District,
            Self::District | Self::State => Self::State,
        }
    }
}

impl fmt::Display for AuthorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mandal => "mandal",
            Self::Division => "division",
            Self::District => "district",
            Self::State => "state",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    Operator,
    /// Matched an earlier filing by the same citizen.
    DuplicateCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub root_cause: RootCause,
    pub confidence: f64,
    pub source: ClassificationSource,
    pub classified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    pub question_id: u32,
    pub value: AnswerValue,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateApplication {
    pub template_key: TemplateKey,
    pub officer: String,
    pub actions: Vec<ActionOutcome>,
    pub applied_at: DateTime<Utc>,
}

/// Why a case is waiting for a human operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    ManualClassification,
    NoTemplateFound,
}

impl fmt::Display for QueueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualClassification => f.write_str("manual_classification"),
            Self::NoTemplateFound => f.write_str("no_template_found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub reason: QueueReason,
    pub detail: String,
    pub queued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseEvent {
    Filed,
    Classified,
    QueuedForOperator,
    Answered,
    TemplateApplied,
    Notified,
    Escalated,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: CaseEvent,
    pub detail: String,
}

/// Fields supplied when a citizen files a grievance.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub id: CaseId,
    pub description: String,
    pub department: Option<String>,
    pub category: Option<String>,
    pub citizen_phone: Option<String>,
    pub preferred_language: Language,
    pub filed_at: DateTime<Utc>,
    pub sla_target: SlaTarget,
}

/// One citizen complaint and its triage state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrievanceCase {
    pub id: CaseId,
    pub version: u64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<RootCause>,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last change a citizen would see as progress. SLA sweeps do not move it.
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citizen_phone: Option<String>,
    #[serde(default)]
    pub preferred_language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<RecordedAnswer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_templates: Vec<TemplateApplication>,
    pub sla_target: SlaTarget,
    #[serde(default)]
    pub sla: SlaProgress,
    #[serde(default)]
    pub authority_tier: AuthorityTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_queue: Option<QueueEntry>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl GrievanceCase {
    pub fn new(new: NewCase) -> Self {
        let at = new.filed_at;
        let mut case = Self {
            id: new.id,
            version: 0,
            description: new.description,
            department: new.department.filter(|d| !d.trim().is_empty()),
            category: new.category.filter(|c| !c.trim().is_empty()),
            root_cause: None,
            status: CaseStatus::Registered,
            created_at: at,
            updated_at: at,
            last_activity_at: at,
            citizen_phone: new.citizen_phone,
            preferred_language: new.preferred_language,
            classification: None,
            answers: Vec::new(),
            applied_templates: Vec::new(),
            sla_target: new.sla_target,
            sla: SlaProgress::default(),
            authority_tier: AuthorityTier::default(),
            operator_queue: None,
            history: Vec::new(),
        };
        case.record(CaseEvent::Filed, "grievance registered", at);
        case
    }

    pub fn is_open(&self) -> bool {
        self.status != CaseStatus::Resolved
    }

    /// Saturates at the latest representable time for windows a hand-edited
    /// case file can carry past the config limit.
    pub fn sla_deadline(&self) -> DateTime<Utc> {
        Duration::try_hours(i64::from(self.sla_target.hours))
            .and_then(|window| self.created_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Elapsed share of the SLA window; may exceed 1.0 once breached.
    pub fn elapsed_fraction(&self, now: DateTime<Utc>) -> f64 {
        let sla_secs = i64::from(self.sla_target.hours) * 3600;
        if sla_secs == 0 {
            return 1.0;
        }
        let elapsed = (now - self.created_at).num_seconds().max(0);
        elapsed as f64 / sla_secs as f64
    }

    /// Whether `earlier` is a prior filing by the same citizen phone to
    /// the same department, at most [`DUPLICATE_WINDOW_DAYS`] before this
    /// one. Cases filed at the same instant are ordered by id.
    pub fn repeats(&self, earlier: &GrievanceCase) -> bool {
        if earlier.id == self.id {
            return false;
        }
        let phone = |c: &GrievanceCase| {
            c.citizen_phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };
        let (Some(mine), Some(theirs)) = (phone(self), phone(earlier)) else {
            return false;
        };
        let same_department = match (self.department.as_deref(), earlier.department.as_deref()) {
            (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
            _ => false,
        };
        if mine != theirs || !same_department {
            return false;
        }
        let before = earlier.created_at < self.created_at
            || (earlier.created_at == self.created_at && earlier.id < self.id);
        before && self.created_at - earlier.created_at <= Duration::days(DUPLICATE_WINDOW_DAYS)
    }

    pub fn answered_ids(&self) -> BTreeSet<u32> {
        self.answers.iter().map(|a| a.question_id).collect()
    }

    /// Append to the audit trail.
    pub fn record(&mut self, event: CaseEvent, detail: impl Into<String>, at: DateTime<Utc>) {
        self.history.push(HistoryEntry {
            at,
            event,
            detail: detail.into(),
        });
        self.updated_at = at;
    }

    /// Mark citizen-visible progress; resets the no-update clock.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = at;
        self.updated_at = at;
    }

    pub fn queue_for_operator(&mut self, reason: QueueReason, detail: impl Into<String>, at: DateTime<Utc>) {
        let detail = detail.into();
        self.record(CaseEvent::QueuedForOperator, format!("{}: {}", reason, detail), at);
        self.operator_queue = Some(QueueEntry {
            reason,
            detail,
            queued_at: at,
        });
    }

    /// Drop the queue entry if it was queued for `reason`.
    pub fn clear_queue(&mut self, reason: QueueReason) {
        if self.queued_for(reason) {
            self.operator_queue = None;
        }
    }

    pub fn queued_for(&self, reason: QueueReason) -> bool {
        self.operator_queue.as_ref().is_some_and(|q| q.reason == reason)
    }

    pub fn ensure_open(&self, action: &str) -> Result<(), CoreError> {
        if self.is_open() {
            return Ok(());
        }
        Err(CoreError::InvalidTransition {
            case_id: self.id.to_string(),
            status: self.status.to_string(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn filed_case(hours: u32) -> GrievanceCase {
        GrievanceCase::new(NewCase {
            id: CaseId::parse("PGRS-2025-GTR-00001").unwrap(),
            description: "Pension not received for three months".into(),
            department: Some("Pension".into()),
            category: Some("Pension Delay".into()),
            citizen_phone: None,
            preferred_language: Language::Te,
            filed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            sla_target: SlaTarget {
                hours,
                defaulted: false,
            },
        })
    }

    #[test]
    fn case_id_rules() {
        assert!(CaseId::parse("PGRS-2025-GTR-00001").is_ok());
        assert_eq!(
            CaseId::standard(2025, "gtr", 42).unwrap().as_str(),
            "PGRS-2025-GTR-00042"
        );
        for bad in ["", "../etc", "a/b", ".hidden", "-x", "has space"] {
            assert!(CaseId::parse(bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn clarifying_is_in_progress_for_citizens() {
        assert_eq!(CaseStatus::Clarifying.public_status(), PublicStatus::InProgress);
        assert_eq!(CaseStatus::InProgress.public_status(), PublicStatus::InProgress);
        assert_eq!(CaseStatus::Registered.public_status(), PublicStatus::Registered);
    }

    #[test]
    fn status_parses_cli_spellings() {
        assert_eq!("in-progress".parse::<CaseStatus>().unwrap(), CaseStatus::InProgress);
        assert_eq!("Resolved".parse::<CaseStatus>().unwrap(), CaseStatus::Resolved);
        assert!("closed".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn tier_saturates_at_state() {
        assert_eq!(AuthorityTier::Mandal.next(), AuthorityTier::Division);
        assert_eq!(AuthorityTier::District.next(), AuthorityTier::State);
        assert_eq!(AuthorityTier::State.next(), AuthorityTier::State);
    }

    #[test]
    fn deadline_and_fraction() {
        let case = filed_case(100);
        assert_eq!(case.sla_deadline(), case.created_at + Duration::hours(100));
        let later = case.created_at + Duration::hours(85);
        assert!((case.elapsed_fraction(later) - 0.85).abs() < 1e-9);
        let before = case.created_at - Duration::hours(1);
        assert_eq!(case.elapsed_fraction(before), 0.0);
    }

    #[test]
    fn repeat_filing_by_same_citizen_and_department() {
        let mut first = filed_case(240);
        first.citizen_phone = Some("9876543210".into());
        let mut second = first.clone();
        second.id = CaseId::parse("PGRS-2025-GTR-00002").unwrap();
        second.created_at = first.created_at + Duration::days(30);

        assert!(second.repeats(&first));
        assert!(!first.repeats(&second));
        assert!(!first.repeats(&first));

        second.department = Some("pension ".into());
        assert!(second.repeats(&first));

        let mut late = second.clone();
        late.created_at = first.created_at + Duration::days(31);
        assert!(!late.repeats(&first));

        let mut other_dept = second.clone();
        other_dept.department = Some("Revenue".into());
        assert!(!other_dept.repeats(&first));

        let mut no_phone = second.clone();
        no_phone.citizen_phone = None;
        assert!(!no_phone.repeats(&first));
    }

    #[test]
    fn same_instant_filings_order_by_id() {
        let mut first = filed_case(240);
        first.citizen_phone = Some("9876543210".into());
        let mut second = first.clone();
        second.id = CaseId::parse("PGRS-2025-GTR-00002").unwrap();
        assert!(second.repeats(&first));
        assert!(!first.repeats(&second));
    }

    #[test]
    fn oversized_window_saturates_deadline() {
        let mut case = filed_case(100);
        case.sla_target.hours = 4_000_000_000;
        assert_eq!(case.sla_deadline(), DateTime::<Utc>::MAX_UTC);
        let ctx = crate::notification::MessageContext::for_case(&case, case.created_at);
        assert!(ctx.days_remaining > 0);
    }

    #[test]
    fn new_case_records_filing() {
        let case = filed_case(720);
        assert_eq!(case.status, CaseStatus::Registered);
        assert_eq!(case.history.len(), 1);
        assert_eq!(case.history[0].event, CaseEvent::Filed);
        assert_eq!(case.version, 0);
    }

    #[test]
    fn resolved_case_rejects_changes() {
        let mut case = filed_case(720);
        case.status = CaseStatus::Resolved;
        let err = case.ensure_open("apply a template").unwrap_err();
        assert!(err.to_string().contains("is resolved"));
    }

    #[test]
    fn case_json_roundtrip_keeps_version() {
        let mut case = filed_case(720);
        case.version = 4;
        let json = serde_json::to_string(&case).unwrap();
        let back: GrievanceCase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, case);
    }
}
