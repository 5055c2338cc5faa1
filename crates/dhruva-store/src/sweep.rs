use crate::cases::CaseStore;
use crate::error::StoreError;
use crate::outbox::Outbox;
use chrono::{DateTime, Utc};
use dhruva_core::case::{CaseId, GrievanceCase};
use dhruva_core::catalog::ReferenceCatalog;
use dhruva_core::notification::NotificationEvent;
use dhruva_core::sla::{SlaCheck, SlaEffect, SlaTracker};
use serde::Serialize;

/// What one sweep did to one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseSweep {
    pub case_id: CaseId,
    #[serde(flatten)]
    pub check: SlaCheck,
    pub notifications: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    /// Case id, or the file name when the case file could not be read.
    pub case_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub changed: Vec<CaseSweep>,
    pub failed: Vec<SweepFailure>,
}

/// Run the SLA tracker over every open case at `now`.
///
/// Each case is advanced with a compare-and-swap write; its notifications
/// reach the outbox only after that write lands. Unreadable case files and
/// cases that fail to update are reported as failed and the sweep moves on.
pub fn sweep(
    store: &CaseStore,
    outbox: &Outbox,
    tracker: &SlaTracker,
    reference: &ReferenceCatalog,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<SweepReport, StoreError> {
    let mut report = SweepReport::default();
    let scan = store.scan()?;
    for bad in scan.unreadable {
        tracing::error!(file = %bad.file, error = %bad.error, "skipping unreadable case file");
        report.failed.push(SweepFailure {
            case_id: bad.file,
            error: bad.error.to_string(),
        });
    }
    for case in scan.cases.into_iter().filter(GrievanceCase::is_open) {
        report.checked += 1;
        match sweep_case(store, outbox, tracker, reference, &case.id, max_attempts, now) {
            Ok(Some(done)) => report.changed.push(done),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(case = %case.id, error = %e, "SLA check failed");
                report.failed.push(SweepFailure {
                    case_id: case.id.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    tracing::info!(
        checked = report.checked,
        changed = report.changed.len(),
        failed = report.failed.len(),
        "SLA sweep finished"
    );
    Ok(report)
}

/// Check one case and persist the result; `None` when nothing changed.
pub fn sweep_case(
    store: &CaseStore,
    outbox: &Outbox,
    tracker: &SlaTracker,
    reference: &ReferenceCatalog,
    id: &CaseId,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<Option<CaseSweep>, StoreError> {
    let written = store.update_with_retry(id, max_attempts, |case| {
        let Some(check) = tracker.check(case, now) else {
            return Ok(None);
        };
        if !check.changed() {
            return Ok(None);
        }
        let events = notifications_for(case, &check, reference, now);
        Ok(Some((check, events)))
    })?;
    let Some((_, (check, events))) = written else {
        return Ok(None);
    };
    outbox.append(&events)?;
    Ok(Some(CaseSweep {
        case_id: id.clone(),
        check,
        notifications: events.len(),
    }))
}

fn notifications_for(
    case: &GrievanceCase,
    check: &SlaCheck,
    reference: &ReferenceCatalog,
    now: DateTime<Utc>,
) -> Vec<NotificationEvent> {
    check
        .effects
        .iter()
        .filter_map(|effect| match effect {
            SlaEffect::Notify { trigger } => reference.trigger(*trigger),
            SlaEffect::Escalate { .. } => None,
        })
        .filter(|config| config.enabled)
        .map(|config| NotificationEvent::render_for(case, config, now))
        .collect()
}
