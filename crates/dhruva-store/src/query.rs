//! Query functions for filtering stored cases

use dhruva_core::case::{CaseStatus, GrievanceCase, QueueReason};
use dhruva_core::taxonomy::RootCause;

use crate::cases::CaseStore;
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub department: Option<String>,
    pub root_cause: Option<RootCause>,
    pub queue: Option<QueueReason>,
    pub open_only: bool,
}

impl CaseFilter {
    pub fn matches(&self, case: &GrievanceCase) -> bool {
        if self.open_only && !case.is_open() {
            return false;
        }
        if let Some(status) = self.status {
            if case.status != status {
                return false;
            }
        }
        if let Some(department) = &self.department {
            let same = case
                .department
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(department));
            if !same {
                return false;
            }
        }
        if let Some(rc) = &self.root_cause {
            if case.root_cause.as_ref() != Some(rc) {
                return false;
            }
        }
        if let Some(reason) = self.queue {
            if !case.queued_for(reason) {
                return false;
            }
        }
        true
    }
}

/// Cases matching `filter`, most recently filed first.
pub fn query_cases(store: &CaseStore, filter: &CaseFilter) -> Result<Vec<GrievanceCase>, StoreError> {
    let mut results: Vec<GrievanceCase> = store
        .list()?
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect();
    results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(results)
}

/// Cases waiting for an operator, oldest queue entry first.
pub fn operator_queue(
    store: &CaseStore,
    reason: Option<QueueReason>,
) -> Result<Vec<GrievanceCase>, StoreError> {
    let mut results: Vec<GrievanceCase> = store
        .list()?
        .into_iter()
        .filter(|c| c.is_open())
        .filter(|c| match (&c.operator_queue, reason) {
            (Some(entry), Some(r)) => entry.reason == r,
            (Some(_), None) => true,
            (None, _) => false,
        })
        .collect();
    results.sort_by_key(|c| {
        (
            c.operator_queue.as_ref().map(|q| q.queued_at),
            c.id.clone(),
        )
    });
    Ok(results)
}

/// The most recent earlier filing that `case` repeats, if any.
///
/// Unreadable case files are skipped; they cannot be compared.
pub fn find_duplicate(
    store: &CaseStore,
    case: &GrievanceCase,
) -> Result<Option<GrievanceCase>, StoreError> {
    Ok(store
        .scan()?
        .cases
        .into_iter()
        .filter(|other| case.repeats(other))
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::tests::new_case;
    use chrono::Duration;
    use dhruva_core::case::{CaseId, ClassificationSource};
    use dhruva_core::workflow;

    fn store_with_cases(dir: &std::path::Path) -> CaseStore {
        let store = CaseStore::new(dir);

        let mut a = new_case("PGRS-2025-GTR-00001");
        let filed = a.created_at;
        workflow::route_to_manual(&mut a, "classifier timed out", filed + Duration::hours(2));
        store.create(&a).unwrap();

        let mut b = new_case("PGRS-2025-GTR-00002");
        b.created_at = filed + Duration::hours(1);
        b.department = Some("Revenue".into());
        workflow::classify(
            &mut b,
            None,
            RootCause::parse("NEEDS_FIELD_VISIT").unwrap(),
            0.91,
            ClassificationSource::Model,
            filed + Duration::hours(1),
        )
        .unwrap();
        store.create(&b).unwrap();

        let mut c = new_case("PGRS-2025-GTR-00003");
        c.created_at = filed + Duration::hours(3);
        workflow::route_to_manual(&mut c, "low confidence", filed + Duration::hours(1));
        workflow::resolve(&mut c, "officer-1", "", filed + Duration::hours(4)).unwrap();
        store.create(&c).unwrap();

        let mut d = new_case("PGRS-2025-GTR-00004");
        d.created_at = filed + Duration::hours(4);
        workflow::route_to_manual(&mut d, "low confidence", filed + Duration::hours(1));
        store.create(&d).unwrap();

        store
    }

    fn ids(cases: &[GrievanceCase]) -> Vec<&str> {
        cases.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn newest_first_without_filters() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_cases(dir.path());
        let all = query_cases(&store, &CaseFilter::default()).unwrap();
        assert_eq!(
            ids(&all),
            vec![
                "PGRS-2025-GTR-00004",
                "PGRS-2025-GTR-00003",
                "PGRS-2025-GTR-00002",
                "PGRS-2025-GTR-00001"
            ]
        );
    }

    #[test]
    fn filters_combine() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_cases(dir.path());
        let filter = CaseFilter {
            department: Some("revenue".into()),
            root_cause: Some(RootCause::parse("NEEDS_FIELD_VISIT").unwrap()),
            ..CaseFilter::default()
        };
        assert_eq!(ids(&query_cases(&store, &filter).unwrap()), vec!["PGRS-2025-GTR-00002"]);

        let open = CaseFilter {
            open_only: true,
            ..CaseFilter::default()
        };
        assert_eq!(query_cases(&store, &open).unwrap().len(), 3);

        let resolved = CaseFilter {
            status: Some(CaseStatus::Resolved),
            ..CaseFilter::default()
        };
        assert_eq!(ids(&query_cases(&store, &resolved).unwrap()), vec!["PGRS-2025-GTR-00003"]);
    }

    #[test]
    fn duplicate_is_latest_earlier_filing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_cases(dir.path());
        // 00001, 00003 and 00004 are Pension filings from the same phone
        let latest = store.read(&CaseId::parse("PGRS-2025-GTR-00004").unwrap()).unwrap();
        let found = find_duplicate(&store, &latest).unwrap().unwrap();
        assert_eq!(found.id.as_str(), "PGRS-2025-GTR-00003");

        let first = store.read(&CaseId::parse("PGRS-2025-GTR-00001").unwrap()).unwrap();
        assert!(find_duplicate(&store, &first).unwrap().is_none());

        // 00002 moved to Revenue, nothing earlier there
        let revenue = store.read(&CaseId::parse("PGRS-2025-GTR-00002").unwrap()).unwrap();
        assert!(find_duplicate(&store, &revenue).unwrap().is_none());
    }

    #[test]
    fn queue_is_oldest_entry_first_and_skips_closed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_cases(dir.path());
        let queue = operator_queue(&store, None).unwrap();
        assert_eq!(ids(&queue), vec!["PGRS-2025-GTR-00004", "PGRS-2025-GTR-00001"]);
        let none = operator_queue(&store, Some(QueueReason::NoTemplateFound)).unwrap();
        assert!(none.is_empty());
    }
}
