use anyhow::Result;
use dhruva_core::case::{CaseStatus, QueueReason};
use dhruva_core::taxonomy::RootCause;
use dhruva_store::query::{operator_queue, query_cases, CaseFilter};

pub fn cases(
    status: Option<String>,
    department: Option<String>,
    root_cause: Option<String>,
    open_only: bool,
    json: bool,
) -> Result<()> {
    let repo = super::open_repo()?;
    let filter = CaseFilter {
        status: status.as_deref().map(str::parse::<CaseStatus>).transpose()?,
        department,
        root_cause: root_cause.as_deref().map(RootCause::parse).transpose()?,
        queue: None,
        open_only,
    };
    let results = query_cases(&repo.cases, &filter)?;

    if json {
        return super::print_json(&results);
    }
    if results.is_empty() {
        println!("No cases.");
        return Ok(());
    }
    for case in &results {
        println!("{}", super::summary_line(case));
    }
    Ok(())
}

pub fn queue(reason: Option<QueueReason>, json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let results = operator_queue(&repo.cases, reason)?;

    if json {
        let entries: Vec<_> = results
            .iter()
            .map(|c| {
                serde_json::json!({
                    "case_id": c.id,
                    "status": c.status,
                    "queue": c.operator_queue,
                })
            })
            .collect();
        return super::print_json(&entries);
    }
    if results.is_empty() {
        println!("Operator queue is empty.");
        return Ok(());
    }
    for case in &results {
        if let Some(entry) = &case.operator_queue {
            println!(
                "{}  {:<21}  {}  {}",
                case.id,
                entry.reason.to_string(),
                entry.queued_at.format("%Y-%m-%d %H:%M"),
                entry.detail
            );
        }
    }
    Ok(())
}
