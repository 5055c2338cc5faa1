use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use dhruva_core::sla::SlaEffect;
use dhruva_store::sweep::sweep;

pub fn run(at: Option<DateTime<Utc>>, json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let reference = repo.reference()?;
    let tracker = repo.sla_tracker(&reference)?;
    let now = at.unwrap_or_else(Utc::now);

    let report = sweep(
        &repo.cases,
        &repo.outbox,
        &tracker,
        &reference,
        repo.config().retry.max_attempts,
        now,
    )?;

    if json {
        super::print_json(&report)?;
    } else {
        println!(
            "Checked {} open case(s) at {}",
            report.checked,
            now.format("%Y-%m-%d %H:%M UTC")
        );
        for done in &report.changed {
            let mut line = format!(
                "  {}  {} -> {} ({:.0}% elapsed), {} notification(s)",
                done.case_id,
                done.check.previous,
                done.check.state,
                done.check.elapsed_fraction * 100.0,
                done.notifications
            );
            for effect in &done.check.effects {
                if let SlaEffect::Escalate { to, .. } = effect {
                    line.push_str(&format!(", escalated to {}", to));
                }
            }
            println!("{}", line);
        }
        for failed in &report.failed {
            eprintln!("  {}  {}", failed.case_id, failed.error);
        }
    }

    if !report.failed.is_empty() {
        bail!(
            "{} case(s) could not be checked",
            report.failed.len()
        );
    }
    Ok(())
}
