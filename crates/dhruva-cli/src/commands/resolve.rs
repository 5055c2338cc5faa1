use anyhow::{bail, Result};
use chrono::Utc;
use dhruva_core::workflow;

pub fn run(id: String, note: String, officer: Option<String>, json: bool) -> Result<()> {
    let officer = super::officer(officer)?;
    let repo = super::open_repo()?;
    let id = super::case_id(&id)?;
    let now = Utc::now();

    let written = repo
        .cases
        .update_with_retry(&id, repo.config().retry.max_attempts, |case| {
            workflow::resolve(case, &officer, &note, now)?;
            Ok(Some(()))
        })?;
    let Some((case, ())) = written else {
        bail!("case {} was not updated", id);
    };

    if json {
        return super::print_json(&case);
    }
    println!("Resolved {}", case.id);
    Ok(())
}
