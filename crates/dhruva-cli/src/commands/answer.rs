use anyhow::{bail, Result};
use chrono::Utc;
use dhruva_core::recommend::Recommender;
use dhruva_core::workflow::{self, Triage};

pub fn run(id: String, question: u32, value: String, json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let id = super::case_id(&id)?;
    let reference = repo.reference()?;
    let recommender = Recommender::new(&reference);
    let now = Utc::now();

    let written = repo
        .cases
        .update_with_retry(&id, repo.config().retry.max_attempts, |case| {
            let recorded = workflow::answer(case, &reference, question, &value, now)?;
            let triage = workflow::triage(case, &recommender, now)?;
            Ok(Some((recorded, triage)))
        })?;
    let Some((case, (recorded, triage))) = written else {
        bail!("case {} was not updated", id);
    };

    if json {
        return super::print_json(&serde_json::json!({
            "case_id": case.id,
            "answer": recorded,
            "status": case.status,
            "triage": triage,
        }));
    }
    println!("Recorded answer to question {}: {}", question, recorded.value);
    match &triage {
        Triage::Recommended(rec) if rec.questions.is_empty() => {
            println!("All questions answered; recommended template {}", rec.template.key);
        }
        Triage::Recommended(rec) => {
            println!("{} question(s) still pending", rec.questions.len());
        }
        Triage::NoTemplate { reason } => println!("No resolution template: {}", reason),
    }
    println!("Status: {}", case.status);
    Ok(())
}
