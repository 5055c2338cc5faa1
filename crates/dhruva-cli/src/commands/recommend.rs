use anyhow::{bail, Result};
use chrono::Utc;
use dhruva_core::recommend::{Recommendation, Recommender};
use dhruva_core::taxonomy::{InterventionQuestion, Language, RootCause};
use dhruva_core::workflow::{self, Triage};
use std::collections::BTreeSet;

pub fn run(
    id: Option<String>,
    root_cause: Option<String>,
    department: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let repo = super::open_repo()?;
    let reference = repo.reference()?;
    let recommender = Recommender::new(&reference);

    let Some(id) = id else {
        let Some(root_cause) = root_cause else {
            bail!("give a case id or --root-cause");
        };
        let rec = recommender.recommend(
            department.as_deref(),
            category.as_deref(),
            &RootCause::parse(&root_cause)?,
            &BTreeSet::new(),
        )?;
        if json {
            return super::print_json(&rec);
        }
        print_recommendation(&rec, Language::En);
        return Ok(());
    };

    let id = super::case_id(&id)?;
    let now = Utc::now();
    // A re-run that leaves status and queue as they were writes nothing.
    let mut unchanged = None;
    let written = repo
        .cases
        .update_with_retry(&id, repo.config().retry.max_attempts, |case| {
            let before = (case.status, case.operator_queue.clone());
            let triage = workflow::triage(case, &recommender, now)?;
            if before == (case.status, case.operator_queue.clone()) {
                unchanged = Some((case.clone(), triage));
                return Ok(None);
            }
            Ok(Some(triage))
        })?;
    let Some((case, triage)) = written.or(unchanged) else {
        bail!("case {} was not updated", id);
    };

    if json {
        return super::print_json(&serde_json::json!({
            "case_id": case.id,
            "status": case.status,
            "triage": triage,
        }));
    }
    print_triage(&triage, case.preferred_language);
    println!("Status: {}", case.status);
    Ok(())
}

pub fn print_triage(triage: &Triage, language: Language) {
    match triage {
        Triage::Recommended(rec) => print_recommendation(rec, language),
        Triage::NoTemplate { reason } => {
            println!("No resolution template: {}", reason);
            println!("Case queued for an operator.");
        }
    }
}

pub fn print_recommendation(rec: &Recommendation, language: Language) {
    let t = &rec.template;
    println!("Template: {} - {} ({})", t.key, t.title, rec.specificity);
    println!(
        "  success rate {}%, avg {} h, {} similar cases resolved",
        t.success_rate, t.avg_resolution_hours, t.similar_cases_resolved
    );
    for step in &t.action_steps {
        println!("  {}. {:<28} {}", step.step, step.action.as_str(), step.description);
    }
    if !rec.alternatives.is_empty() {
        let alts: Vec<&str> = rec.alternatives.iter().map(|k| k.as_str()).collect();
        println!("  alternatives: {}", alts.join(", "));
    }
    if rec.questions.is_empty() {
        println!("No clarifying questions pending.");
    } else {
        println!("Clarifying questions:");
        for q in &rec.questions {
            print_question(q, language);
        }
    }
}

pub fn print_question(q: &InterventionQuestion, language: Language) {
    let required = if q.required { "" } else { ", optional" };
    println!(
        "  [{}] {} ({:?}{})",
        q.id,
        q.text(language),
        q.response_type,
        required
    );
    if !q.choices.is_empty() {
        println!("      choices: {}", q.choices.join(" / "));
    }
}
