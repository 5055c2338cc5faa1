use anyhow::{bail, Result};
use chrono::Utc;
use dhruva_core::action::{next_steps, ActionStatus, ExecutorRegistry};
use dhruva_core::error::CoreError;
use dhruva_core::recommend::Recommender;
use dhruva_core::workflow;

pub fn run(id: String, template: Option<String>, officer: Option<String>, json: bool) -> Result<()> {
    let officer = super::officer(officer)?;
    let repo = super::open_repo()?;
    let id = super::case_id(&id)?;
    let reference = repo.reference()?;

    let key = match template {
        Some(key) => key,
        None => {
            let case = repo.cases.read(&id)?;
            let Some(root_cause) = &case.root_cause else {
                bail!("case {} is not classified yet; pass --template", case.id);
            };
            Recommender::new(&reference)
                .recommend(
                    case.department.as_deref(),
                    case.category.as_deref(),
                    root_cause,
                    &case.answered_ids(),
                )?
                .template
                .key
                .to_string()
        }
    };
    let Some(template) = reference.template(&key) else {
        return Err(CoreError::TemplateNotFound(key).into());
    };

    let registry = ExecutorRegistry::default();
    let now = Utc::now();
    let written = repo
        .cases
        .update_with_retry(&id, repo.config().retry.max_attempts, |case| {
            Ok(Some(workflow::apply_template(case, template, &registry, &officer, now)?))
        })?;
    let Some((case, outcomes)) = written else {
        bail!("case {} was not updated", id);
    };

    if json {
        return super::print_json(&serde_json::json!({
            "case_id": case.id,
            "template": template.key,
            "officer": officer,
            "status": case.status,
            "actions": outcomes,
            "next_steps": next_steps(&outcomes),
        }));
    }
    println!("Applied {} to {} ({})", template.key, case.id, template.title);
    for o in &outcomes {
        let mark = match o.status {
            ActionStatus::Completed => "ok",
            ActionStatus::Failed => "FAILED",
        };
        println!("  {}. {:<28} {:<6} {}", o.step, o.action.as_str(), mark, o.message);
    }
    println!("Next steps:");
    for step in next_steps(&outcomes) {
        println!("  - {}", step);
    }
    println!("Status: {}", case.status);
    Ok(())
}
