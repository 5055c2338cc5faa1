use anyhow::{bail, Result};
use dhruva_core::recommend::Recommender;
use dhruva_core::taxonomy::Language;

pub fn run(id: String, language: Option<String>, json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let id = super::case_id(&id)?;
    let reference = repo.reference()?;
    let case = repo.cases.read(&id)?;
    let Some(root_cause) = &case.root_cause else {
        bail!("case {} is not classified yet", case.id);
    };
    let language: Language = match language {
        Some(l) => l.parse()?,
        None => case.preferred_language,
    };

    let pending = Recommender::new(&reference).next_questions(
        root_cause,
        case.department.as_deref(),
        case.category.as_deref(),
        &case.answered_ids(),
    );

    if json {
        return super::print_json(&pending);
    }
    if pending.is_empty() {
        println!("No clarifying questions pending for {}.", case.id);
        return Ok(());
    }
    for q in &pending {
        super::recommend::print_question(q, language);
    }
    Ok(())
}
