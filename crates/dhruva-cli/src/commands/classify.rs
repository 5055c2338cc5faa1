use anyhow::Result;
use chrono::Utc;
use dhruva_classify::adapter::{ClassifierAdapter, Routing};
use dhruva_classify::ClassifierOutput;
use dhruva_core::case::{ClassificationSource, QueueReason, DUPLICATE_CONFIDENCE};
use dhruva_core::recommend::Recommender;
use dhruva_core::taxonomy::RootCause;
use dhruva_core::workflow::{self, Triage};
use dhruva_store::query::find_duplicate;

pub fn run(
    id: String,
    root_cause: Option<String>,
    department: Option<String>,
    json: bool,
) -> Result<()> {
    let repo = super::open_repo()?;
    let id = super::case_id(&id)?;
    let reference = repo.reference()?;
    let recommender = Recommender::new(&reference);
    let now = Utc::now();

    // The classifier runs once; only the case write is retried.
    let mut duplicate_of = None;
    let (routing, source, backend) = match root_cause {
        Some(code) => {
            let output = ClassifierOutput {
                department,
                root_cause: RootCause::parse(&code)?,
                confidence: 1.0,
            };
            (Routing::Auto(output), ClassificationSource::Operator, "operator".to_string())
        }
        None => {
            let case = repo.cases.read(&id)?;
            case.ensure_open("be classified")?;
            match find_duplicate(&repo.cases, &case)? {
                Some(earlier) => {
                    tracing::info!(case = %case.id, earlier = %earlier.id, "repeat filing");
                    let output = ClassifierOutput {
                        department: case.department.clone(),
                        root_cause: RootCause::parse("DUPLICATE_CASE")?,
                        confidence: DUPLICATE_CONFIDENCE,
                    };
                    duplicate_of = Some(earlier.id);
                    (
                        Routing::Auto(output),
                        ClassificationSource::DuplicateCheck,
                        "duplicate-check".to_string(),
                    )
                }
                None => {
                    let adapter = ClassifierAdapter::from_config(&repo.config().classifier)?;
                    let routing = adapter.route(&case.description, case.preferred_language);
                    (routing, ClassificationSource::Model, adapter.backend().to_string())
                }
            }
        }
    };

    let written = repo
        .cases
        .update_with_retry(&id, repo.config().retry.max_attempts, |case| match &routing {
            Routing::Auto(out) => {
                workflow::classify(
                    case,
                    out.department.clone(),
                    out.root_cause.clone(),
                    out.confidence,
                    source,
                    now,
                )?;
                Ok(Some(Some(workflow::triage(case, &recommender, now)?)))
            }
            Routing::Manual { reason, .. } => {
                if case.queued_for(QueueReason::ManualClassification) {
                    return Ok(None);
                }
                workflow::route_to_manual(case, &reason.to_string(), now);
                Ok(Some(None))
            }
        })?;
    let triage: Option<Triage> = written.and_then(|(_, t)| t);
    let case = repo.cases.read(&id)?;

    if json {
        return super::print_json(&serde_json::json!({
            "case_id": case.id,
            "backend": backend,
            "duplicate_of": duplicate_of,
            "routing": routing,
            "triage": triage,
            "status": case.status,
        }));
    }

    match &routing {
        Routing::Auto(out) => {
            println!(
                "{} classified as {} (confidence {:.2}, {})",
                case.id, out.root_cause, out.confidence, backend
            );
            if let Some(earlier) = &duplicate_of {
                println!("  repeats {} from the same citizen", earlier);
            }
            if let Some(triage) = &triage {
                super::recommend::print_triage(triage, case.preferred_language);
            }
        }
        Routing::Manual { reason, suggestion } => {
            println!("{} routed to manual classification: {}", case.id, reason);
            if let Some(s) = suggestion {
                println!("  classifier suggested {} ({:.2})", s.root_cause, s.confidence);
            }
        }
    }
    println!("Status: {}", case.status);
    Ok(())
}
