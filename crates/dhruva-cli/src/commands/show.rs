use anyhow::Result;
use chrono::Utc;

pub fn run(id: String, json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let case = repo.cases.read(&super::case_id(&id)?)?;

    if json {
        return super::print_json(&case);
    }

    let language = case.preferred_language;
    println!("case {}  (version {})", case.id, case.version);
    println!(
        "Status:     {}  (citizen sees: {})",
        case.status,
        case.status.public_status().label(language)
    );
    println!("Filed:      {}", case.created_at.format("%Y-%m-%d %H:%M:%S %Z"));
    println!(
        "Department: {} / {}",
        case.department.as_deref().unwrap_or("-"),
        case.category.as_deref().unwrap_or("-")
    );
    if let Some(c) = &case.classification {
        println!(
            "Root cause: {}  ({:?}, confidence {:.2})",
            c.root_cause, c.source, c.confidence
        );
    } else {
        println!("Root cause: unclassified");
    }
    println!(
        "SLA:        {} h{}, deadline {}, {:.0}% elapsed, state {}",
        case.sla_target.hours,
        if case.sla_target.defaulted { " (default)" } else { "" },
        case.sla_deadline().format("%Y-%m-%d %H:%M"),
        case.elapsed_fraction(Utc::now()) * 100.0,
        case.sla.state
    );
    println!("Authority:  {}", case.authority_tier);
    if let Some(q) = &case.operator_queue {
        println!("Queued:     {} since {} ({})", q.reason, q.queued_at.format("%Y-%m-%d %H:%M"), q.detail);
    }

    println!();
    println!("    {}", case.description);

    if !case.answers.is_empty() {
        println!();
        println!("Answers:");
        for a in &case.answers {
            println!("  [{}] {}", a.question_id, a.value);
        }
    }
    if !case.applied_templates.is_empty() {
        println!();
        println!("Templates applied:");
        for t in &case.applied_templates {
            println!(
                "  {} by {} at {} ({} action(s))",
                t.template_key,
                t.officer,
                t.applied_at.format("%Y-%m-%d %H:%M"),
                t.actions.len()
            );
        }
    }
    println!();
    println!("History:");
    for h in &case.history {
        println!("  {}  {:?}  {}", h.at.format("%Y-%m-%d %H:%M"), h.event, h.detail);
    }
    Ok(())
}
