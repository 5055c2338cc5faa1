use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Utc};
use dhruva_core::case::{GrievanceCase, NewCase};
use dhruva_core::taxonomy::Language;
use dhruva_store::error::StoreError;

pub struct FileArgs {
    pub description: String,
    pub district: String,
    pub department: Option<String>,
    pub category: Option<String>,
    pub citizen_phone: Option<String>,
    pub language: String,
    pub filed_at: Option<DateTime<Utc>>,
}

pub fn run(args: FileArgs, json: bool) -> Result<()> {
    if args.description.trim().is_empty() {
        bail!("grievance description is empty");
    }
    let repo = super::open_repo()?;
    let language: Language = args.language.parse()?;
    let filed_at = args.filed_at.unwrap_or_else(Utc::now);
    let sla_target = repo
        .config()
        .sla
        .target_for(args.department.as_deref(), args.category.as_deref());

    // Another operator may take the same sequence number; take the next one.
    let attempts = repo.config().retry.max_attempts;
    let mut stored = None;
    for _ in 0..attempts {
        let id = repo.cases.next_id(filed_at.year(), &args.district)?;
        let case = GrievanceCase::new(NewCase {
            id,
            description: args.description.trim().to_string(),
            department: args.department.clone(),
            category: args.category.clone(),
            citizen_phone: args.citizen_phone.clone(),
            preferred_language: language,
            filed_at,
            sla_target,
        });
        match repo.cases.create(&case) {
            Ok(case) => {
                stored = Some(case);
                break;
            }
            Err(StoreError::CaseExists(_) | StoreError::LockConflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let Some(case) = stored else {
        bail!("could not allocate a case id after {} attempts, try again", attempts);
    };

    if json {
        return super::print_json(&case);
    }
    println!("Filed {}", case.id);
    println!(
        "SLA: {} hours{} (deadline {})",
        case.sla_target.hours,
        if case.sla_target.defaulted { " (default)" } else { "" },
        case.sla_deadline().format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}
