pub mod answer;
pub mod apply;
pub mod classify;
pub mod file;
pub mod init;
pub mod list;
pub mod questions;
pub mod recommend;
pub mod resolve;
pub mod show;
pub mod sla_check;
pub mod templates;
pub mod validate;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use dhruva_core::case::{CaseId, GrievanceCase};
use dhruva_store::repository::Repository;
use serde::Serialize;
use std::env;

pub fn open_repo() -> Result<Repository> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    Repository::discover(&cwd).context("not a DHRUVA repository (run `dhruva init`)")
}

pub fn case_id(id: &str) -> Result<CaseId> {
    Ok(CaseId::parse(id)?)
}

/// `--officer`, then `$DHRUVA_OFFICER`.
pub fn officer(flag: Option<String>) -> Result<String> {
    flag.or_else(|| env::var("DHRUVA_OFFICER").ok())
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .ok_or_else(|| anyhow!("no officer given (pass --officer or set DHRUVA_OFFICER)"))
}

/// RFC 3339 timestamp, or a bare date meaning midnight UTC.
pub fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid time '{}' (expected RFC 3339 or YYYY-MM-DD)", s))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line summary used by list, queue and the write commands.
pub fn summary_line(case: &GrievanceCase) -> String {
    let root_cause = case.root_cause.as_ref().map_or("-", |r| r.as_str());
    format!(
        "{}  {:<11}  {:<12}  {:<20}  {}",
        case.id,
        case.status.as_str(),
        case.department.as_deref().unwrap_or("-"),
        root_cause,
        case.created_at.format("%Y-%m-%d")
    )
}
