use anyhow::Result;
use dhruva_core::recommend::Recommender;
use dhruva_core::taxonomy::RootCause;

pub fn run(
    department: Option<String>,
    category: Option<String>,
    root_cause: Option<String>,
    json: bool,
) -> Result<()> {
    let repo = super::open_repo()?;
    let reference = repo.reference()?;
    let root_cause = root_cause.as_deref().map(RootCause::parse).transpose()?;

    let templates = Recommender::new(&reference).list_templates(
        department.as_deref(),
        category.as_deref(),
        root_cause.as_ref(),
    );

    if json {
        return super::print_json(&templates);
    }
    if templates.is_empty() {
        println!("No matching templates.");
        return Ok(());
    }
    for t in &templates {
        println!(
            "{:<32} {:<20} {:>6}%  {:>4} h  {}/{}",
            t.key.as_str(),
            t.root_cause.as_str(),
            t.success_rate.to_string(),
            t.avg_resolution_hours,
            t.department.as_deref().unwrap_or("General"),
            t.category.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
