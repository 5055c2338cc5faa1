use anyhow::{Context, Result};
use std::env;
use dhruva_store::repository::Repository;

pub fn run(json: bool) -> Result<()> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    let repo = Repository::init(&cwd)?;
    let reference = repo.reference()?;
    if json {
        return super::print_json(&serde_json::json!({
            "path": cwd.join(".dhruva"),
            "reference_fingerprint": reference.fingerprint().hex(),
        }));
    }
    println!(
        "Initialized DHRUVA repository in {}",
        cwd.join(".dhruva").display()
    );
    println!("Reference data {}", reference.fingerprint().short());
    Ok(())
}
