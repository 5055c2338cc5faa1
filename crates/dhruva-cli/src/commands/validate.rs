use anyhow::{Context, Result};
use dhruva_core::catalog::ReferenceSource;

pub fn run(json: bool) -> Result<()> {
    let repo = super::open_repo()?;
    let reference = repo.reference().context("reference data is invalid")?;
    let tracker = repo.sla_tracker(&reference).context("SLA trigger configuration is invalid")?;
    let thresholds = tracker.thresholds();
    let config = repo.config();

    if json {
        return super::print_json(&serde_json::json!({
            "valid": true,
            "reference_fingerprint": reference.fingerprint().hex(),
            "questions": reference.questions().len(),
            "templates": reference.templates().len(),
            "triggers": reference.triggers().len(),
            "root_causes": reference.root_causes(),
            "classifier_backend": config.classifier.backend,
            "sla_thresholds": {
                "warning_percent": thresholds.warning_percent,
                "approaching_percent": thresholds.approaching_percent,
                "breach_percent": thresholds.breach_percent,
                "no_update_days": thresholds.no_update_days,
            },
        }));
    }

    println!("Reference data OK ({})", reference.fingerprint().short());
    println!("  questions:   {}", reference.questions().len());
    println!("  templates:   {}", reference.templates().len());
    println!("  triggers:    {}", reference.triggers().len());
    println!("  root causes: {}", reference.root_causes().len());
    println!(
        "SLA thresholds: warning {}%, approaching {}%, breach {}%",
        thresholds.warning_percent, thresholds.approaching_percent, thresholds.breach_percent
    );
    if let Some(days) = thresholds.no_update_days {
        println!("No-update notice after {} days", days);
    }
    println!(
        "Classifier: {:?}, threshold {:.2}, timeout {} ms",
        config.classifier.backend, config.classifier.confidence_threshold, config.classifier.timeout_ms
    );
    Ok(())
}
