use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dhruva() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("dhruva").unwrap();
    cmd.env_remove("DHRUVA_OFFICER").env_remove("DHRUVA_LOG");
    cmd
}

fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    dhruva().arg("init").current_dir(dir.path()).assert().success();
    dir
}

fn json_out(dir: &Path, args: &[&str]) -> Value {
    let output = dhruva()
        .args(args)
        .arg("--json")
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// File a Pension Delay grievance on 2025-01-01 and return its id.
fn file_pension_case(dir: &Path, text: &str) -> String {
    let case = json_out(
        dir,
        &[
            "file",
            text,
            "--department",
            "Pension",
            "--category",
            "Pension Delay",
            "--citizen-phone",
            "9876543210",
            "--filed-at",
            "2025-01-01T00:00:00Z",
        ],
    );
    case["id"].as_str().unwrap().to_string()
}

fn outbox_lines(dir: &Path) -> Vec<Value> {
    let path = dir.join(".dhruva/outbox/notifications.jsonl");
    match fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn init_creates_dhruva_dir() {
    let dir = TempDir::new().unwrap();
    dhruva()
        .arg("init")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains(".dhruva"));

    assert!(dir.path().join(".dhruva/config.toml").exists());
    assert!(dir.path().join(".dhruva/cases").is_dir());
    assert!(dir.path().join(".dhruva/reference/questions.json").exists());
    assert!(dir.path().join(".dhruva/reference/templates.json").exists());
    assert!(dir.path().join(".dhruva/reference/triggers.json").exists());
}

#[test]
fn init_twice_fails() {
    let dir = init_repo();
    dhruva()
        .arg("init")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("already exists"));
}

#[test]
fn commands_outside_repo_fail() {
    let dir = TempDir::new().unwrap();
    dhruva()
        .arg("list")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a DHRUVA repository"));
}

#[test]
fn validate_reports_reference_data() {
    let dir = init_repo();
    let report = json_out(dir.path(), &["validate"]);
    assert_eq!(report["valid"], true);
    assert_eq!(report["triggers"], 3);
    assert_eq!(report["sla_thresholds"]["no_update_days"], 7);
    assert_eq!(report["reference_fingerprint"].as_str().unwrap().len(), 64);
}

#[test]
fn validate_rejects_broken_reference_data() {
    let dir = init_repo();
    fs::write(dir.path().join(".dhruva/reference/triggers.json"), "{").unwrap();
    dhruva()
        .arg("validate")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("triggers.json"));
}

#[test]
fn file_assigns_sequential_ids_and_sla() {
    let dir = init_repo();
    let first = file_pension_case(dir.path(), "Pension not credited");
    let second = file_pension_case(dir.path(), "Pension not credited again");
    assert_eq!(first, "PGRS-2025-GTR-00001");
    assert_eq!(second, "PGRS-2025-GTR-00002");

    let case = json_out(dir.path(), &["show", &first]);
    assert_eq!(case["status"], "registered");
    assert_eq!(case["sla_target"]["hours"], 240);
    assert_eq!(case["preferred_language"], "te");
}

#[test]
fn unknown_department_gets_default_sla() {
    let dir = init_repo();
    let case = json_out(
        dir.path(),
        &["file", "Street light broken", "--department", "Municipal", "--district", "krn"],
    );
    assert!(case["id"].as_str().unwrap().starts_with("PGRS-"));
    assert!(case["id"].as_str().unwrap().contains("-KRN-"));
    assert_eq!(case["sla_target"]["hours"], 720);
    assert_eq!(case["sla_target"]["defaulted"], true);
}

#[test]
fn pension_case_end_to_end() {
    let dir = init_repo();
    let id = file_pension_case(
        dir.path(),
        "My pension is not credited, the bank account number is wrong",
    );

    let classified = json_out(dir.path(), &["classify", &id]);
    assert_eq!(classified["routing"]["routing"], "auto");
    assert_eq!(classified["routing"]["root_cause"], "MISSING_INFORMATION");
    assert_eq!(classified["triage"]["outcome"], "recommended");
    assert_eq!(classified["triage"]["template"]["key"], "pension_bank_mismatch_fix");
    assert_eq!(classified["status"], "clarifying");

    let questions = json_out(dir.path(), &["questions", &id]);
    let ids: Vec<u64> = questions
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let first = json_out(dir.path(), &["answer", &id, "1", "PPO-4471"]);
    assert_eq!(first["status"], "clarifying");
    let second = json_out(dir.path(), &["answer", &id, "2", "4321"]);
    assert_eq!(second["status"], "in_progress");
    assert!(json_out(dir.path(), &["questions", &id])
        .as_array()
        .unwrap()
        .is_empty());

    let applied = dhruva()
        .args(["apply", &id, "--json"])
        .env("DHRUVA_OFFICER", "mandal-officer-3")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(applied.status.success());
    let applied: Value = serde_json::from_slice(&applied.stdout).unwrap();
    assert_eq!(applied["template"], "pension_bank_mismatch_fix");
    let actions: Vec<&str> = applied["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions[0], "VERIFY_AADHAAR");
    assert!(applied["actions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["status"] == "completed"));

    dhruva()
        .args(["resolve", &id, "--note", "bank account corrected"])
        .env("DHRUVA_OFFICER", "mandal-officer-3")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Resolved"));

    let case = json_out(dir.path(), &["show", &id]);
    assert_eq!(case["status"], "resolved");
    assert_eq!(case["applied_templates"][0]["officer"], "mandal-officer-3");

    dhruva()
        .args(["answer", &id, "1", "PPO-9999"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("resolved"));
}

#[test]
fn answer_for_other_root_cause_is_rejected() {
    let dir = init_repo();
    let id = file_pension_case(dir.path(), "Pension not credited");
    json_out(dir.path(), &["classify", &id, "--root-cause", "DUPLICATE_CASE"]);
    dhruva()
        .args(["answer", &id, "1", "PPO-4471"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("MISSING_INFORMATION"));
}

#[test]
fn duplicate_case_recommends_merge() {
    let dir = init_repo();
    let rec = json_out(
        dir.path(),
        &["recommend", "--root-cause", "DUPLICATE_CASE", "--department", "Pension"],
    );
    assert_eq!(rec["template"]["key"], "duplicate_merge");
    assert_eq!(rec["template"]["success_rate"], "96.70");
    assert_eq!(rec["template"]["avg_resolution_hours"], 1);
    assert_eq!(rec["specificity"], "generic_all");
}

#[test]
fn unknown_root_cause_goes_to_operator_queue() {
    let dir = init_repo();
    let id = file_pension_case(dir.path(), "Something unusual");
    let out = json_out(dir.path(), &["classify", &id, "--root-cause", "SEASONAL_BACKLOG"]);
    assert_eq!(out["triage"]["outcome"], "no_template");
    assert_eq!(out["status"], "clarifying");

    let queue = json_out(dir.path(), &["queue", "--reason", "no-template"]);
    assert_eq!(queue[0]["case_id"], id.as_str());
    assert_eq!(queue[0]["queue"]["reason"], "no_template_found");
}

#[test]
fn disabled_classifier_routes_to_manual() {
    let dir = init_repo();
    let config = dir.path().join(".dhruva/config.toml");
    let text = fs::read_to_string(&config)
        .unwrap()
        .replace("backend = \"keyword\"", "backend = \"disabled\"");
    fs::write(&config, text).unwrap();

    let id = file_pension_case(dir.path(), "Pension not credited, bank account wrong");
    let out = json_out(dir.path(), &["classify", &id]);
    assert_eq!(out["routing"]["routing"], "manual");
    assert_eq!(out["routing"]["reason"], "disabled");
    assert_eq!(out["status"], "registered");

    let queue = json_out(dir.path(), &["queue", "--reason", "manual"]);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    // an operator decision takes the case off the manual queue
    json_out(dir.path(), &["classify", &id, "--root-cause", "MISSING_INFORMATION"]);
    assert!(json_out(dir.path(), &["queue"]).as_array().unwrap().is_empty());
}

#[test]
fn sla_check_notifies_once_then_escalates() {
    let dir = init_repo();
    let id = file_pension_case(dir.path(), "Pension not credited");

    let report = json_out(dir.path(), &["sla-check", "--at", "2025-01-06T00:00:00Z"]);
    assert_eq!(report["checked"], 1);
    assert_eq!(report["changed"][0]["state"], "warning50");
    let sent = outbox_lines(dir.path());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["trigger_type"], "SLA_50_PERCENT");
    assert_eq!(sent[0]["case_id"], id.as_str());
    assert!(sent[0]["rendered_message_te"].as_str().unwrap().contains(&id));

    let again = json_out(dir.path(), &["sla-check", "--at", "2025-01-06T00:10:00Z"]);
    assert!(again["changed"].as_array().unwrap().is_empty());
    assert_eq!(outbox_lines(dir.path()).len(), 1);

    json_out(dir.path(), &["sla-check", "--at", "2025-01-11T01:00:00Z"]);
    let case = json_out(dir.path(), &["show", &id]);
    assert_eq!(case["status"], "escalated");
    assert_eq!(case["authority_tier"], "division");

    let kinds: Vec<String> = outbox_lines(dir.path())
        .iter()
        .map(|e| e["trigger_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["SLA_50_PERCENT", "NO_UPDATE_N_DAYS"]);
}

#[test]
fn list_filters_by_status() {
    let dir = init_repo();
    let a = file_pension_case(dir.path(), "Pension not credited");
    file_pension_case(dir.path(), "Pension not credited either");
    dhruva()
        .args(["resolve", &a, "--officer", "officer-1"])
        .current_dir(dir.path())
        .assert()
        .success();

    let open = json_out(dir.path(), &["list", "--open"]);
    assert_eq!(open.as_array().unwrap().len(), 1);
    let resolved = json_out(dir.path(), &["list", "--status", "resolved"]);
    assert_eq!(resolved[0]["id"], a.as_str());
}

#[test]
fn resolve_needs_an_officer() {
    let dir = init_repo();
    let id = file_pension_case(dir.path(), "Pension not credited");
    dhruva()
        .args(["resolve", &id])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("DHRUVA_OFFICER"));
}

#[test]
fn templates_lists_pension_rows_best_first() {
    let dir = init_repo();
    let rows = json_out(dir.path(), &["templates", "--department", "Pension"]);
    let keys: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["key"].as_str().unwrap())
        .collect();
    assert_eq!(
        keys,
        vec!["pension_bank_mismatch_fix", "pension_verification_pending"]
    );
}

#[test]
fn repeat_filing_is_classified_as_duplicate() {
    let dir = init_repo();
    let first = file_pension_case(dir.path(), "My pension is not credited");
    let second = file_pension_case(dir.path(), "Pension still not credited, filing again");

    let out = json_out(dir.path(), &["classify", &second]);
    assert_eq!(out["backend"], "duplicate-check");
    assert_eq!(out["duplicate_of"], first.as_str());
    assert_eq!(out["routing"]["root_cause"], "DUPLICATE_CASE");
    assert_eq!(out["routing"]["confidence"].as_f64(), Some(0.95));
    assert_eq!(out["triage"]["template"]["key"], "duplicate_merge");

    let case = json_out(dir.path(), &["show", &second]);
    assert_eq!(case["classification"]["source"], "duplicate_check");

    let out = json_out(dir.path(), &["classify", &first]);
    assert!(out["duplicate_of"].is_null());
    assert_ne!(out["backend"], "duplicate-check");
}

#[test]
fn repeated_recommend_leaves_case_version_alone() {
    let dir = init_repo();
    let id = file_pension_case(dir.path(), "Pension not credited");
    json_out(dir.path(), &["classify", &id, "--root-cause", "MISSING_INFORMATION"]);
    let before = json_out(dir.path(), &["show", &id]);

    let rec = json_out(dir.path(), &["recommend", &id]);
    assert_eq!(rec["status"], before["status"]);
    assert_eq!(rec["triage"]["outcome"], "recommended");

    let after = json_out(dir.path(), &["show", &id]);
    assert_eq!(after["version"], before["version"]);
}
