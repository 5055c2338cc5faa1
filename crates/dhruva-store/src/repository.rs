use crate::cases::CaseStore;
use crate::error::StoreError;
use crate::outbox::Outbox;
use crate::reference::{load_reference, seed_reference};
use dhruva_core::catalog::{ReferenceCatalog, ReferenceSource};
use dhruva_core::config::Config;
use dhruva_core::sla::{SlaThresholds, SlaTracker};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const DHRUVA_DIR: &str = ".dhruva";
const CONFIG_FILE: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# DHRUVA triage settings. Every section is optional.

[classifier]
# "keyword" (offline), "http" (NLP service) or "disabled" (manual routing)
backend = "keyword"
endpoint = "http://localhost:8000"
timeout_ms = 3000
confidence_threshold = 0.5

[sla]
# Used when a department/category has no entry below (30 days).
default_hours = 720
breach_percent = 100

[sla.departments.Pension]
hours = 360

[sla.departments.Pension.categories]
"Pension Delay" = 240

[sla.departments.Revenue]
hours = 720

[retry]
max_attempts = 3
"#;

/// A DHRUVA working directory: config, reference data, cases and the
/// notification outbox under `.dhruva/`.
pub struct Repository {
    root: PathBuf,
    config: Config,
    pub cases: CaseStore,
    pub outbox: Outbox,
}

impl Repository {
    /// Create `.dhruva/` with the default config and seed reference data.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(DHRUVA_DIR);

        if dir.exists() {
            return Err(StoreError::RepositoryExists(dir.display().to_string()));
        }

        fs::create_dir_all(dir.join("cases"))?;
        fs::create_dir_all(dir.join("outbox"))?;
        write_atomic(&dir, CONFIG_FILE, DEFAULT_CONFIG)?;
        seed_reference(&dir.join("reference"))?;
        tracing::info!(path = %dir.display(), "repository initialized");

        Self::open(&root)
    }

    /// Open the repository rooted at `path`, reading its config.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(DHRUVA_DIR);

        if !dir.exists() {
            return Err(StoreError::RepositoryNotFound(root.display().to_string()));
        }

        let config = match fs::read_to_string(dir.join(CONFIG_FILE)) {
            Ok(text) => Config::from_toml_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            cases: CaseStore::new(dir.join("cases")),
            outbox: Outbox::new(dir.join("outbox").join("notifications.jsonl")),
            config,
            root,
        })
    }

    /// Search upward from `start` for a `.dhruva/` directory and open it.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut current = start.as_ref().to_path_buf();
        loop {
            if current.join(DHRUVA_DIR).exists() {
                return Self::open(&current);
            }
            if !current.pop() {
                return Err(StoreError::RepositoryNotFound(
                    start.as_ref().display().to_string(),
                ));
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reference_dir(&self) -> PathBuf {
        self.root.join(DHRUVA_DIR).join("reference")
    }

    /// Load and validate the reference data.
    pub fn reference(&self) -> Result<ReferenceCatalog, StoreError> {
        load_reference(&self.reference_dir())
    }

    /// SLA tracker configured from the reference triggers and config.
    pub fn sla_tracker(&self, reference: &ReferenceCatalog) -> Result<SlaTracker, StoreError> {
        let thresholds =
            SlaThresholds::from_triggers(reference.triggers(), self.config.sla.breach_percent)?;
        Ok(SlaTracker::new(thresholds))
    }
}

fn write_atomic(dir: &Path, name: &str, contents: &str) -> Result<(), StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(dir.join(name)).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhruva_core::config::ClassifierBackend;

    #[test]
    fn default_config_parses() {
        let config = Config::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.classifier.backend, ClassifierBackend::Keyword);
        assert_eq!(
            config.sla.target_for(Some("Pension"), Some("Pension Delay")).hours,
            240
        );
    }

    #[test]
    fn init_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(dir.path().join(".dhruva/cases").is_dir());
        assert!(dir.path().join(".dhruva/reference/templates.json").is_file());
        let reference = repo.reference().unwrap();
        assert!(reference.template("duplicate_merge").is_some());
        let tracker = repo.sla_tracker(&reference).unwrap();
        assert_eq!(tracker.thresholds().no_update_days, Some(7));
    }

    #[test]
    fn init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        assert!(matches!(
            Repository::init(dir.path()),
            Err(StoreError::RepositoryExists(_))
        ));
    }

    #[test]
    fn discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let repo = Repository::discover(&nested).unwrap();
        assert_eq!(repo.root(), dir.path());
    }

    #[test]
    fn discover_without_repo_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::discover(dir.path()),
            Err(StoreError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn bad_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        fs::write(
            dir.path().join(".dhruva/config.toml"),
            "[retry]\nmax_attempts = 0\n",
        )
        .unwrap();
        let err = Repository::open(dir.path()).err().unwrap();
        assert!(err.to_string().contains("max_attempts"));
    }
}
