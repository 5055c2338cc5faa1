use crate::error::StoreError;
use crate::lockfile::Lockfile;
use dhruva_core::case::{CaseId, GrievanceCase};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct CaseScan {
    pub cases: Vec<GrievanceCase>,
    pub unreadable: Vec<UnreadableCase>,
}

/// A case file that exists but could not be read or parsed.
#[derive(Debug)]
pub struct UnreadableCase {
    /// File name without `.json`, normally the case id.
    pub file: String,
    pub error: StoreError,
}

/// One JSON document per case under `cases/`, with optimistic versioning.
///
/// Every write holds `<id>.json.lock`, re-reads the stored version and
/// only replaces the file when it matches the caller's expectation.
pub struct CaseStore {
    dir: PathBuf,
}

impl CaseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn case_path(&self, id: &CaseId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn exists(&self, id: &CaseId) -> bool {
        self.case_path(id).exists()
    }

    /// Store a new case at version 1.
    pub fn create(&self, case: &GrievanceCase) -> Result<GrievanceCase, StoreError> {
        let path = self.case_path(&case.id);
        let mut lock = Lockfile::acquire(&path)?;
        if path.exists() {
            return Err(StoreError::CaseExists(case.id.to_string()));
        }
        let mut stored = case.clone();
        stored.version = 1;
        lock.write_all(&to_bytes(&stored)?)?;
        lock.commit()?;
        tracing::info!(case = %stored.id, "case created");
        Ok(stored)
    }

    pub fn read(&self, id: &CaseId) -> Result<GrievanceCase, StoreError> {
        read_case(&self.case_path(id))?.ok_or_else(|| StoreError::CaseNotFound(id.to_string()))
    }

    /// Write `case` only if the stored version still equals `expected_version`.
    ///
    /// On success the returned case carries the new version.
    pub fn update_cas(
        &self,
        case: &GrievanceCase,
        expected_version: u64,
    ) -> Result<GrievanceCase, StoreError> {
        let path = self.case_path(&case.id);
        let mut lock = Lockfile::acquire(&path)?;
        let current = read_case(&path)?.ok_or_else(|| StoreError::CaseNotFound(case.id.to_string()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                case_id: case.id.to_string(),
                expected: expected_version,
                found: current.version,
            });
        }
        let mut stored = case.clone();
        stored.version = expected_version + 1;
        lock.write_all(&to_bytes(&stored)?)?;
        lock.commit()?;
        tracing::debug!(case = %stored.id, version = stored.version, "case written");
        Ok(stored)
    }

    /// Read-modify-write with bounded retries on conflicts.
    ///
    /// `edit` gets a fresh copy on every attempt and returns `None` to
    /// leave the case untouched. Returns the stored case and the edit's
    /// value, or `None` when nothing was written.
    pub fn update_with_retry<T>(
        &self,
        id: &CaseId,
        max_attempts: u32,
        mut edit: impl FnMut(&mut GrievanceCase) -> Result<Option<T>, StoreError>,
    ) -> Result<Option<(GrievanceCase, T)>, StoreError> {
        let attempts = max_attempts.max(1);
        for attempt in 1..=attempts {
            let mut case = self.read(id)?;
            let expected = case.version;
            let Some(value) = edit(&mut case)? else {
                return Ok(None);
            };
            match self.update_cas(&case, expected) {
                Ok(stored) => return Ok(Some((stored, value))),
                Err(e) if e.is_retryable() => {
                    tracing::debug!(case = %id, attempt, error = %e, "retrying case update");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::warn!(case = %id, attempts, "giving up on case update");
        Err(StoreError::ConcurrentUpdateConflict {
            case_id: id.to_string(),
            attempts,
        })
    }

    /// All cases, sorted by id. Fails on the first unreadable case file.
    pub fn list(&self) -> Result<Vec<GrievanceCase>, StoreError> {
        let scan = self.scan()?;
        match scan.unreadable.into_iter().next() {
            Some(bad) => Err(bad.error),
            None => Ok(scan.cases),
        }
    }

    /// Every case file, keeping the ones that fail to parse apart so a
    /// whole-store pass can skip them.
    pub fn scan(&self) -> Result<CaseScan, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CaseScan::default()),
            Err(e) => return Err(e.into()),
        };
        let mut scan = CaseScan::default();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_case(&path) {
                Ok(Some(case)) => scan.cases.push(case),
                Ok(None) => {}
                Err(error) => {
                    let file = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    scan.unreadable.push(UnreadableCase { file, error });
                }
            }
        }
        scan.cases.sort_by(|a, b| a.id.cmp(&b.id));
        scan.unreadable.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(scan)
    }

    /// Next free `PGRS-<year>-<district>-<seq>` id.
    pub fn next_id(&self, year: i32, district: &str) -> Result<CaseId, StoreError> {
        let prefix = format!("PGRS-{}-{}-", year, district.to_uppercase());
        let highest = self
            .list()?
            .iter()
            .filter_map(|c| c.id.as_str().strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(CaseId::standard(year, district, highest + 1)?)
    }
}

fn to_bytes(case: &GrievanceCase) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(case)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn read_case(path: &Path) -> Result<Option<GrievanceCase>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::CorruptCase {
            path: path.display().to_string(),
            source,
        })
}
