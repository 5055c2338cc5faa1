use crate::error::StoreError;
use dhruva_core::catalog::ReferenceCatalog;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const QUESTIONS_FILE: &str = "questions.json";
pub const TEMPLATES_FILE: &str = "templates.json";
pub const TRIGGERS_FILE: &str = "triggers.json";

/// Reference data shipped with the binary and written by `init`.
pub const SEED_QUESTIONS: &str = include_str!("../seed/questions.json");
pub const SEED_TEMPLATES: &str = include_str!("../seed/templates.json");
pub const SEED_TRIGGERS: &str = include_str!("../seed/triggers.json");

/// Load and validate the three reference files in `dir`.
pub fn load_reference(dir: &Path) -> Result<ReferenceCatalog, StoreError> {
    let questions = read_rows(dir, QUESTIONS_FILE)?;
    let templates = read_rows(dir, TEMPLATES_FILE)?;
    let triggers = read_rows(dir, TRIGGERS_FILE)?;
    Ok(ReferenceCatalog::new(questions, templates, triggers)?)
}

/// The seed reference data as a catalog, without touching disk.
pub fn bundled_catalog() -> Result<ReferenceCatalog, StoreError> {
    let questions = parse_rows(QUESTIONS_FILE, SEED_QUESTIONS.as_bytes())?;
    let templates = parse_rows(TEMPLATES_FILE, SEED_TEMPLATES.as_bytes())?;
    let triggers = parse_rows(TRIGGERS_FILE, SEED_TRIGGERS.as_bytes())?;
    Ok(ReferenceCatalog::new(questions, templates, triggers)?)
}

/// Write the seed files into `dir`, replacing any present.
pub fn seed_reference(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    for (name, contents) in [
        (QUESTIONS_FILE, SEED_QUESTIONS),
        (TEMPLATES_FILE, SEED_TEMPLATES),
        (TRIGGERS_FILE, SEED_TRIGGERS),
    ] {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.persist(dir.join(name)).map_err(|e| StoreError::Io(e.error))?;
    }
    Ok(())
}

fn read_rows<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, StoreError> {
    let bytes = fs::read(dir.join(file))?;
    parse_rows(file, &bytes)
}

fn parse_rows<T: DeserializeOwned>(file: &str, bytes: &[u8]) -> Result<Vec<T>, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::ReferenceFile {
        file: file.to_string(),
        source,
    })
}
