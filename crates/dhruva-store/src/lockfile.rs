use crate::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exclusive lock on a case file, doubling as its replacement buffer.
///
/// Creates `<target>.lock` with create-new semantics, so a second writer
/// fails fast with [`StoreError::LockConflict`]. New contents are written
/// to the lock file and renamed over `<target>` on commit. An uncommitted
/// lock is removed on drop.
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<fs::File>,
}

impl Lockfile {
    pub fn acquire(target: impl AsRef<Path>) -> Result<Self, StoreError> {
        let target = target.as_ref().to_path_buf();
        let lock_path = lock_path_for(&target);

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => Ok(Self {
                target,
                lock_path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::LockConflict(lock_path.display().to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), StoreError> {
        match self.file {
            Some(ref mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                Ok(())
            }
            None => Err(StoreError::LockConflict(
                "lock file already committed".into(),
            )),
        }
    }

    /// Rename the lock file over the target.
    pub fn commit(mut self) -> Result<(), StoreError> {
        self.file.take();
        fs::rename(&self.lock_path, &self.target)?;
        Ok(())
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

/// `cases/X.json` locks as `cases/X.json.lock`.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
