use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::{CacheEntry, CacheStorage};
use crate::config::ConfigProperties;
use crate::error::{AddContext, HPCError};
use crate::{log_debug, log_error, log_info, log_warn, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Durable storage: one file per key, named after the key, inside a cache
/// directory. Entries are written to a temporary sibling and renamed into
/// place, so a reader sees either the old or the new entry for a key.
pub struct FileStorage {
    location: PathBuf,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        FileStorage {
            location: location.into(),
        }
    }

    pub fn from_config(config: &impl ConfigProperties) -> Result<Self> {
        let location = config
            .cache_location()
            .ok_or(HPCError::ConfigurationNotFound)?;
        Ok(FileStorage::new(location))
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Path of the file holding `key`, or `None` if `key` is not a plain
    /// file name and would resolve outside the cache directory.
    pub fn path(&self, key: &str) -> Option<PathBuf> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == key => {
                Some(self.location.join(name))
            }
            _ => None,
        }
    }

    pub fn validate_location(&self) -> Result<()> {
        let location = self.location.to_string_lossy();
        if !self.location.exists() {
            return Err(HPCError::CacheLocationDoesNotExist(format!(
                "Cache directory does not exist: {location}"
            ))
            .into());
        }

        if !self.location.is_dir() {
            return Err(HPCError::CacheLocationIsNotADirectory(format!(
                "Cache location is not a directory: {location}"
            ))
            .into());
        }

        // Check if we can write to the directory
        let test_file_path = self.location.join(".write_test_cache_file");
        match File::create(&test_file_path) {
            Ok(_) => {
                if let Err(e) = fs::remove_file(&test_file_path) {
                    return Err(HPCError::CacheLocationWriteTestFailed(format!(
                        "Failed to remove cache test file {}: {}",
                        test_file_path.to_string_lossy(),
                        e
                    ))
                    .into());
                }
            }
            Err(e) => {
                return Err(HPCError::CacheLocationIsNotWriteable(format!(
                    "No write permission for cache directory {location}: {e}"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Files in the cache directory that hold entries or leftover temporary
    /// files from interrupted saves. Anything else is left alone.
    fn cache_files(&self) -> Result<Vec<(PathBuf, fs::Metadata)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.location)? {
            let entry = entry?;
            let name = entry.file_name();
            if !is_cache_file_name(&name.to_string_lossy()) {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((entry.path(), metadata));
            }
        }
        Ok(files)
    }

    /// Total size in bytes of the cache files.
    pub fn size(&self) -> Result<u64> {
        Ok(self
            .cache_files()?
            .iter()
            .map(|(_, metadata)| metadata.len())
            .sum())
    }

    /// Remove every cache file. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let files = self.cache_files()?;
        for (path, _) in &files {
            fs::remove_file(path).err_context(format!("removing {}", path.display()))?;
        }
        log_info!(
            "Removed {} cache files from {}",
            files.len(),
            self.location.display()
        );
        Ok(files.len())
    }

    fn read_entry(&self, path: &Path) -> Result<CacheEntry> {
        let data = fs::read(path)?;
        CacheEntry::decode(&data)
    }

    fn write_entry(&self, path: &Path, entry: &CacheEntry) -> Result<()> {
        let data = entry.encode()?;
        let tmp_path = path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let written = File::create(&tmp_path).and_then(|mut f| {
            f.write_all(&data)?;
            f.sync_all()
        });
        if let Err(err) = written.and_then(|_| fs::rename(&tmp_path, path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err).err_context(format!("writing cache file {}", path.display()));
        }
        Ok(())
    }
}

const KEY_LEN: usize = 64;

fn is_key_name(name: &str) -> bool {
    name.len() == KEY_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Entry files are named after their hex key. Temporary files written by
/// `save` are `<key>.<pid>.<counter>.tmp`.
fn is_cache_file_name(name: &str) -> bool {
    if is_key_name(name) {
        return true;
    }
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(pid), Some(counter), Some("tmp"), None) => {
            is_key_name(key)
                && [pid, counter]
                    .iter()
                    .all(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        }
        _ => false,
    }
}

impl CacheStorage for FileStorage {
    fn fetch(&self, key: &str) -> Option<CacheEntry> {
        let Some(path) = self.path(key) else {
            log_error!("Invalid cache key {:?}", key);
            return None;
        };
        if !path.exists() {
            log_debug!("Cache miss for {}", key);
            return None;
        }
        match self.read_entry(&path) {
            Ok(entry) => Some(entry),
            Err(err) => {
                // Partially written or foreign file. Treated as a miss and
                // overwritten on the next save.
                log_warn!("Discarding unreadable cache file {}: {:#}", path.display(), err);
                None
            }
        }
    }

    fn save(&self, key: &str, entry: &CacheEntry) -> bool {
        let Some(path) = self.path(key) else {
            log_error!("Invalid cache key {:?}", key);
            return false;
        };
        match self.write_entry(&path, entry) {
            Ok(()) => true,
            Err(err) => {
                log_error!("Could not save cache entry {}: {:#}", key, err);
                false
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let Some(path) = self.path(key) else {
            log_error!("Invalid cache key {:?}", key);
            return false;
        };
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(err) => {
                log_error!("Could not delete cache file {}: {}", path.display(), err);
                false
            }
        }
    }
}
