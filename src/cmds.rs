pub mod cache;
pub mod get;

use std::fs;

use crate::cache::FileStorage;
use crate::config::ConfigProperties;
use crate::error::AddContext;
use crate::Result;

/// File storage at the configured location, creating the directory on
/// first use.
pub fn file_storage(config: &impl ConfigProperties) -> Result<FileStorage> {
    let storage = FileStorage::from_config(config)?;
    fs::create_dir_all(storage.location()).err_context(format!(
        "Cannot create cache directory {}",
        storage.location().display()
    ))?;
    storage.validate_location()?;
    Ok(storage)
}
