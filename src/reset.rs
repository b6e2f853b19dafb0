//! Project cleanup: delete the database and the classified output tree.
//!
//! Originals are never touched; the classified tree only holds copies.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LabelerError, Result};
use crate::imaging::classify::classified_root;

/// What happened to one cleanup target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(PathBuf),
    NotFound(PathBuf),
    /// The user did not confirm
    Kept(PathBuf),
}

/// Delete the database file and its rollback journal if present.
pub fn remove_database(path: &Path) -> Result<RemoveOutcome> {
    if !path.exists() {
        return Ok(RemoveOutcome::NotFound(path.to_path_buf()));
    }

    fs::remove_file(path).map_err(|e| LabelerError::io(path, e))?;

    let mut journal = path.as_os_str().to_owned();
    journal.push("-journal");
    let journal = PathBuf::from(journal);
    if journal.exists() {
        fs::remove_file(&journal).map_err(|e| LabelerError::io(&journal, e))?;
    }

    log::info!("Removed database {}", path.display());
    Ok(RemoveOutcome::Removed(path.to_path_buf()))
}

/// Recursively delete `<base>/Classified` once `confirm` agrees.
pub fn remove_classified<F>(base_dir: &Path, confirm: F) -> Result<RemoveOutcome>
where
    F: FnOnce(&Path) -> bool,
{
    let root = classified_root(base_dir);
    if !root.exists() {
        return Ok(RemoveOutcome::NotFound(root));
    }
    if !confirm(&root) {
        return Ok(RemoveOutcome::Kept(root));
    }

    fs::remove_dir_all(&root).map_err(|e| LabelerError::io(&root, e))?;
    log::info!("Removed classified images under {}", root.display());
    Ok(RemoveOutcome::Removed(root))
}
