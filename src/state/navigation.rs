use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{LabelerError, Result};

/// Supported image file extensions (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "dcm", "dicom"];

/// Check whether a path has one of the supported extensions
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// List the supported images directly inside `folder`, sorted by path.
///
/// Subdirectories are not entered.
pub fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            // A broken child entry (dangling link, permission) is skipped
            Err(e) if e.depth() > 0 => {
                log::warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                continue;
            }
            Err(e) => return Err(walk_error(folder, e)),
        };

        let path = entry.path();
        if entry.file_type().is_file() && is_supported_image(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn walk_error(folder: &Path, e: walkdir::Error) -> LabelerError {
    let path = e.path().unwrap_or(folder).to_path_buf();
    match e.into_io_error() {
        Some(io) => LabelerError::io(path, io),
        None => LabelerError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop"),
        ),
    }
}

/// Ordered file list plus a cursor. `cursor == None` means "no selection".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Navigation {
    files: Vec<PathBuf>,
    cursor: Option<usize>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list; the cursor moves to the first file if there is one.
    pub fn replace(&mut self, files: Vec<PathBuf>) {
        self.cursor = if files.is_empty() { None } else { Some(0) };
        self.files = files;
    }

    /// Forget the list and the selection
    pub fn clear(&mut self) {
        self.files.clear();
        self.cursor = None;
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Path under the cursor
    pub fn current(&self) -> Option<&Path> {
        self.cursor.map(|index| self.files[index].as_path())
    }

    /// Move one step forward. Returns false when already on the last file
    /// or nothing is selected.
    pub fn step_forward(&mut self) -> bool {
        match self.cursor {
            Some(index) if index + 1 < self.files.len() => {
                self.cursor = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    /// Move one step back. Returns false when already on the first file
    /// or nothing is selected.
    pub fn step_back(&mut self) -> bool {
        match self.cursor {
            Some(index) if index > 0 => {
                self.cursor = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    /// "Image 3 of 12" style position, 1-based
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.cursor.map(|index| (index + 1, self.files.len()))
    }
}
