use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{LabelerError, Result};

/// Folder (under the output base) holding one subfolder per label
pub const CLASSIFIED_DIR: &str = "Classified";

/// Subfolder used when the label is blank or not a usable folder name
pub const UNLABELED_DIR: &str = "Unlabeled";

/// Outcome of one classification copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub destination: PathBuf,
    /// A file already existed at the destination and was overwritten
    pub replaced: bool,
}

/// Sorts an original file into a label folder
pub trait FileClassifier {
    /// Copy `source` into the folder for `label`. The source is never
    /// moved or deleted.
    fn classify(&mut self, source: &Path, label: &str) -> Result<Classified>;
}

/// Turn a free-text label into a single, safe folder name
pub fn label_dir_name(label: &str) -> String {
    let name: String = label
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();

    match name.as_str() {
        "" | "." | ".." => UNLABELED_DIR.to_string(),
        _ => name,
    }
}

/// `<base>/Classified`
pub fn classified_root(base_dir: &Path) -> PathBuf {
    base_dir.join(CLASSIFIED_DIR)
}

/// Copies files into `<base>/Classified/<label>/`
#[derive(Debug, Clone)]
pub struct CopyClassifier {
    base_dir: PathBuf,
}

impl CopyClassifier {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Where `source` would land for `label`
    pub fn destination_for(&self, source: &Path, label: &str) -> Option<PathBuf> {
        let file_name = source.file_name()?;
        Some(
            classified_root(&self.base_dir)
                .join(label_dir_name(label))
                .join(file_name),
        )
    }
}

impl FileClassifier for CopyClassifier {
    fn classify(&mut self, source: &Path, label: &str) -> Result<Classified> {
        let destination = self.destination_for(source, label).ok_or_else(|| {
            LabelerError::Classify {
                source_path: source.to_path_buf(),
                destination: classified_root(&self.base_dir),
                source: io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
            }
        })?;

        if let Some(target_dir) = destination.parent() {
            fs::create_dir_all(target_dir).map_err(|e| LabelerError::io(target_dir, e))?;
        }

        let replaced = destination.exists();

        // Copying a file onto itself would truncate it
        if replaced && same_file(source, &destination) {
            log::debug!("{} is already classified in place", source.display());
            return Ok(Classified {
                destination,
                replaced,
            });
        }

        if let Err(e) = fs::copy(source, &destination) {
            // A failed copy may leave a truncated file behind
            if !replaced && destination.exists() {
                if let Err(err) = fs::remove_file(&destination) {
                    log::warn!("Could not remove partial copy {}: {}", destination.display(), err);
                }
            }
            return Err(LabelerError::Classify {
                source_path: source.to_path_buf(),
                destination,
                source: e,
            });
        }

        if let Err(err) = copy_modified_time(source, &destination) {
            log::warn!(
                "Copied {} but could not preserve its modification time: {}",
                destination.display(),
                err
            );
        }

        log::debug!("Classified {} -> {}", source.display(), destination.display());

        Ok(Classified {
            destination,
            replaced,
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Carry the source's mtime over (permissions are already copied by `fs::copy`)
fn copy_modified_time(source: &Path, destination: &Path) -> io::Result<()> {
    let modified = fs::metadata(source)?.modified()?;
    let file = fs::OpenOptions::new().write(true).open(destination)?;
    file.set_modified(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_creates_label_folder_and_keeps_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.png");
        fs::write(&source, b"pixels").unwrap();
        let out = dir.path().join("out");

        let mut classifier = CopyClassifier::new(&out);
        let result = classifier.classify(&source, "Grade A").unwrap();

        assert_eq!(result.destination, out.join("Classified").join("Grade A").join("a.png"));
        assert!(!result.replaced);
        assert_eq!(fs::read(&result.destination).unwrap(), b"pixels");
        assert!(source.exists());
    }

    #[test]
    fn test_repeated_copy_overwrites() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("b.jpg");
        fs::write(&source, b"v1").unwrap();

        let mut classifier = CopyClassifier::new(dir.path());
        classifier.classify(&source, "No gradable").unwrap();

        fs::write(&source, b"v2").unwrap();
        let again = classifier.classify(&source, "No gradable").unwrap();

        assert!(again.replaced);
        assert_eq!(fs::read(&again.destination).unwrap(), b"v2");
    }

    #[test]
    fn test_modification_time_is_preserved() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("c.png");
        fs::write(&source, b"data").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600 * 24 * 30);
        fs::OpenOptions::new()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let mut classifier = CopyClassifier::new(dir.path());
        let result = classifier.classify(&source, "Grade B").unwrap();

        let copied = fs::metadata(&result.destination).unwrap().modified().unwrap();
        let original = fs::metadata(&source).unwrap().modified().unwrap();
        assert_eq!(copied, original);
    }

    #[test]
    fn test_missing_source_is_a_classify_error() {
        let dir = TempDir::new().unwrap();
        let mut classifier = CopyClassifier::new(dir.path());

        let err = classifier
            .classify(&dir.path().join("gone.png"), "Grade A")
            .unwrap_err();
        assert!(matches!(err, LabelerError::Classify { .. }));
    }

    // /proc/self/mem opens as a regular file but fails on the first read,
    // after the destination has been created
    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_copy_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let mut classifier = CopyClassifier::new(dir.path());
        let source = Path::new("/proc/self/mem");

        let err = classifier.classify(source, "Grade A").unwrap_err();

        assert!(matches!(err, LabelerError::Classify { .. }));
        let destination = classifier.destination_for(source, "Grade A").unwrap();
        assert!(!destination.exists());
    }

    #[test]
    fn test_label_dir_name_is_sanitized() {
        assert_eq!(label_dir_name("Grade A"), "Grade A");
        assert_eq!(label_dir_name("  No gradable "), "No gradable");
        assert_eq!(label_dir_name("Blurred / not usable"), "Blurred - not usable");
        assert_eq!(label_dir_name("..\\..\\etc"), "..-..-etc");
        assert_eq!(label_dir_name(""), UNLABELED_DIR);
        assert_eq!(label_dir_name(".."), UNLABELED_DIR);
    }

    #[test]
    fn test_classifying_a_file_onto_itself_keeps_it() {
        let dir = TempDir::new().unwrap();
        let label_dir = dir.path().join("Classified").join("Grade A");
        fs::create_dir_all(&label_dir).unwrap();
        let source = label_dir.join("a.png");
        fs::write(&source, b"keep me").unwrap();

        let mut classifier = CopyClassifier::new(dir.path());
        let result = classifier.classify(&source, "Grade A").unwrap();

        assert!(result.replaced);
        assert_eq!(fs::read(&source).unwrap(), b"keep me");
    }
}
