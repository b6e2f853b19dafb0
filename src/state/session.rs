//! Annotation session: folder navigation, in-memory staging and batch commit.
//!
//! The session is the single owner of "which folder am I browsing, which image
//! is on screen, and which edits are not saved yet". The UI edits the active
//! form through [`Session::form_mut`]; every time the current image changes,
//! the outgoing form is snapshotted into the staging area under the outgoing
//! path. Nothing reaches the database until [`Session::commit_batch`].

use std::fs;
use std::path::{Path, PathBuf};

use super::data::NewRecord;
use super::edit::Annotation;
use super::library::Library;
use super::navigation::{scan_folder, Navigation};
use super::staging::StagingArea;
use super::suggest::SuggestionProvider;
use crate::error::{LabelerError, Result};
use crate::imaging::classify::FileClassifier;
use crate::imaging::loader::{load_for_display, DisplayImage};

/// What the image slot currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// No image selected
    Empty,
    Ready(DisplayImage),
    /// Decoding failed; holds the message for the placeholder
    Failed(String),
}

/// Result of [`Session::load_folder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderLoad {
    Loaded { count: usize },
    /// The folder holds no supported images
    Empty,
}

/// Result of [`Session::advance`] / [`Session::retreat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigated {
    Moved,
    /// Already on the last image
    EndOfList,
    /// Already on the first image
    AtStart,
    /// No folder loaded
    NoSelection,
}

/// Where the values in the active form came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormSource {
    /// Restored from a staged edit
    Restored,
    /// Filled in by the suggestion provider
    Suggested,
}

/// Result of [`Session::commit_batch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was staged
    NothingPending,
    /// The user said no at the confirmation prompt
    Declined { pending: usize },
    Committed { count: usize },
}

pub struct Session {
    navigation: Navigation,
    staging: StagingArea,
    /// Values of the form for the current image
    form: Annotation,
    form_source: Option<FormSource>,
    preview: Preview,
    folder: Option<PathBuf>,
    suggester: Box<dyn SuggestionProvider>,
    preview_max_side: u32,
}

impl Session {
    pub fn new(suggester: Box<dyn SuggestionProvider>, preview_max_side: u32) -> Self {
        Self {
            navigation: Navigation::new(),
            staging: StagingArea::new(),
            form: Annotation::new(),
            form_source: None,
            preview: Preview::Empty,
            folder: None,
            suggester,
            preview_max_side,
        }
    }

    // ========== Accessors ==========

    pub fn current_path(&self) -> Option<&Path> {
        self.navigation.current()
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn form(&self) -> &Annotation {
        &self.form
    }

    /// Mutable access for the UI controls. Changes are staged on the next
    /// navigation or commit.
    pub fn form_mut(&mut self) -> &mut Annotation {
        &mut self.form
    }

    pub fn form_source(&self) -> Option<FormSource> {
        self.form_source
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn pending_count(&self) -> usize {
        self.staging.len()
    }

    pub fn staged(&self, path: &Path) -> Option<&Annotation> {
        self.staging.get(path)
    }

    pub fn suggester_name(&self) -> &str {
        self.suggester.name()
    }

    // ========== Navigation ==========

    /// Scan `folder` and show its first image.
    ///
    /// The form of the image currently on screen is staged first. Edits staged
    /// for other folders stay pending.
    pub fn load_folder(&mut self, folder: &Path) -> Result<FolderLoad> {
        let files = scan_folder(folder)?;

        self.flush_form();
        self.navigation.replace(files);
        self.folder = Some(folder.to_path_buf());

        log::info!(
            "Loaded {} images from {}",
            self.navigation.len(),
            folder.display()
        );

        if self.navigation.is_empty() {
            self.form.reset();
            self.form_source = None;
            self.preview = Preview::Empty;
            return Ok(FolderLoad::Empty);
        }

        self.show_current();
        Ok(FolderLoad::Loaded {
            count: self.navigation.len(),
        })
    }

    /// Stage the current form and move to the next image
    pub fn advance(&mut self) -> Navigated {
        if self.navigation.is_empty() {
            return Navigated::NoSelection;
        }

        self.flush_form();
        if self.navigation.step_forward() {
            self.show_current();
            Navigated::Moved
        } else {
            Navigated::EndOfList
        }
    }

    /// Stage the current form and move to the previous image
    pub fn retreat(&mut self) -> Navigated {
        if self.navigation.is_empty() {
            return Navigated::NoSelection;
        }

        self.flush_form();
        if self.navigation.step_back() {
            self.show_current();
            Navigated::Moved
        } else {
            Navigated::AtStart
        }
    }

    /// Snapshot the form into the staging area under the current path
    pub fn flush_form(&mut self) {
        if let Some(path) = self.navigation.current() {
            log::debug!("Staging annotation for {}", path.display());
            self.staging.stage(path, self.form.clone());
        }
    }

    /// Fill the form for the current image: the staged edit if there is one,
    /// otherwise a fresh suggestion with every artifact flag cleared.
    ///
    /// Reads staged state only; the database is never touched.
    fn restore_or_suggest(&mut self) -> Option<FormSource> {
        let path = self.navigation.current()?;

        let source = match self.staging.get(path) {
            Some(staged) => {
                self.form = staged.clone();
                FormSource::Restored
            }
            None => {
                let mut suggestion = self.suggester.suggest(path);
                suggestion.artifacts.clear();
                suggestion.doctor_notes.clear();
                self.form = suggestion;
                FormSource::Suggested
            }
        };

        self.form_source = Some(source);
        Some(source)
    }

    /// Decode the current image and fill its form
    fn show_current(&mut self) {
        let Some(path) = self.navigation.current() else {
            self.preview = Preview::Empty;
            return;
        };

        self.preview = match load_for_display(path, self.preview_max_side) {
            Ok(image) => Preview::Ready(image),
            Err(err) => {
                log::warn!("Could not display {}: {}", path.display(), err);
                Preview::Failed(err.to_string())
            }
        };

        self.restore_or_suggest();
    }

    // ========== Commit ==========

    /// Persist every staged annotation and classify the files, all or nothing.
    ///
    /// `confirm` receives the number of staged images and decides whether to
    /// go ahead. Records are inserted in one transaction; if any insert or copy
    /// fails, the transaction is rolled back, copies made by this attempt are
    /// removed and the staged edits stay untouched so the user can retry.
    /// On success the staging area, the file list and the folder are cleared.
    pub fn commit_batch<F>(
        &mut self,
        library: &mut Library,
        classifier: &mut dyn FileClassifier,
        confirm: F,
    ) -> Result<CommitOutcome>
    where
        F: FnOnce(usize) -> bool,
    {
        self.flush_form();

        let pending = self.staging.len();
        if pending == 0 {
            return Ok(CommitOutcome::NothingPending);
        }
        if !confirm(pending) {
            log::info!("Batch of {} images not confirmed", pending);
            return Ok(CommitOutcome::Declined { pending });
        }

        let mut created = Vec::new();
        let mut processed = 0;

        match write_batch(&self.staging, library, classifier, &mut created, &mut processed) {
            Ok(count) => {
                log::info!("Committed batch of {} images", count);
                self.staging.clear();
                self.navigation.clear();
                self.folder = None;
                self.form.reset();
                self.form_source = None;
                self.preview = Preview::Empty;
                Ok(CommitOutcome::Committed { count })
            }
            Err(err) => {
                log::warn!(
                    "Batch failed after {} of {} images, rolling back: {}",
                    processed,
                    pending,
                    err
                );
                remove_copies(&created);
                Err(LabelerError::BatchRolledBack {
                    processed,
                    total: pending,
                    source: Box::new(err),
                })
            }
        }
    }
}

/// Insert + classify every staged edit inside one transaction.
/// The transaction is dropped (rolled back) on the first error.
fn write_batch(
    staging: &StagingArea,
    library: &mut Library,
    classifier: &mut dyn FileClassifier,
    created: &mut Vec<PathBuf>,
    processed: &mut usize,
) -> Result<usize> {
    let mut batch = library.begin_batch()?;

    for (path, annotation) in staging.iter() {
        let record = NewRecord::validated(path, annotation);
        batch.insert(&record)?;

        let classified = classifier.classify(path, &annotation.quality)?;
        if !classified.replaced {
            created.push(classified.destination);
        }
        *processed += 1;
    }

    batch.commit()
}

/// Undo the copies a failed batch created. Pre-existing files are not in
/// the list and stay as they were.
fn remove_copies(created: &[PathBuf]) {
    for path in created {
        if let Err(err) = fs::remove_file(path) {
            log::warn!("Could not remove {} during rollback: {}", path.display(), err);
            continue;
        }
        // Only succeeds when the label folder is now empty
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("folder", &self.folder)
            .field("cursor", &self.navigation.cursor())
            .field("files", &self.navigation.len())
            .field("pending", &self.staging.len())
            .finish()
    }
}
