/// Per-image annotation values collected from the form
///
/// An `Annotation` is a value snapshot of every classification control.
/// Snapshots are staged in memory per file path and only turned into
/// database records when the batch is committed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ========== Vocabularies ==========

/// Imaging technique options
pub const STUDY_TYPES: &[&str] = &[
    "Fundus photography",
    "OCT",
    "OCTA",
    "Visual field",
    "Stereoscopic photography",
    "Anterior segment",
];

/// Which eye the image belongs to
pub const LATERALITIES: &[&str] = &["OD (Right)", "OS (Left)", "Not identified"];

/// Are the relevant details in focus?
pub const SHARPNESS_LEVELS: &[&str] = &[
    "Excellent sharpness",
    "Good sharpness",
    "Slightly blurred",
    "Severely blurred - not usable",
];

/// Is the exposure correct?
pub const ILLUMINATION_LEVELS: &[&str] = &[
    "Well illuminated",
    "Overexposed",
    "Underexposed",
    "Uneven illumination",
];

/// Is the region of interest centered?
pub const CENTERING_LEVELS: &[&str] = &[
    "Correctly centered",
    "Decentered nasally",
    "Decentered temporally",
    "Poor composition",
];

/// Does the image cover what is needed?
pub const FIELD_OF_VIEW_LEVELS: &[&str] = &[
    "Adequate field",
    "Incomplete field",
    "Too close",
    "Too far",
];

/// Opacities, floaters or bleeding
pub const OBSTRUCTIONS: &[&str] = &[
    "None",
    "Media opacity",
    "Floaters",
    "Bleeding/Hemorrhage",
];

/// Overall clinical gradability. Also names the classification folder.
pub const QUALITY_GRADES: &[&str] = &["Grade A (High quality)", "Grade B (Limited)", "No gradable"];

/// Can the image be used for a diagnosis?
pub const DIAGNOSTIC_UTILITIES: &[&str] = &[
    "Useful for diagnosis",
    "Useful with limitations",
    "Not useful",
];

// ========== Artifacts ==========

/// Image artifacts that can be flagged independently of each other
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactFlag {
    Reflections,
    Shadows,
    Eyelashes,
    Blink,
    BrokenImage,
}

impl ArtifactFlag {
    /// Every flag, in display order
    pub const ALL: [ArtifactFlag; 5] = [
        ArtifactFlag::Reflections,
        ArtifactFlag::Shadows,
        ArtifactFlag::Eyelashes,
        ArtifactFlag::Blink,
        ArtifactFlag::BrokenImage,
    ];

    /// Text used both in the UI and in the stored comma-joined column
    pub fn label(self) -> &'static str {
        match self {
            ArtifactFlag::Reflections => "Reflections",
            ArtifactFlag::Shadows => "Shadows",
            ArtifactFlag::Eyelashes => "Eyelashes",
            ArtifactFlag::Blink => "Blink",
            ArtifactFlag::BrokenImage => "Broken image",
        }
    }
}

impl fmt::Display for ArtifactFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of flagged artifacts.
///
/// Kept as a proper set in memory; converted to comma-joined text only when
/// written to the database.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet(BTreeSet<ArtifactFlag>);

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: ArtifactFlag) -> bool {
        self.0.contains(&flag)
    }

    /// Turn a flag on or off
    pub fn set(&mut self, flag: ArtifactFlag, on: bool) {
        if on {
            self.0.insert(flag);
        } else {
            self.0.remove(&flag);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ArtifactFlag> + '_ {
        self.0.iter().copied()
    }

    /// Comma-joined storage form, in display order (e.g. "Reflections,Blink")
    pub fn to_storage(&self) -> String {
        self.iter()
            .map(ArtifactFlag::label)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<ArtifactFlag> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = ArtifactFlag>>(iter: I) -> Self {
        ArtifactSet(iter.into_iter().collect())
    }
}

// ========== Annotation ==========

/// All classification values for one image
///
/// Text fields hold whatever the form shows; an empty string means
/// "not set" and is stored as NULL.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    // ========== Study ==========
    pub study_type: String,
    pub laterality: String,

    // ========== Technical assessment ==========
    pub sharpness: String,
    pub illumination: String,
    pub centering: String,
    pub field_of_view: String,

    // ========== Problems ==========
    pub artifacts: ArtifactSet,
    pub obstructions: String,

    // ========== Conclusion ==========
    /// Overall gradability; the file is classified under this label
    pub quality: String,
    pub diagnostic_utility: String,
    pub doctor_notes: String,
}

impl Annotation {
    /// Create an empty annotation (nothing selected)
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field to empty
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Convert a form value into a nullable column value
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_blank() {
        let annotation = Annotation::default();
        assert!(annotation.quality.is_empty());
        assert!(annotation.artifacts.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut annotation = Annotation::new();
        annotation.quality = "No gradable".into();
        annotation.artifacts.set(ArtifactFlag::Blink, true);
        assert_ne!(annotation, Annotation::new());

        annotation.reset();

        assert_eq!(annotation, Annotation::new());
    }

    #[test]
    fn test_artifacts_storage_is_ordered_and_comma_joined() {
        let mut set = ArtifactSet::new();
        set.set(ArtifactFlag::BrokenImage, true);
        set.set(ArtifactFlag::Reflections, true);
        set.set(ArtifactFlag::Blink, true);

        assert_eq!(set.to_storage(), "Reflections,Blink,Broken image");
        assert_eq!(ArtifactSet::new().to_storage(), "");
    }

    #[test]
    fn test_toggle_off_removes_flag() {
        let mut set: ArtifactSet = [ArtifactFlag::Shadows, ArtifactFlag::Blink].into_iter().collect();
        set.set(ArtifactFlag::Shadows, false);
        assert!(!set.contains(ArtifactFlag::Shadows));
        assert!(set.contains(ArtifactFlag::Blink));
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" OCT "), Some("OCT".to_string()));
    }
}
