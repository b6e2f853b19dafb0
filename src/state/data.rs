/// Shared data structures for persisted annotations
///
/// These structs represent the data model that flows between
/// the staging session and the database layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::edit::{non_empty, Annotation};
use crate::error::LabelerError;

/// Review lifecycle of a record. Only ever moves Pending -> Validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ValidationStatus {
    #[default]
    Pending,
    Validated,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "Pending",
            ValidationStatus::Validated => "Validated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, LabelerError> {
        match value {
            "Pending" => Ok(ValidationStatus::Pending),
            "Validated" => Ok(ValidationStatus::Validated),
            _ => Err(LabelerError::InvalidValue {
                field: "validation_status",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record ready to be inserted (no ID yet)
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Filename only (e.g., "IMG_0001.dcm")
    pub filename: String,
    /// Full path to the original file
    pub original_path: String,
    pub study_type: Option<String>,
    pub laterality: Option<String>,
    pub sharpness: Option<String>,
    pub illumination: Option<String>,
    pub centering: Option<String>,
    pub field_of_view: Option<String>,
    /// Comma-joined artifact labels
    pub artifacts: Option<String>,
    pub obstructions: Option<String>,
    pub quality: Option<String>,
    pub diagnostic_utility: Option<String>,
    pub doctor_notes: Option<String>,
    pub validation_status: ValidationStatus,
    pub created_at: DateTime<Utc>,
}

impl NewRecord {
    /// Build a validated record from a staged annotation.
    ///
    /// The timestamp is taken now; `filename` falls back to the whole path
    /// when it has no final component so the column is never empty.
    pub fn validated(path: &Path, annotation: &Annotation) -> Self {
        let original_path = path.to_string_lossy().into_owned();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| original_path.clone());

        NewRecord {
            filename,
            original_path,
            study_type: non_empty(&annotation.study_type),
            laterality: non_empty(&annotation.laterality),
            sharpness: non_empty(&annotation.sharpness),
            illumination: non_empty(&annotation.illumination),
            centering: non_empty(&annotation.centering),
            field_of_view: non_empty(&annotation.field_of_view),
            artifacts: non_empty(&annotation.artifacts.to_storage()),
            obstructions: non_empty(&annotation.obstructions),
            quality: non_empty(&annotation.quality),
            diagnostic_utility: non_empty(&annotation.diagnostic_utility),
            doctor_notes: non_empty(&annotation.doctor_notes),
            validation_status: ValidationStatus::Validated,
            created_at: Utc::now(),
        }
    }
}

/// Represents a single persisted annotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRecord {
    /// Unique database ID
    pub id: i64,
    pub filename: String,
    pub original_path: String,
    pub study_type: Option<String>,
    pub laterality: Option<String>,
    pub sharpness: Option<String>,
    pub illumination: Option<String>,
    pub centering: Option<String>,
    pub field_of_view: Option<String>,
    pub artifacts: Option<String>,
    pub obstructions: Option<String>,
    pub quality: Option<String>,
    pub diagnostic_utility: Option<String>,
    pub doctor_notes: Option<String>,
    pub validation_status: ValidationStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::edit::ArtifactFlag;

    #[test]
    fn test_status_text_round_trip() {
        for status in [ValidationStatus::Pending, ValidationStatus::Validated] {
            assert_eq!(ValidationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ValidationStatus::parse("validated").is_err());
        assert_eq!(ValidationStatus::default(), ValidationStatus::Pending);
    }

    #[test]
    fn test_validated_record_from_annotation() {
        let mut annotation = Annotation::new();
        annotation.quality = "Grade A".into();
        annotation.study_type = "OCT".into();
        annotation.artifacts.set(ArtifactFlag::Eyelashes, true);
        annotation.artifacts.set(ArtifactFlag::Reflections, true);

        let record = NewRecord::validated(Path::new("/data/scans/a.png"), &annotation);

        assert_eq!(record.filename, "a.png");
        assert_eq!(record.original_path, "/data/scans/a.png");
        assert_eq!(record.quality.as_deref(), Some("Grade A"));
        assert_eq!(record.artifacts.as_deref(), Some("Reflections,Eyelashes"));
        assert_eq!(record.laterality, None);
        assert_eq!(record.doctor_notes, None);
        assert_eq!(record.validation_status, ValidationStatus::Validated);
    }
}
