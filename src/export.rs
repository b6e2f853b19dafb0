//! CSV export of committed annotations.

use serde::Serialize;
use std::path::Path;

use crate::config::DatabaseLocation;
use crate::error::{LabelerError, Result};
use crate::state::data::AnnotationRecord;
use crate::state::library::Library;

/// Default export file name
pub const DEFAULT_EXPORT_FILE: &str = "dataset_labels.csv";

/// Column order of the export, always written as the first line
pub const EXPORT_COLUMNS: [&str; 12] = [
    "filename",
    "study_type",
    "laterality",
    "sharpness",
    "illumination",
    "centering",
    "field_of_view",
    "obstructions",
    "artifacts",
    "quality",
    "diagnostic_utility",
    "doctor_notes",
];

/// One CSV line; field order must match `EXPORT_COLUMNS`
#[derive(Serialize)]
struct ExportRow<'a> {
    filename: &'a str,
    study_type: Option<&'a str>,
    laterality: Option<&'a str>,
    sharpness: Option<&'a str>,
    illumination: Option<&'a str>,
    centering: Option<&'a str>,
    field_of_view: Option<&'a str>,
    obstructions: Option<&'a str>,
    artifacts: Option<&'a str>,
    quality: Option<&'a str>,
    diagnostic_utility: Option<&'a str>,
    doctor_notes: Option<&'a str>,
}

impl<'a> From<&'a AnnotationRecord> for ExportRow<'a> {
    fn from(record: &'a AnnotationRecord) -> Self {
        ExportRow {
            filename: &record.filename,
            study_type: record.study_type.as_deref(),
            laterality: record.laterality.as_deref(),
            sharpness: record.sharpness.as_deref(),
            illumination: record.illumination.as_deref(),
            centering: record.centering.as_deref(),
            field_of_view: record.field_of_view.as_deref(),
            obstructions: record.obstructions.as_deref(),
            artifacts: record.artifacts.as_deref(),
            quality: record.quality.as_deref(),
            diagnostic_utility: record.diagnostic_utility.as_deref(),
            doctor_notes: record.doctor_notes.as_deref(),
        }
    }
}

/// Open a database for reading without creating it.
pub fn open_existing(location: &DatabaseLocation) -> Result<Library> {
    if let DatabaseLocation::File(path) = location {
        if !path.is_file() {
            return Err(LabelerError::DatabaseNotFound(path.clone()));
        }
    }
    Library::open(location)
}

/// Write every record to `output` as CSV. Returns the number of data rows.
pub fn export_csv(library: &Library, output: &Path) -> Result<usize> {
    let records = library.all_records()?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(output)?;
    writer.write_record(EXPORT_COLUMNS)?;
    for record in &records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer.flush().map_err(|e| LabelerError::io(output, e))?;

    log::info!("Exported {} records to {}", records.len(), output.display());
    Ok(records.len())
}
