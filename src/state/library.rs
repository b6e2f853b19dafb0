use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};

use super::data::{AnnotationRecord, NewRecord, ValidationStatus};
use crate::config::DatabaseLocation;
use crate::error::{LabelerError, Result};

/// Schema version stored in `PRAGMA user_version`
const CURRENT_SCHEMA_VERSION: i32 = 1;

const RECORD_COLUMNS: &str = "id, filename, original_path, study_type, laterality, \
     sharpness, illumination, centering, field_of_view, artifacts, obstructions, \
     quality, diagnostic_utility, doctor_notes, validation_status, created_at";

/// The Library manages the SQLite annotation database.
/// It stores one row per committed image annotation.
pub struct Library {
    conn: Connection,
    location: DatabaseLocation,
}

impl Library {
    /// Open (or create) the database and bring its schema up to date.
    pub fn open(location: &DatabaseLocation) -> Result<Self> {
        let conn = match location {
            DatabaseLocation::File(path) => {
                // Ensure the parent directory exists
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| LabelerError::io(parent, e))?;
                }
                Connection::open(path)?
            }
            DatabaseLocation::Memory => Connection::open_in_memory()?,
        };

        let mut library = Library {
            conn,
            location: location.clone(),
        };
        library.init_schema()?;

        match &library.location {
            DatabaseLocation::File(path) => {
                log::info!("Database initialized at: {}", path.display())
            }
            DatabaseLocation::Memory => log::info!("Database initialized in memory"),
        }

        Ok(library)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseLocation::Memory)
    }

    /// Create or migrate the schema based on `user_version`.
    fn init_schema(&mut self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version > CURRENT_SCHEMA_VERSION {
            return Err(LabelerError::InvalidValue {
                field: "user_version",
                value: format!(
                    "{version} (newest supported schema is {CURRENT_SCHEMA_VERSION})"
                ),
            });
        }
        if version == CURRENT_SCHEMA_VERSION {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let mut next = version;
        while next < CURRENT_SCHEMA_VERSION {
            next += 1;
            apply_migration(&tx, next)?;
        }
        tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
        tx.commit()?;

        log::info!("Database schema migrated from v{} to v{}", version, CURRENT_SCHEMA_VERSION);
        Ok(())
    }

    /// Get a count of records in the library
    pub fn record_count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM image_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get all records ordered by ID (insertion order)
    pub fn all_records(&self) -> Result<Vec<AnnotationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM image_records ORDER BY id ASC"
        ))?;
        let mut rows = stmt.query([])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    /// Start a unit of work. Nothing is visible to readers until
    /// [`Batch::commit`]; dropping the batch rolls it back.
    pub fn begin_batch(&mut self) -> Result<Batch<'_>> {
        let tx = self.conn.transaction()?;
        Ok(Batch { tx, inserted: 0 })
    }
}

/// One transactional group of record inserts
pub struct Batch<'conn> {
    tx: Transaction<'conn>,
    inserted: usize,
}

impl Batch<'_> {
    /// Insert a record and return its new ID
    pub fn insert(&mut self, record: &NewRecord) -> Result<i64> {
        self.tx.execute(
            "INSERT INTO image_records (
                filename, original_path, study_type, laterality,
                sharpness, illumination, centering, field_of_view,
                artifacts, obstructions, quality, diagnostic_utility,
                doctor_notes, validation_status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                record.filename,
                record.original_path,
                record.study_type,
                record.laterality,
                record.sharpness,
                record.illumination,
                record.centering,
                record.field_of_view,
                record.artifacts,
                record.obstructions,
                record.quality,
                record.diagnostic_utility,
                record.doctor_notes,
                record.validation_status.as_str(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        self.inserted += 1;
        Ok(self.tx.last_insert_rowid())
    }

    /// Make every insert of this batch durable. Returns the row count.
    pub fn commit(self) -> Result<usize> {
        let inserted = self.inserted;
        self.tx.commit()?;
        Ok(inserted)
    }

    /// Discard every insert of this batch
    pub fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => {
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS image_records (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    filename            TEXT NOT NULL CHECK (filename <> ''),
                    original_path       TEXT NOT NULL CHECK (original_path <> ''),
                    study_type          TEXT,
                    laterality          TEXT,
                    sharpness           TEXT,
                    illumination        TEXT,
                    centering           TEXT,
                    field_of_view       TEXT,
                    artifacts           TEXT,
                    obstructions        TEXT,
                    quality             TEXT,
                    diagnostic_utility  TEXT,
                    validation_status   TEXT NOT NULL DEFAULT 'Pending'
                                        CHECK (validation_status IN ('Pending', 'Validated')),
                    created_at          TEXT NOT NULL,
                    doctor_notes        TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_image_records_original_path
                    ON image_records(original_path);",
            )?;
            Ok(())
        }
        other => Err(LabelerError::InvalidValue {
            field: "user_version",
            value: format!("no migration defined for version {other}"),
        }),
    }
}

fn row_to_record(row: &Row) -> Result<AnnotationRecord> {
    let status: String = row.get("validation_status")?;
    let created_at: Option<String> = row.get("created_at")?;

    Ok(AnnotationRecord {
        id: row.get("id")?,
        filename: row.get("filename")?,
        original_path: row.get("original_path")?,
        study_type: row.get("study_type")?,
        laterality: row.get("laterality")?,
        sharpness: row.get("sharpness")?,
        illumination: row.get("illumination")?,
        centering: row.get("centering")?,
        field_of_view: row.get("field_of_view")?,
        artifacts: row.get("artifacts")?,
        obstructions: row.get("obstructions")?,
        quality: row.get("quality")?,
        diagnostic_utility: row.get("diagnostic_utility")?,
        doctor_notes: row.get("doctor_notes")?,
        validation_status: ValidationStatus::parse(&status)?,
        created_at: created_at.as_deref().map(parse_datetime).transpose()?,
    })
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LabelerError::InvalidValue {
            field: "created_at",
            value: value.to_string(),
        })
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("location", &self.location)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::edit::Annotation;
    use std::path::Path;
    use tempfile::TempDir;

    fn record_for(path: &str, quality: &str) -> NewRecord {
        let mut annotation = Annotation::new();
        annotation.quality = quality.to_string();
        NewRecord::validated(Path::new(path), &annotation)
    }

    #[test]
    fn test_new_library_is_empty() {
        let library = Library::open_in_memory().unwrap();
        assert_eq!(library.record_count().unwrap(), 0);
        assert!(library.all_records().unwrap().is_empty());
    }

    #[test]
    fn test_committed_batch_is_visible() {
        let mut library = Library::open_in_memory().unwrap();

        let mut batch = library.begin_batch().unwrap();
        batch.insert(&record_for("/scans/a.png", "Grade A")).unwrap();
        batch.insert(&record_for("/scans/b.jpg", "No gradable")).unwrap();
        assert_eq!(batch.commit().unwrap(), 2);

        let records = library.all_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "a.png");
        assert_eq!(records[1].quality.as_deref(), Some("No gradable"));
        assert!(records
            .iter()
            .all(|r| r.validation_status == ValidationStatus::Validated && r.created_at.is_some()));
    }

    #[test]
    fn test_dropped_batch_rolls_back() {
        let mut library = Library::open_in_memory().unwrap();

        {
            let mut batch = library.begin_batch().unwrap();
            batch.insert(&record_for("/scans/a.png", "Grade A")).unwrap();
            // dropped without commit
        }
        assert_eq!(library.record_count().unwrap(), 0);

        let mut batch = library.begin_batch().unwrap();
        batch.insert(&record_for("/scans/a.png", "Grade A")).unwrap();
        batch.rollback().unwrap();
        assert_eq!(library.record_count().unwrap(), 0);
    }

    #[test]
    fn test_empty_filename_is_rejected() {
        let mut library = Library::open_in_memory().unwrap();
        let mut record = record_for("/scans/a.png", "Grade A");
        record.filename.clear();

        let mut batch = library.begin_batch().unwrap();
        assert!(matches!(batch.insert(&record), Err(LabelerError::Database(_))));
    }

    #[test]
    fn test_reopen_file_keeps_records_and_schema_version() {
        let dir = TempDir::new().unwrap();
        let location = DatabaseLocation::File(dir.path().join("nested").join("labels.db"));

        {
            let mut library = Library::open(&location).unwrap();
            let mut batch = library.begin_batch().unwrap();
            batch.insert(&record_for("/scans/a.png", "Grade A")).unwrap();
            batch.commit().unwrap();
        }

        let library = Library::open(&location).unwrap();
        assert_eq!(library.record_count().unwrap(), 1);
        let version: i32 = library
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let records = library.all_records().unwrap();
        assert_eq!(records[0].original_path, "/scans/a.png");
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 42).unwrap();
        }

        let err = Library::open(&DatabaseLocation::File(path)).unwrap_err();
        assert!(matches!(err, LabelerError::InvalidValue { field: "user_version", .. }));
    }
}
