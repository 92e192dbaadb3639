//! Calibration storage for the simulation board.
//!
//! The file-backed store persists the calibration table using bincode for
//! efficient binary serialization. Without a configured path the table lives
//! in memory and is lost with the process.

use fgen_common::hal::driver::{CalibrationStore, HalError, Peripheral};
use fgen_common::hal::types::CalibrationTable;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// On-disk calibration record.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PersistedCalibration {
    /// Version of the record format (for migration)
    pub version: u32,
    /// Timestamp of last save (Unix epoch seconds)
    pub saved_at: u64,
    /// Stored table
    pub table: CalibrationTable,
}

impl PersistedCalibration {
    /// Current record format version.
    pub const CURRENT_VERSION: u32 = 1;
}

/// Calibration table stored in a bincode file.
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Peripheral for FileCalibrationStore {
    fn name(&self) -> &'static str {
        "calibration"
    }

    fn init(&self) -> Result<(), HalError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(HalError::InitFailed(format!(
                    "calibration directory {parent:?} does not exist"
                )));
            }
        }
        Ok(())
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self) -> Result<CalibrationTable, HalError> {
        debug!("Loading calibration from {:?}", self.path);

        if !self.path.exists() {
            debug!("Calibration file does not exist, starting with an empty table");
            return Ok(CalibrationTable::new());
        }

        let file = File::open(&self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to open calibration file: {}", e))
        })?;

        let reader = BufReader::new(file);
        let record: PersistedCalibration = bincode::deserialize_from(reader).map_err(|e| {
            HalError::PersistenceError(format!("Failed to deserialize calibration: {}", e))
        })?;

        if record.version != PersistedCalibration::CURRENT_VERSION {
            warn!(
                "Calibration file version {} differs from current {}, starting with an empty table",
                record.version,
                PersistedCalibration::CURRENT_VERSION
            );
            return Ok(CalibrationTable::new());
        }

        info!(
            "Loaded {} calibration points from {:?} (saved at {})",
            record.table.len(),
            self.path,
            record.saved_at
        );
        Ok(record.table)
    }

    fn save(&self, table: &CalibrationTable) -> Result<(), HalError> {
        debug!("Saving calibration to {:?}", self.path);

        let record = PersistedCalibration {
            version: PersistedCalibration::CURRENT_VERSION,
            saved_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            table: table.clone(),
        };

        // Write a sibling file first so a failed save never truncates the old table.
        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp).map_err(|e| {
            HalError::PersistenceError(format!("Failed to create calibration file: {}", e))
        })?;
        let written = encode_record(file, &record).and_then(|file| {
            file.sync_all().map_err(|e| {
                HalError::PersistenceError(format!("Failed to sync calibration file: {}", e))
            })
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to replace calibration file: {}", e))
        })?;

        info!(
            "Saved {} calibration points to {:?}",
            table.len(),
            self.path
        );
        Ok(())
    }
}

/// Serialize `record` through a buffer and flush it, handing back the writer.
fn encode_record<W: Write>(inner: W, record: &PersistedCalibration) -> Result<W, HalError> {
    let mut writer = BufWriter::new(inner);
    bincode::serialize_into(&mut writer, record).map_err(|e| {
        HalError::PersistenceError(format!("Failed to serialize calibration: {}", e))
    })?;
    writer.into_inner().map_err(|e| {
        HalError::PersistenceError(format!("Failed to write calibration file: {}", e.error()))
    })
}

/// Calibration table held in memory.
#[derive(Default)]
pub struct MemoryCalibrationStore {
    table: Mutex<CalibrationTable>,
    saves: Mutex<u32>,
}

impl MemoryCalibrationStore {
    /// Create a store pre-loaded with `table`.
    pub fn with_table(table: CalibrationTable) -> Self {
        Self {
            table: Mutex::new(table),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> u32 {
        *self.saves.lock()
    }
}

impl Peripheral for MemoryCalibrationStore {
    fn name(&self) -> &'static str {
        "calibration"
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self) -> Result<CalibrationTable, HalError> {
        Ok(self.table.lock().clone())
    }

    fn save(&self, table: &CalibrationTable) -> Result<(), HalError> {
        *self.table.lock() = table.clone();
        *self.saves.lock() += 1;
        debug!(points = table.len(), "Calibration saved to memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgen_common::hal::types::CalibrationPoint;
    use tempfile::tempdir;

    fn sample_table() -> CalibrationTable {
        let mut table = CalibrationTable::new();
        table.add_point(CalibrationPoint {
            frequency_hz: 1_000_000_000,
            power_correction_db: -2,
            temp_coefficient: 0.05,
        });
        table.add_point(CalibrationPoint {
            frequency_hz: 5_000_000_000,
            power_correction_db: 3,
            temp_coefficient: -0.01,
        });
        table
    }

    #[test]
    fn test_file_store_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.bin");
        let store = FileCalibrationStore::new(&path);
        store.init().unwrap();

        store.save(&sample_table()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, sample_table());
    }

    #[test]
    fn test_file_store_load_missing() {
        let dir = tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path().join("nonexistent.bin"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.bin");
        fs::write(&path, b"\xff\xff\xff\xff\xff\xff\xff\xff\xff").unwrap();
        let store = FileCalibrationStore::new(&path);
        assert!(matches!(store.load(), Err(HalError::PersistenceError(_))));
    }

    #[test]
    fn test_file_store_ignores_other_versions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.bin");
        let record = PersistedCalibration {
            version: 99,
            saved_at: 0,
            table: sample_table(),
        };
        fs::write(&path, bincode::serialize(&record).unwrap()).unwrap();

        let store = FileCalibrationStore::new(&path);
        assert!(store.load().unwrap().is_empty());
    }

    /// Accepts nothing; every write reports a full disk.
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encode_reports_buffered_write_failure() {
        let record = PersistedCalibration {
            version: PersistedCalibration::CURRENT_VERSION,
            saved_at: 0,
            table: sample_table(),
        };
        match encode_record(FullDisk, &record) {
            Err(HalError::PersistenceError(msg)) => assert!(msg.contains("no space left")),
            other => panic!("expected a persistence error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calibration.bin");
        let store = FileCalibrationStore::new(&path);
        store.save(&sample_table()).unwrap();

        // A directory in place of the scratch file makes the next save fail.
        fs::create_dir(path.with_extension("tmp")).unwrap();
        assert!(matches!(
            store.save(&CalibrationTable::new()),
            Err(HalError::PersistenceError(_))
        ));
        assert_eq!(store.load().unwrap(), sample_table());
    }

    #[test]
    fn test_file_store_init_requires_directory() {
        let store = FileCalibrationStore::new("/nonexistent/dir/calibration.bin");
        assert!(matches!(store.init(), Err(HalError::InitFailed(_))));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryCalibrationStore::default();
        assert!(store.load().unwrap().is_empty());
        store.save(&sample_table()).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().len(), 2);
    }
}
