use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::config::app_config::StoreSection;
use crate::core::errors::{Result, VestigeError};
use crate::core::models::change_record::ChangeRecord;
use crate::core::traits::store::ChangeStore;

/// Change store that appends records as JSON lines to a file.
///
/// Each line in the log file is a self-contained JSON object
/// representing one `ChangeRecord`. This format supports efficient
/// append operations and line-by-line streaming reads.
pub struct JsonChangeStore {
    log_path: PathBuf,
}

impl JsonChangeStore {
    /// Create a store that writes to `{dir}/{log_file}`.
    pub fn new(dir: &Path, log_file: &str) -> Self {
        Self {
            log_path: dir.join(log_file),
        }
    }

    /// Create a store from a `[store]` config section, falling back to
    /// the default filename if the section is missing.
    pub fn from_config(dir: &Path, store_section: Option<&StoreSection>) -> Self {
        let log_file = store_section
            .map(|s| s.log_file.as_str())
            .unwrap_or("changes.log");
        Self::new(dir, log_file)
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

impl ChangeStore for JsonChangeStore {
    fn create(&self, record: ChangeRecord) -> Result<ChangeRecord> {
        let line = serde_json::to_string(&record).map_err(|e| VestigeError::StoreError {
            detail: format!("Failed to serialize change record: {e}"),
        })?;

        // Ensure the parent directory exists
        if let Some(parent) = self.log_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| VestigeError::StoreError {
                detail: format!("Cannot open change log at {}: {e}", self.log_path.display()),
            })?;

        writeln!(file, "{line}").map_err(|e| VestigeError::StoreError {
            detail: format!("Failed to write change record: {e}"),
        })?;

        Ok(record)
    }

    fn query_by_target(&self, identifier: &str) -> Result<Vec<ChangeRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.log_path).map_err(|e| VestigeError::StoreError {
            detail: format!("Cannot read change log: {e}"),
        })?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| VestigeError::StoreError {
                detail: format!("Error reading change log line {}: {e}", line_num + 1),
            })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record: ChangeRecord =
                serde_json::from_str(trimmed).map_err(|e| VestigeError::StoreError {
                    detail: format!("Malformed change record at line {}: {e}", line_num + 1),
                })?;

            if record.identifier == identifier {
                records.push(record);
            }
        }

        Ok(records)
    }
}
