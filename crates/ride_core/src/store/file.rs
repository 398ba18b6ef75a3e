use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{check_next_id, RequestRecordStore, StatusTransition, StoreError};
use crate::request::{RequestId, RideRequest};

/// Durable store backed by two JSON array files.
///
/// `<name>.json` holds the submission log and `<name>.status.json` the status log.
/// Every write reads the whole array, appends, and atomically replaces the file via a
/// temp-file rename. Concurrent writers in separate processes can still lose an append.
#[derive(Debug, Clone)]
pub struct JsonFileRecordStore {
    records_path: PathBuf,
    transitions_path: PathBuf,
}

impl JsonFileRecordStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let records_path = path.into();
        let transitions_path = status_log_path(&records_path);
        Self {
            records_path,
            transitions_path,
        }
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn transitions_path(&self) -> &Path {
        &self.transitions_path
    }
}

impl RequestRecordStore for JsonFileRecordStore {
    fn enqueue(&mut self, record: &RideRequest) -> Result<(), StoreError> {
        let mut records: Vec<RideRequest> = read_array(&self.records_path)?;
        check_next_id(records.last().map(RideRequest::id), record)?;
        records.push(record.clone());
        write_array_atomic(&self.records_path, &records)?;
        tracing::debug!(
            request_id = record.id(),
            path = %self.records_path.display(),
            total = records.len(),
            "request appended to queue file"
        );
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<RideRequest>, StoreError> {
        read_array(&self.records_path)
    }

    fn record_transition(&mut self, transition: &StatusTransition) -> Result<(), StoreError> {
        let known = self
            .load_all()?
            .iter()
            .any(|record| record.id() == transition.request_id);
        if !known {
            return Err(StoreError::UnknownRequest(transition.request_id));
        }
        let mut transitions: Vec<StatusTransition> = read_array(&self.transitions_path)?;
        transitions.push(*transition);
        write_array_atomic(&self.transitions_path, &transitions)
    }

    fn load_transitions(&self) -> Result<Vec<StatusTransition>, StoreError> {
        read_array(&self.transitions_path)
    }

    fn last_id(&self) -> Result<Option<RequestId>, StoreError> {
        Ok(self.load_all()?.iter().map(RideRequest::id).max())
    }
}

fn status_log_path(records_path: &Path) -> PathBuf {
    let stem = records_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "requests".to_string());
    records_path.with_file_name(format!("{stem}.status.json"))
}

fn read_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Io {
                action: "read",
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&contents).map_err(|error| StoreError::InvalidFormat {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}

fn write_array_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error("create directory", parent))?;
    }

    let serialized =
        serde_json::to_string_pretty(items).map_err(|error| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            message: format!("failed to serialize: {error}"),
        })?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("json.tmp.{nanos}"));
    fill_temp_file(&temp_path, |file| {
        file.write_all(serialized.as_bytes())?;
        file.sync_all()
    })?;

    replace_file(&temp_path, path)
}

/// Create `temp_path` and fill it; a partially written file is removed on failure.
fn fill_temp_file(
    temp_path: &Path,
    fill: impl FnOnce(&mut File) -> std::io::Result<()>,
) -> Result<(), StoreError> {
    let mut file = File::create(temp_path).map_err(io_error("create", temp_path))?;
    if let Err(source) = fill(&mut file) {
        drop(file);
        let _ = fs::remove_file(temp_path);
        return Err(StoreError::Io {
            action: "write",
            path: temp_path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io {
        action,
        path,
        source,
    }
}

fn replace_file(temp_path: &Path, target_path: &Path) -> Result<(), StoreError> {
    match fs::rename(temp_path, target_path) {
        Ok(()) => Ok(()),
        Err(first_error) => {
            if target_path.exists() {
                if let Err(source) = fs::remove_file(target_path) {
                    let _ = fs::remove_file(temp_path);
                    return Err(StoreError::Io {
                        action: "replace",
                        path: target_path.to_path_buf(),
                        source,
                    });
                }
                fs::rename(temp_path, target_path).map_err(|source| {
                    let _ = fs::remove_file(temp_path);
                    StoreError::Io {
                        action: "move temp file onto",
                        path: target_path.to_path_buf(),
                        source,
                    }
                })
            } else {
                let _ = fs::remove_file(temp_path);
                Err(StoreError::Io {
                    action: "move temp file onto",
                    path: target_path.to_path_buf(),
                    source: first_error,
                })
            }
        }
    }
}
