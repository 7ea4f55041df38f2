//! In-memory raster store backing unit and lifecycle tests.
//!
//! Mirrors the on-disk layout as a map of path -> file content and records
//! every open/close so tests can assert on handle lifetimes.

use crate::dataset::{RasterStore, SourceDataset, TimeAxis, TimeBounds};
use crate::{SourceError, SourceResult};
use cube_common::Raster;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One handle lifecycle event recorded by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Opened(PathBuf),
    Closed(PathBuf),
}

/// Shared record of open/close events, observable after the store has been
/// moved into a provider.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<StoreEvent>>>);

impl EventLog {
    fn push(&self, event: StoreEvent) {
        self.0.lock().expect("event log poisoned").push(event);
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.0.lock().expect("event log poisoned").clone()
    }

    pub fn opens_of(&self, path: &Path) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StoreEvent::Opened(p) if p == path))
            .count()
    }

    pub fn closes_of(&self, path: &Path) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, StoreEvent::Closed(p) if p == path))
            .count()
    }
}

/// Content of one simulated source file.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    pub time: TimeAxis,
    pub bounds: Option<TimeBounds>,
    /// Per-variable slices, one raster per time index
    pub slices: HashMap<String, Vec<Raster>>,
}

impl MemoryFile {
    /// A file with a plain time axis and one variable.
    pub fn with_variable(time: TimeAxis, variable: &str, slices: Vec<Raster>) -> Self {
        let mut map = HashMap::new();
        map.insert(variable.to_string(), slices);
        Self {
            time,
            bounds: None,
            slices: map,
        }
    }
}

/// In-memory [`RasterStore`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: HashMap<PathBuf, MemoryFile>,
    log: EventLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, file: MemoryFile) {
        self.files.insert(path.into(), file);
    }

    /// A handle onto the store's event record; stays valid after the store
    /// is moved into a provider.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }
}

impl RasterStore for MemoryStore {
    type Dataset = MemoryDataset;

    fn list(&self, dir: &Path) -> SourceResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect();
        if files.is_empty() {
            // A directory no simulated file lives in is "unreadable"
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            )));
        }
        files.sort();
        Ok(files)
    }

    fn open(&self, path: &Path) -> SourceResult<MemoryDataset> {
        let file = self.files.get(path).ok_or_else(|| {
            SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            ))
        })?;
        self.log.push(StoreEvent::Opened(path.to_path_buf()));
        Ok(MemoryDataset {
            path: path.to_path_buf(),
            file: file.clone(),
            log: self.log.clone(),
        })
    }
}

/// One open simulated dataset; records its close on drop.
#[derive(Debug)]
pub struct MemoryDataset {
    path: PathBuf,
    file: MemoryFile,
    log: EventLog,
}

impl Drop for MemoryDataset {
    fn drop(&mut self) {
        self.log.push(StoreEvent::Closed(self.path.clone()));
    }
}

impl SourceDataset for MemoryDataset {
    fn time_axis(&self, _variable: &str) -> SourceResult<TimeAxis> {
        Ok(self.file.time.clone())
    }

    fn time_bounds(&self, variable: &str) -> SourceResult<TimeBounds> {
        self.file
            .bounds
            .clone()
            .ok_or_else(|| SourceError::MissingVariable(variable.to_string()))
    }

    fn read_slice(&self, variable: &str, time_index: usize) -> SourceResult<Raster> {
        let slices = self
            .file
            .slices
            .get(variable)
            .ok_or_else(|| SourceError::MissingVariable(variable.to_string()))?;
        slices
            .get(time_index)
            .cloned()
            .ok_or_else(|| SourceError::InvalidLayout {
                variable: variable.to_string(),
                message: format!("time index {} out of range", time_index),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_records_events() {
        let mut store = MemoryStore::new();
        store.insert(
            "/data/a.nc",
            MemoryFile::with_variable(TimeAxis::default(), "v", vec![]),
        );
        let log = store.log();

        let ds = store.open(Path::new("/data/a.nc")).unwrap();
        assert_eq!(log.opens_of(Path::new("/data/a.nc")), 1);
        assert_eq!(log.closes_of(Path::new("/data/a.nc")), 0);

        drop(ds);
        assert_eq!(log.closes_of(Path::new("/data/a.nc")), 1);
    }

    #[test]
    fn test_list_unknown_dir_is_io_error() {
        let store = MemoryStore::new();
        let err = store.list(Path::new("/nowhere")).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
