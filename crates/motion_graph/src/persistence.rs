use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic_io::write_text_atomic;
use crate::math::Vec3;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistedValue {
    Float(f32),
    Vector(Vec3),
    Bool(bool),
}

pub trait PersistenceWriter {
    fn write_float(&mut self, key: &str, value: f32);
    fn write_vector(&mut self, key: &str, value: Vec3);
    fn write_bool(&mut self, key: &str, value: bool);
}

/// Reads fall back to `default` when a key is absent or holds a different type.
pub trait PersistenceReader {
    fn try_read_float(&self, key: &str, default: f32) -> f32;
    fn try_read_vector(&self, key: &str, default: Vec3) -> Vec3;
    fn try_read_bool(&self, key: &str, default: bool) -> bool;
}

/// Continuous variables of one state instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateRecord {
    values: BTreeMap<String, PersistedValue>,
}

impl StateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, key: &str) -> Option<&PersistedValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PersistedValue> {
        self.values.remove(key)
    }

    fn insert(&mut self, key: &str, value: PersistedValue) {
        self.values.insert(key.to_string(), value);
    }
}

impl PersistenceWriter for StateRecord {
    fn write_float(&mut self, key: &str, value: f32) {
        self.insert(key, PersistedValue::Float(value));
    }

    fn write_vector(&mut self, key: &str, value: Vec3) {
        self.insert(key, PersistedValue::Vector(value));
    }

    fn write_bool(&mut self, key: &str, value: bool) {
        self.insert(key, PersistedValue::Bool(value));
    }
}

impl PersistenceReader for StateRecord {
    fn try_read_float(&self, key: &str, default: f32) -> f32 {
        match self.get(key) {
            Some(PersistedValue::Float(value)) => *value,
            _ => default,
        }
    }

    fn try_read_vector(&self, key: &str, default: Vec3) -> Vec3 {
        match self.get(key) {
            Some(PersistedValue::Vector(value)) => *value,
            _ => default,
        }
    }

    fn try_read_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(PersistedValue::Bool(value)) => *value,
            _ => default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub format_version: u32,
    pub definition_hash: String,
    pub active_state: Option<String>,
    #[serde(default)]
    pub time_in_state: f32,
    #[serde(default)]
    pub states: BTreeMap<String, StateRecord>,
}

#[derive(Debug, Error)]
pub enum SnapshotFileError {
    #[error("failed to access snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode snapshot for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse snapshot {path} at {json_path}: {message}")]
    Parse {
        path: PathBuf,
        json_path: String,
        message: String,
    },
}

pub fn write_snapshot_file(path: &Path, snapshot: &GraphSnapshot) -> Result<(), SnapshotFileError> {
    let json =
        serde_json::to_string_pretty(snapshot).map_err(|source| SnapshotFileError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    write_text_atomic(path, &json).map_err(|source| SnapshotFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_snapshot_file(path: &Path) -> Result<GraphSnapshot, SnapshotFileError> {
    let raw = fs::read_to_string(path).map_err(|source| SnapshotFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_snapshot_json(&raw).map_err(|(json_path, message)| SnapshotFileError::Parse {
        path: path.to_path_buf(),
        json_path,
        message,
    })
}

pub(crate) fn parse_snapshot_json(raw: &str) -> Result<GraphSnapshot, (String, String)> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GraphSnapshot>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        (json_path, error.into_inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample_snapshot() -> GraphSnapshot {
        let mut record = StateRecord::new();
        record.write_vector("acceleration", Vec3::new(0.1, -0.0, 1.0e-7));
        record.write_vector("velocity", Vec3::new(1.0 / 3.0, -9.81, 2.718_281_7));
        record.write_bool("impulse_pending", true);

        let mut states = BTreeMap::new();
        states.insert("falling".to_string(), record);
        GraphSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            definition_hash: "abc".to_string(),
            active_state: Some("falling".to_string()),
            time_in_state: 0.35,
            states,
        }
    }

    #[test]
    fn reader_falls_back_on_missing_or_mismatched_keys() {
        let mut record = StateRecord::new();
        record.write_float("speed", 3.0);

        assert_eq!(record.try_read_float("speed", 1.0), 3.0);
        assert_eq!(record.try_read_float("absent", 1.0), 1.0);
        assert_eq!(record.try_read_vector("speed", Vec3::Y), Vec3::Y);
        assert!(record.try_read_bool("speed", true));
    }

    #[test]
    fn later_writes_replace_earlier_ones() {
        let mut record = StateRecord::new();
        record.write_vector("velocity", Vec3::X);
        record.write_vector("velocity", Vec3::Z);
        assert_eq!(record.len(), 1);
        assert_eq!(record.try_read_vector("velocity", Vec3::ZERO), Vec3::Z);
    }

    #[test]
    fn snapshot_file_round_trip_is_bit_exact() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("saves").join("motion.json");
        let snapshot = sample_snapshot();

        write_snapshot_file(&path, &snapshot).expect("write");
        let loaded = read_snapshot_file(&path).expect("read");
        assert_eq!(loaded, snapshot);

        let original = snapshot.states["falling"].try_read_vector("velocity", Vec3::ZERO);
        let restored = loaded.states["falling"].try_read_vector("velocity", Vec3::ZERO);
        assert_eq!(original.x.to_bits(), restored.x.to_bits());
        assert_eq!(original.y.to_bits(), restored.y.to_bits());
        assert_eq!(original.z.to_bits(), restored.z.to_bits());
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{
            "format_version": 1,
            "definition_hash": "abc",
            "active_state": "falling",
            "states": { "falling": { "velocity": { "vector": [1.0, "oops", 0.0] } } }
        }"#;
        let (json_path, _message) = parse_snapshot_json(raw).expect_err("must fail");
        assert!(json_path.starts_with("states.falling.velocity"), "{json_path}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let temp = TempDir::new().expect("tempdir");
        let error = read_snapshot_file(&temp.path().join("absent.json")).expect_err("must fail");
        assert!(matches!(error, SnapshotFileError::Io { .. }));
    }
}
