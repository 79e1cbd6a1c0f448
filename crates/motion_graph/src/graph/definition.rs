use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::params::ParameterTable;
use crate::states::StateConfig;
use crate::transition::TransitionDef;

/// Authored graph: shared parameters, state instances and the edges between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_state: Option<String>,
    #[serde(default)]
    pub parameters: ParameterTable,
    #[serde(default)]
    pub states: Vec<StateDef>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    pub id: String,
    #[serde(flatten)]
    pub config: StateConfig,
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read graph definition {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse graph definition{} at {json_path}: {message}", describe_path(.path))]
    Parse {
        path: Option<PathBuf>,
        json_path: String,
        message: String,
    },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {}", path.display()))
        .unwrap_or_default()
}

impl GraphDefinition {
    pub fn from_json_str(raw: &str) -> Result<Self, DefinitionError> {
        parse_definition(raw, None)
    }
}

pub fn load_graph_definition(path: &Path) -> Result<GraphDefinition, DefinitionError> {
    let raw = fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definition(&raw, Some(path))
}

fn parse_definition(raw: &str, path: Option<&Path>) -> Result<GraphDefinition, DefinitionError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GraphDefinition>(&mut deserializer).map_err(|error| {
        DefinitionError::Parse {
            path: path.map(Path::to_path_buf),
            json_path: error.path().to_string(),
            message: error.into_inner().to_string(),
        }
    })
}

pub(crate) fn definition_hash(definition: &GraphDefinition) -> Result<String, serde_json::Error> {
    let encoded = serde_json::to_vec(definition)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(to_hex_lower(&hasher.finalize()))
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::params::{ParamRef, ParamValue};
    use crate::transition::Condition;

    const SAMPLE: &str = r#"{
        "name": "biped",
        "default_state": "falling",
        "parameters": { "air_speed": { "float": 4.0 } },
        "states": [
            { "id": "falling", "kind": "falling", "top_speed": { "param": "air_speed" } },
            { "id": "grounded", "kind": "grounded" }
        ],
        "transitions": [
            { "from": "falling", "to": "grounded", "when": { "grounded": true } },
            { "from": "grounded", "to": "falling", "priority": 2, "when": { "grounded": false } }
        ]
    }"#;

    #[test]
    fn parses_states_parameters_and_transitions() {
        let definition = GraphDefinition::from_json_str(SAMPLE).expect("parse definition");

        assert_eq!(definition.name, "biped");
        assert_eq!(definition.default_state.as_deref(), Some("falling"));
        assert_eq!(
            definition.parameters.get("air_speed"),
            Some(&ParamValue::Float(4.0))
        );
        assert_eq!(definition.states.len(), 2);
        let StateConfig::Falling(falling) = &definition.states[0].config else {
            panic!("expected falling config");
        };
        assert_eq!(falling.motor.top_speed, ParamRef::bound("air_speed"));
        assert_eq!(definition.transitions[0].priority, 0);
        assert_eq!(definition.transitions[1].when, Condition::Grounded(false));
    }

    #[test]
    fn parse_error_names_the_json_path() {
        let raw = r#"{ "states": [ { "id": "a", "kind": "falling", "top_speed": "fast" } ] }"#;
        let error = GraphDefinition::from_json_str(raw).expect_err("must fail");
        let DefinitionError::Parse { json_path, .. } = error else {
            panic!("expected parse error");
        };
        assert!(json_path.starts_with("states[0]"), "path was {json_path}");
    }

    #[test]
    fn load_from_file_reports_missing_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("absent.json");
        let error = load_graph_definition(&path).expect_err("must fail");
        assert!(matches!(error, DefinitionError::Read { .. }));

        let present = temp.path().join("graph.json");
        fs::write(&present, SAMPLE).expect("write");
        let loaded = load_graph_definition(&present).expect("load");
        assert_eq!(loaded.states[1].id, "grounded");
    }

    #[test]
    fn hash_is_stable_and_tracks_content() {
        let definition = GraphDefinition::from_json_str(SAMPLE).expect("parse");
        let first = definition_hash(&definition).expect("hash");
        let second = definition_hash(&definition.clone()).expect("hash");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);

        let mut edited = definition;
        edited.transitions[0].priority = 7;
        assert_ne!(definition_hash(&edited).expect("hash"), first);
    }
}
