use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use motion_graph::{
    load_graph_definition, write_text_atomic, DefinitionError, DriverError, FixedStepScheduler,
    GraphDefinition, GraphLinkError, MotionGraph, MotionGraphDriver, TickOutput, Vec3,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::body::KinematicBody;
use crate::config::DemoConfig;
use crate::script::InputScript;

pub const BUNDLED_GRAPH: &str = include_str!("../assets/biped_graph.json");
pub const SNAPSHOT_FILE_NAME: &str = "motion_demo_snapshot.json";
pub const REPORT_FILE_NAME: &str = "motion_demo_report.json";

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("save tick {save_at_tick} must fall strictly between 0 and the final tick {total_ticks}")]
    InvalidSavePoint { save_at_tick: u32, total_ticks: u32 },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Link(#[from] GraphLinkError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("resumed session diverged from the original run at tick {tick}")]
    ReplayDiverged { tick: u64 },
    #[error("failed to encode session report: {0}")]
    EncodeReport(#[source] serde_json::Error),
    #[error("failed to write session report {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoReport {
    pub graph: String,
    pub ticks: u64,
    pub frames: u64,
    pub transitions: u32,
    pub final_state: String,
    pub final_position: Vec3,
    pub snapshot_path: PathBuf,
    pub report_path: PathBuf,
    pub resumed_ticks: u64,
}

pub fn load_definition(config: &DemoConfig) -> Result<GraphDefinition, DemoError> {
    let definition = match &config.graph_path {
        Some(path) => load_graph_definition(path)?,
        None => GraphDefinition::from_json_str(BUNDLED_GRAPH)?,
    };
    Ok(definition)
}

/// Runs the scripted session, saves at the configured tick, then resumes a fresh driver
/// from the save file and checks it replays the rest of the run exactly.
pub fn run_session(config: &DemoConfig) -> Result<DemoReport, DemoError> {
    if config.save_at_tick == 0 || config.save_at_tick >= config.total_ticks {
        return Err(DemoError::InvalidSavePoint {
            save_at_tick: config.save_at_tick,
            total_ticks: config.total_ticks,
        });
    }

    let graph = MotionGraph::link(load_definition(config)?)?;
    let mut scheduler = FixedStepScheduler::new(&config.schedule);
    let dt = scheduler.fixed_dt_seconds();
    let frame_pattern = usable_frame_pattern(&config.frame_pattern, scheduler.fixed_dt());
    let snapshot_path = config.save_dir.join(SNAPSHOT_FILE_NAME);
    let total_ticks = u64::from(config.total_ticks);
    let save_at_tick = u64::from(config.save_at_tick);
    let progress_interval = u64::from(config.schedule.target_tps.max(1));

    let mut driver = MotionGraphDriver::new(graph.clone());
    let mut body = KinematicBody::at_height(config.start_height);
    let mut script = InputScript::demo();
    driver.init(&body);

    let mut checkpoint: Option<(KinematicBody, InputScript)> = None;
    let mut recorded: Vec<TickOutput> = Vec::new();
    let mut transitions = 0u32;
    let mut frames = 0u64;

    while driver.ticks() < total_ticks {
        let frame_dt = frame_pattern[(frames as usize) % frame_pattern.len()];
        frames += 1;
        let plan = scheduler.advance(frame_dt);

        for _ in 0..plan.ticks_to_run {
            if driver.ticks() >= total_ticks {
                break;
            }
            let output = driver.tick_from_source(dt, &mut script, &mut body)?;
            if output.transitioned_from.is_some() {
                transitions += 1;
            }
            if checkpoint.is_some() {
                recorded.push(output);
            }

            let tick = driver.ticks();
            if tick == save_at_tick {
                driver.save_to_file(&snapshot_path)?;
                checkpoint = Some((body.clone(), script.clone()));
            }
            if tick % progress_interval == 0 {
                debug!(
                    tick,
                    state = driver.active_state_id().unwrap_or_default(),
                    x = body.position().x,
                    y = body.position().y,
                    z = body.position().z,
                    grounded = body.is_grounded(),
                    "motion_demo_progress"
                );
            }
        }
    }

    let final_state = driver.active_state_id().unwrap_or_default().to_string();
    driver.shutdown();

    let Some((mut resumed_body, mut resumed_script)) = checkpoint else {
        return Err(DemoError::InvalidSavePoint {
            save_at_tick: config.save_at_tick,
            total_ticks: config.total_ticks,
        });
    };
    let mut resumed = MotionGraphDriver::new(graph);
    resumed.load_from_file(&snapshot_path)?;
    for (offset, expected) in recorded.iter().enumerate() {
        let actual = resumed.tick_from_source(dt, &mut resumed_script, &mut resumed_body)?;
        if actual != *expected {
            return Err(DemoError::ReplayDiverged {
                tick: save_at_tick + offset as u64 + 1,
            });
        }
    }
    if resumed_body != body {
        return Err(DemoError::ReplayDiverged { tick: total_ticks });
    }
    let resumed_ticks = resumed.ticks();
    resumed.shutdown();

    let report = DemoReport {
        graph: driver.graph().name().to_string(),
        ticks: driver.ticks(),
        frames,
        transitions,
        final_state,
        final_position: body.position(),
        snapshot_path,
        report_path: config.save_dir.join(REPORT_FILE_NAME),
        resumed_ticks,
    };
    write_report(&report.report_path, &report)?;
    info!(
        graph = report.graph.as_str(),
        ticks = report.ticks,
        frames = report.frames,
        transitions = report.transitions,
        final_state = report.final_state.as_str(),
        resumed_ticks = report.resumed_ticks,
        "motion_demo_replay_verified"
    );
    Ok(report)
}

fn write_report(path: &Path, report: &DemoReport) -> Result<(), DemoError> {
    let json = serde_json::to_string_pretty(report).map_err(DemoError::EncodeReport)?;
    write_text_atomic(path, &json).map_err(|source| DemoError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}

fn usable_frame_pattern(pattern: &[Duration], fallback: Duration) -> Vec<Duration> {
    let usable: Vec<Duration> = pattern
        .iter()
        .copied()
        .filter(|frame| !frame.is_zero())
        .collect();
    if usable.is_empty() {
        vec![fallback]
    } else {
        usable
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn config_in(temp: &TempDir) -> DemoConfig {
        DemoConfig {
            save_dir: temp.path().join("saves"),
            ..DemoConfig::default()
        }
    }

    #[test]
    fn bundled_graph_links() {
        let definition = GraphDefinition::from_json_str(BUNDLED_GRAPH).expect("parse bundled");
        let graph = MotionGraph::link(definition).expect("link bundled");
        assert_eq!(graph.name(), "biped");
        assert_eq!(graph.state_count(), 3);
    }

    #[test]
    fn session_saves_resumes_and_matches() {
        let temp = TempDir::new().expect("temp dir");
        let config = config_in(&temp);

        let report = run_session(&config).expect("session");
        assert_eq!(report.ticks, u64::from(config.total_ticks));
        assert_eq!(
            report.resumed_ticks,
            u64::from(config.total_ticks - config.save_at_tick)
        );
        assert!(report.transitions >= 4, "transitions: {}", report.transitions);
        assert!(report.snapshot_path.is_file());
        assert!(report.final_position.is_finite());

        let saved = fs::read_to_string(&report.snapshot_path).expect("read snapshot");
        assert!(saved.contains("\"definition_hash\""));

        let written = fs::read_to_string(&report.report_path).expect("read report");
        let parsed: serde_json::Value = serde_json::from_str(&written).expect("parse report");
        assert_eq!(parsed["ticks"], serde_json::json!(report.ticks));
        assert_eq!(parsed["final_state"], serde_json::json!(report.final_state));
        let staging = report
            .report_path
            .with_file_name(format!("{REPORT_FILE_NAME}.partial"));
        assert!(!staging.exists());
    }

    #[test]
    fn zero_length_frames_do_not_stall_the_session() {
        let temp = TempDir::new().expect("temp dir");
        let config = DemoConfig {
            frame_pattern: vec![Duration::ZERO],
            total_ticks: 30,
            save_at_tick: 10,
            ..config_in(&temp)
        };

        let report = run_session(&config).expect("session");
        assert_eq!(report.ticks, 30);
        assert_eq!(report.frames, 30);
    }

    #[test]
    fn save_point_must_be_inside_the_run() {
        let temp = TempDir::new().expect("temp dir");
        let config = DemoConfig {
            total_ticks: 10,
            save_at_tick: 10,
            ..config_in(&temp)
        };
        assert!(matches!(
            run_session(&config),
            Err(DemoError::InvalidSavePoint { .. })
        ));
    }

    #[test]
    fn graph_file_errors_are_reported() {
        let temp = TempDir::new().expect("temp dir");
        let missing = DemoConfig {
            graph_path: Some(temp.path().join("missing.json")),
            ..config_in(&temp)
        };
        assert!(matches!(
            run_session(&missing),
            Err(DemoError::Definition(DefinitionError::Read { .. }))
        ));

        let dangling_path = temp.path().join("dangling.json");
        let dangling = BUNDLED_GRAPH.replace("\"param\": \"run_speed\"", "\"param\": \"sprint\"");
        fs::write(&dangling_path, dangling).expect("write graph");
        let config = DemoConfig {
            graph_path: Some(dangling_path),
            ..config_in(&temp)
        };
        assert!(matches!(
            run_session(&config),
            Err(DemoError::Link(GraphLinkError::Binding(_)))
        ));
    }
}
