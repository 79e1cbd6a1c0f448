use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use motion_graph::ScheduleConfig;
use tracing::warn;

pub const GRAPH_ENV_VAR: &str = "MOTION_DEMO_GRAPH";
pub const TPS_ENV_VAR: &str = "MOTION_DEMO_TPS";
pub const SAVE_DIR_ENV_VAR: &str = "MOTION_DEMO_SAVE_DIR";
pub const TICKS_ENV_VAR: &str = "MOTION_DEMO_TICKS";

#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Graph definition to load; the bundled biped graph when unset.
    pub graph_path: Option<PathBuf>,
    pub save_dir: PathBuf,
    pub schedule: ScheduleConfig,
    pub total_ticks: u32,
    /// Tick after which the session is saved and later resumed from disk.
    pub save_at_tick: u32,
    /// Synthetic frame times cycled through by the scheduler.
    pub frame_pattern: Vec<Duration>,
    pub start_height: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            graph_path: None,
            save_dir: PathBuf::from("saves"),
            schedule: ScheduleConfig::default(),
            total_ticks: 240,
            save_at_tick: 90,
            frame_pattern: vec![
                Duration::from_millis(16),
                Duration::from_millis(17),
                Duration::from_millis(17),
                Duration::from_millis(40),
            ],
            start_height: 1.5,
        }
    }
}

impl DemoConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let defaults = Self::default();
        let total_ticks = read_var(&lookup, TICKS_ENV_VAR, defaults.total_ticks);
        let target_tps = read_var(&lookup, TPS_ENV_VAR, defaults.schedule.target_tps);
        let target_tps = if target_tps == 0 {
            warn!(
                env_var = TPS_ENV_VAR,
                "tick rate must be positive; falling back to default"
            );
            defaults.schedule.target_tps
        } else {
            target_tps
        };

        Self {
            graph_path: read_graph_path(&lookup),
            save_dir: read_var(&lookup, SAVE_DIR_ENV_VAR, defaults.save_dir),
            schedule: ScheduleConfig {
                target_tps,
                ..defaults.schedule
            },
            save_at_tick: defaults.save_at_tick.min(total_ticks / 2),
            total_ticks,
            frame_pattern: defaults.frame_pattern,
            start_height: defaults.start_height,
        }
    }
}

fn read_graph_path<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(GRAPH_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value.trim())),
        Ok(_) | Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = GRAPH_ENV_VAR,
                error = %err,
                "unable to read env var; using bundled graph"
            );
            None
        }
    }
}

fn read_var<T, F>(lookup: &F, name: &'static str, fallback: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(name) {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var = name,
                    value = value.as_str(),
                    "invalid env var value; falling back to default"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var = name,
                error = %err,
                "unable to read env var; falling back to default"
            );
            fallback
        }
    }
}
