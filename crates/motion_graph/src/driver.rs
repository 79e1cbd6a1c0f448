use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::controller::{CharacterController, MotionRequest};
use crate::graph::{MotionGraph, SnapshotLoadError, StateHandle, TickOutput};
use crate::input::{InputSource, MoveInput};
use crate::persistence::{read_snapshot_file, write_snapshot_file, GraphSnapshot, SnapshotFileError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Created,
    Running,
    ShutDown,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("motion graph driver is not running (status {status:?})")]
    NotRunning { status: DriverStatus },
    #[error(transparent)]
    SnapshotLoad(#[from] SnapshotLoadError),
    #[error(transparent)]
    SnapshotFile(#[from] SnapshotFileError),
}

/// Owns one character's graph and feeds it from the controller once per fixed tick.
#[derive(Debug)]
pub struct MotionGraphDriver {
    graph: MotionGraph,
    status: DriverStatus,
    ticks: u64,
}

impl MotionGraphDriver {
    pub fn new(graph: MotionGraph) -> Self {
        Self {
            graph,
            status: DriverStatus::Created,
            ticks: 0,
        }
    }

    pub fn graph(&self) -> &MotionGraph {
        &self.graph
    }

    pub fn status(&self) -> DriverStatus {
        self.status
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn active_state_id(&self) -> Option<&str> {
        self.graph
            .active_state()
            .and_then(|handle| self.graph.state_id(handle))
    }

    pub fn init<C: CharacterController + ?Sized>(&mut self, controller: &C) -> StateHandle {
        let handle = self.graph.activate(&controller.snapshot());
        self.status = DriverStatus::Running;
        info!(
            graph = self.graph.name(),
            state = self.graph.state_id(handle).unwrap_or_default(),
            "motion_driver_started"
        );
        handle
    }

    pub fn tick<C: CharacterController + ?Sized>(
        &mut self,
        dt: f32,
        input: &MoveInput,
        controller: &mut C,
    ) -> Result<TickOutput, DriverError> {
        if self.status != DriverStatus::Running {
            return Err(DriverError::NotRunning {
                status: self.status,
            });
        }

        let output = self.graph.tick(dt, input, &controller.snapshot());
        controller.apply_motion(&MotionRequest {
            delta: output.delta,
            velocity: output.velocity,
            dt: output.dt,
            flags: output.flags,
        });
        self.ticks = self.ticks.saturating_add(1);

        if let Some(from) = output.transitioned_from {
            info!(
                graph = self.graph.name(),
                tick = self.ticks,
                from = self.graph.state_id(from).unwrap_or_default(),
                to = self.graph.state_id(output.state).unwrap_or_default(),
                "motion_state_transition"
            );
        }
        Ok(output)
    }

    /// Samples the input source exactly once for this tick.
    pub fn tick_from_source<C, I>(
        &mut self,
        dt: f32,
        input: &mut I,
        controller: &mut C,
    ) -> Result<TickOutput, DriverError>
    where
        C: CharacterController + ?Sized,
        I: InputSource + ?Sized,
    {
        let sampled = input.sample();
        self.tick(dt, &sampled, controller)
    }

    pub fn shutdown(&mut self) {
        if self.status == DriverStatus::ShutDown {
            return;
        }
        let exited = self.graph.deactivate();
        self.status = DriverStatus::ShutDown;
        info!(
            graph = self.graph.name(),
            ticks = self.ticks,
            state = exited
                .and_then(|handle| self.graph.state_id(handle))
                .unwrap_or_default(),
            "motion_driver_stopped"
        );
    }

    pub fn save(&self) -> GraphSnapshot {
        let snapshot = self.graph.save();
        info!(
            graph = self.graph.name(),
            tick = self.ticks,
            active_state = snapshot.active_state.as_deref().unwrap_or_default(),
            records = snapshot.states.len(),
            "motion_graph_saved"
        );
        snapshot
    }

    /// Restores a snapshot and resumes ticking from it, including after `shutdown`.
    pub fn load(&mut self, snapshot: &GraphSnapshot) -> Result<(), DriverError> {
        if let Err(error) = self.graph.load(snapshot) {
            warn!(graph = self.graph.name(), error = %error, "motion_graph_load_rejected");
            return Err(error.into());
        }
        self.status = DriverStatus::Running;
        info!(
            graph = self.graph.name(),
            active_state = snapshot.active_state.as_deref().unwrap_or_default(),
            time_in_state = snapshot.time_in_state,
            records = snapshot.states.len(),
            "motion_graph_loaded"
        );
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), DriverError> {
        write_snapshot_file(path, &self.save())?;
        Ok(())
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), DriverError> {
        let snapshot = read_snapshot_file(path)?;
        self.load(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::math::Vec3;
    use crate::test_support::{biped_definition, scripted_input, TestBody, FIXED_DT};

    struct ScriptedInput {
        tick: usize,
    }

    impl InputSource for ScriptedInput {
        fn sample(&mut self) -> MoveInput {
            let input = scripted_input(self.tick);
            self.tick += 1;
            input
        }
    }

    fn driver() -> MotionGraphDriver {
        MotionGraphDriver::new(MotionGraph::link(biped_definition()).expect("link"))
    }

    #[test]
    fn ticking_requires_init_and_stops_after_shutdown() {
        let mut driver = driver();
        let mut body = TestBody::airborne(1.0);

        let error = driver
            .tick(FIXED_DT, &MoveInput::empty(), &mut body)
            .expect_err("not started");
        assert!(matches!(
            error,
            DriverError::NotRunning {
                status: DriverStatus::Created
            }
        ));
        assert!(body.applied.is_empty());

        driver.init(&body);
        assert_eq!(driver.active_state_id(), Some("falling"));
        driver
            .tick(FIXED_DT, &MoveInput::empty(), &mut body)
            .expect("tick");

        driver.shutdown();
        assert_eq!(driver.status(), DriverStatus::ShutDown);
        assert_eq!(driver.active_state_id(), None);
        assert!(matches!(
            driver.tick(FIXED_DT, &MoveInput::empty(), &mut body),
            Err(DriverError::NotRunning {
                status: DriverStatus::ShutDown
            })
        ));
        assert_eq!(body.applied.len(), 1);
    }

    #[test]
    fn controller_receives_delta_velocity_and_flags() {
        let mut driver = driver();
        let mut body = TestBody::airborne(2.0);
        body.velocity = Vec3::new(0.0, -1.0, 0.0);
        driver.init(&body);

        let output = driver
            .tick(FIXED_DT, &MoveInput::new(0.0, 1.0), &mut body)
            .expect("tick");
        let request = body.applied[0];
        assert_eq!(request.velocity, output.velocity);
        assert_eq!(request.delta, output.velocity * FIXED_DT);
        assert_eq!(request.dt, FIXED_DT);
        assert!(request.flags.apply_gravity);
        assert_eq!(driver.ticks(), 1);
    }

    #[test]
    fn input_source_is_sampled_once_per_tick() {
        let mut driver = driver();
        let mut body = TestBody::airborne(1.0);
        let mut input = ScriptedInput { tick: 0 };
        driver.init(&body);

        for _ in 0..12 {
            driver
                .tick_from_source(FIXED_DT, &mut input, &mut body)
                .expect("tick");
        }
        assert_eq!(input.tick, 12);
        assert_eq!(driver.ticks(), 12);
    }

    #[test]
    fn file_round_trip_resumes_identically() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("saves").join("biped.json");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create saves");

        let mut original = driver();
        let mut body = TestBody::airborne(1.0);
        original.init(&body);
        for tick in 0..50 {
            original
                .tick(FIXED_DT, &scripted_input(tick), &mut body)
                .expect("tick");
        }
        original.save_to_file(&path).expect("save");

        let mut resumed = driver();
        resumed.load_from_file(&path).expect("load");
        assert_eq!(resumed.status(), DriverStatus::Running);
        assert_eq!(resumed.active_state_id(), original.active_state_id());

        let mut resumed_body = body.clone();
        for tick in 50..140 {
            let expected = original
                .tick(FIXED_DT, &scripted_input(tick), &mut body)
                .expect("tick original");
            let actual = resumed
                .tick(FIXED_DT, &scripted_input(tick), &mut resumed_body)
                .expect("tick resumed");
            assert_eq!(actual, expected, "diverged at tick {tick}");
        }
    }

    #[test]
    fn bad_snapshots_surface_typed_errors() {
        let temp = TempDir::new().expect("temp dir");
        let mut driver = driver();

        let missing = driver
            .load_from_file(&temp.path().join("absent.json"))
            .expect_err("missing file");
        assert!(matches!(
            missing,
            DriverError::SnapshotFile(SnapshotFileError::Io { .. })
        ));

        let mut snapshot = driver.save();
        snapshot.active_state = Some("swimming".to_string());
        let rejected = driver.load(&snapshot).expect_err("unknown state");
        assert!(matches!(
            rejected,
            DriverError::SnapshotLoad(SnapshotLoadError::UnknownActiveState { .. })
        ));
        assert_eq!(driver.status(), DriverStatus::Created);
    }
}
