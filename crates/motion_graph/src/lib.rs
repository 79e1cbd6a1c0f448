mod atomic_io;
pub mod controller;
pub mod driver;
pub mod graph;
pub mod input;
pub mod math;
pub mod params;
pub mod persistence;
pub mod schedule;
pub mod states;
pub mod transition;

#[cfg(test)]
mod test_support;

pub use atomic_io::write_text_atomic;
pub use controller::{CharacterController, ControllerSnapshot, MotionFlags, MotionRequest};
pub use driver::{DriverError, DriverStatus, MotionGraphDriver};
pub use graph::{
    load_graph_definition, DefinitionError, GraphDefinition, GraphLinkError, MotionGraph,
    SnapshotLoadError, StateDef, StateHandle, TickOutput,
};
pub use input::{InputSource, MoveInput};
pub use math::Vec3;
pub use params::{
    BindingError, BindingErrorKind, ParamKind, ParamRef, ParamValue, ParameterTable,
};
pub use persistence::{
    read_snapshot_file, write_snapshot_file, GraphSnapshot, PersistedValue, PersistenceReader,
    PersistenceWriter, SnapshotFileError, StateRecord, SNAPSHOT_FORMAT_VERSION,
};
pub use schedule::{FixedStepScheduler, ScheduleConfig, StepPlan};
pub use states::{
    FallingConfig, FallingState, GroundedConfig, GroundedState, JumpConfig, JumpState,
    MomentumConservation, MotionBehavior, MotionState, MotorConfig, StateConfig,
};
pub use transition::{Comparison, Condition, TransitionDef};
