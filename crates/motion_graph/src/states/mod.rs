mod falling;
mod grounded;
mod jump;
mod motor;

use serde::{Deserialize, Serialize};

use crate::controller::{ControllerSnapshot, MotionFlags};
use crate::input::MoveInput;
use crate::math::Vec3;
use crate::params::{Binder, BindingError};
use crate::persistence::{PersistenceReader, PersistenceWriter};

pub use falling::{FallingConfig, FallingState};
pub use grounded::{GroundedConfig, GroundedState};
pub use jump::{JumpConfig, JumpState};
pub use motor::{direction_multiplier_for, MomentumConservation, MotorConfig, TINY_VALUE};

#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub dt: f32,
    pub input: &'a MoveInput,
    pub controller: &'a ControllerSnapshot,
}

/// The per-tick capability every locomotion state provides.
///
/// States only mutate their own continuous variables; the driver hands the resulting
/// velocity to the controller.
pub trait MotionBehavior {
    /// Seeds continuous variables from the controller's resolved velocity.
    fn on_enter(&mut self, controller: &ControllerSnapshot);
    /// Returns the output velocity for this tick.
    fn update(&mut self, ctx: &TickContext<'_>) -> Vec3;
    fn on_exit(&mut self);
    fn output_velocity(&self) -> Vec3;
    fn motion_flags(&self) -> MotionFlags;
    fn write_properties(&self, writer: &mut dyn PersistenceWriter);
    fn read_properties(&mut self, reader: &dyn PersistenceReader);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateConfig {
    Falling(FallingConfig),
    Grounded(GroundedConfig),
    Jump(JumpConfig),
}

impl StateConfig {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StateConfig::Falling(_) => "falling",
            StateConfig::Grounded(_) => "grounded",
            StateConfig::Jump(_) => "jump",
        }
    }

    /// Rewrites deprecated authoring fields into their replacements. Returns true when the
    /// config changed.
    pub(crate) fn migrate_deprecated(&mut self) -> bool {
        match self {
            StateConfig::Falling(config) => config.migrate_deprecated(),
            StateConfig::Grounded(_) | StateConfig::Jump(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MotionState {
    Falling(FallingState),
    Grounded(GroundedState),
    Jump(JumpState),
}

impl MotionState {
    pub(crate) fn bind(config: &StateConfig, binder: &Binder<'_>) -> Result<Self, BindingError> {
        Ok(match config {
            StateConfig::Falling(config) => MotionState::Falling(FallingState::bind(config, binder)?),
            StateConfig::Grounded(config) => {
                MotionState::Grounded(GroundedState::bind(config, binder)?)
            }
            StateConfig::Jump(config) => MotionState::Jump(JumpState::bind(config, binder)?),
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MotionState::Falling(_) => "falling",
            MotionState::Grounded(_) => "grounded",
            MotionState::Jump(_) => "jump",
        }
    }

    fn behavior(&self) -> &dyn MotionBehavior {
        match self {
            MotionState::Falling(state) => state,
            MotionState::Grounded(state) => state,
            MotionState::Jump(state) => state,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn MotionBehavior {
        match self {
            MotionState::Falling(state) => state,
            MotionState::Grounded(state) => state,
            MotionState::Jump(state) => state,
        }
    }
}

impl MotionBehavior for MotionState {
    fn on_enter(&mut self, controller: &ControllerSnapshot) {
        self.behavior_mut().on_enter(controller);
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> Vec3 {
        self.behavior_mut().update(ctx)
    }

    fn on_exit(&mut self) {
        self.behavior_mut().on_exit();
    }

    fn output_velocity(&self) -> Vec3 {
        self.behavior().output_velocity()
    }

    fn motion_flags(&self) -> MotionFlags {
        self.behavior().motion_flags()
    }

    fn write_properties(&self, writer: &mut dyn PersistenceWriter) {
        self.behavior().write_properties(writer);
    }

    fn read_properties(&mut self, reader: &dyn PersistenceReader) {
        self.behavior_mut().read_properties(reader);
    }
}
