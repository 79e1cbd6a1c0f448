use serde::{Deserialize, Serialize};

use crate::controller::{ControllerSnapshot, MotionFlags};
use crate::math::Vec3;
use crate::params::{Binder, BindingError};
use crate::persistence::{PersistenceReader, PersistenceWriter};

use super::motor::{HorizontalMotor, MomentumConservation, MotorConfig};
use super::{MotionBehavior, TickContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallingConfig {
    #[serde(flatten)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub momentum_conservation: MomentumConservation,
    /// Superseded by `momentum_conservation: "clamp_speed"`; migrated when the graph links.
    #[serde(default, skip_serializing_if = "is_false")]
    pub clamp_speed: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FallingConfig {
    pub(crate) fn migrate_deprecated(&mut self) -> bool {
        if !self.clamp_speed {
            return false;
        }
        self.momentum_conservation = MomentumConservation::ClampSpeed;
        self.clamp_speed = false;
        true
    }
}

/// Airborne air-control. Vertical velocity is left to the controller's gravity.
#[derive(Debug, Clone)]
pub struct FallingState {
    motor: HorizontalMotor,
}

impl FallingState {
    pub(crate) fn bind(config: &FallingConfig, binder: &Binder<'_>) -> Result<Self, BindingError> {
        Ok(Self {
            motor: HorizontalMotor::bind(&config.motor, config.momentum_conservation, binder)?,
        })
    }

    pub fn momentum_conservation(&self) -> MomentumConservation {
        self.motor.policy()
    }
}

impl MotionBehavior for FallingState {
    fn on_enter(&mut self, controller: &ControllerSnapshot) {
        self.motor.enter(controller.velocity);
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> Vec3 {
        self.motor.step(ctx)
    }

    fn on_exit(&mut self) {
        self.motor.exit();
    }

    fn output_velocity(&self) -> Vec3 {
        self.motor.out_velocity()
    }

    fn motion_flags(&self) -> MotionFlags {
        MotionFlags {
            apply_gravity: true,
            apply_grounding_force: false,
            ignore_platform_move: true,
        }
    }

    fn write_properties(&self, writer: &mut dyn PersistenceWriter) {
        self.motor.write_properties(writer);
    }

    fn read_properties(&mut self, reader: &dyn PersistenceReader) {
        self.motor.read_properties(reader);
    }
}
