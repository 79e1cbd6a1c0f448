use serde::{Deserialize, Serialize};

use crate::controller::{ControllerSnapshot, MotionFlags};
use crate::math::Vec3;
use crate::params::{Binder, BindingError};
use crate::persistence::{PersistenceReader, PersistenceWriter};

use super::motor::{resolve_up, HorizontalMotor, MomentumConservation, MotorConfig};
use super::{MotionBehavior, TickContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedConfig {
    #[serde(flatten)]
    pub motor: MotorConfig,
    #[serde(default = "default_grounded_conservation")]
    pub momentum_conservation: MomentumConservation,
}

impl Default for GroundedConfig {
    fn default() -> Self {
        Self {
            motor: MotorConfig::default(),
            momentum_conservation: default_grounded_conservation(),
        }
    }
}

fn default_grounded_conservation() -> MomentumConservation {
    MomentumConservation::ClampToInput
}

/// Walking on a surface. The up component is dropped and the controller keeps the
/// character pressed onto the ground.
#[derive(Debug, Clone)]
pub struct GroundedState {
    motor: HorizontalMotor,
}

impl GroundedState {
    pub(crate) fn bind(
        config: &GroundedConfig,
        binder: &Binder<'_>,
    ) -> Result<Self, BindingError> {
        Ok(Self {
            motor: HorizontalMotor::bind(&config.motor, config.momentum_conservation, binder)?,
        })
    }
}

impl MotionBehavior for GroundedState {
    fn on_enter(&mut self, controller: &ControllerSnapshot) {
        self.motor.enter(controller.velocity);
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> Vec3 {
        let velocity = self
            .motor
            .step(ctx)
            .project_on_plane(resolve_up(ctx.controller.up));
        self.motor.set_out_velocity(velocity);
        velocity
    }

    fn on_exit(&mut self) {
        self.motor.exit();
    }

    fn output_velocity(&self) -> Vec3 {
        self.motor.out_velocity()
    }

    fn motion_flags(&self) -> MotionFlags {
        MotionFlags {
            apply_gravity: false,
            apply_grounding_force: true,
            ignore_platform_move: false,
        }
    }

    fn write_properties(&self, writer: &mut dyn PersistenceWriter) {
        self.motor.write_properties(writer);
    }

    fn read_properties(&mut self, reader: &dyn PersistenceReader) {
        self.motor.read_properties(reader);
    }
}
