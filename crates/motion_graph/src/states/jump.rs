use serde::{Deserialize, Serialize};

use crate::controller::{ControllerSnapshot, MotionFlags};
use crate::math::Vec3;
use crate::params::{Binder, BindingError, BoundParam, ParamRef, VectorRange};
use crate::persistence::{PersistenceReader, PersistenceWriter};

use super::motor::{resolve_up, HorizontalMotor, MomentumConservation, MotorConfig};
use super::{MotionBehavior, TickContext};

const JUMP_VELOCITY_RANGE: VectorRange = VectorRange { max_length: 100.0 };
const KEY_IMPULSE_PENDING: &str = "impulse_pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpConfig {
    #[serde(flatten)]
    pub motor: MotorConfig,
    #[serde(default)]
    pub momentum_conservation: MomentumConservation,
    /// Launch velocity in character space: x right, y up, z forward.
    #[serde(default = "default_jump_velocity")]
    pub jump_velocity: ParamRef<Vec3>,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            motor: MotorConfig::default(),
            momentum_conservation: MomentumConservation::default(),
            jump_velocity: default_jump_velocity(),
        }
    }
}

fn default_jump_velocity() -> ParamRef<Vec3> {
    ParamRef::Literal(Vec3::new(0.0, 6.0, 0.0))
}

/// Air control with a one-shot launch on the first update after entering.
#[derive(Debug, Clone)]
pub struct JumpState {
    motor: HorizontalMotor,
    jump_velocity: BoundParam<Vec3>,
    impulse_pending: bool,
}

impl JumpState {
    pub(crate) fn bind(config: &JumpConfig, binder: &Binder<'_>) -> Result<Self, BindingError> {
        Ok(Self {
            motor: HorizontalMotor::bind(&config.motor, config.momentum_conservation, binder)?,
            jump_velocity: binder.bind("jump_velocity", &config.jump_velocity, JUMP_VELOCITY_RANGE)?,
            impulse_pending: false,
        })
    }

    pub fn impulse_pending(&self) -> bool {
        self.impulse_pending
    }
}

impl MotionBehavior for JumpState {
    fn on_enter(&mut self, controller: &ControllerSnapshot) {
        self.motor.enter(controller.velocity);
        self.impulse_pending = true;
    }

    fn update(&mut self, ctx: &TickContext<'_>) -> Vec3 {
        let velocity = self.motor.step(ctx);
        if !self.impulse_pending {
            return velocity;
        }

        let controller = ctx.controller;
        let up = resolve_up(controller.up);
        let launch = self.jump_velocity.get();
        let launched = velocity.project_on_plane(up)
            + up * launch.y
            + controller.forward * launch.z
            + controller.right * launch.x;
        self.motor.set_out_velocity(launched);
        self.impulse_pending = false;
        launched
    }

    fn on_exit(&mut self) {
        self.motor.exit();
        self.impulse_pending = false;
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
        writer.write_bool(KEY_IMPULSE_PENDING, self.impulse_pending);
    }

    fn read_properties(&mut self, reader: &dyn PersistenceReader) {
        self.motor.read_properties(reader);
        self.impulse_pending = reader.try_read_bool(KEY_IMPULSE_PENDING, self.impulse_pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MoveInput;
    use crate::params::{ParamValue, ParameterTable};
    use crate::persistence::StateRecord;

    fn bind_with(jump_velocity: ParamRef<Vec3>, parameters: &ParameterTable) -> JumpState {
        let config = JumpConfig {
            jump_velocity,
            ..JumpConfig::default()
        };
        JumpState::bind(&config, &Binder::new(parameters, "jump")).expect("bind jump")
    }

    fn tick(state: &mut JumpState, controller: &ControllerSnapshot) -> Vec3 {
        let input = MoveInput::empty();
        state.update(&TickContext {
            dt: 1.0 / 60.0,
            input: &input,
            controller,
        })
    }

    #[test]
    fn impulse_applies_exactly_once_per_entry() {
        let mut parameters = ParameterTable::new();
        parameters.insert(
            "leap".to_string(),
            ParamValue::Vector(Vec3::new(0.0, 6.0, 1.0)),
        );
        let mut state = bind_with(ParamRef::bound("leap"), &parameters);
        let mut controller = ControllerSnapshot::default().with_velocity(Vec3::new(2.0, -0.5, 0.0));
        state.on_enter(&controller);
        assert!(state.impulse_pending());

        let launched = tick(&mut state, &controller);
        assert_eq!(launched.y, 6.0);
        assert!((launched.z - 1.0).abs() < 1e-6);
        assert!((launched.x - 2.0).abs() < 1e-6);
        assert!(!state.impulse_pending());

        controller.velocity = Vec3::new(2.0, 5.5, 1.0);
        let next = tick(&mut state, &controller);
        assert_eq!(next.y, 5.5);
    }

    #[test]
    fn pending_impulse_survives_save_and_load() {
        let parameters = ParameterTable::new();
        let mut original = bind_with(ParamRef::Literal(Vec3::new(0.0, 4.0, 0.0)), &parameters);
        let controller = ControllerSnapshot::default();
        original.on_enter(&controller);

        let mut record = StateRecord::new();
        original.write_properties(&mut record);

        let mut restored = bind_with(ParamRef::Literal(Vec3::new(0.0, 4.0, 0.0)), &parameters);
        restored.read_properties(&record);
        assert!(restored.impulse_pending());
        assert_eq!(tick(&mut restored, &controller), tick(&mut original, &controller));
    }
}
