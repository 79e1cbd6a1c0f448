use serde::{Deserialize, Serialize};

use crate::math::{clamp01, lerp, smooth_damp, Vec3};
use crate::params::{Binder, BindingError, BoundParam, FloatRange, ParamRef};
use crate::persistence::{PersistenceReader, PersistenceWriter};

use super::TickContext;

/// Below this, input, drag and acceleration rates count as zero.
pub const TINY_VALUE: f32 = 0.001;
pub const SMOOTH_TIME_MIN: f32 = 0.05;
pub const SMOOTH_TIME_MAX: f32 = 0.25;

pub const ACCELERATION_RANGE: FloatRange = FloatRange::new(0.0, 1000.0);
pub const TOP_SPEED_RANGE: FloatRange = FloatRange::new(0.0, 100.0);
pub const MULTIPLIER_RANGE: FloatRange = FloatRange::new(0.0, 1.0);
pub const DRAG_RANGE: FloatRange = FloatRange::new(0.0, 100.0);

const KEY_ACCELERATION: &str = "acceleration";
const KEY_VELOCITY: &str = "velocity";

/// How horizontal speed behaves when input is absent or slower than the current velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumConservation {
    #[default]
    MaintainSpeed,
    ClampSpeed,
    ClampToInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    #[serde(default = "default_acceleration")]
    pub horizontal_acceleration: ParamRef<f32>,
    #[serde(default = "default_acceleration")]
    pub horizontal_deceleration: ParamRef<f32>,
    #[serde(default = "default_top_speed")]
    pub top_speed: ParamRef<f32>,
    #[serde(default = "default_strafe_multiplier")]
    pub strafe_multiplier: ParamRef<f32>,
    #[serde(default = "default_reverse_multiplier")]
    pub reverse_multiplier: ParamRef<f32>,
    #[serde(default = "default_drag")]
    pub horizontal_drag: ParamRef<f32>,
    #[serde(default = "default_damping")]
    pub damping: f32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            horizontal_acceleration: default_acceleration(),
            horizontal_deceleration: default_acceleration(),
            top_speed: default_top_speed(),
            strafe_multiplier: default_strafe_multiplier(),
            reverse_multiplier: default_reverse_multiplier(),
            horizontal_drag: default_drag(),
            damping: default_damping(),
        }
    }
}

fn default_acceleration() -> ParamRef<f32> {
    ParamRef::Literal(50.0)
}

fn default_top_speed() -> ParamRef<f32> {
    ParamRef::Literal(5.0)
}

fn default_strafe_multiplier() -> ParamRef<f32> {
    ParamRef::Literal(0.75)
}

fn default_reverse_multiplier() -> ParamRef<f32> {
    ParamRef::Literal(0.5)
}

fn default_drag() -> ParamRef<f32> {
    ParamRef::Literal(0.0)
}

fn default_damping() -> f32 {
    0.25
}

/// Input-driven horizontal velocity model shared by every locomotion state.
#[derive(Debug, Clone)]
pub(crate) struct HorizontalMotor {
    acceleration: BoundParam<f32>,
    deceleration: BoundParam<f32>,
    top_speed: BoundParam<f32>,
    strafe_multiplier: BoundParam<f32>,
    reverse_multiplier: BoundParam<f32>,
    drag: BoundParam<f32>,
    damping: f32,
    policy: MomentumConservation,
    motor_acceleration: Vec3,
    out_velocity: Vec3,
}

impl HorizontalMotor {
    pub(crate) fn bind(
        config: &MotorConfig,
        policy: MomentumConservation,
        binder: &Binder<'_>,
    ) -> Result<Self, BindingError> {
        Ok(Self {
            acceleration: binder.bind(
                "horizontal_acceleration",
                &config.horizontal_acceleration,
                ACCELERATION_RANGE,
            )?,
            deceleration: binder.bind(
                "horizontal_deceleration",
                &config.horizontal_deceleration,
                ACCELERATION_RANGE,
            )?,
            top_speed: binder.bind("top_speed", &config.top_speed, TOP_SPEED_RANGE)?,
            strafe_multiplier: binder.bind(
                "strafe_multiplier",
                &config.strafe_multiplier,
                MULTIPLIER_RANGE,
            )?,
            reverse_multiplier: binder.bind(
                "reverse_multiplier",
                &config.reverse_multiplier,
                MULTIPLIER_RANGE,
            )?,
            drag: binder.bind("horizontal_drag", &config.horizontal_drag, DRAG_RANGE)?,
            damping: binder.bind(
                "damping",
                &ParamRef::Literal(config.damping),
                MULTIPLIER_RANGE,
            )?
            .get(),
            policy,
            motor_acceleration: Vec3::ZERO,
            out_velocity: Vec3::ZERO,
        })
    }

    pub(crate) fn enter(&mut self, controller_velocity: Vec3) {
        self.motor_acceleration = Vec3::ZERO;
        self.out_velocity = controller_velocity;
    }

    pub(crate) fn exit(&mut self) {
        self.out_velocity = Vec3::ZERO;
    }

    pub(crate) fn out_velocity(&self) -> Vec3 {
        self.out_velocity
    }

    pub(crate) fn set_out_velocity(&mut self, velocity: Vec3) {
        self.out_velocity = velocity;
    }

    pub(crate) fn policy(&self) -> MomentumConservation {
        self.policy
    }

    pub(crate) fn step(&mut self, ctx: &TickContext<'_>) -> Vec3 {
        let controller = ctx.controller;
        let up = resolve_up(controller.up);
        let up_velocity = up * controller.velocity.dot(up);
        let h_velocity = controller.velocity - up_velocity;

        let top_speed = self.top_speed.get();
        let mut direction_multiplier = 1.0;
        let mut target_velocity = h_velocity;
        let mut decelerating = false;

        if ctx.input.scale() < TINY_VALUE {
            match self.policy {
                MomentumConservation::MaintainSpeed => {}
                MomentumConservation::ClampSpeed => {
                    let before = target_velocity.length_squared();
                    target_velocity = target_velocity.clamp_length(top_speed);
                    if before > target_velocity.length_squared() {
                        decelerating = true;
                    }
                }
                MomentumConservation::ClampToInput => {
                    target_velocity = Vec3::ZERO;
                    decelerating = true;
                }
            }
        } else {
            let [input_x, input_y] = ctx.input.direction();
            direction_multiplier = direction_multiplier_for(
                ctx.input.direction(),
                self.strafe_multiplier.get(),
                self.reverse_multiplier.get(),
            );

            let direction = controller.forward * input_y + controller.right * input_x;
            let input_speed = top_speed * ctx.input.scale() * direction_multiplier;
            let mut aligned_speed = h_velocity.dot(direction);
            if self.policy != MomentumConservation::MaintainSpeed && aligned_speed > top_speed {
                decelerating = true;
                aligned_speed = top_speed;
            }
            target_velocity = direction * input_speed.max(aligned_speed);
        }

        let drag = self.drag.get();
        if drag > TINY_VALUE {
            target_velocity *= clamp01(1.0 - drag * ctx.dt);
        }

        let rate = if decelerating {
            self.deceleration.get()
        } else {
            self.acceleration.get()
        };
        let smoothed = if rate < TINY_VALUE || target_velocity == h_velocity {
            target_velocity
        } else {
            smooth_damp(
                h_velocity,
                target_velocity,
                &mut self.motor_acceleration,
                lerp(SMOOTH_TIME_MIN, SMOOTH_TIME_MAX, self.damping),
                rate * direction_multiplier,
                ctx.dt,
            )
        };

        self.out_velocity = smoothed.project_on_plane(up) + up_velocity;
        self.out_velocity
    }

    pub(crate) fn write_properties(&self, writer: &mut dyn PersistenceWriter) {
        writer.write_vector(KEY_ACCELERATION, self.motor_acceleration);
        writer.write_vector(KEY_VELOCITY, self.out_velocity);
    }

    pub(crate) fn read_properties(&mut self, reader: &dyn PersistenceReader) {
        self.motor_acceleration = reader.try_read_vector(KEY_ACCELERATION, self.motor_acceleration);
        self.out_velocity = reader.try_read_vector(KEY_VELOCITY, self.out_velocity);
    }

    #[cfg(test)]
    pub(crate) fn motor_acceleration(&self) -> Vec3 {
        self.motor_acceleration
    }
}

/// Speed scale for an input direction: reverse and strafe blends combine multiplicatively.
pub fn direction_multiplier_for(direction: [f32; 2], strafe: f32, reverse: f32) -> f32 {
    let [x, y] = direction;
    let mut multiplier = 1.0;
    if y < 0.0 {
        multiplier *= lerp(1.0, reverse, -y);
    }
    multiplier * lerp(1.0, strafe, x.abs())
}

pub(crate) fn resolve_up(up: Vec3) -> Vec3 {
    let up = up.normalize_or_zero();
    if up == Vec3::ZERO {
        Vec3::Y
    } else {
        up
    }
}
