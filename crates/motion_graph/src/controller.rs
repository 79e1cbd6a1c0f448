use crate::math::Vec3;

/// What the character controller reports at the start of a tick. `velocity` is the velocity
/// resolved by the controller's last collision sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSnapshot {
    pub velocity: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub is_grounded: bool,
}

impl Default for ControllerSnapshot {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            up: Vec3::Y,
            forward: Vec3::Z,
            right: Vec3::X,
            is_grounded: false,
        }
    }
}

impl ControllerSnapshot {
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_grounded(mut self, is_grounded: bool) -> Self {
        self.is_grounded = is_grounded;
        self
    }

    pub fn vertical_speed(&self) -> f32 {
        self.velocity.dot(self.up)
    }

    pub(crate) fn sanitized(mut self) -> Self {
        if !self.velocity.is_finite() {
            self.velocity = Vec3::ZERO;
        }
        self
    }
}

/// How the controller should treat the requested motion beyond the raw delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionFlags {
    pub apply_gravity: bool,
    pub apply_grounding_force: bool,
    pub ignore_platform_move: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRequest {
    pub delta: Vec3,
    pub velocity: Vec3,
    pub dt: f32,
    pub flags: MotionFlags,
}

/// The collision-resolving mover a driver ticks against.
pub trait CharacterController {
    fn snapshot(&self) -> ControllerSnapshot;
    fn apply_motion(&mut self, request: &MotionRequest);
}
