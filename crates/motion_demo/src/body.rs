use motion_graph::{CharacterController, ControllerSnapshot, MotionRequest, Vec3};

const GRAVITY: f32 = 9.81;
const GROUND_SNAP_DISTANCE: f32 = 0.05;

/// Kinematic stand-in for a character controller: a point mover over a flat floor at
/// y = 0. Gravity and ground snapping follow the flags each state reports.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicBody {
    position: Vec3,
    velocity: Vec3,
    grounded: bool,
}

impl KinematicBody {
    pub fn at_height(height: f32) -> Self {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        Self {
            position: Vec3::new(0.0, height, 0.0),
            velocity: Vec3::ZERO,
            grounded: height <= 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }
}

impl CharacterController for KinematicBody {
    fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot::default()
            .with_velocity(self.velocity)
            .with_grounded(self.grounded)
    }

    fn apply_motion(&mut self, request: &MotionRequest) {
        let mut velocity = request.velocity;
        if request.flags.apply_gravity {
            velocity.y -= GRAVITY * request.dt;
        }

        let mut next = self.position + velocity * request.dt;
        if request.flags.apply_grounding_force && self.grounded && next.y <= GROUND_SNAP_DISTANCE {
            next.y = 0.0;
            velocity.y = velocity.y.min(0.0);
        }
        if next.y <= 0.0 {
            next.y = 0.0;
            velocity.y = velocity.y.max(0.0);
        }

        self.grounded = next.y <= 0.0 && velocity.y <= 0.0;
        self.position = next;
        self.velocity = velocity;
    }
}
