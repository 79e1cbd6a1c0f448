use crate::controller::{CharacterController, ControllerSnapshot, MotionRequest};
use crate::graph::GraphDefinition;
use crate::input::MoveInput;
use crate::math::Vec3;

pub(crate) const GRAVITY: f32 = 9.81;
pub(crate) const FIXED_DT: f32 = 1.0 / 60.0;

pub(crate) const BIPED_GRAPH: &str = r#"{
    "name": "biped",
    "default_state": "falling",
    "parameters": {
        "run_speed": { "float": 6.0 },
        "leap": { "vector": [0.0, 5.0, 0.0] }
    },
    "states": [
        { "id": "falling", "kind": "falling", "top_speed": 3.0 },
        { "id": "grounded", "kind": "grounded", "top_speed": { "param": "run_speed" } },
        { "id": "jump", "kind": "jump", "jump_velocity": { "param": "leap" } }
    ],
    "transitions": [
        { "from": "falling", "to": "grounded", "when": { "grounded": true } },
        { "from": "grounded", "to": "jump", "when": { "jump_pressed": true } },
        { "from": "grounded", "to": "falling", "priority": 1, "when": { "grounded": false } },
        {
            "from": "jump",
            "to": "falling",
            "when": { "all": [ { "time_in_state_at_least": 0.05 }, { "vertical_speed_below": 0.0 } ] }
        }
    ]
}"#;

pub(crate) fn biped_definition() -> GraphDefinition {
    GraphDefinition::from_json_str(BIPED_GRAPH).expect("parse biped graph")
}

/// Kinematic body over a flat floor at y = 0.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub applied: Vec<MotionRequest>,
}

impl TestBody {
    pub(crate) fn airborne(height: f32) -> Self {
        Self {
            position: Vec3::new(0.0, height, 0.0),
            velocity: Vec3::ZERO,
            grounded: false,
            applied: Vec::new(),
        }
    }
}

impl CharacterController for TestBody {
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
        self.position += velocity * request.dt;
        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            velocity.y = velocity.y.max(0.0);
        }
        self.grounded = self.position.y <= 0.0 && velocity.y <= 0.0;
        self.velocity = velocity;
        self.applied.push(*request);
    }
}

/// Runs forward for a bit, presses jump around tick 40, then strafes.
pub(crate) fn scripted_input(tick: usize) -> MoveInput {
    match tick {
        0..=29 => MoveInput::new(0.0, 1.0),
        30..=39 => MoveInput::new(0.5, 0.5),
        40..=42 => MoveInput::new(0.0, 1.0).with_jump(true),
        43..=89 => MoveInput::new(1.0, 0.0),
        _ => MoveInput::empty(),
    }
}
