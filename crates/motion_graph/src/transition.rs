use serde::{Deserialize, Serialize};

use crate::controller::ControllerSnapshot;
use crate::input::MoveInput;
use crate::params::{Binder, BindingError, BoundParam, FloatRange, ParamRef};
use crate::states::TINY_VALUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Greater,
    Less,
    Equal,
}

impl Comparison {
    fn holds(self, left: f32, right: f32) -> bool {
        match self {
            Comparison::Greater => left > right,
            Comparison::Less => left < right,
            Comparison::Equal => (left - right).abs() < TINY_VALUE,
        }
    }
}

/// Guard predicate as authored in a graph definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Always,
    Grounded(bool),
    JumpPressed(bool),
    InputAbove(f32),
    InputBelow(f32),
    VerticalSpeedAbove(f32),
    VerticalSpeedBelow(f32),
    TimeInStateAtLeast(f32),
    Parameter {
        param: String,
        compare: Comparison,
        value: ParamRef<f32>,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Always
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDef {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub when: Condition,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct GuardContext<'a> {
    pub controller: &'a ControllerSnapshot,
    pub input: &'a MoveInput,
    pub time_in_state: f32,
}

#[derive(Debug, Clone)]
pub(crate) enum Guard {
    Always,
    Grounded(bool),
    JumpPressed(bool),
    InputAbove(f32),
    InputBelow(f32),
    VerticalSpeedAbove(f32),
    VerticalSpeedBelow(f32),
    TimeInStateAtLeast(f32),
    Parameter {
        left: BoundParam<f32>,
        compare: Comparison,
        right: BoundParam<f32>,
    },
    All(Vec<Guard>),
    Any(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    pub(crate) fn bind(
        condition: &Condition,
        binder: &Binder<'_>,
        field: &str,
    ) -> Result<Self, BindingError> {
        Ok(match condition {
            Condition::Always => Guard::Always,
            Condition::Grounded(expected) => Guard::Grounded(*expected),
            Condition::JumpPressed(expected) => Guard::JumpPressed(*expected),
            Condition::InputAbove(threshold) => Guard::InputAbove(*threshold),
            Condition::InputBelow(threshold) => Guard::InputBelow(*threshold),
            Condition::VerticalSpeedAbove(threshold) => Guard::VerticalSpeedAbove(*threshold),
            Condition::VerticalSpeedBelow(threshold) => Guard::VerticalSpeedBelow(*threshold),
            Condition::TimeInStateAtLeast(seconds) => Guard::TimeInStateAtLeast(*seconds),
            Condition::Parameter {
                param,
                compare,
                value,
            } => Guard::Parameter {
                left: binder.bind(field, &ParamRef::bound(param.as_str()), FloatRange::UNBOUNDED)?,
                compare: *compare,
                right: binder.bind(field, value, FloatRange::UNBOUNDED)?,
            },
            Condition::All(conditions) => Guard::All(bind_all(conditions, binder, field)?),
            Condition::Any(conditions) => Guard::Any(bind_all(conditions, binder, field)?),
            Condition::Not(condition) => Guard::Not(Box::new(Guard::bind(condition, binder, field)?)),
        })
    }

    pub(crate) fn evaluate(&self, ctx: &GuardContext<'_>) -> bool {
        match self {
            Guard::Always => true,
            Guard::Grounded(expected) => ctx.controller.is_grounded == *expected,
            Guard::JumpPressed(expected) => ctx.input.jump_pressed() == *expected,
            Guard::InputAbove(threshold) => ctx.input.scale() > *threshold,
            Guard::InputBelow(threshold) => ctx.input.scale() < *threshold,
            Guard::VerticalSpeedAbove(threshold) => ctx.controller.vertical_speed() > *threshold,
            Guard::VerticalSpeedBelow(threshold) => ctx.controller.vertical_speed() < *threshold,
            Guard::TimeInStateAtLeast(seconds) => ctx.time_in_state >= *seconds,
            Guard::Parameter {
                left,
                compare,
                right,
            } => compare.holds(left.get(), right.get()),
            Guard::All(guards) => guards.iter().all(|guard| guard.evaluate(ctx)),
            Guard::Any(guards) => guards.iter().any(|guard| guard.evaluate(ctx)),
            Guard::Not(guard) => !guard.evaluate(ctx),
        }
    }
}

fn bind_all(
    conditions: &[Condition],
    binder: &Binder<'_>,
    field: &str,
) -> Result<Vec<Guard>, BindingError> {
    conditions
        .iter()
        .map(|condition| Guard::bind(condition, binder, field))
        .collect()
}

/// A linked edge. `order` is the declaration index, used to break priority ties.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    pub order: usize,
    pub target: usize,
    pub priority: u32,
    pub guard: Guard,
}

pub(crate) fn sort_by_priority(transitions: &mut [Transition]) {
    transitions.sort_by_key(|transition| (transition.priority, transition.order));
}
