mod definition;

use std::collections::{BTreeMap, HashMap, VecDeque};

use thiserror::Error;
use tracing::{info, warn};

use crate::controller::{ControllerSnapshot, MotionFlags};
use crate::input::MoveInput;
use crate::math::Vec3;
use crate::params::{Binder, BindingError};
use crate::persistence::{GraphSnapshot, StateRecord, SNAPSHOT_FORMAT_VERSION};
use crate::states::{MotionBehavior, MotionState, TickContext};
use crate::transition::{sort_by_priority, Guard, GuardContext, Transition};

pub use definition::{load_graph_definition, DefinitionError, GraphDefinition, StateDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHandle(pub u32);

impl StateHandle {
    fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphLinkError {
    #[error("graph '{graph}' has no states")]
    EmptyGraph { graph: String },
    #[error("state at index {index} has an empty id")]
    EmptyStateId { index: usize },
    #[error("state id '{state}' is declared more than once")]
    DuplicateState { state: String },
    #[error("graph '{graph}' does not name a default state")]
    MissingDefaultState { graph: String },
    #[error("default state '{state}' is not declared")]
    UnknownDefaultState { state: String },
    #[error("transition {index} starts at undeclared state '{state}'")]
    UnknownTransitionSource { index: usize, state: String },
    #[error("transition {index} targets undeclared state '{state}'")]
    UnknownTransitionTarget { index: usize, state: String },
    #[error("state '{state}' cannot be reached from default state '{default_state}'")]
    UnreachableState {
        state: String,
        default_state: String,
    },
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error("failed to fingerprint graph definition: {message}")]
    Fingerprint { message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotLoadError {
    #[error("unsupported snapshot format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("snapshot names active state '{state}' which this graph does not declare")]
    UnknownActiveState { state: String },
    #[error("snapshot time in state is not a finite non-negative number: {value}")]
    InvalidTimeInState { value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub state: StateHandle,
    pub transitioned_from: Option<StateHandle>,
    pub velocity: Vec3,
    pub delta: Vec3,
    pub dt: f32,
    pub flags: MotionFlags,
}

/// A linked, runnable graph. Exists only once every reference and edge resolved.
#[derive(Debug, Clone)]
pub struct MotionGraph {
    name: String,
    definition_hash: String,
    state_ids: Vec<String>,
    index_by_id: HashMap<String, usize>,
    states: Vec<MotionState>,
    outgoing: Vec<Vec<Transition>>,
    default_state: usize,
    active: Option<usize>,
    time_in_state: f32,
}

impl MotionGraph {
    pub fn link(mut definition: GraphDefinition) -> Result<Self, GraphLinkError> {
        for state in &mut definition.states {
            if state.config.migrate_deprecated() {
                warn!(
                    graph = %definition.name,
                    state = %state.id,
                    kind = state.config.kind_name(),
                    "motion_state_config_migrated"
                );
            }
        }

        if definition.states.is_empty() {
            return Err(GraphLinkError::EmptyGraph {
                graph: definition.name,
            });
        }

        let mut index_by_id = HashMap::with_capacity(definition.states.len());
        for (index, state) in definition.states.iter().enumerate() {
            if state.id.is_empty() {
                return Err(GraphLinkError::EmptyStateId { index });
            }
            if index_by_id.insert(state.id.clone(), index).is_some() {
                return Err(GraphLinkError::DuplicateState {
                    state: state.id.clone(),
                });
            }
        }

        let default_id = definition
            .default_state
            .as_deref()
            .ok_or_else(|| GraphLinkError::MissingDefaultState {
                graph: definition.name.clone(),
            })?;
        let default_state = *index_by_id.get(default_id).ok_or_else(|| {
            GraphLinkError::UnknownDefaultState {
                state: default_id.to_string(),
            }
        })?;

        let mut edges = Vec::with_capacity(definition.transitions.len());
        for (index, transition) in definition.transitions.iter().enumerate() {
            let from = *index_by_id.get(&transition.from).ok_or_else(|| {
                GraphLinkError::UnknownTransitionSource {
                    index,
                    state: transition.from.clone(),
                }
            })?;
            let to = *index_by_id.get(&transition.to).ok_or_else(|| {
                GraphLinkError::UnknownTransitionTarget {
                    index,
                    state: transition.to.clone(),
                }
            })?;
            edges.push((from, to));
        }

        if let Some(unreachable) = first_unreachable(definition.states.len(), default_state, &edges) {
            return Err(GraphLinkError::UnreachableState {
                state: definition.states[unreachable].id.clone(),
                default_state: default_id.to_string(),
            });
        }

        let mut states = Vec::with_capacity(definition.states.len());
        for state in &definition.states {
            let binder = Binder::new(&definition.parameters, &state.id);
            states.push(MotionState::bind(&state.config, &binder)?);
        }

        let mut outgoing: Vec<Vec<Transition>> = vec![Vec::new(); states.len()];
        for (order, (transition, &(from, to))) in
            definition.transitions.iter().zip(&edges).enumerate()
        {
            let binder = Binder::new(&definition.parameters, &transition.from);
            let field = format!("transitions[{order}].when");
            outgoing[from].push(Transition {
                order,
                target: to,
                priority: transition.priority,
                guard: Guard::bind(&transition.when, &binder, &field)?,
            });
        }
        for transitions in &mut outgoing {
            sort_by_priority(transitions);
        }

        let definition_hash = definition::definition_hash(&definition).map_err(|error| {
            GraphLinkError::Fingerprint {
                message: error.to_string(),
            }
        })?;

        info!(
            graph = %definition.name,
            states = states.len(),
            transitions = definition.transitions.len(),
            parameters = definition.parameters.len(),
            default_state = default_id,
            definition_hash = %definition_hash,
            "motion_graph_linked"
        );

        Ok(Self {
            name: definition.name,
            definition_hash,
            state_ids: definition.states.into_iter().map(|state| state.id).collect(),
            index_by_id,
            states,
            outgoing,
            default_state,
            active: None,
            time_in_state: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition_hash(&self) -> &str {
        &self.definition_hash
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn handle_of(&self, state_id: &str) -> Option<StateHandle> {
        self.index_by_id
            .get(state_id)
            .copied()
            .map(StateHandle::from_index)
    }

    pub fn state_id(&self, handle: StateHandle) -> Option<&str> {
        self.state_ids.get(handle.index()).map(String::as_str)
    }

    pub fn state(&self, handle: StateHandle) -> Option<&MotionState> {
        self.states.get(handle.index())
    }

    pub fn default_state(&self) -> StateHandle {
        StateHandle::from_index(self.default_state)
    }

    pub fn active_state(&self) -> Option<StateHandle> {
        self.active.map(StateHandle::from_index)
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    /// Enters the default state if nothing is active yet.
    pub fn activate(&mut self, controller: &ControllerSnapshot) -> StateHandle {
        let index = match self.active {
            Some(index) => index,
            None => self.enter(self.default_state, &controller.sanitized()),
        };
        StateHandle::from_index(index)
    }

    pub fn deactivate(&mut self) -> Option<StateHandle> {
        let index = self.active.take()?;
        self.states[index].on_exit();
        self.time_in_state = 0.0;
        Some(StateHandle::from_index(index))
    }

    pub fn tick(
        &mut self,
        dt: f32,
        input: &MoveInput,
        controller: &ControllerSnapshot,
    ) -> TickOutput {
        let dt = sanitize_dt(dt);
        let controller = controller.sanitized();

        let mut active = match self.active {
            Some(index) => index,
            None => self.enter(self.default_state, &controller),
        };

        let mut transitioned_from = None;
        if let Some(target) = self.select_transition(active, input, &controller) {
            self.states[active].on_exit();
            transitioned_from = Some(StateHandle::from_index(active));
            active = self.enter(target, &controller);
        }

        let ctx = TickContext {
            dt,
            input,
            controller: &controller,
        };
        let mut velocity = self.states[active].update(&ctx);
        if !velocity.is_finite() {
            warn!(
                graph = %self.name,
                state = %self.state_ids[active],
                kind = self.states[active].kind_name(),
                "motion_state_output_not_finite"
            );
            self.states[active].on_enter(&controller.with_velocity(Vec3::ZERO));
            velocity = Vec3::ZERO;
        }
        self.time_in_state += dt;

        TickOutput {
            state: StateHandle::from_index(active),
            transitioned_from,
            velocity,
            delta: velocity * dt,
            dt,
            flags: self.states[active].motion_flags(),
        }
    }

    pub fn save(&self) -> GraphSnapshot {
        let mut states = BTreeMap::new();
        for (id, state) in self.state_ids.iter().zip(&self.states) {
            let mut record = StateRecord::new();
            state.write_properties(&mut record);
            if !record.is_empty() {
                states.insert(id.clone(), record);
            }
        }

        GraphSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            definition_hash: self.definition_hash.clone(),
            active_state: self.active.map(|index| self.state_ids[index].clone()),
            time_in_state: self.time_in_state,
            states,
        }
    }

    /// Restores continuous state without running any enter hooks. A state that stops being
    /// active is exited first. Nothing changes when an error is returned.
    pub fn load(&mut self, snapshot: &GraphSnapshot) -> Result<(), SnapshotLoadError> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotLoadError::UnsupportedVersion {
                found: snapshot.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        let active = match snapshot.active_state.as_deref() {
            Some(id) => Some(*self.index_by_id.get(id).ok_or_else(|| {
                SnapshotLoadError::UnknownActiveState {
                    state: id.to_string(),
                }
            })?),
            None => None,
        };
        if !snapshot.time_in_state.is_finite() || snapshot.time_in_state < 0.0 {
            return Err(SnapshotLoadError::InvalidTimeInState {
                value: snapshot.time_in_state,
            });
        }

        if snapshot.definition_hash != self.definition_hash {
            warn!(
                graph = %self.name,
                expected = %self.definition_hash,
                found = %snapshot.definition_hash,
                "motion_snapshot_definition_changed"
            );
        }

        if let Some(current) = self.active.filter(|&current| Some(current) != active) {
            self.states[current].on_exit();
        }
        for (id, record) in &snapshot.states {
            match self.index_by_id.get(id) {
                Some(&index) => self.states[index].read_properties(record),
                None => warn!(graph = %self.name, state = %id, "motion_snapshot_state_skipped"),
            }
        }
        self.active = active;
        self.time_in_state = snapshot.time_in_state;
        Ok(())
    }

    fn select_transition(
        &self,
        active: usize,
        input: &MoveInput,
        controller: &ControllerSnapshot,
    ) -> Option<usize> {
        let ctx = GuardContext {
            controller,
            input,
            time_in_state: self.time_in_state,
        };
        self.outgoing[active]
            .iter()
            .find(|transition| transition.guard.evaluate(&ctx))
            .map(|transition| transition.target)
    }

    fn enter(&mut self, index: usize, controller: &ControllerSnapshot) -> usize {
        self.states[index].on_enter(controller);
        self.active = Some(index);
        self.time_in_state = 0.0;
        index
    }
}

fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}

fn first_unreachable(state_count: usize, start: usize, edges: &[(usize, usize)]) -> Option<usize> {
    let mut adjacency = vec![Vec::new(); state_count];
    for &(from, to) in edges {
        adjacency[from].push(to);
    }

    let mut visited = vec![false; state_count];
    let mut queue = VecDeque::from([start]);
    visited[start] = true;
    while let Some(current) = queue.pop_front() {
        for &next in &adjacency[current] {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }

    visited.iter().position(|reached| !reached)
}
