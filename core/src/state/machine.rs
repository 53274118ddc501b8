//! Supervisor State Machine (C7, spec §4.7).

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::context::TaskContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisorState {
    Idle,
    Plan,
    Execute,
    Verify,
    Iterate,
    Complete,
    Failed,
    Paused,
}

impl SupervisorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SupervisorState::Complete | SupervisorState::Failed)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Idle => "IDLE",
            SupervisorState::Plan => "PLAN",
            SupervisorState::Execute => "EXECUTE",
            SupervisorState::Verify => "VERIFY",
            SupervisorState::Iterate => "ITERATE",
            SupervisorState::Complete => "COMPLETE",
            SupervisorState::Failed => "FAILED",
            SupervisorState::Paused => "PAUSED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: SupervisorState, to: SupervisorState },
    #[error("restoreFromPersistedState is only valid from IDLE, current state is {0}")]
    RestoreNotFromIdle(SupervisorState),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SupervisorState,
    pub to: SupervisorState,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub current_state: SupervisorState,
    pub previous_active_state: Option<SupervisorState>,
    pub task_context: Option<TaskContext>,
    pub state_history: Vec<TransitionRecord>,
    pub persisted_at: i64,
}

const SNAPSHOT_VERSION: u32 = 1;

type TransitionCallback = Box<dyn Fn(&TransitionRecord) + Send + Sync>;
type StateCallback = Box<dyn Fn(SupervisorState) + Send + Sync>;

/// Token returned by a callback registration; dropping it does not unregister —
/// call `unregister` explicitly (handles are cheap ids, not RAII guards).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackHandle(u64);

#[derive(Default)]
struct Callbacks {
    on_transition: Vec<(u64, TransitionCallback)>,
    on_entry: Vec<(u64, SupervisorState, StateCallback)>,
    on_exit: Vec<(u64, SupervisorState, StateCallback)>,
    next_id: u64,
}

impl Callbacks {
    fn alloc(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Drives one task through IDLE→PLAN→EXECUTE→VERIFY→{COMPLETE|ITERATE}, with
/// PAUSE/FAIL escapes from every non-terminal state.
pub struct SupervisorStateMachine {
    state: SupervisorState,
    previous_active_state: Option<SupervisorState>,
    task_context: Option<TaskContext>,
    history: Vec<TransitionRecord>,
    iteration: u32,
    max_iterations: u32,
    state_timeouts: HashMap<SupervisorState, u64>,
    state_entered_at: Instant,
    callbacks: Callbacks,
}

impl SupervisorStateMachine {
    pub fn new(max_iterations: u32, state_timeouts: HashMap<SupervisorState, u64>) -> Self {
        Self {
            state: SupervisorState::Idle,
            previous_active_state: None,
            task_context: None,
            history: Vec::new(),
            iteration: 0,
            max_iterations,
            state_timeouts,
            state_entered_at: Instant::now(),
            callbacks: Callbacks::default(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn task_context(&self) -> Option<&TaskContext> {
        self.task_context.as_ref()
    }

    pub fn task_context_mut(&mut self) -> Option<&mut TaskContext> {
        self.task_context.as_mut()
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn on_transition(&mut self, f: impl Fn(&TransitionRecord) + Send + Sync + 'static) -> CallbackHandle {
        let id = self.callbacks.alloc();
        self.callbacks.on_transition.push((id, Box::new(f)));
        CallbackHandle(id)
    }

    pub fn on_state_entry(&mut self, state: SupervisorState, f: impl Fn(SupervisorState) + Send + Sync + 'static) -> CallbackHandle {
        let id = self.callbacks.alloc();
        self.callbacks.on_entry.push((id, state, Box::new(f)));
        CallbackHandle(id)
    }

    pub fn on_state_exit(&mut self, state: SupervisorState, f: impl Fn(SupervisorState) + Send + Sync + 'static) -> CallbackHandle {
        let id = self.callbacks.alloc();
        self.callbacks.on_exit.push((id, state, Box::new(f)));
        CallbackHandle(id)
    }

    pub fn unregister(&mut self, handle: CallbackHandle) {
        self.callbacks.on_transition.retain(|(id, _)| *id != handle.0);
        self.callbacks.on_entry.retain(|(id, _, _)| *id != handle.0);
        self.callbacks.on_exit.retain(|(id, _, _)| *id != handle.0);
    }

    pub fn initialize(&mut self, task: TaskContext, now: i64) -> Result<(), StateMachineError> {
        self.task_context = Some(task);
        self.transition(SupervisorState::Plan, "initialize(task)".into(), now)
    }

    pub fn fail(&mut self, reason: impl Into<String>, now: i64) -> Result<(), StateMachineError> {
        self.transition(SupervisorState::Failed, reason.into(), now)
    }

    pub fn pause(&mut self, reason: impl Into<String>, now: i64) -> Result<(), StateMachineError> {
        self.previous_active_state = Some(self.state);
        self.transition(SupervisorState::Paused, reason.into(), now)
    }

    pub fn resume(&mut self, now: i64) -> Result<(), StateMachineError> {
        let target = self.previous_active_state.unwrap_or(SupervisorState::Idle);
        self.transition(target, "resume()".into(), now)
    }

    pub fn start_execution(&mut self, now: i64) -> Result<(), StateMachineError> {
        self.transition(SupervisorState::Execute, "startExecution()".into(), now)
    }

    pub fn executor_finished(&mut self, now: i64) -> Result<(), StateMachineError> {
        self.transition(SupervisorState::Verify, "executor finished".into(), now)
    }

    pub fn verifier_passed(&mut self, now: i64) -> Result<(), StateMachineError> {
        self.transition(SupervisorState::Complete, "verifier passes all required checks".into(), now)
    }

    /// `iterate(reason)`: bumps the counter; transitions to FAILED instead of
    /// ITERATE once the counter exceeds `maxIterations`.
    pub fn iterate(&mut self, reason: impl Into<String>, now: i64) -> Result<(), StateMachineError> {
        self.iteration += 1;
        if self.iteration > self.max_iterations {
            return self.transition(SupervisorState::Failed, "max iterations reached".into(), now);
        }
        self.transition(SupervisorState::Iterate, reason.into(), now)
    }

    pub fn resume_execution_after_iterate(&mut self, now: i64) -> Result<(), StateMachineError> {
        self.transition(SupervisorState::Execute, "after applying remediation context".into(), now)
    }

    pub fn reset(&mut self, now: i64) -> Result<(), StateMachineError> {
        let result = self.transition(SupervisorState::Idle, "reset()".into(), now);
        if result.is_ok() {
            self.task_context = None;
            self.iteration = 0;
        }
        result
    }

    /// Checks the current state's configured timeout against wall-clock time
    /// held in-state; call periodically from the driving loop.
    pub fn check_timeout(&mut self, now: i64) -> Result<(), StateMachineError> {
        if let Some(limit_ms) = self.state_timeouts.get(&self.state) {
            if self.state_entered_at.elapsed().as_millis() as u64 > *limit_ms {
                return self.transition(SupervisorState::Failed, "state timeout".into(), now);
            }
        }
        Ok(())
    }

    fn is_valid(&self, to: SupervisorState) -> bool {
        use SupervisorState::*;
        match (self.state, to) {
            (Idle, Plan) | (Idle, Failed) => true,
            (Plan, Execute) | (Plan, Failed) | (Plan, Paused) => true,
            (Execute, Verify) | (Execute, Failed) | (Execute, Paused) => true,
            (Verify, Complete) | (Verify, Iterate) | (Verify, Failed) | (Verify, Paused) => true,
            (Iterate, Execute) | (Iterate, Failed) | (Iterate, Paused) => true,
            (Paused, Plan) | (Paused, Execute) | (Paused, Verify) | (Paused, Iterate) | (Paused, Idle) | (Paused, Failed) => true,
            (Complete, Idle) => true,
            (Failed, Idle) => true,
            _ => false,
        }
    }

    fn transition(&mut self, to: SupervisorState, reason: String, now: i64) -> Result<(), StateMachineError> {
        if !self.is_valid(to) {
            return Err(StateMachineError::InvalidTransition { from: self.state, to });
        }
        let from = self.state;

        for (_, exit_state, cb) in &self.callbacks.on_exit {
            if *exit_state == from {
                cb(from);
            }
        }

        self.state = to;
        self.state_entered_at = Instant::now();
        if let Some(ctx) = self.task_context.as_mut() {
            ctx.updated_at = now;
            ctx.iteration = self.iteration;
        }

        let record = TransitionRecord { from, to, reason, timestamp: now };
        self.history.push(record.clone());

        for (_, cb) in &self.callbacks.on_transition {
            cb(&record);
        }
        for (_, entry_state, cb) in &self.callbacks.on_entry {
            if *entry_state == to {
                cb(to);
            }
        }

        if to == SupervisorState::Failed {
            warn!(from = %from, reason = %record.reason, "supervisor transitioned to FAILED");
        } else {
            info!(from = %from, to = %to, "supervisor transition");
        }

        Ok(())
    }

    pub fn get_persisted_state(&self, now: i64) -> PersistedState {
        PersistedState {
            version: SNAPSHOT_VERSION,
            current_state: self.state,
            previous_active_state: self.previous_active_state,
            task_context: self.task_context.clone(),
            state_history: self.history.clone(),
            persisted_at: now,
        }
    }

    pub fn restore_from_persisted_state(&mut self, snapshot: PersistedState) -> Result<(), StateMachineError> {
        if self.state != SupervisorState::Idle {
            return Err(StateMachineError::RestoreNotFromIdle(self.state));
        }
        self.state = snapshot.current_state;
        self.previous_active_state = snapshot.previous_active_state;
        self.task_context = snapshot.task_context;
        self.history = snapshot.state_history;
        self.iteration = self.task_context.as_ref().map(|c| c.iteration).unwrap_or(0);
        self.state_entered_at = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TaskContext {
        TaskContext::new("t1", "do the thing", 3, 0)
    }

    #[test]
    fn happy_path_drives_idle_to_complete() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        assert_eq!(m.state(), SupervisorState::Plan);
        m.start_execution(1).unwrap();
        assert_eq!(m.state(), SupervisorState::Execute);
        m.executor_finished(2).unwrap();
        assert_eq!(m.state(), SupervisorState::Verify);
        m.verifier_passed(3).unwrap();
        assert_eq!(m.state(), SupervisorState::Complete);
    }

    #[test]
    fn s2_iterate_budget_exhaustion_fails_instead_of_iterating() {
        let mut m = SupervisorStateMachine::new(1, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        m.start_execution(1).unwrap();
        m.executor_finished(2).unwrap();
        m.iterate("verifier failed", 3).unwrap();
        assert_eq!(m.state(), SupervisorState::Iterate);
        m.resume_execution_after_iterate(4).unwrap();
        m.executor_finished(5).unwrap();
        m.iterate("verifier failed again", 6).unwrap();
        assert_eq!(m.state(), SupervisorState::Failed);
        assert_eq!(m.history().last().unwrap().reason, "max iterations reached");
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        let err = m.start_execution(0).unwrap_err();
        assert!(matches!(err, StateMachineError::InvalidTransition { .. }));
    }

    #[test]
    fn pause_takes_precedence_and_resume_returns_to_prior_state() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        m.start_execution(1).unwrap();
        m.pause("operator requested pause", 2).unwrap();
        assert_eq!(m.state(), SupervisorState::Paused);
        m.resume(3).unwrap();
        assert_eq!(m.state(), SupervisorState::Execute);
    }

    #[test]
    fn r1_persist_restore_round_trips_from_idle() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        m.start_execution(1).unwrap();
        let snapshot = m.get_persisted_state(2);

        let mut fresh = SupervisorStateMachine::new(3, HashMap::new());
        fresh.restore_from_persisted_state(snapshot).unwrap();
        assert_eq!(fresh.state(), SupervisorState::Execute);
        assert_eq!(fresh.history().len(), 2);
    }

    #[test]
    fn restore_preserves_previous_active_state_across_pause() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        m.start_execution(1).unwrap();
        m.pause("operator requested pause", 2).unwrap();
        let snapshot = m.get_persisted_state(3);

        let mut fresh = SupervisorStateMachine::new(3, HashMap::new());
        fresh.restore_from_persisted_state(snapshot).unwrap();
        assert_eq!(fresh.state(), SupervisorState::Paused);
        fresh.resume(4).unwrap();
        assert_eq!(fresh.state(), SupervisorState::Execute);
    }

    #[test]
    fn restore_outside_idle_is_rejected() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        let snapshot = m.get_persisted_state(1);
        let err = m.restore_from_persisted_state(snapshot).unwrap_err();
        assert!(matches!(err, StateMachineError::RestoreNotFromIdle(_)));
    }

    #[test]
    fn terminal_states_only_return_to_idle() {
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        m.initialize(ctx(), 0).unwrap();
        m.fail("fatal precondition failure", 1).unwrap();
        assert_eq!(m.state(), SupervisorState::Failed);
        assert!(m.start_execution(2).is_err());
        m.reset(3).unwrap();
        assert_eq!(m.state(), SupervisorState::Idle);
    }

    #[test]
    fn callbacks_fire_in_registration_order() {
        use std::sync::{Arc, Mutex};
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        let o1 = order.clone();
        m.on_transition(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        m.on_transition(move |_| o2.lock().unwrap().push(2));
        m.initialize(ctx(), 0).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn unregister_stops_future_callback_invocations() {
        use std::sync::{Arc, Mutex};
        let count = Arc::new(Mutex::new(0));
        let mut m = SupervisorStateMachine::new(3, HashMap::new());
        let c = count.clone();
        let handle = m.on_transition(move |_| *c.lock().unwrap() += 1);
        m.initialize(ctx(), 0).unwrap();
        m.unregister(handle);
        m.start_execution(1).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
