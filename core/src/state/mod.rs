pub mod machine;
pub mod persistence;

pub use machine::{CallbackHandle, PersistedState, StateMachineError, SupervisorState, SupervisorStateMachine, TransitionRecord};
pub use persistence::PersistenceError;
