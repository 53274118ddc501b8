//! Task Planner (C2/C2a) and Plan Validator (C3).

pub mod decomposer;
pub mod effort;
pub mod validator;

pub use decomposer::{DecompositionRequest, PlanningError, SubtaskTemplate, decompose};
pub use validator::{ValidationReport, ValidatorConfig, validate};
