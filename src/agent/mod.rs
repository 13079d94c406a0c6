//! Autonomous agent loop: plan, generate, persist, execute, verify

pub mod controller;
pub mod schemas;

pub use controller::{AgentController, AgentObserver, RunOptions, FILENAME_MARKER};
pub use schemas::{AgentAttempt, AgentEvent, AgentStage, AttemptOutcome, Plan};
