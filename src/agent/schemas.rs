//! Data models for agent task runs

use serde::{Deserialize, Serialize};

/// Stage of the agent loop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStage {
    Planning,
    Generating,
    Persisting,
    Executing,
    Verifying,
    Succeeded,
    Failed,
}

/// Progress event emitted at stage boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub stage: AgentStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

/// Best-effort structured plan produced before the first attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub command: Option<String>,
}

/// Outcome of one attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AttemptOutcome {
    Success { exit_code: i32 },
    Failure { exit_code: i32, output: String },
}

/// One full generate, persist, execute, verify cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAttempt {
    /// 1-based attempt number
    pub number: u32,
    /// Task text this attempt was generated against
    pub task: String,
    pub generated_filename: String,
    pub generated_code: String,
    pub outcome: AttemptOutcome,
}

impl AgentAttempt {
    /// Accumulated execution output when the attempt failed
    pub fn failure_output(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Failure { output, .. } => Some(output),
            AttemptOutcome::Success { .. } => None,
        }
    }
}
