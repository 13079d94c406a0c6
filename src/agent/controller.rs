//! Agent controller for autonomous coding tasks
//!
//! Drives the plan, generate, persist, execute, verify loop with a bounded
//! number of attempts. Execution failures are folded into the next attempt's
//! task text so retrieval and generation both see the error. Cancellation is
//! cooperative: the flag is checked at stage boundaries and silences further
//! log and event emission; in-flight calls are never force-aborted.

use super::schemas::{AgentAttempt, AgentEvent, AgentStage, AttemptOutcome, Plan};
use crate::config::AgentConfig;
use crate::context::{
    ContextAssembler, ContextBucket, ContextItem, ItemSource, PackRequest, ScoreReason, SourceKind,
};
use crate::index::EmbeddingIndex;
use crate::llm::{ChatMessage, GenerationRequest, GenerationService};
use crate::metrics::METRICS;
use crate::sandbox::Sandbox;
use crate::workspace::WorkspaceFiles;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// First-line marker the generation must carry to name its output file
pub const FILENAME_MARKER: &str = "# filename:";

const DIAGNOSTIC_SCORE: f64 = 0.8;

/// Observer for one task run. All hooks default to no-ops.
pub trait AgentObserver: Send + Sync {
    fn log(&self, _message: &str) {}
    fn event(&self, _event: &AgentEvent) {}
    fn success(&self, _filename: &str, _code: &str) {}
}

/// Per-run inputs beyond the task text
pub struct RunOptions {
    /// Conversation history fed into context assembly, oldest first
    pub chat: Vec<ChatMessage>,
    /// Pinned workspace paths fed into context assembly
    pub pinned_files: Vec<String>,
    /// External diagnostics appended to every attempt's context
    pub diagnostics: Vec<String>,
    /// Cooperative cancellation flag
    pub cancel: Arc<AtomicBool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            chat: Vec::new(),
            pinned_files: Vec::new(),
            diagnostics: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Drives one coding task to success or failure
pub struct AgentController {
    config: AgentConfig,
    assembler: Arc<ContextAssembler>,
    index: Arc<EmbeddingIndex>,
    generator: Arc<dyn GenerationService>,
    sandbox: Arc<dyn Sandbox>,
    workspace: Arc<dyn WorkspaceFiles>,
}

/// Cancellation-aware wrapper over the observer: once the flag is set, no
/// further emissions reach the caller
struct Emitter {
    observer: Arc<dyn AgentObserver>,
    cancel: Arc<AtomicBool>,
}

impl Emitter {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn log(&self, message: &str) {
        if !self.cancelled() {
            self.observer.log(message);
        }
    }

    fn event(&self, stage: AgentStage, message: impl Into<String>, progress: Option<f32>) {
        if !self.cancelled() {
            self.observer.event(&AgentEvent {
                stage,
                message: message.into(),
                progress,
            });
        }
    }

    fn success(&self, filename: &str, code: &str) {
        if !self.cancelled() {
            self.observer.success(filename, code);
        }
    }
}

impl AgentController {
    pub fn new(
        config: AgentConfig,
        assembler: Arc<ContextAssembler>,
        index: Arc<EmbeddingIndex>,
        generator: Arc<dyn GenerationService>,
        sandbox: Arc<dyn Sandbox>,
        workspace: Arc<dyn WorkspaceFiles>,
    ) -> Self {
        Self {
            config,
            assembler,
            index,
            generator,
            sandbox,
            workspace,
        }
    }

    /// Run one task to a terminal state, reporting progress through `observer`
    pub async fn run_task(&self, task: &str, options: RunOptions, observer: Arc<dyn AgentObserver>) {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let emitter = Emitter {
            observer,
            cancel: options.cancel.clone(),
        };

        METRICS.agent_tasks_total.inc();
        info!("Starting agent run {} for task: {}", run_id, task);

        if emitter.cancelled() {
            return;
        }

        emitter.event(AgentStage::Planning, "Drafting a plan", Some(0.0));
        if let Some(plan) = self.plan(task).await {
            emitter.log(&format!(
                "Plan: {} steps, {} files",
                plan.steps.len(),
                plan.files.len()
            ));
        } else {
            emitter.log("Proceeding without a plan");
        }

        let mut attempts: Vec<AgentAttempt> = Vec::new();
        let mut current_task = task.to_string();

        for number in 1..=self.config.max_attempts {
            if emitter.cancelled() {
                return;
            }

            let progress = (number - 1) as f32 / self.config.max_attempts as f32;
            emitter.event(
                AgentStage::Generating,
                format!("Attempt {}/{}", number, self.config.max_attempts),
                Some(progress),
            );

            let code = match self.generate_code(&current_task, &options).await {
                Some(code) => code,
                None => {
                    error!("Run {}: generation produced no usable code", run_id);
                    METRICS.agent_tasks_failed.inc();
                    emitter.event(
                        AgentStage::Failed,
                        "Generation returned no extractable code",
                        None,
                    );
                    return;
                }
            };

            let filename = extract_filename(&code)
                .unwrap_or_else(|| self.config.default_filename.clone());

            if emitter.cancelled() {
                return;
            }

            emitter.event(AgentStage::Persisting, format!("Writing {}", filename), None);
            if let Err(e) = self.sandbox.write_file(&filename, &code).await {
                error!("Run {}: sandbox write failed: {}", run_id, e);
                METRICS.agent_tasks_failed.inc();
                emitter.event(
                    AgentStage::Failed,
                    format!("Could not stage {} for execution", filename),
                    None,
                );
                return;
            }

            // Backend copy and re-indexing are best-effort; the sandbox copy
            // is authoritative for execution.
            if let Err(e) = self.workspace.write_file(&filename, &code).await {
                warn!("Run {}: backend persistence failed: {}", run_id, e);
                emitter.log(&format!("Warning: could not save {} to backend", filename));
            }
            if let Err(e) = self.index.add_file(&filename, &code).await {
                warn!("Run {}: could not index generated file: {}", run_id, e);
            }

            if emitter.cancelled() {
                return;
            }

            emitter.event(
                AgentStage::Executing,
                format!("Running {} {}", self.config.interpreter, filename),
                None,
            );
            let (exit_code, output) = self.execute(&filename, &emitter).await;

            if emitter.cancelled() {
                return;
            }

            emitter.event(
                AgentStage::Verifying,
                format!("Exit code {}", exit_code),
                None,
            );

            if exit_code == 0 {
                METRICS.agent_attempts_total.with_label_values(&["success"]).inc();
                METRICS.agent_tasks_success.inc();
                METRICS.agent_task_duration.observe(start.elapsed().as_secs_f64());
                info!("Run {} succeeded on attempt {}", run_id, number);
                emitter.event(
                    AgentStage::Succeeded,
                    format!("Attempt {} succeeded", number),
                    Some(1.0),
                );
                emitter.success(&filename, &code);
                return;
            }

            METRICS.agent_attempts_total.with_label_values(&["failure"]).inc();
            emitter.log(&format!(
                "Attempt {} failed with exit code {}",
                number, exit_code
            ));

            let attempt = AgentAttempt {
                number,
                task: current_task.clone(),
                generated_filename: filename,
                generated_code: code,
                outcome: AttemptOutcome::Failure { exit_code, output },
            };
            current_task = amended_task(task, &attempt);
            attempts.push(attempt);
        }

        METRICS.agent_tasks_failed.inc();
        METRICS.agent_task_duration.observe(start.elapsed().as_secs_f64());
        info!(
            "Run {} failed after {} attempts",
            run_id,
            attempts.len()
        );
        emitter.event(
            AgentStage::Failed,
            format!("Max attempts reached ({})", self.config.max_attempts),
            Some(1.0),
        );
    }

    /// Single best-effort planning call; a malformed or failed response is
    /// logged and the loop proceeds without a plan
    async fn plan(&self, task: &str) -> Option<Plan> {
        let prompt = format!(
            "Produce a JSON plan for this coding task with fields \"steps\" \
             (ordered strings), \"files\" (paths to create), and \"command\" \
             (command to run). Respond with JSON only.\n\nTask:\n{}",
            task
        );

        match self.generator.generate(GenerationRequest::new(prompt)).await {
            Ok(text) => match serde_json::from_str::<Plan>(&extract_code(&text)) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!("Discarding malformed plan: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Planning call failed: {}", e);
                None
            }
        }
    }

    /// Retrieve context for the current task text and generate code.
    /// Returns `None` when the response yields nothing executable.
    async fn generate_code(&self, current_task: &str, options: &RunOptions) -> Option<String> {
        let pack = self
            .assembler
            .build_context_pack(PackRequest {
                query: current_task.to_string(),
                chat: options.chat.clone(),
                pinned_files: options.pinned_files.clone(),
                extra_items: diagnostic_items(&options.diagnostics),
            })
            .await;

        debug!(
            "Generation context: {} items, ~{} tokens",
            pack.items.len(),
            pack.estimated_tokens
        );

        let instruction = format!(
            "Write the code for this task. Respond with only code, no prose. \
             The first line must be `{} <name>` naming the output file.\n\nTask:\n{}",
            FILENAME_MARKER, current_task
        );

        let request = GenerationRequest::new(instruction)
            .with_history(vec![ChatMessage::system(pack.system_prompt)]);

        let response = match self.generator.generate(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Generation call failed: {}", e);
                return None;
            }
        };

        let code = extract_code(&response);
        if code.trim().is_empty() {
            return None;
        }
        Some(code)
    }

    /// Run the interpreter against the generated file, streaming output to the
    /// observer while accumulating it for the next attempt
    async fn execute(&self, filename: &str, emitter: &Emitter) -> (i32, String) {
        let mut output = String::new();
        let args = vec![filename.to_string()];

        let exit_code = {
            let mut sink = |chunk: &str| {
                output.push_str(chunk);
                emitter.log(chunk);
            };

            match self
                .sandbox
                .run_command(&self.config.interpreter, &args, &mut sink)
                .await
            {
                Ok(code) => code,
                Err(e) => {
                    warn!("Sandbox execution failed: {}", e);
                    output.push_str(&e.to_string());
                    -1
                }
            }
        };

        (exit_code, output)
    }
}

/// Fold a failed attempt into the next task text. The original task stays the
/// anchor; only the latest failure output is carried forward.
fn amended_task(original: &str, attempt: &AgentAttempt) -> String {
    let output = attempt.failure_output().unwrap_or_default();
    format!(
        "The previous code for task \"{}\" failed with this error: \"{}\". \
         Please fix the code. Ensure the first line is `{} <name>`.",
        original,
        output.trim(),
        FILENAME_MARKER
    )
}

/// First fenced code block if present, else the raw text verbatim
fn extract_code(response: &str) -> String {
    if let Some(start) = response.find("```") {
        let after = &response[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim_end().to_string();
        }
    }
    response.trim().to_string()
}

/// Filename from the first-line marker, if any
fn extract_filename(code: &str) -> Option<String> {
    let first = code.lines().next()?.trim();
    let name = first.strip_prefix(FILENAME_MARKER)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn diagnostic_items(diagnostics: &[String]) -> Vec<ContextItem> {
    diagnostics
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| ContextItem {
            id: format!("diagnostic#{}", index),
            bucket: ContextBucket::Artifacts,
            title: "Diagnostics".to_string(),
            content: text.clone(),
            score: DIAGNOSTIC_SCORE,
            reason: ScoreReason {
                task_affinity: Some(1.0),
                ..ScoreReason::default()
            },
            source: ItemSource {
                kind: SourceKind::Rag,
                reference: None,
            },
        })
        .collect()
}
