//! Shared in-memory fakes for integration tests

#![allow(dead_code)]

use assistant_core::agent::{AgentEvent, AgentObserver};
use assistant_core::error::{AssistantError, Result};
use assistant_core::index::Embedder;
use assistant_core::llm::{GenerationRequest, GenerationService};
use assistant_core::sandbox::{OutputSink, Sandbox};
use assistant_core::workspace::{FileEntry, FileKind, WorkspaceFiles};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic bag-of-words embedder: similar texts share buckets, so
/// retrieval ordering is meaningful without a model
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

const DIM: usize = 16;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers can interleave, like a real network call
        tokio::task::yield_now().await;

        let mut vector = vec![0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut h: u32 = 2166136261;
            for b in word.bytes() {
                h ^= b as u32;
                h = h.wrapping_mul(16777619);
            }
            vector[(h as usize) % DIM] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Embedder whose warm-up always fails, leaving the index degraded
pub struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    async fn prepare(&self) -> Result<()> {
        Err(AssistantError::Embedding("model unavailable".to_string()))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AssistantError::Embedding("model unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// In-memory workspace with optional per-path read failures
pub struct FakeWorkspace {
    files: Mutex<HashMap<String, String>>,
    unreadable: HashSet<String>,
    pub writes: Mutex<Vec<(String, String)>>,
    pub fail_writes: bool,
}

impl FakeWorkspace {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: Mutex::new(
                files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            ),
            unreadable: HashSet::new(),
            writes: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn with_unreadable(mut self, paths: &[&str]) -> Self {
        self.unreadable = paths.iter().map(|p| p.to_string()).collect();
        self
    }
}

#[async_trait]
impl WorkspaceFiles for FakeWorkspace {
    async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut paths: Vec<String> = {
            let files = self.files.lock().unwrap();
            files
                .keys()
                .cloned()
                .chain(self.unreadable.iter().cloned())
                .collect()
        };
        paths.sort();
        paths.dedup();

        Ok(paths
            .into_iter()
            .map(|path| FileEntry {
                name: path.rsplit('/').next().unwrap_or(&path).to_string(),
                kind: FileKind::File,
                path,
            })
            .collect())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        if self.unreadable.contains(path) {
            return Err(AssistantError::Workspace(format!("{} unavailable", path)));
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AssistantError::Workspace(format!("{} not found", path)))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        if self.fail_writes {
            return Err(AssistantError::Workspace("backend down".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((path.to_string(), content.to_string()));
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }
}

/// Generation service replaying a fixed script of responses; the last
/// response repeats once the script runs out
pub struct ScriptedGenerator {
    responses: Vec<String>,
    cursor: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.message.clone());
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let index = index.min(self.responses.len().saturating_sub(1));
        Ok(self
            .responses
            .get(index)
            .cloned()
            .unwrap_or_default())
    }
}

/// Sandbox replaying scripted exit codes and streaming a fixed output
pub struct FakeSandbox {
    pub files: Mutex<HashMap<String, String>>,
    exit_codes: Mutex<Vec<i32>>,
    output: String,
    pub runs: Mutex<Vec<(String, Vec<String>)>>,
    pub fail_writes: bool,
}

impl FakeSandbox {
    pub fn new(exit_codes: &[i32], output: &str) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            exit_codes: Mutex::new(exit_codes.to_vec()),
            output: output.to_string(),
            runs: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        if self.fail_writes {
            return Err(AssistantError::Sandbox("filesystem full".to_string()));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| AssistantError::Sandbox(format!("{} not found", path)))
    }

    async fn run_command(
        &self,
        command: &str,
        args: &[String],
        on_output: OutputSink<'_>,
    ) -> Result<i32> {
        self.runs
            .lock()
            .unwrap()
            .push((command.to_string(), args.to_vec()));

        for chunk in self.output.split_inclusive('\n') {
            on_output(chunk);
        }

        let mut codes = self.exit_codes.lock().unwrap();
        let code = if codes.len() > 1 {
            codes.remove(0)
        } else {
            codes.first().copied().unwrap_or(0)
        };
        Ok(code)
    }
}

/// Observer recording everything it is handed
#[derive(Default)]
pub struct RecordingObserver {
    pub logs: Mutex<Vec<String>>,
    pub events: Mutex<Vec<AgentEvent>>,
    pub succeeded: Mutex<Option<(String, String)>>,
}

impl AgentObserver for RecordingObserver {
    fn log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }

    fn event(&self, event: &AgentEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn success(&self, filename: &str, code: &str) {
        *self.succeeded.lock().unwrap() = Some((filename.to_string(), code.to_string()));
    }
}
