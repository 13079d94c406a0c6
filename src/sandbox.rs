//! Sandboxed execution environment contract
//!
//! The runtime that actually executes generated code lives outside the core.
//! This interface treats it as a process-execution oracle: write a file, run a
//! command against it, stream the output, read back an integer exit code.

use crate::error::Result;
use async_trait::async_trait;

/// Incremental consumer of interleaved stdout/stderr output
pub type OutputSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Sandboxed filesystem plus process execution
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Write a file into the sandbox filesystem
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Read a file back from the sandbox filesystem
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Run `command args...`, streaming output chunks as they arrive.
    /// Returns the process exit code.
    async fn run_command(
        &self,
        command: &str,
        args: &[String],
        on_output: OutputSink<'_>,
    ) -> Result<i32>;
}
