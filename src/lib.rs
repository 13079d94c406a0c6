//! Core engine for an in-browser coding assistant
//!
//! Two subsystems carry the weight here: a session-local semantic code index
//! (chunking, embeddings, nearest-neighbor retrieval, context packing) and an
//! autonomous agent controller that generates, runs, and repairs code in a
//! bounded retry loop. Everything else — editors, auth, settings, the sandbox
//! runtime itself — lives outside and is consumed through the narrow contracts
//! in [`workspace`] and [`sandbox`].

pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod llm;
pub mod metrics;
pub mod sandbox;
pub mod workspace;

pub use agent::{AgentController, AgentObserver, RunOptions};
pub use config::Config;
pub use context::{ContextAssembler, ContextPack, PackRequest};
pub use error::{AssistantError, Result};
pub use index::EmbeddingIndex;
pub use llm::{GenerationRequest, GenerationService, HttpGenerationClient};
pub use sandbox::Sandbox;
pub use workspace::{FileEntry, FileKind, WorkspaceFiles};

/// Install a tracing subscriber honoring `RUST_LOG`. Safe to call once at
/// session start; subsequent calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
