//! Context assembly: merging chat, pinned files, and retrieval into one
//! ranked, size-bounded prompt payload per query

pub mod assembler;
pub mod models;
pub mod token_estimator;

pub use assembler::{ContextAssembler, PackRequest};
pub use models::{ContextBucket, ContextItem, ContextPack, ItemSource, ScoreReason, SourceKind};
pub use token_estimator::TokenEstimator;
