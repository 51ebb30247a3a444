//! Engine error types.

use std::path::PathBuf;

use sitestack_model::{ModelError, Urn};

use crate::plan::Operation;
use crate::provider::ProviderError;

/// Errors raised while loading or saving a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Filesystem failure.
    #[error("checkpoint I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint is not valid JSON of the expected shape.
    #[error("malformed checkpoint: {0}")]
    Json(#[from] serde_json::Error),

    /// The checkpoint was written by an incompatible format version.
    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },
}

/// Errors raised while building, planning, or applying a stack.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Two declarations share a URN.
    #[error("resource {0} is declared more than once")]
    DuplicateResource(Urn),

    /// Two exports share a name.
    #[error("stack output {0:?} is exported more than once")]
    DuplicateOutput(String),

    /// A declaration depends on a resource that is not part of the stack.
    #[error("{urn} depends on {dependency}, which is not declared in this stack")]
    UnknownDependency {
        /// The dependent resource.
        urn: Urn,
        /// The missing dependency.
        dependency: Urn,
    },

    /// The declarations form a dependency cycle.
    #[error(
        "dependency cycle among: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    Cycle(Vec<Urn>),

    /// Declaration, resolution, or validation failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A provider call failed.
    #[error("{operation} {urn} failed: {source}")]
    Provider {
        /// The resource being changed.
        urn: Urn,
        /// The attempted operation.
        operation: Operation,
        /// Provider error.
        #[source]
        source: ProviderError,
    },

    /// Checkpoint persistence failure.
    #[error(transparent)]
    State(#[from] StateError),

    /// The checkpoint belongs to a different project or stack.
    #[error("checkpoint belongs to {found}, not {expected}")]
    StackMismatch {
        /// `<project>/<stack>` of the program.
        expected: String,
        /// `<project>/<stack>` recorded in the checkpoint.
        found: String,
    },

    /// A stack output could not be computed after apply.
    #[error("stack output {name:?} could not be resolved: {source}")]
    Output {
        /// Output name.
        name: String,
        /// Resolution error.
        #[source]
        source: ModelError,
    },

    /// A resource task panicked or was cancelled.
    #[error("resource task aborted: {0}")]
    TaskAborted(String),
}

/// Convenience result type for the engine.
pub type EngineResult<T> = Result<T, EngineError>;
