//! Checkpoints: the recorded result of the last apply.
//!
//! A checkpoint maps every applied URN to its provider id, the properties
//! it was applied with, the attributes it published, and the resources it
//! depended on. It is the only input besides the program that planning
//! needs, and it is rewritten after every apply, successful or not.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sitestack_core::SiteStackConfig;
use sitestack_model::{Attributes, OutputContext, ResourceProps, Urn};
use tracing::debug;

use crate::error::StateError;

/// Checkpoint format version written by this build.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Recorded state of one applied resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceState {
    /// Resource URN.
    pub urn: Urn,
    /// Provider-assigned identifier.
    pub id: String,
    /// Properties the resource was last applied with.
    pub props: ResourceProps,
    /// Attributes the provider published.
    #[serde(default)]
    pub outputs: Attributes,
    /// Resources this one depended on when it was applied.
    #[serde(default)]
    pub dependencies: BTreeSet<Urn>,
}

/// Recorded state of a whole stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Format version.
    pub version: u32,
    /// Project name.
    pub project: String,
    /// Stack name.
    pub stack: String,
    /// Time of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Applied resources, in the order they completed.
    #[serde(default)]
    pub resources: Vec<ResourceState>,
    /// Replaced resources whose old instance still has to be deleted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_deletes: Vec<ResourceState>,
    /// Stack outputs of the last successful apply.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl Checkpoint {
    /// An empty checkpoint.
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            project: project.into(),
            stack: stack.into(),
            updated_at: None,
            resources: Vec::new(),
            pending_deletes: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// `<project>/<stack>`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}/{}", self.project, self.stack)
    }

    /// Recorded state of a resource.
    #[must_use]
    pub fn get(&self, urn: &Urn) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.urn == *urn)
    }

    /// Record a resource, replacing an earlier entry for the same URN in place.
    pub fn upsert(&mut self, state: ResourceState) {
        match self.resources.iter_mut().find(|r| r.urn == state.urn) {
            Some(slot) => *slot = state,
            None => self.resources.push(state),
        }
    }

    /// Forget a resource.
    pub fn remove(&mut self, urn: &Urn) -> Option<ResourceState> {
        let index = self.resources.iter().position(|r| r.urn == *urn)?;
        Some(self.resources.remove(index))
    }

    /// Whether nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.pending_deletes.is_empty()
    }

    /// Published attributes of every recorded resource.
    #[must_use]
    pub fn output_context(&self) -> OutputContext {
        let mut ctx = OutputContext::new();
        for resource in &self.resources {
            ctx.insert(resource.urn.clone(), resource.outputs.clone());
        }
        ctx
    }
}

/// Persistence for checkpoints of one stack.
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Load the checkpoint, or `None` if the stack was never applied.
    async fn load(&self) -> Result<Option<Checkpoint>, StateError>;

    /// Replace the stored checkpoint.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StateError>;
}

/// Stores the checkpoint as a JSON file.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// checkpoint, so a crash never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<state_dir>/<project>.<stack>.json`.
    #[must_use]
    pub fn for_config(config: &SiteStackConfig) -> Self {
        Self::new(config.state_file())
    }

    /// Checkpoint path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StateError + '_ {
    move |source| StateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<Checkpoint>, StateError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&self.path)(e)),
        };

        let header: VersionHeader = serde_json::from_slice(&raw)?;
        if header.version != CHECKPOINT_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: header.version,
                expected: CHECKPOINT_VERSION,
            });
        }
        let checkpoint = serde_json::from_slice(&raw)?;
        debug!(path = %self.path.display(), "loaded checkpoint");
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StateError> {
        let json = serde_json::to_vec_pretty(checkpoint)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        debug!(
            path = %self.path.display(),
            resources = checkpoint.resources.len(),
            "saved checkpoint"
        );
        Ok(())
    }
}

/// Keeps the checkpoint in memory; used by tests and previews of throwaway stacks.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: Mutex<Option<Checkpoint>>,
}

impl MemoryStateStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored checkpoint, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Checkpoint> {
        self.inner.lock().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<Checkpoint>, StateError> {
        Ok(self.inner.lock().clone())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StateError> {
        *self.inner.lock() = Some(checkpoint.clone());
        Ok(())
    }
}
