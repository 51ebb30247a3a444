//! Plan and apply engine for SiteStack.
//!
//! A [`Stack`] collects resource declarations. The engine derives a
//! [`DependencyGraph`] from explicit `depends_on` options and from the
//! resources every [`Output`](sitestack_model::Output) reads, compares the
//! resolved properties with the last [`Checkpoint`], and drives a
//! [`Provider`] to converge:
//!
//! ```text
//! Stack --build--> DependencyGraph --+--> Planner (preview)
//!                                    |
//!                                    +--> Engine::up --> Provider
//!                                              |
//!                                              v
//!                                         StateStore (Checkpoint)
//! ```
//!
//! Independent resources are applied concurrently; a resource starts only
//! after every resource it depends on has completed.

pub mod engine;
pub mod error;
pub mod graph;
pub mod memory;
pub mod plan;
pub mod provider;
pub mod stack;
pub mod state;

pub use engine::{Engine, UpdateSummary};
pub use error::{EngineError, EngineResult, StateError};
pub use graph::DependencyGraph;
pub use memory::{CallPhase, InMemoryProvider};
pub use plan::{Operation, Plan, Step};
pub use provider::{CreateResult, Provider, ProviderError};
pub use stack::{ResourceDeclaration, ResourceOptions, ResourceRef, Stack};
pub use state::{Checkpoint, FileStateStore, MemoryStateStore, ResourceState, StateStore};
