//! Applying and destroying stacks.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use sitestack_model::{Output, OutputContext, ResourceProps, Urn, attrs};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::plan::{self, Operation, Plan, Teardown, assign_bucket_name, compare};
use crate::provider::Provider;
use crate::stack::Stack;
use crate::state::{Checkpoint, ResourceState, StateStore};

/// Outcome of an update or destroy.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    /// Number of resources per operation.
    pub changes: BTreeMap<Operation, usize>,
    /// Stack outputs after the update.
    pub outputs: BTreeMap<String, String>,
    /// Wall-clock time spent.
    #[serde(skip)]
    pub duration: Duration,
}

impl UpdateSummary {
    /// Number of resources that went through `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.changes.get(&operation).copied().unwrap_or(0)
    }

    /// Number of resources the provider was asked to change.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.changes
            .iter()
            .filter(|(op, _)| op.is_mutation())
            .map(|(_, n)| n)
            .sum()
    }

    fn record(&mut self, operation: Operation) {
        *self.changes.entry(operation).or_insert(0) += 1;
    }
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.outputs.is_empty() {
            writeln!(f, "Outputs:")?;
            let width = self.outputs.keys().map(String::len).max().unwrap_or(0);
            for (name, value) in &self.outputs {
                writeln!(f, "    {name:<width$}: {value:?}")?;
            }
            writeln!(f)?;
        }
        let parts: Vec<String> = self
            .changes
            .iter()
            .map(|(op, n)| match op {
                Operation::Create => format!("{n} created"),
                Operation::Update => format!("{n} updated"),
                Operation::Replace => format!("{n} replaced"),
                Operation::Delete => format!("{n} deleted"),
                Operation::Same => format!("{n} unchanged"),
            })
            .collect();
        if parts.is_empty() {
            write!(f, "Resources: no changes")?;
        } else {
            write!(f, "Resources: {}", parts.join(", "))?;
        }
        write!(f, "\nDuration: {:.1}s", self.duration.as_secs_f64())
    }
}

/// Drives a [`Provider`] to make the recorded state match a [`Stack`].
#[derive(Debug, Clone)]
pub struct Engine {
    provider: Arc<dyn Provider>,
    store: Arc<dyn StateStore>,
}

/// Work for one declared resource.
struct ApplyJob {
    props: Output<ResourceProps>,
    dependencies: BTreeSet<Urn>,
    prior: Option<ResourceState>,
}

/// Result of applying one declared resource.
struct Applied {
    operation: Operation,
    state: ResourceState,
    replaced: Option<ResourceState>,
}

impl Engine {
    /// Create an engine.
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn StateStore>) -> Self {
        Self { provider, store }
    }

    /// The provider resources are applied with.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Compute what [`up`](Self::up) would do without calling the provider.
    ///
    /// # Errors
    /// Fails on an invalid graph, an unreadable or foreign checkpoint, or
    /// invalid known properties.
    pub async fn preview(&self, stack: &Stack) -> EngineResult<Plan> {
        let graph = DependencyGraph::build(stack)?;
        let checkpoint = self.load_for(stack).await?;
        plan::preview(stack, &graph, &checkpoint)
    }

    /// Create, update, replace, and delete resources until the recorded
    /// state matches `stack`, then compute the stack outputs.
    ///
    /// Each resource starts as soon as all of its dependencies have
    /// completed. After the first failure no new resources are started, the
    /// ones in flight are awaited, and the checkpoint is saved with every
    /// change that did happen.
    ///
    /// # Errors
    /// Returns the first resource failure, or a graph, validation, or
    /// checkpoint error.
    pub async fn up(&self, stack: &Stack) -> EngineResult<UpdateSummary> {
        let started = Instant::now();
        let graph = DependencyGraph::build(stack)?;
        let mut checkpoint = self.load_for(stack).await?;
        info!(
            stack = %checkpoint.label(),
            resources = graph.len(),
            "starting update"
        );

        let mut summary = UpdateSummary::default();
        let result = self
            .converge(stack, &graph, &mut checkpoint, &mut summary)
            .await;
        summary.duration = started.elapsed();
        self.finish(result, &mut checkpoint, summary).await
    }

    /// Delete every recorded resource, dependents first.
    ///
    /// # Errors
    /// Returns the first deletion failure or a checkpoint error.
    pub async fn destroy(&self) -> EngineResult<UpdateSummary> {
        let started = Instant::now();
        let Some(mut checkpoint) = self.store.load().await? else {
            info!("nothing to destroy");
            return Ok(UpdateSummary::default());
        };
        info!(
            stack = %checkpoint.label(),
            resources = checkpoint.resources.len(),
            "starting destroy"
        );

        let states: Vec<ResourceState> = checkpoint
            .pending_deletes
            .iter()
            .chain(&checkpoint.resources)
            .cloned()
            .collect();
        let mut summary = UpdateSummary::default();
        let result = match Teardown::new(states) {
            Ok(teardown) => {
                self.teardown(teardown, &mut checkpoint, &mut summary)
                    .await
            }
            Err(e) => Err(e),
        };
        if result.is_ok() {
            checkpoint.outputs.clear();
        }
        summary.duration = started.elapsed();
        self.finish(result, &mut checkpoint, summary).await
    }

    /// Stack outputs recorded by the last successful update.
    ///
    /// # Errors
    /// Returns a checkpoint error.
    pub async fn outputs(&self) -> EngineResult<BTreeMap<String, String>> {
        Ok(self
            .store
            .load()
            .await?
            .map(|c| c.outputs)
            .unwrap_or_default())
    }

    async fn load_for(&self, stack: &Stack) -> EngineResult<Checkpoint> {
        match self.store.load().await? {
            Some(checkpoint)
                if checkpoint.project != stack.project() || checkpoint.stack != stack.name() =>
            {
                Err(EngineError::StackMismatch {
                    expected: format!("{}/{}", stack.project(), stack.name()),
                    found: checkpoint.label(),
                })
            }
            Some(checkpoint) => Ok(checkpoint),
            None => Ok(Checkpoint::new(stack.project(), stack.name())),
        }
    }

    /// Save the checkpoint whatever the outcome, then report the outcome.
    async fn finish(
        &self,
        result: EngineResult<()>,
        checkpoint: &mut Checkpoint,
        mut summary: UpdateSummary,
    ) -> EngineResult<UpdateSummary> {
        checkpoint.updated_at = Some(Utc::now());
        let saved = self.store.save(checkpoint).await;

        match (result, saved) {
            (Ok(()), Ok(())) => {
                summary.outputs.clone_from(&checkpoint.outputs);
                info!(
                    mutations = summary.mutations(),
                    elapsed_ms = summary.duration.as_millis(),
                    "update complete"
                );
                Ok(summary)
            }
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(e), saved) => {
                if let Err(save_error) = saved {
                    error!(error = %save_error, "failed to save checkpoint after failed update");
                }
                Err(e)
            }
        }
    }

    async fn converge(
        &self,
        stack: &Stack,
        graph: &DependencyGraph,
        checkpoint: &mut Checkpoint,
        summary: &mut UpdateSummary,
    ) -> EngineResult<()> {
        let ctx = Arc::new(RwLock::new(OutputContext::new()));
        let jobs: HashMap<Urn, ApplyJob> = stack
            .resources()
            .iter()
            .map(|decl| {
                let job = ApplyJob {
                    props: decl.props().clone(),
                    dependencies: decl.dependencies(),
                    prior: checkpoint.get(decl.urn()).cloned(),
                };
                (decl.urn().clone(), job)
            })
            .collect();

        let provider = Arc::clone(&self.provider);
        let shared = Arc::clone(&ctx);
        run_graph(
            graph,
            jobs,
            |urn, job| apply_resource(Arc::clone(&provider), Arc::clone(&shared), urn, job),
            |applied: Applied| {
                summary.record(applied.operation);
                if let Some(old) = applied.replaced {
                    checkpoint.pending_deletes.push(old);
                }
                checkpoint.upsert(applied.state);
            },
        )
        .await?;

        let teardown = Teardown::for_removed(stack, checkpoint)?;
        self.teardown(teardown, checkpoint, summary).await?;

        let ctx = ctx.read();
        let mut outputs = BTreeMap::new();
        for (name, value) in stack.exports() {
            let value = value.resolve(&ctx).map_err(|source| EngineError::Output {
                name: name.clone(),
                source,
            })?;
            outputs.insert(name.clone(), value);
        }
        checkpoint.outputs = outputs;
        Ok(())
    }

    async fn teardown(
        &self,
        teardown: Teardown,
        checkpoint: &mut Checkpoint,
        summary: &mut UpdateSummary,
    ) -> EngineResult<()> {
        if teardown.graph().is_empty() {
            return Ok(());
        }
        let (graph, jobs) = teardown.into_parts();
        let provider = Arc::clone(&self.provider);

        run_graph(
            &graph,
            jobs,
            |urn, states| delete_resource(Arc::clone(&provider), urn, states),
            |deleted: Vec<ResourceState>| {
                for state in deleted {
                    let pending = checkpoint
                        .pending_deletes
                        .iter()
                        .position(|p| p.urn == state.urn && p.id == state.id);
                    if let Some(index) = pending {
                        checkpoint.pending_deletes.remove(index);
                    } else if checkpoint.get(&state.urn).is_some_and(|r| r.id == state.id) {
                        checkpoint.remove(&state.urn);
                        summary.record(Operation::Delete);
                    }
                }
            },
        )
        .await
    }
}

/// Resolve, diff, and apply one declared resource.
async fn apply_resource(
    provider: Arc<dyn Provider>,
    ctx: Arc<RwLock<OutputContext>>,
    urn: Urn,
    job: ApplyJob,
) -> EngineResult<Applied> {
    let resolved = {
        let ctx = ctx.read();
        job.props.resolve(&ctx)
    };
    let mut props = resolved?;
    assign_bucket_name(&mut props, &urn, job.prior.as_ref(), true);
    props.validate()?;

    let (operation, changed) = compare(&props, job.prior.as_ref());
    let failed = |source| EngineError::Provider {
        urn: urn.clone(),
        operation,
        source,
    };

    let (id, mut outputs, replaced) = match job.prior {
        Some(prior) if operation == Operation::Same => {
            debug!(urn = %urn, "unchanged");
            (prior.id, prior.outputs, None)
        }
        Some(prior) if operation == Operation::Update => {
            info!(urn = %urn, changed = ?changed, "updating");
            let published = provider
                .update(&urn, &prior.id, &prior.props, &props)
                .await
                .map_err(failed)?;
            let mut outputs = prior.outputs;
            outputs.extend(published);
            (prior.id, outputs, None)
        }
        prior => {
            if prior.is_some() {
                info!(urn = %urn, changed = ?changed, "replacing");
            } else {
                info!(urn = %urn, "creating");
            }
            let created = provider.create(&urn, &props).await.map_err(failed)?;
            (created.id, created.outputs, prior)
        }
    };
    outputs
        .entry(attrs::ID.to_owned())
        .or_insert_with(|| id.clone());

    ctx.write().insert(urn.clone(), outputs.clone());
    if operation.is_mutation() {
        info!(urn = %urn, id = %id, %operation, "resource applied");
    }

    Ok(Applied {
        operation,
        state: ResourceState {
            urn,
            id,
            props,
            outputs,
            dependencies: job.dependencies,
        },
        replaced,
    })
}

/// Delete every recorded instance of one URN, oldest first.
async fn delete_resource(
    provider: Arc<dyn Provider>,
    urn: Urn,
    states: Vec<ResourceState>,
) -> EngineResult<Vec<ResourceState>> {
    for state in &states {
        info!(urn = %urn, id = %state.id, "deleting");
        provider
            .delete(&urn, &state.id, &state.props)
            .await
            .map_err(|source| EngineError::Provider {
                urn: urn.clone(),
                operation: Operation::Delete,
                source,
            })?;
    }
    Ok(states)
}

/// Run one job per graph node, starting each as soon as its dependencies
/// have finished. Nodes without a job complete immediately.
///
/// After the first failure no further jobs are started; jobs in flight are
/// awaited and their results still passed to `finish`.
async fn run_graph<J, T, F, Fut>(
    graph: &DependencyGraph,
    mut jobs: HashMap<Urn, J>,
    mut start: F,
    mut finish: impl FnMut(T),
) -> EngineResult<()>
where
    F: FnMut(Urn, J) -> Fut,
    Fut: Future<Output = EngineResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut waiting: HashMap<Urn, usize> = graph
        .nodes()
        .iter()
        .map(|urn| (urn.clone(), graph.dependencies_of(urn).len()))
        .collect();
    let mut ready: VecDeque<Urn> = graph
        .topological_order()
        .into_iter()
        .filter(|urn| waiting.get(urn) == Some(&0))
        .collect();
    let mut tasks: JoinSet<(Urn, EngineResult<T>)> = JoinSet::new();
    let mut first_error: Option<EngineError> = None;

    loop {
        if first_error.is_none() {
            while let Some(urn) = ready.pop_front() {
                match jobs.remove(&urn) {
                    Some(job) => {
                        let task = start(urn.clone(), job);
                        tasks.spawn(async move { (urn, task.await) });
                    }
                    None => unlock(graph, &urn, &mut waiting, &mut ready),
                }
            }
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        match joined {
            Ok((urn, Ok(value))) => {
                finish(value);
                unlock(graph, &urn, &mut waiting, &mut ready);
            }
            Ok((urn, Err(e))) => {
                error!(urn = %urn, error = %e, "resource failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(join_error) => {
                warn!(error = %join_error, "resource task aborted");
                if first_error.is_none() {
                    first_error = Some(EngineError::TaskAborted(join_error.to_string()));
                }
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

fn unlock(
    graph: &DependencyGraph,
    urn: &Urn,
    waiting: &mut HashMap<Urn, usize>,
    ready: &mut VecDeque<Urn>,
) {
    for dependent in graph.dependents_of(urn) {
        if let Some(count) = waiting.get_mut(&dependent) {
            *count -= 1;
            if *count == 0 {
                ready.push_back(dependent);
            }
        }
    }
}
