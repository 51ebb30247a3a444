//! Previewing the changes an apply would make.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use sitestack_model::validation::MAX_BUCKET_NAME_LEN;
use sitestack_model::{DiffKind, ResourceProps, Urn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::graph::DependencyGraph;
use crate::stack::Stack;
use crate::state::{Checkpoint, ResourceState};

/// Length of the random suffix of generated bucket names.
const AUTONAME_SUFFIX_LEN: usize = 7;

/// What happens to one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a new resource.
    Create,
    /// Change the resource in place.
    Update,
    /// Create a replacement, then delete the old resource.
    Replace,
    /// Delete a resource that is no longer declared.
    Delete,
    /// Nothing to do.
    Same,
}

impl Operation {
    /// Short marker used in plan listings.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "+-",
            Self::Delete => "-",
            Self::Same => " ",
        }
    }

    /// Whether the operation calls the provider.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Same)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::Same => "same",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One planned change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Resource URN.
    pub urn: Urn,
    /// Planned operation.
    pub operation: Operation,
    /// Properties that differ from the checkpoint.
    pub changed: Vec<&'static str>,
    /// Desired properties, or `None` while they depend on unapplied resources.
    pub props: Option<ResourceProps>,
}

/// Ordered list of planned changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Project name.
    pub project: String,
    /// Stack name.
    pub stack: String,
    /// Steps in execution order; deletions come last.
    pub steps: Vec<Step>,
}

impl Plan {
    /// Number of steps per operation.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Operation, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.operation).or_insert(0) += 1;
        }
        counts
    }

    /// Whether applying the plan would call the provider at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.steps.iter().any(|s| s.operation.is_mutation())
    }

    /// The step for a resource.
    #[must_use]
    pub fn step(&self, urn: &Urn) -> Option<&Step> {
        self.steps.iter().find(|s| s.urn == *urn)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Previewing update ({}/{}):", self.project, self.stack)?;
        for step in &self.steps {
            write!(
                f,
                "  {:<2} {:<64} {:<32} {}",
                step.operation.symbol(),
                step.urn.kind(),
                step.urn.name(),
                step.operation
            )?;
            if !step.changed.is_empty() {
                write!(f, " [diff: {}]", step.changed.join(", "))?;
            }
            writeln!(f)?;
        }
        let summary: Vec<String> = self
            .counts()
            .into_iter()
            .map(|(op, n)| match op {
                Operation::Same => format!("{n} unchanged"),
                Operation::Create => format!("{n} to create"),
                Operation::Update => format!("{n} to update"),
                Operation::Replace => format!("{n} to replace"),
                Operation::Delete => format!("{n} to delete"),
            })
            .collect();
        write!(f, "Resources: {}", summary.join(", "))
    }
}

/// Generate a bucket name `<logical>-<7 hex chars>` that satisfies S3 naming rules.
#[must_use]
pub fn autoname(logical: &str) -> String {
    let mut base: String = logical
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    base.truncate(MAX_BUCKET_NAME_LEN - AUTONAME_SUFFIX_LEN - 1);
    let base = match base.trim_matches('-') {
        "" => "bucket",
        trimmed => trimmed,
    };
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &suffix[..AUTONAME_SUFFIX_LEN])
}

/// Fill in an empty bucket name with the recorded one, or with a generated
/// one when `generate` is set. Other kinds are left untouched.
pub(crate) fn assign_bucket_name(
    props: &mut ResourceProps,
    urn: &Urn,
    prior: Option<&ResourceState>,
    generate: bool,
) {
    let ResourceProps::Bucket(args) = props else {
        return;
    };
    if !args.bucket.is_empty() {
        return;
    }
    if let Some(ResourceProps::Bucket(recorded)) = prior.map(|p| &p.props) {
        args.bucket.clone_from(&recorded.bucket);
    } else if generate {
        args.bucket = autoname(urn.name());
    }
}

/// Decide the operation for resolved `props` against the recorded state.
pub(crate) fn compare(
    props: &ResourceProps,
    prior: Option<&ResourceState>,
) -> (Operation, Vec<&'static str>) {
    let Some(prior) = prior else {
        return (Operation::Create, Vec::new());
    };
    let diff = props.diff(&prior.props);
    let operation = match diff.kind {
        DiffKind::Same => Operation::Same,
        DiffKind::Update => Operation::Update,
        DiffKind::Replace => Operation::Replace,
    };
    (operation, diff.changed)
}

/// Recorded resources that have to be deleted, ordered dependents first.
#[derive(Debug)]
pub(crate) struct Teardown {
    graph: DependencyGraph,
    states: HashMap<Urn, Vec<ResourceState>>,
}

impl Teardown {
    /// Group `states` by URN and order them for deletion.
    ///
    /// A URN can appear more than once when a replaced instance is still
    /// pending deletion; such instances are deleted in the given order.
    pub(crate) fn new(states: impl IntoIterator<Item = ResourceState>) -> EngineResult<Self> {
        let mut order: Vec<Urn> = Vec::new();
        let mut grouped: HashMap<Urn, Vec<ResourceState>> = HashMap::new();
        for state in states {
            let entry = grouped.entry(state.urn.clone()).or_default();
            if entry.is_empty() {
                order.push(state.urn.clone());
            }
            entry.push(state);
        }

        let edges = order.iter().map(|urn| {
            let dependencies: BTreeSet<Urn> = grouped[urn]
                .iter()
                .flat_map(|s| s.dependencies.iter().cloned())
                .collect();
            (urn.clone(), dependencies)
        });
        let graph = DependencyGraph::from_edges(edges)?.reversed();
        Ok(Self {
            graph,
            states: grouped,
        })
    }

    /// Removed resources and stale replaced instances of a checkpoint.
    pub(crate) fn for_removed(stack: &Stack, checkpoint: &Checkpoint) -> EngineResult<Self> {
        let states = checkpoint
            .pending_deletes
            .iter()
            .chain(
                checkpoint
                    .resources
                    .iter()
                    .filter(|r| !stack.contains(&r.urn)),
            )
            .cloned();
        Self::new(states)
    }

    /// Deletion graph: an edge `a -> b` means `a` is deleted after `b`.
    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Instances recorded for a URN.
    pub(crate) fn states(&self, urn: &Urn) -> &[ResourceState] {
        self.states.get(urn).map(Vec::as_slice).unwrap_or_default()
    }

    /// Split into the deletion graph and the instances per URN.
    pub(crate) fn into_parts(self) -> (DependencyGraph, HashMap<Urn, Vec<ResourceState>>) {
        (self.graph, self.states)
    }

    /// Every instance in deletion order.
    pub(crate) fn ordered(&self) -> Vec<&ResourceState> {
        self.graph
            .topological_order()
            .iter()
            .flat_map(|urn| self.states(urn))
            .collect()
    }
}

/// Compute the plan for applying `stack` on top of `checkpoint`.
///
/// Values that depend on resources which are about to be created or
/// replaced are not known yet; such steps carry `props: None`.
///
/// # Errors
/// Returns [`EngineError::Model`](crate::EngineError::Model) if a known value
/// fails validation or a transform fails.
pub fn preview(
    stack: &Stack,
    graph: &DependencyGraph,
    checkpoint: &Checkpoint,
) -> EngineResult<Plan> {
    let mut ctx = checkpoint.output_context();
    let mut steps = Vec::with_capacity(graph.len());

    for urn in graph.topological_order() {
        let Some(decl) = stack.get(&urn) else {
            continue;
        };
        let prior = checkpoint.get(&urn);

        match decl.props().resolve(&ctx) {
            Ok(mut props) => {
                assign_bucket_name(&mut props, &urn, prior, false);
                validate_unnamed(&props, &urn)?;
                let (operation, changed) = compare(&props, prior);
                if matches!(operation, Operation::Create | Operation::Replace) {
                    ctx.remove(&urn);
                }
                steps.push(Step {
                    urn,
                    operation,
                    changed,
                    props: Some(props),
                });
            }
            Err(e) if e.is_unknown() => {
                let operation = if prior.is_some() {
                    Operation::Update
                } else {
                    Operation::Create
                };
                steps.push(Step {
                    urn,
                    operation,
                    changed: Vec::new(),
                    props: None,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let teardown = Teardown::for_removed(stack, checkpoint)?;
    steps.extend(teardown.ordered().into_iter().map(|state| Step {
        urn: state.urn.clone(),
        operation: Operation::Delete,
        changed: Vec::new(),
        props: Some(state.props.clone()),
    }));

    Ok(Plan {
        project: stack.project().to_owned(),
        stack: stack.name().to_owned(),
        steps,
    })
}

/// Validate props whose bucket name will only be generated at apply time
/// by checking a representative generated name.
fn validate_unnamed(props: &ResourceProps, urn: &Urn) -> EngineResult<()> {
    match props {
        ResourceProps::Bucket(args) if args.bucket.is_empty() => {
            let mut candidate = props.clone();
            assign_bucket_name(&mut candidate, urn, None, true);
            candidate.validate()?;
        }
        _ => props.validate()?,
    }
    Ok(())
}
