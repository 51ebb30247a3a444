//! Dependency graph over declared or recorded resources.

use std::collections::{BTreeSet, HashMap, VecDeque};

use sitestack_model::Urn;

use crate::error::{EngineError, EngineResult};
use crate::stack::Stack;

/// A directed acyclic graph of resources; an edge `a -> b` means `a`
/// depends on `b` and must be applied after it.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<Urn>,
    dependencies: HashMap<Urn, BTreeSet<Urn>>,
    dependents: HashMap<Urn, BTreeSet<Urn>>,
}

impl DependencyGraph {
    /// Build the graph of a stack from explicit and property dependencies.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownDependency`] if a declaration depends on
    /// a resource outside the stack and [`EngineError::Cycle`] if the
    /// declarations are cyclic.
    pub fn build(stack: &Stack) -> EngineResult<Self> {
        let mut graph = Self::default();
        for decl in stack.resources() {
            let dependencies = decl.dependencies();
            if let Some(missing) = dependencies.iter().find(|d| !stack.contains(d)) {
                return Err(EngineError::UnknownDependency {
                    urn: decl.urn().clone(),
                    dependency: missing.clone(),
                });
            }
            graph.insert(decl.urn().clone(), dependencies);
        }
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Build a graph from recorded `(urn, dependencies)` pairs.
    ///
    /// Dependencies on resources outside `nodes` are dropped: they were
    /// already deleted or are not part of the operation.
    ///
    /// # Errors
    /// Returns [`EngineError::Cycle`] if the recorded edges are cyclic.
    pub fn from_edges<I>(nodes: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (Urn, BTreeSet<Urn>)>,
    {
        let nodes: Vec<(Urn, BTreeSet<Urn>)> = nodes.into_iter().collect();
        let known: BTreeSet<&Urn> = nodes.iter().map(|(urn, _)| urn).collect();
        let mut graph = Self::default();
        for (urn, dependencies) in &nodes {
            let dependencies = dependencies
                .iter()
                .filter(|d| known.contains(d))
                .cloned()
                .collect();
            graph.insert(urn.clone(), dependencies);
        }
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn insert(&mut self, urn: Urn, dependencies: BTreeSet<Urn>) {
        for dependency in &dependencies {
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .insert(urn.clone());
        }
        self.dependents.entry(urn.clone()).or_default();
        self.dependencies.insert(urn.clone(), dependencies);
        self.nodes.push(urn);
    }

    fn check_acyclic(&self) -> EngineResult<()> {
        let order = self.topological_order();
        if order.len() == self.nodes.len() {
            return Ok(());
        }
        let sorted: BTreeSet<&Urn> = order.iter().collect();
        let cyclic = self
            .nodes
            .iter()
            .filter(|urn| !sorted.contains(urn))
            .cloned()
            .collect();
        Err(EngineError::Cycle(cyclic))
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Urn] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `urn` is a node.
    #[must_use]
    pub fn contains(&self, urn: &Urn) -> bool {
        self.dependencies.contains_key(urn)
    }

    /// Direct dependencies of `urn` (empty for unknown nodes).
    #[must_use]
    pub fn dependencies_of(&self, urn: &Urn) -> BTreeSet<Urn> {
        self.dependencies.get(urn).cloned().unwrap_or_default()
    }

    /// Direct dependents of `urn` (empty for unknown nodes).
    #[must_use]
    pub fn dependents_of(&self, urn: &Urn) -> BTreeSet<Urn> {
        self.dependents.get(urn).cloned().unwrap_or_default()
    }

    /// Nodes ordered so every node comes after its dependencies.
    ///
    /// Ties are broken by insertion order, so the result is deterministic.
    /// Nodes on a cycle are omitted.
    #[must_use]
    pub fn topological_order(&self) -> Vec<Urn> {
        let mut remaining: HashMap<&Urn, usize> = self
            .nodes
            .iter()
            .map(|urn| (urn, self.dependencies.get(urn).map_or(0, BTreeSet::len)))
            .collect();
        let position: HashMap<&Urn, usize> =
            self.nodes.iter().enumerate().map(|(i, u)| (u, i)).collect();

        let mut ready: VecDeque<&Urn> = self
            .nodes
            .iter()
            .filter(|urn| remaining[urn] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(urn) = ready.pop_front() {
            order.push(urn.clone());
            let mut unlocked = Vec::new();
            if let Some(dependents) = self.dependents.get(urn) {
                for dependent in dependents {
                    if let Some(count) = remaining.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            unlocked.push(dependent);
                        }
                    }
                }
            }
            unlocked.sort_by_key(|u| position[u]);
            ready.extend(unlocked);
        }
        order
    }

    /// The same nodes with every edge reversed, for teardown ordering.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut graph = Self::default();
        for urn in self.nodes.iter().rev() {
            graph.insert(urn.clone(), self.dependents_of(urn));
        }
        graph
    }
}
