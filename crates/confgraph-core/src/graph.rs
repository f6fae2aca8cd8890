//! # Graph Resolver
//!
//! Dependency graph operations over module definitions.
//!
//! All structures use `BTreeMap`/`BTreeSet`, so every result is a pure function
//! of the definition set: the same definitions in any discovery order produce
//! the same reachable set, the same cycle report and the same ordering.
//!
//! ## Ordering rule
//!
//! `topological_sort` is Kahn's algorithm with a sorted ready set: among the
//! modules whose dependencies are all placed, the smallest name comes first.

use crate::discovery::DefinitionSet;
use crate::{ConfgraphError, ModuleDefinition, ModuleName};
use std::collections::{BTreeMap, BTreeSet, VecDeque, btree_set};

// =============================================================================
// MODULE GRAPH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Directed graph of module names: `name -> dependency`.
///
/// Built fresh for each resolution. Edges to undefined names are kept so that
/// validation can report them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleGraph {
    /// Adjacency list: module -> its dependencies
    edges: BTreeMap<ModuleName, BTreeSet<ModuleName>>,
}

impl ModuleGraph {
    /// Build the graph of `definitions`.
    #[must_use]
    pub fn build(definitions: &[ModuleDefinition]) -> Self {
        let mut edges: BTreeMap<ModuleName, BTreeSet<ModuleName>> = BTreeMap::new();
        for definition in definitions {
            edges
                .entry(definition.name.clone())
                .or_default()
                .extend(definition.dependencies.iter().cloned());
        }
        Self { edges }
    }

    /// Check if a module is a node of the graph.
    #[must_use]
    pub fn contains(&self, name: &ModuleName) -> bool {
        self.edges.contains_key(name)
    }

    /// All nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &ModuleName> {
        self.edges.keys()
    }

    /// Direct dependencies of a module, in name order.
    pub fn dependencies_of(&self, name: &ModuleName) -> btree_set::Iter<'_, ModuleName> {
        self.dependency_iter(name)
    }

    /// Modules that directly depend on `name`, in name order.
    #[must_use]
    pub fn dependents_of(&self, name: &ModuleName) -> Vec<&ModuleName> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(name))
            .map(|(module, _)| module)
            .collect()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of edges, including edges to undefined names.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Find one cycle, if the graph has any.
    ///
    /// Returns the cycle as a path whose last element repeats the first,
    /// e.g. `[a, b, a]`. Edges to undefined names are ignored.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<ModuleName>> {
        let mut state: BTreeMap<&ModuleName, Visit> = BTreeMap::new();

        for start in self.edges.keys() {
            if state.contains_key(start) {
                continue;
            }

            let mut path: Vec<&ModuleName> = vec![start];
            let mut stack: Vec<btree_set::Iter<'_, ModuleName>> = vec![self.dependency_iter(start)];
            state.insert(start, Visit::InProgress);

            while let Some(children) = stack.last_mut() {
                let Some(child) = children.next() else {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        state.insert(done, Visit::Done);
                    }
                    continue;
                };

                if !self.contains(child) {
                    continue;
                }

                match state.get(child) {
                    Some(Visit::InProgress) => {
                        let from = path.iter().position(|node| *node == child).unwrap_or(0);
                        let mut cycle: Vec<ModuleName> =
                            path[from..].iter().map(|node| (*node).clone()).collect();
                        cycle.push(child.clone());
                        return Some(cycle);
                    }
                    Some(Visit::Done) => {}
                    None => {
                        state.insert(child, Visit::InProgress);
                        path.push(child);
                        stack.push(self.dependency_iter(child));
                    }
                }
            }
        }

        None
    }

    fn dependency_iter(&self, name: &ModuleName) -> btree_set::Iter<'_, ModuleName> {
        static NO_DEPENDENCIES: BTreeSet<ModuleName> = BTreeSet::new();
        self.edges.get(name).unwrap_or(&NO_DEPENDENCIES).iter()
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Verify that names are unique and every dependency is defined.
///
/// Fails with `DuplicateDefinition` or `MissingModule`. When several modules
/// have missing dependencies, the first in name order is reported.
pub fn validate_dependencies(definitions: &[ModuleDefinition]) -> Result<(), ConfgraphError> {
    let set = DefinitionSet::from_definitions(definitions)?;
    check_dependencies(&set)
}

fn check_dependencies(set: &DefinitionSet) -> Result<(), ConfgraphError> {
    for name in set.names() {
        let Some(definition) = set.get(name) else {
            continue;
        };
        let missing: Vec<ModuleName> = definition
            .dependencies
            .iter()
            .filter(|dependency| !set.contains(dependency))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConfgraphError::MissingModule {
                module: definition.name.clone(),
                missing,
            });
        }
    }
    Ok(())
}

/// The root's transitive dependency closure, root included.
///
/// Breadth-first over dependency edges. The result keeps the order of `all`;
/// undefined dependency names are skipped (validation reports them later).
#[must_use]
pub fn reachable(all: &[ModuleDefinition], root: &ModuleDefinition) -> Vec<ModuleDefinition> {
    let mut index: BTreeMap<&ModuleName, &ModuleDefinition> = BTreeMap::new();
    for definition in all {
        index.entry(&definition.name).or_insert(definition);
    }

    let mut visited: BTreeSet<&ModuleName> = BTreeSet::new();
    let mut queue: VecDeque<&ModuleDefinition> = VecDeque::new();
    visited.insert(&root.name);
    queue.push_back(index.get(&root.name).copied().unwrap_or(root));

    while let Some(current) = queue.pop_front() {
        for dependency in &current.dependencies {
            if visited.contains(dependency) {
                continue;
            }
            if let Some(&definition) = index.get(dependency) {
                visited.insert(dependency);
                queue.push_back(definition);
            }
        }
    }

    let mut result = Vec::with_capacity(visited.len());
    if !index.contains_key(&root.name) {
        result.push(root.clone());
    }
    let mut emitted: BTreeSet<&ModuleName> = BTreeSet::new();
    for definition in all {
        if visited.contains(&definition.name) && emitted.insert(&definition.name) {
            result.push(definition.clone());
        }
    }
    result
}

/// Order definitions dependency-first.
///
/// Every definition appears after all of its dependencies. Fails with
/// `DuplicateDefinition` or `MissingModule` before ordering, and with
/// `CircularDependency` (no partial order) when a cycle remains.
pub fn topological_sort(
    definitions: &[ModuleDefinition],
) -> Result<Vec<ModuleDefinition>, ConfgraphError> {
    let set = DefinitionSet::from_definitions(definitions)?;
    check_dependencies(&set)?;

    let mut pending: BTreeMap<&ModuleName, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&ModuleName, Vec<&ModuleName>> = BTreeMap::new();
    let mut ready: BTreeSet<&ModuleName> = BTreeSet::new();

    for definition in set.definitions() {
        pending.insert(&definition.name, definition.dependencies.len());
        if definition.dependencies.is_empty() {
            ready.insert(&definition.name);
        }
        for dependency in &definition.dependencies {
            dependents
                .entry(dependency)
                .or_default()
                .push(&definition.name);
        }
    }

    let mut order = Vec::with_capacity(set.len());
    while let Some(next) = ready.pop_first() {
        if let Some(definition) = set.get(next) {
            order.push(definition.clone());
        }
        for dependent in dependents.get(next).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() < set.len() {
        let placed: BTreeSet<&ModuleName> = order.iter().map(|d| &d.name).collect();
        let modules: Vec<ModuleName> = set
            .names()
            .filter(|name| !placed.contains(name))
            .cloned()
            .collect();
        let cycle = ModuleGraph::build(set.definitions())
            .find_cycle()
            .unwrap_or_else(|| modules.clone());
        tracing::debug!(unresolved = modules.len(), "dependency cycle detected");
        return Err(ConfgraphError::CircularDependency { modules, cycle });
    }

    Ok(order)
}

// =============================================================================
// TESTS
// =============================================================================
