//! # Property-Based Tests
//!
//! Ordering and reachability invariants over random dependency graphs.
//!
//! Graphs are generated acyclic by only letting module `i` depend on
//! modules with a smaller index.

use confgraph_core::{ConfgraphError, ModuleDefinition, ModuleName, reachable, topological_sort};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn module_name(index: usize) -> ModuleName {
    ModuleName::parse(&format!("m{index:03}")).expect("generated name")
}

/// Turn `(count, raw edges)` into a DAG of definitions.
fn dag(count: usize, edges: &[(usize, usize)]) -> Vec<ModuleDefinition> {
    let mut definitions: Vec<ModuleDefinition> = (0..count)
        .map(|i| ModuleDefinition::new(module_name(i)))
        .collect();
    for &(a, b) in edges {
        let (from, to) = (a % count, b % count);
        if from > to {
            definitions[from] = definitions[from].clone().depends_on(module_name(to));
        }
    }
    definitions
}

fn dag_strategy() -> impl Strategy<Value = Vec<ModuleDefinition>> {
    (1usize..24, vec((0usize..64, 0usize..64), 0..60))
        .prop_map(|(count, edges)| dag(count, &edges))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every module is placed after all of its dependencies.
    #[test]
    fn sorted_order_respects_dependencies(definitions in dag_strategy()) {
        let sorted = topological_sort(&definitions).expect("acyclic");
        prop_assert_eq!(sorted.len(), definitions.len());

        let position: BTreeMap<&ModuleName, usize> =
            sorted.iter().enumerate().map(|(i, d)| (&d.name, i)).collect();
        for definition in &sorted {
            for dependency in &definition.dependencies {
                prop_assert!(position[dependency] < position[&definition.name]);
            }
        }
    }

    /// Input order never changes the result.
    #[test]
    fn sorted_order_independent_of_input_order(
        definitions in dag_strategy(),
        rotation in 0usize..24,
    ) {
        let mut shuffled = definitions.clone();
        let len = shuffled.len();
        shuffled.rotate_left(rotation % len);
        shuffled.reverse();

        let first = topological_sort(&definitions).expect("acyclic");
        let second = topological_sort(&shuffled).expect("acyclic");
        prop_assert_eq!(first, second);
    }

    /// The reachable set contains the root and is closed under dependencies.
    #[test]
    fn reachable_set_is_closed(definitions in dag_strategy(), pick in 0usize..24) {
        let root = &definitions[pick % definitions.len()];
        let active = reachable(&definitions, root);

        prop_assert!(active.iter().any(|d| d.name == root.name));
        for definition in &active {
            for dependency in &definition.dependencies {
                prop_assert!(active.iter().any(|d| &d.name == dependency));
            }
        }
        prop_assert!(topological_sort(&active).is_ok());
    }

    /// Closing any dependency chain into a loop is always detected.
    #[test]
    fn back_edge_creates_cycle(len in 2usize..12) {
        let mut definitions: Vec<ModuleDefinition> = (0..len)
            .map(|i| {
                let definition = ModuleDefinition::new(module_name(i));
                if i + 1 < len {
                    definition.depends_on(module_name(i + 1))
                } else {
                    definition.depends_on(module_name(0))
                }
            })
            .collect();
        definitions.reverse();

        match topological_sort(&definitions) {
            Err(ConfgraphError::CircularDependency { modules, cycle }) => {
                prop_assert_eq!(modules.len(), len);
                prop_assert_eq!(cycle.len(), len + 1);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected CircularDependency, got {:?}", other),
        }
    }
}
