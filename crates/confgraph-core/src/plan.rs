//! # Build Plan
//!
//! The resolved, dependency-first module order of one build, and the exact
//! callback steps each phase will run.
//!
//! Steps form a closed set: a schema call, an initializer application, or a
//! configure call. The pipeline dispatches on them with `match`.

use crate::system::Stage;
use crate::{CallableRef, Initializer, ModuleDefinition, ModuleName};
use serde::Serialize;
use std::fmt;

/// One callback invocation of a build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// Invoke a module's schema function.
    Schema {
        definition: &'a ModuleDefinition,
        schema: &'a CallableRef,
    },
    /// Apply one of a module's initializers.
    Initialize {
        definition: &'a ModuleDefinition,
        initializer: &'a Initializer,
    },
    /// Invoke a module's configure function.
    Configure {
        definition: &'a ModuleDefinition,
        configure: &'a CallableRef,
    },
}

impl<'a> Step<'a> {
    /// The module this step belongs to.
    #[must_use]
    pub fn definition(&self) -> &'a ModuleDefinition {
        match *self {
            Step::Schema { definition, .. }
            | Step::Initialize { definition, .. }
            | Step::Configure { definition, .. } => definition,
        }
    }

    /// The phase this step runs in.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Step::Schema { .. } => Stage::Schema,
            Step::Initialize { .. } => Stage::Init,
            Step::Configure { .. } => Stage::Configure,
        }
    }
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Schema { definition, schema } => {
                write!(f, "{}: schema {}", definition.name, schema)
            }
            Step::Initialize {
                definition,
                initializer,
            } => write!(f, "{}: init {}", definition.name, initializer),
            Step::Configure {
                definition,
                configure,
            } => write!(f, "{}: configure {}", definition.name, configure),
        }
    }
}

/// The resolved module order for one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    root: ModuleName,
    order: Vec<ModuleDefinition>,
}

impl BuildPlan {
    /// Create a plan from a dependency-first order.
    #[must_use]
    pub fn new(root: ModuleName, order: Vec<ModuleDefinition>) -> Self {
        Self { root, order }
    }

    /// The root module.
    #[must_use]
    pub fn root(&self) -> &ModuleName {
        &self.root
    }

    /// Dependency-first order (schema and init phases).
    #[must_use]
    pub fn init_order(&self) -> &[ModuleDefinition] {
        &self.order
    }

    /// Dependents-first order (configure phase).
    pub fn configure_order(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.order.iter().rev()
    }

    /// Number of active modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no module is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The callback steps of a phase, in execution order.
    ///
    /// Stages that run no callbacks have no steps.
    #[must_use]
    pub fn steps(&self, stage: Stage) -> Vec<Step<'_>> {
        match stage {
            Stage::Schema => self
                .order
                .iter()
                .filter_map(|definition| {
                    definition
                        .schema
                        .as_ref()
                        .map(|schema| Step::Schema { definition, schema })
                })
                .collect(),
            Stage::Init => self
                .order
                .iter()
                .flat_map(|definition| {
                    definition
                        .inits
                        .iter()
                        .map(move |initializer| Step::Initialize {
                            definition,
                            initializer,
                        })
                })
                .collect(),
            Stage::Configure => self
                .configure_order()
                .filter_map(|definition| {
                    definition
                        .configure
                        .as_ref()
                        .map(|configure| Step::Configure {
                            definition,
                            configure,
                        })
                })
                .collect(),
            Stage::Discover | Stage::Resolve | Stage::Sort | Stage::Validate => Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn name(s: &str) -> ModuleName {
        ModuleName::parse(s).expect("name")
    }

    fn callable(s: &str) -> CallableRef {
        CallableRef::parse(s).expect("callable")
    }

    fn sample_plan() -> BuildPlan {
        let db = ModuleDefinition::new(name("db"))
            .with_schema(callable("db/schema"))
            .with_init(Initializer::Script(PathBuf::from("db.json")))
            .with_init(Initializer::Call(callable("db/seed")))
            .with_configure(callable("db/configure"));
        let app = ModuleDefinition::new(name("app"))
            .depends_on(name("db"))
            .with_init(Initializer::Literal(serde_json::json!({"debug": true})))
            .with_configure(callable("app/configure"));
        BuildPlan::new(name("app"), vec![db, app])
    }

    #[test]
    fn schema_steps_follow_dependency_order() {
        let plan = sample_plan();
        let steps = plan.steps(Stage::Schema);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].definition().name, name("db"));
        assert_eq!(steps[0].stage(), Stage::Schema);
    }

    #[test]
    fn init_steps_keep_declared_order() {
        let plan = sample_plan();
        let rendered: Vec<_> = plan
            .steps(Stage::Init)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            rendered,
            vec![
                "db: init script db.json",
                "db: init call db/seed",
                "app: init value {\"debug\":true}",
            ]
        );
    }

    #[test]
    fn configure_steps_run_dependents_first() {
        let plan = sample_plan();
        let modules: Vec<_> = plan
            .steps(Stage::Configure)
            .iter()
            .map(|step| step.definition().name.as_str())
            .collect();
        assert_eq!(modules, vec!["app", "db"]);
    }

    #[test]
    fn non_callback_stages_have_no_steps() {
        let plan = sample_plan();
        for stage in [Stage::Discover, Stage::Resolve, Stage::Sort, Stage::Validate] {
            assert!(plan.steps(stage).is_empty());
        }
    }

    #[test]
    fn orders_are_mirrors() {
        let plan = sample_plan();
        let forward: Vec<_> = plan.init_order().iter().map(|d| d.name.as_str()).collect();
        let mut backward: Vec<_> = plan.configure_order().map(|d| d.name.as_str()).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(plan.len(), 2);
        assert!(!plan.is_empty());
        assert_eq!(plan.root(), &name("app"));
    }
}
