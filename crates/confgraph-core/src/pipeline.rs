//! # Build Pipeline
//!
//! Drives one build from discovery to a validated configuration:
//!
//! ```text
//! Discover -> Resolve -> Sort -> Schema -> Init -> Configure -> Validate
//! ```
//!
//! - Single pass, strictly sequential, no retries
//! - The configuration is moved from stage to stage, never shared
//! - The first failure aborts the build and names its module and cause

use crate::collaborator::ConfigCollaborator;
use crate::discovery::{Discovery, discover_definitions};
use crate::graph::{reachable, topological_sort};
use crate::plan::{BuildPlan, Step};
use crate::registry::Registry;
use crate::system::Stage;
use crate::{BoxError, ConfgraphError, ModuleDefinition, RootModule, Schema, Validated};

/// A build pipeline over one discovery source, registry and collaborator.
///
/// Holds only shared references; several builds may run from the same
/// pipeline, each with its own discovery pass and configuration.
pub struct Pipeline<'a, K: ConfigCollaborator> {
    discovery: &'a dyn Discovery,
    registry: &'a Registry<K::Config>,
    collaborator: &'a K,
}

impl<'a, K: ConfigCollaborator> Pipeline<'a, K> {
    /// Create a pipeline.
    #[must_use]
    pub fn new(
        discovery: &'a dyn Discovery,
        registry: &'a Registry<K::Config>,
        collaborator: &'a K,
    ) -> Self {
        Self {
            discovery,
            registry,
            collaborator,
        }
    }

    /// Run Discover, Resolve and Sort for `root` without invoking any callback.
    pub fn plan(&self, root: impl Into<RootModule>) -> Result<BuildPlan, ConfgraphError> {
        let root = root.into();
        let mut candidates = discover_definitions(self.discovery)?;

        let root_definition = match root {
            RootModule::Name(name) => match candidates.get(&name) {
                Some(definition) => definition.clone(),
                None => return Err(ConfgraphError::ModuleNameNotFound { name }),
            },
            RootModule::Inline(definition) => {
                if candidates.contains(&definition.name) {
                    return Err(ConfgraphError::ModuleAlreadyDeclared {
                        name: definition.name,
                    });
                }
                candidates.insert(definition.clone())?;
                definition
            }
        };
        tracing::info!(
            stage = Stage::Discover.name(),
            candidates = candidates.len(),
            "module definitions discovered"
        );

        let active = reachable(candidates.definitions(), &root_definition);
        tracing::info!(
            stage = Stage::Resolve.name(),
            active = active.len(),
            "reachable modules resolved"
        );

        let order = topological_sort(&active)?;
        tracing::info!(
            stage = Stage::Sort.name(),
            order = ?order.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "modules ordered"
        );

        Ok(BuildPlan::new(root_definition.name, order))
    }

    /// Build and validate the configuration for `root`.
    pub fn build_config(
        &self,
        root: impl Into<RootModule>,
        blank: K::Config,
        strict: bool,
    ) -> Result<Validated<K::Config>, ConfgraphError> {
        let root = root.into();
        let span = tracing::info_span!("build_config", root = %root.name(), strict);
        let _guard = span.enter();

        let plan = self.plan(root)?;
        self.execute(&plan, blank, strict)
    }

    /// Run the Schema, Init, Configure and Validate stages of a plan.
    pub fn execute(
        &self,
        plan: &BuildPlan,
        blank: K::Config,
        strict: bool,
    ) -> Result<Validated<K::Config>, ConfgraphError> {
        let schemas = self.collect_schemas(plan)?;
        let mut config = self
            .collaborator
            .init_config(blank, &schemas)
            .map_err(|source| ConfgraphError::ConfigInitFailed { source })?;
        tracing::info!(
            stage = Stage::Schema.name(),
            schemas = schemas.len(),
            "configuration initialized"
        );

        for stage in [Stage::Init, Stage::Configure] {
            let steps = plan.steps(stage);
            let count = steps.len();
            for step in steps {
                config = self.invoke(step, config)?;
            }
            tracing::info!(stage = stage.name(), steps = count, "stage complete");
        }

        let validated = self
            .collaborator
            .validate(config, strict)
            .map_err(|source| ConfgraphError::ValidationFailed { source })?;

        if !validated.is_valid() {
            if strict {
                return Err(ConfgraphError::ValidationFailed {
                    source: validated.diagnostics.join("; ").into(),
                });
            }
            tracing::warn!(
                diagnostics = validated.diagnostics.len(),
                "configuration returned with validation problems"
            );
        }
        tracing::info!(stage = Stage::Validate.name(), modules = plan.len(), "build complete");

        Ok(validated)
    }

    /// Invoke every schema function, dropping empty results and structural repeats.
    fn collect_schemas(&self, plan: &BuildPlan) -> Result<Vec<Schema>, ConfgraphError> {
        let mut schemas: Vec<Schema> = Vec::new();

        for step in plan.steps(Stage::Schema) {
            let Step::Schema { definition, schema } = step else {
                continue;
            };
            tracing::debug!(%step, "running schema function");

            let produced = self
                .registry
                .schema(schema)
                .map_err(BoxError::from)
                .and_then(|schema_fn| schema_fn())
                .map_err(|source| ConfgraphError::SchemaError {
                    module: definition.name.clone(),
                    definition: Box::new(definition.clone()),
                    schema: schema.clone(),
                    source,
                })?;

            if let Some(data) = produced.filter(|data| !data.is_null()) {
                if !schemas.contains(&data) {
                    schemas.push(data);
                }
            }
        }

        Ok(schemas)
    }

    /// Apply an init or configure step to the configuration.
    ///
    /// Schema steps never touch the configuration.
    fn invoke(&self, step: Step<'_>, config: K::Config) -> Result<K::Config, ConfgraphError> {
        tracing::debug!(%step, "running step");
        match step {
            Step::Schema { .. } => Ok(config),
            Step::Initialize {
                definition,
                initializer,
            } => self
                .collaborator
                .apply_initializer(config, initializer)
                .map_err(|source| ConfgraphError::InitializerError {
                    module: definition.name.clone(),
                    definition: boxed(definition),
                    initializer: initializer.clone(),
                    source,
                }),
            Step::Configure {
                definition,
                configure,
            } => {
                let wrap = |source: BoxError| ConfgraphError::ConfigureError {
                    module: definition.name.clone(),
                    definition: boxed(definition),
                    configure: configure.clone(),
                    source,
                };
                let configure_fn = self
                    .registry
                    .configure(configure)
                    .map_err(|e| wrap(e.into()))?;
                configure_fn(config).map_err(wrap)
            }
        }
    }
}

fn boxed(definition: &ModuleDefinition) -> Box<ModuleDefinition> {
    Box::new(definition.clone())
}

/// Build a configuration in one call.
///
/// Equivalent to `Pipeline::new(discovery, registry, collaborator).build_config(root, blank, strict)`.
pub fn build_config<K: ConfigCollaborator>(
    discovery: &dyn Discovery,
    registry: &Registry<K::Config>,
    collaborator: &K,
    root: impl Into<RootModule>,
    blank: K::Config,
    strict: bool,
) -> Result<Validated<K::Config>, ConfgraphError> {
    Pipeline::new(discovery, registry, collaborator).build_config(root, blank, strict)
}

// =============================================================================
// TESTS
// =============================================================================
