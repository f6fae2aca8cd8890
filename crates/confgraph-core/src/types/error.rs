//! # Error Types
//!
//! Every failure of a build is a `ConfgraphError` variant with a fixed,
//! structured payload. Causes raised by callbacks are kept as `#[source]`.

use super::{CallableRef, Initializer, ModuleDefinition, ModuleName, NameError};
use crate::system::Stage;
use thiserror::Error;

/// Error type returned by every externally supplied callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn join_names(names: &[ModuleName], separator: &str) -> String {
    names
        .iter()
        .map(ModuleName::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Errors raised while resolving modules or running the build pipeline.
///
/// - No silent failures: every stage fails fast with one of these
/// - Definitions are boxed to keep the `Result` small
#[derive(Debug, Error)]
pub enum ConfgraphError {
    /// A raw record is not a valid module definition.
    #[error("invalid module definition{}: {reason}", name.as_deref().map(|n| format!(" `{n}`")).unwrap_or_default())]
    InvalidDefinition {
        /// Name of the definition, when one could be read.
        name: Option<String>,
        /// Which field is wrong and why.
        reason: String,
        /// The offending raw record.
        raw: Box<serde_json::Value>,
    },

    /// Two structurally different definitions share a name.
    #[error("module `{name}` is defined more than once with different contents")]
    DuplicateDefinition {
        name: ModuleName,
        /// The previously known definition followed by the conflicting one.
        conflicting: Vec<ModuleDefinition>,
    },

    /// An inline root definition collides with a discovered module.
    #[error("module `{name}` is already declared by a discovered definition")]
    ModuleAlreadyDeclared { name: ModuleName },

    /// The requested root module does not exist.
    #[error("no module named `{name}` was found")]
    ModuleNameNotFound { name: ModuleName },

    /// A discovery resource could not be read or decoded.
    #[error("cannot load module resource {resource}: {reason}")]
    Resource { resource: String, reason: String },

    /// A module depends on names that are not defined.
    #[error("module `{module}` depends on undefined module(s): {}", join_names(missing, ", "))]
    MissingModule {
        module: ModuleName,
        missing: Vec<ModuleName>,
    },

    /// The active dependency graph contains a cycle.
    #[error("circular dependency: {}", join_names(cycle, " -> "))]
    CircularDependency {
        /// Every module that could not be ordered, sorted by name.
        modules: Vec<ModuleName>,
        /// One concrete cycle, first name repeated at the end.
        cycle: Vec<ModuleName>,
    },

    /// A schema function is unregistered or failed.
    #[error("schema {schema} of module `{module}` failed: {source}")]
    SchemaError {
        module: ModuleName,
        definition: Box<ModuleDefinition>,
        schema: CallableRef,
        #[source]
        source: BoxError,
    },

    /// The collaborator rejected the merged schemas.
    #[error("cannot initialize configuration from schemas: {source}")]
    ConfigInitFailed {
        #[source]
        source: BoxError,
    },

    /// An initializer failed during the init phase.
    #[error("initializer ({initializer}) of module `{module}` failed: {source}")]
    InitializerError {
        module: ModuleName,
        definition: Box<ModuleDefinition>,
        initializer: Initializer,
        #[source]
        source: BoxError,
    },

    /// A configure function is unregistered or failed.
    #[error("configure {configure} of module `{module}` failed: {source}")]
    ConfigureError {
        module: ModuleName,
        definition: Box<ModuleDefinition>,
        configure: CallableRef,
        #[source]
        source: BoxError,
    },

    /// Strict final validation failed.
    #[error("configuration is invalid: {source}")]
    ValidationFailed {
        #[source]
        source: BoxError,
    },
}

impl ConfgraphError {
    /// The pipeline stage this failure belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            ConfgraphError::InvalidDefinition { .. }
            | ConfgraphError::DuplicateDefinition { .. }
            | ConfgraphError::ModuleAlreadyDeclared { .. }
            | ConfgraphError::ModuleNameNotFound { .. }
            | ConfgraphError::Resource { .. } => Stage::Discover,
            ConfgraphError::MissingModule { .. } | ConfgraphError::CircularDependency { .. } => {
                Stage::Sort
            }
            ConfgraphError::SchemaError { .. } | ConfgraphError::ConfigInitFailed { .. } => {
                Stage::Schema
            }
            ConfgraphError::InitializerError { .. } => Stage::Init,
            ConfgraphError::ConfigureError { .. } => Stage::Configure,
            ConfgraphError::ValidationFailed { .. } => Stage::Validate,
        }
    }

    /// Build an `InvalidDefinition` for a raw record.
    pub(crate) fn invalid(raw: &serde_json::Value, reason: impl Into<String>) -> Self {
        let name = raw
            .get("name")
            .and_then(serde_json::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        ConfgraphError::InvalidDefinition {
            name,
            reason: reason.into(),
            raw: Box::new(raw.clone()),
        }
    }
}

/// Errors raised by the callable registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registration key is not a valid callable reference.
    #[error("invalid callable key {key:?}: {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: NameError,
    },

    /// A function is already registered under this key.
    #[error("callable {0} is already registered")]
    AlreadyRegistered(CallableRef),

    /// No function is registered under this key.
    #[error("no callable registered as {0}")]
    Unregistered(CallableRef),
}
