//! # confgraph-core
//!
//! The deterministic module resolver and staged build pipeline for confgraph.
//!
//! Applications declare configuration modules as plain data. Each module
//! names its dependencies and the callbacks that contribute to one shared
//! configuration. Starting from a root module, this crate:
//!
//! 1. discovers every candidate definition from a `Discovery` source
//! 2. keeps only the modules transitively required by the root
//! 3. orders them dependencies first, failing on missing or circular dependencies
//! 4. drives a `ConfigCollaborator` through schema, init, configure and
//!    validate phases
//!
//! ## Architectural Constraints
//!
//! - Single-threaded, single pass: no async, no retries, no caching between builds
//! - Deterministic: BTreeMap/BTreeSet only, ties broken by module name
//! - Closed: callbacks live in an explicit `Registry`, never loaded dynamically
//! - Format-agnostic: the core never looks inside the configuration

// =============================================================================
// MODULES
// =============================================================================

pub mod collaborator;
pub mod definition;
pub mod discovery;
pub mod graph;
pub mod pipeline;
pub mod plan;
pub mod primitives;
pub mod registry;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BoxError, CallableRef, ConfgraphError, Initializer, ModuleDefinition, ModuleName, NameError,
    RegistryError, RootModule, Schema, Validated,
};

// =============================================================================
// RE-EXPORTS: Resolution
// =============================================================================

pub use definition::DefinitionValidator;
pub use discovery::{
    DefinitionSet, DirectoryDiscovery, Discovery, Resource, ResourceFormat, StaticDiscovery,
    decode_resource, discover_definitions, toml_to_json,
};
pub use graph::{ModuleGraph, reachable, topological_sort, validate_dependencies};

// =============================================================================
// RE-EXPORTS: Build Pipeline
// =============================================================================

pub use collaborator::ConfigCollaborator;
pub use pipeline::{Pipeline, build_config};
pub use plan::{BuildPlan, Step};
pub use registry::{ConfigureFn, Registry, SchemaFn};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::Stage;
