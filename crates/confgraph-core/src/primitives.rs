//! # Innate Primitives
//!
//! Hardcoded constants for the confgraph CORE.
//!
//! These primitives are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Naming Primitive**: Shape of module names and callable references.
//! 2. **Resource Primitive**: Where discovery looks and how much it reads.

// =============================================================================
// NAMING
// =============================================================================

/// Separator between the namespace and the local part of a name.
///
/// - `app/web` has namespace `app` and local part `web`.
/// - At most one separator is allowed per name.
pub const NAMESPACE_SEPARATOR: char = '/';

/// Optional keyword prefix accepted on names.
///
/// `:app/web` and `app/web` name the same module; the prefix is dropped on parse.
pub const KEYWORD_PREFIX: char = ':';

/// Maximum length of a module name or callable reference (after prefix removal).
pub const MAX_NAME_LENGTH: usize = 256;

// =============================================================================
// RESOURCES
// =============================================================================

/// Default base name of manifest resources looked up on the search path.
///
/// Discovery reads `<dir>/confgraph-modules.json` and `<dir>/confgraph-modules.toml`.
pub const DEFAULT_RESOURCE_NAME: &str = "confgraph-modules";

/// Maximum size of a single discovered resource (16 MiB).
///
/// Larger manifests are rejected to prevent memory exhaustion.
pub const MAX_RESOURCE_SIZE: u64 = 16 * 1024 * 1024;

/// Top-level TOML key holding an array of module tables.
pub const TOML_MODULE_KEY: &str = "module";
