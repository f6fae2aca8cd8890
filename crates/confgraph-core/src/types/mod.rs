//! # Core Type Definitions
//!
//! This module contains the value types of the confgraph resolver:
//! - Identifiers (`ModuleName`, `CallableRef`) and their syntax errors (`NameError`)
//! - Module records (`ModuleDefinition`, `Initializer`, `RootModule`)
//! - Pipeline output (`Validated`)
//! - Error types (`ConfgraphError`, in the `error` submodule)
//!
//! ## Determinism Guarantees
//!
//! - Identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! - Dependency sets are `BTreeSet`, so two definitions listing the same
//!   dependencies in a different order are structurally equal

mod error;

pub use error::{BoxError, ConfgraphError, RegistryError};

use crate::primitives::{KEYWORD_PREFIX, MAX_NAME_LENGTH, NAMESPACE_SEPARATOR};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Schema data produced by a module's schema function.
///
/// The core never looks inside; it only collects and hands it to the collaborator.
pub type Schema = serde_json::Value;

// =============================================================================
// NAME SYNTAX
// =============================================================================

/// Why a string is not a valid module name or callable reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name is empty (or only a keyword prefix).
    #[error("name is empty")]
    Empty,

    /// The name exceeds `MAX_NAME_LENGTH`.
    #[error("name is {len} characters long, maximum is {max}")]
    TooLong { len: usize, max: usize },

    /// The name contains a forbidden character.
    #[error("name contains invalid character {0:?}")]
    InvalidCharacter(char),

    /// The namespace separator is misplaced or repeated.
    #[error("name must have the form `namespace/local` or `local`")]
    MalformedNamespace,
}

/// Check symbol syntax and return the normalized form (keyword prefix dropped).
fn parse_symbol(raw: &str) -> Result<String, NameError> {
    let symbol = raw.strip_prefix(KEYWORD_PREFIX).unwrap_or(raw);

    if symbol.is_empty() {
        return Err(NameError::Empty);
    }

    let len = symbol.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(NameError::TooLong {
            len,
            max: MAX_NAME_LENGTH,
        });
    }

    if let Some(bad) = symbol.chars().find(|c| {
        c.is_whitespace() || c.is_control() || *c == KEYWORD_PREFIX || "\"',;()[]{}`".contains(*c)
    }) {
        return Err(NameError::InvalidCharacter(bad));
    }

    let separators = symbol.matches(NAMESPACE_SEPARATOR).count();
    if separators > 1
        || symbol.starts_with(NAMESPACE_SEPARATOR)
        || symbol.ends_with(NAMESPACE_SEPARATOR)
    {
        return Err(NameError::MalformedNamespace);
    }

    Ok(symbol.to_string())
}

fn split_namespace(symbol: &str) -> (Option<&str>, &str) {
    match symbol.split_once(NAMESPACE_SEPARATOR) {
        Some((ns, local)) => (Some(ns), local),
        None => (None, symbol),
    }
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Globally unique name of a module, e.g. `app/web`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    /// Parse a module name, dropping an optional leading `:`.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        parse_symbol(raw).map(Self)
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace part, if the name has one.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        split_namespace(&self.0).0
    }

    /// The local part (the whole name when there is no namespace).
    #[must_use]
    pub fn local(&self) -> &str {
        split_namespace(&self.0).1
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Registry key of a schema, configure or initializer function.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CallableRef(String);

impl CallableRef {
    /// Parse a callable reference using module-name syntax.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        parse_symbol(raw).map(Self)
    }

    /// Get the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CallableRef {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// INITIALIZER
// =============================================================================

/// A one-shot descriptor applied during the init phase.
///
/// The core never interprets these; the configuration collaborator does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// A file to load.
    Script(PathBuf),
    /// A registered callable.
    Call(CallableRef),
    /// A literal structured value.
    #[serde(rename = "value")]
    Literal(serde_json::Value),
    /// A compound literal form.
    Form(Vec<serde_json::Value>),
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initializer::Script(path) => write!(f, "script {}", path.display()),
            Initializer::Call(callable) => write!(f, "call {}", callable),
            Initializer::Literal(value) => write!(f, "value {}", value),
            Initializer::Form(items) => write!(f, "form of {} item(s)", items.len()),
        }
    }
}

// =============================================================================
// MODULE DEFINITION
// =============================================================================

/// A named configuration unit with dependencies and optional hooks.
///
/// Equality is structural; it is what discovery uses to tell a harmless
/// repeat from a conflicting duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDefinition {
    /// Unique module name.
    pub name: ModuleName,
    /// Names of the modules this one depends on.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<ModuleName>,
    /// Registry key of the zero-argument schema function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<CallableRef>,
    /// Registry key of the `(config) -> config` function.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure: Option<CallableRef>,
    /// Initializers, applied in this order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inits: Vec<Initializer>,
}

impl ModuleDefinition {
    /// Create a definition with no dependencies and no hooks.
    #[must_use]
    pub fn new(name: ModuleName) -> Self {
        Self {
            name,
            dependencies: BTreeSet::new(),
            schema: None,
            configure: None,
            inits: Vec::new(),
        }
    }

    /// Add a dependency.
    #[must_use]
    pub fn depends_on(mut self, dependency: ModuleName) -> Self {
        self.dependencies.insert(dependency);
        self
    }

    /// Set the schema function reference.
    #[must_use]
    pub fn with_schema(mut self, schema: CallableRef) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Set the configure function reference.
    #[must_use]
    pub fn with_configure(mut self, configure: CallableRef) -> Self {
        self.configure = Some(configure);
        self
    }

    /// Append an initializer.
    #[must_use]
    pub fn with_init(mut self, initializer: Initializer) -> Self {
        self.inits.push(initializer);
        self
    }
}

// =============================================================================
// ROOT MODULE
// =============================================================================

/// The module a build starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootModule {
    /// A module that must exist among the discovered definitions.
    Name(ModuleName),
    /// A definition supplied by the caller, added to the discovered set.
    Inline(ModuleDefinition),
}

impl RootModule {
    /// The root's module name.
    #[must_use]
    pub fn name(&self) -> &ModuleName {
        match self {
            RootModule::Name(name) => name,
            RootModule::Inline(definition) => &definition.name,
        }
    }
}

impl From<ModuleName> for RootModule {
    fn from(name: ModuleName) -> Self {
        RootModule::Name(name)
    }
}

impl From<ModuleDefinition> for RootModule {
    fn from(definition: ModuleDefinition) -> Self {
        RootModule::Inline(definition)
    }
}

// =============================================================================
// VALIDATED OUTPUT
// =============================================================================

/// The configuration returned by final validation, with its diagnostics.
///
/// In strict mode `diagnostics` is empty whenever a value is returned at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<C> {
    /// The final configuration (possibly invalid in lenient mode).
    pub config: C,
    /// Problems reported by the collaborator's validation.
    pub diagnostics: Vec<String>,
}

impl<C> Validated<C> {
    /// A configuration that passed validation.
    #[must_use]
    pub fn valid(config: C) -> Self {
        Self {
            config,
            diagnostics: Vec::new(),
        }
    }

    /// A configuration returned together with validation problems.
    #[must_use]
    pub fn with_diagnostics(config: C, diagnostics: Vec<String>) -> Self {
        Self {
            config,
            diagnostics,
        }
    }

    /// True when validation reported no problems.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_prefix_is_dropped() {
        let a = ModuleName::parse(":app/web").expect("name");
        let b = ModuleName::parse("app/web").expect("name");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "app/web");
    }

    #[test]
    fn namespace_and_local_parts() {
        let name = ModuleName::parse("app/web").expect("name");
        assert_eq!(name.namespace(), Some("app"));
        assert_eq!(name.local(), "web");

        let bare = ModuleName::parse("web").expect("name");
        assert_eq!(bare.namespace(), None);
        assert_eq!(bare.local(), "web");
    }

    #[test]
    fn malformed_names_rejected() {
        assert_eq!(ModuleName::parse(""), Err(NameError::Empty));
        assert_eq!(ModuleName::parse(":"), Err(NameError::Empty));
        assert_eq!(
            ModuleName::parse("a b"),
            Err(NameError::InvalidCharacter(' '))
        );
        assert_eq!(
            ModuleName::parse("a/b/c"),
            Err(NameError::MalformedNamespace)
        );
        assert_eq!(ModuleName::parse("/a"), Err(NameError::MalformedNamespace));
        assert_eq!(ModuleName::parse("a/"), Err(NameError::MalformedNamespace));
        assert_eq!(
            ModuleName::parse("::a"),
            Err(NameError::InvalidCharacter(':'))
        );
    }

    #[test]
    fn overlong_name_rejected() {
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            ModuleName::parse(&long),
            Err(NameError::TooLong { .. })
        ));
        assert!(ModuleName::parse(&"x".repeat(MAX_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn dependency_order_does_not_affect_equality() {
        let a = ModuleName::parse("a").expect("name");
        let b = ModuleName::parse("b").expect("name");
        let root = ModuleName::parse("root").expect("name");

        let first = ModuleDefinition::new(root.clone())
            .depends_on(a.clone())
            .depends_on(b.clone());
        let second = ModuleDefinition::new(root).depends_on(b).depends_on(a);
        assert_eq!(first, second);
    }

    #[test]
    fn definition_serializes_compactly() {
        let def = ModuleDefinition::new(ModuleName::parse("a").expect("name"))
            .with_init(Initializer::Literal(serde_json::json!({"k": 1})));
        let json = serde_json::to_value(&def).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"name": "a", "inits": [{"value": {"k": 1}}]})
        );
    }

    #[test]
    fn root_module_name() {
        let name = ModuleName::parse("app").expect("name");
        let by_name = RootModule::from(name.clone());
        let inline = RootModule::from(ModuleDefinition::new(name.clone()));
        assert_eq!(by_name.name(), &name);
        assert_eq!(inline.name(), &name);
    }

    #[test]
    fn validated_reports_validity() {
        assert!(Validated::valid(1).is_valid());
        assert!(!Validated::with_diagnostics(1, vec!["bad".to_string()]).is_valid());
    }
}
