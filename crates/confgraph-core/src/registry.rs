//! # Callable Registry
//!
//! Explicit mapping from `CallableRef` keys to schema and configure functions.
//!
//! The registry is populated once at startup and only read afterwards; a
//! module's `schema` / `configure` reference is looked up here by key. A
//! missing key is not an error of its own: the phase that needed it reports it.

use crate::{BoxError, CallableRef, RegistryError, Schema};
use std::collections::BTreeMap;
use std::fmt;

/// A zero-argument function producing optional schema data.
pub type SchemaFn = Box<dyn Fn() -> Result<Option<Schema>, BoxError> + Send + Sync>;

/// A `(config) -> config` transformation.
pub type ConfigureFn<C> = Box<dyn Fn(C) -> Result<C, BoxError> + Send + Sync>;

/// Schema and configure functions keyed by reference.
///
/// `C` is the configuration type the configure functions operate on.
pub struct Registry<C> {
    schemas: BTreeMap<CallableRef, SchemaFn>,
    configures: BTreeMap<CallableRef, ConfigureFn<C>>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            schemas: BTreeMap::new(),
            configures: BTreeMap::new(),
        }
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .field("configures", &self.configures.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_key(key: &str) -> Result<CallableRef, RegistryError> {
    CallableRef::parse(key).map_err(|source| RegistryError::InvalidKey {
        key: key.to_string(),
        source,
    })
}

impl<C> Registry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema function under `key`.
    pub fn register_schema<F>(&mut self, key: &str, schema: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Option<Schema>, BoxError> + Send + Sync + 'static,
    {
        let key = parse_key(key)?;
        if self.schemas.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        self.schemas.insert(key, Box::new(schema));
        Ok(())
    }

    /// Register a configure function under `key`.
    pub fn register_configure<F>(&mut self, key: &str, configure: F) -> Result<(), RegistryError>
    where
        F: Fn(C) -> Result<C, BoxError> + Send + Sync + 'static,
    {
        let key = parse_key(key)?;
        if self.configures.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        self.configures.insert(key, Box::new(configure));
        Ok(())
    }

    /// Look up a schema function.
    pub fn schema(&self, key: &CallableRef) -> Result<&SchemaFn, RegistryError> {
        self.schemas
            .get(key)
            .ok_or_else(|| RegistryError::Unregistered(key.clone()))
    }

    /// Look up a configure function.
    pub fn configure(&self, key: &CallableRef) -> Result<&ConfigureFn<C>, RegistryError> {
        self.configures
            .get(key)
            .ok_or_else(|| RegistryError::Unregistered(key.clone()))
    }

    /// Registered schema keys in order.
    pub fn schema_keys(&self) -> impl Iterator<Item = &CallableRef> {
        self.schemas.keys()
    }

    /// Registered configure keys in order.
    pub fn configure_keys(&self) -> impl Iterator<Item = &CallableRef> {
        self.configures.keys()
    }
}

// =============================================================================
// TESTS
// =============================================================================
