//! # Configuration Collaborator
//!
//! The three operations the pipeline needs from whoever owns the
//! configuration format. The core enforces call order only; it never looks
//! inside the configuration.

use crate::{BoxError, Initializer, Schema, Validated};

/// Owner of the configuration artifact.
///
/// Call order within one build:
/// 1. `init_config` once, with every collected schema
/// 2. `apply_initializer` once per initializer, dependencies first
/// 3. `validate` once, after all configure functions ran
///
/// Schemas arrive without structural repeats. Implementations must merge them
/// additively: a later schema never overrides an earlier one.
pub trait ConfigCollaborator {
    /// The configuration artifact.
    type Config;

    /// Install the merged schemas on a blank configuration.
    fn init_config(&self, blank: Self::Config, schemas: &[Schema])
    -> Result<Self::Config, BoxError>;

    /// Apply one initializer descriptor.
    fn apply_initializer(
        &self,
        config: Self::Config,
        initializer: &Initializer,
    ) -> Result<Self::Config, BoxError>;

    /// Validate the final configuration.
    ///
    /// With `strict`, problems must be returned as `Err`. Without it, the
    /// configuration comes back with its diagnostics.
    fn validate(&self, config: Self::Config, strict: bool)
    -> Result<Validated<Self::Config>, BoxError>;
}
