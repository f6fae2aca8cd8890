//! Error types of the confgraph application.

use crate::document::FieldSpec;
use confgraph_core::{ConfgraphError, NameError, RegistryError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the command-line application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resolution or build failure.
    #[error(transparent)]
    Build(#[from] ConfgraphError),

    /// Built-in callables could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The settings file is unreadable or malformed.
    #[error("settings file {}: {reason}", path.display())]
    Settings { path: PathBuf, reason: String },

    /// A root module name given on the command line is malformed.
    #[error("invalid module name {name:?}: {source}")]
    InvalidName {
        name: String,
        #[source]
        source: NameError,
    },

    /// An inline root file does not hold exactly one definition.
    #[error("inline root {}: {reason}", path.display())]
    InlineRoot { path: PathBuf, reason: String },

    /// Reading or writing a file failed.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the document collaborator, surfaced through the build pipeline.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Schema data is not a `{ key: spec }` object.
    #[error("malformed schema: {0}")]
    InvalidSchema(String),

    /// Two schemas disagree about one key.
    #[error("conflicting schema for `{key}`: {existing} vs {incoming}")]
    SchemaConflict {
        key: String,
        existing: FieldSpec,
        incoming: FieldSpec,
    },

    /// A dotted key is empty or has an empty segment.
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    /// A dotted key runs through a value that is not an object.
    #[error("cannot set `{key}`: `{blocked}` is not an object")]
    NotAnObject { key: String, blocked: String },

    /// An initializer fragment is not an object.
    #[error("{0} must produce an object")]
    NotAFragment(String),

    /// A script file could not be used.
    #[error("script {}: {reason}", path.display())]
    Script { path: PathBuf, reason: String },

    /// A form is malformed or names an unknown operation.
    #[error("invalid form: {0}")]
    InvalidForm(String),

    /// An initializer function is missing.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Validation found problems in strict mode.
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),
}
