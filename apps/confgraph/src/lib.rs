//! # confgraph
//!
//! Builds JSON configuration documents from dependency-ordered modules.
//!
//! The resolver and build pipeline live in `confgraph-core`; this crate adds
//! a concrete configuration format ([`document::Document`]), the built-in
//! callables, and settings loading for the `confgraph` binary.

pub mod builtins;
pub mod document;
pub mod error;
pub mod settings;

pub use document::{Document, DocumentCollaborator, FieldSpec, FieldType};
pub use error::{AppError, DocumentError};
pub use settings::Settings;
