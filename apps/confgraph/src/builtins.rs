//! # Built-in Callables
//!
//! Schema, configure and initializer functions every confgraph build can
//! reference by key:
//!
//! | Key                      | Kind        | Effect                                     |
//! |--------------------------|-------------|--------------------------------------------|
//! | `confgraph/service`      | schema      | requires `service.name` and `service.port` |
//! | `confgraph/prune-nulls`  | configure   | drops `null` members recursively           |
//! | `confgraph/sort-keys`    | configure   | sorts object keys recursively              |
//! | `confgraph/env`          | initializer | `CONFGRAPH_SET_A__B=v` sets `a.b = "v"`    |

use crate::document::{Document, DocumentCollaborator};
use crate::error::DocumentError;
use confgraph_core::{Registry, RegistryError};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

pub const SERVICE_SCHEMA: &str = "confgraph/service";
pub const PRUNE_NULLS: &str = "confgraph/prune-nulls";
pub const SORT_KEYS: &str = "confgraph/sort-keys";
pub const ENV_INIT: &str = "confgraph/env";

/// Environment variables with this prefix feed `confgraph/env`.
pub const ENV_PREFIX: &str = "CONFGRAPH_SET_";

/// Separator between key segments in an environment variable name.
pub const ENV_SEGMENT_SEPARATOR: &str = "__";

/// Schema of a minimal network service.
#[must_use]
pub fn service_schema() -> Value {
    json!({
        "service.name": { "type": "string", "required": true },
        "service.port": { "type": "integer", "required": true },
    })
}

/// Remove `null` object members at every depth.
pub fn prune_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, member| !member.is_null());
            map.values_mut().for_each(prune_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(prune_nulls),
        _ => {}
    }
}

/// Rebuild every object with its keys in sorted order.
#[must_use]
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, member)| (key, sort_keys(member)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Build a fragment from `CONFGRAPH_SET_*` variables.
///
/// Segments are lowercased; values are always strings. Names with an empty
/// segment (`CONFGRAPH_SET_`, `CONFGRAPH_SET_A____B`) are skipped.
pub fn env_fragment<I>(vars: I) -> Result<Value, DocumentError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut sorted: Vec<(String, String)> = vars
        .into_iter()
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .collect();
    sorted.sort();

    let mut fragment = Document::new();
    for (name, value) in sorted {
        let segments: Vec<String> = name[ENV_PREFIX.len()..]
            .split(ENV_SEGMENT_SEPARATOR)
            .map(str::to_lowercase)
            .collect();
        if segments.iter().any(String::is_empty) {
            tracing::debug!(variable = %name, "skipping override with an empty key segment");
            continue;
        }
        fragment.set(&segments.join("."), Value::String(value))?;
    }
    Ok(fragment.data)
}

/// A registry holding the built-in schema and configure functions.
pub fn registry() -> Result<Registry<Document>, RegistryError> {
    let mut registry = Registry::new();
    registry.register_schema(SERVICE_SCHEMA, || Ok(Some(service_schema())))?;
    registry.register_configure(PRUNE_NULLS, |mut document: Document| {
        prune_nulls(&mut document.data);
        Ok(document)
    })?;
    registry.register_configure(SORT_KEYS, |mut document: Document| {
        document.data = sort_keys(document.data);
        Ok(document)
    })?;
    Ok(registry)
}

/// A document collaborator holding the built-in initializer functions.
pub fn collaborator(base_dir: impl Into<PathBuf>) -> Result<DocumentCollaborator, RegistryError> {
    let mut collaborator = DocumentCollaborator::new(base_dir);
    collaborator.register_init(ENV_INIT, |_| Ok(env_fragment(std::env::vars())?))?;
    Ok(collaborator)
}

// =============================================================================
// TESTS
// =============================================================================
