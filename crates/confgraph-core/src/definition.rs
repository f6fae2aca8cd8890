//! # Definition Module
//!
//! Structural validation of raw module records.
//!
//! - Validate every raw record before it joins a definition set
//! - Reject malformed input with the offending record attached
//! - Normalize names (keyword prefix dropped, dependencies as a set)
//! - No interpretation of hook or initializer contents

use crate::{CallableRef, ConfgraphError, Initializer, ModuleDefinition, ModuleName};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Keys a raw definition record may contain.
const KNOWN_KEYS: [&str; 5] = ["name", "dependencies", "schema", "configure", "inits"];

/// Keys selecting an initializer variant in object form.
const INITIALIZER_KEYS: [&str; 4] = ["script", "call", "value", "form"];

/// The DefinitionValidator turns raw records into `ModuleDefinition`s.
///
/// Raw record shape:
///
/// ```json
/// {
///   "name": "app/web",
///   "dependencies": ["app/db", "app/log"],
///   "schema": "web/schema",
///   "configure": "web/configure",
///   "inits": ["web/defaults.json", {"value": {"port": 80}}, ["set", "debug", false]]
/// }
/// ```
pub struct DefinitionValidator;

impl DefinitionValidator {
    /// Validate a raw record.
    ///
    /// A record is valid if:
    /// - It is an object with no unknown keys
    /// - `name` is a valid module name
    /// - `dependencies`, when present, is a non-empty array of distinct names
    /// - `schema` / `configure`, when present, are valid callable references
    /// - `inits`, when present, is a non-empty array of initializer descriptors
    ///
    /// `null` counts as absent for every optional field.
    ///
    /// Returns `ConfgraphError::InvalidDefinition` if validation fails.
    pub fn validate(raw: &Value) -> Result<ModuleDefinition, ConfgraphError> {
        let record = raw
            .as_object()
            .ok_or_else(|| ConfgraphError::invalid(raw, "definition must be an object"))?;

        if let Some(unknown) = record.keys().find(|k| !KNOWN_KEYS.contains(&k.as_str())) {
            return Err(ConfgraphError::invalid(
                raw,
                format!("unknown key `{unknown}`"),
            ));
        }

        let name = match record.get("name") {
            Some(Value::String(s)) => ModuleName::parse(s)
                .map_err(|e| ConfgraphError::invalid(raw, format!("name: {e}")))?,
            Some(_) => return Err(ConfgraphError::invalid(raw, "name: must be a string")),
            None => return Err(ConfgraphError::invalid(raw, "name: is required")),
        };

        let mut definition = ModuleDefinition::new(name);
        definition.dependencies = Self::dependencies(raw, record)?;
        definition.schema = Self::callable(raw, record, "schema")?;
        definition.configure = Self::callable(raw, record, "configure")?;
        definition.inits = Self::inits(raw, record)?;

        Ok(definition)
    }

    /// Validate a batch of raw records, stopping at the first invalid one.
    pub fn validate_all(raws: &[Value]) -> Result<Vec<ModuleDefinition>, ConfgraphError> {
        raws.iter().map(Self::validate).collect()
    }

    fn present<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
        record.get(key).filter(|v| !v.is_null())
    }

    fn dependencies(
        raw: &Value,
        record: &Map<String, Value>,
    ) -> Result<BTreeSet<ModuleName>, ConfgraphError> {
        let Some(value) = Self::present(record, "dependencies") else {
            return Ok(BTreeSet::new());
        };

        let items = value
            .as_array()
            .ok_or_else(|| ConfgraphError::invalid(raw, "dependencies: must be an array"))?;
        if items.is_empty() {
            return Err(ConfgraphError::invalid(
                raw,
                "dependencies: must not be empty when given",
            ));
        }

        let mut dependencies = BTreeSet::new();
        for item in items {
            let text = item.as_str().ok_or_else(|| {
                ConfgraphError::invalid(raw, "dependencies: every entry must be a string")
            })?;
            let dependency = ModuleName::parse(text)
                .map_err(|e| ConfgraphError::invalid(raw, format!("dependencies: {e}")))?;
            if !dependencies.insert(dependency) {
                return Err(ConfgraphError::invalid(
                    raw,
                    format!("dependencies: `{text}` is listed more than once"),
                ));
            }
        }

        Ok(dependencies)
    }

    fn callable(
        raw: &Value,
        record: &Map<String, Value>,
        key: &str,
    ) -> Result<Option<CallableRef>, ConfgraphError> {
        let Some(value) = Self::present(record, key) else {
            return Ok(None);
        };

        let text = value
            .as_str()
            .ok_or_else(|| ConfgraphError::invalid(raw, format!("{key}: must be a string")))?;
        CallableRef::parse(text)
            .map(Some)
            .map_err(|e| ConfgraphError::invalid(raw, format!("{key}: {e}")))
    }

    fn inits(raw: &Value, record: &Map<String, Value>) -> Result<Vec<Initializer>, ConfgraphError> {
        let Some(value) = Self::present(record, "inits") else {
            return Ok(Vec::new());
        };

        let items = value
            .as_array()
            .ok_or_else(|| ConfgraphError::invalid(raw, "inits: must be an array"))?;
        if items.is_empty() {
            return Err(ConfgraphError::invalid(
                raw,
                "inits: must not be empty when given",
            ));
        }

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Self::initializer(item)
                    .map_err(|reason| ConfgraphError::invalid(raw, format!("inits[{index}]: {reason}")))
            })
            .collect()
    }

    /// Decode one initializer descriptor.
    ///
    /// - string: script path
    /// - array: compound form
    /// - object with exactly one of `script`, `call`, `value`, `form`
    fn initializer(item: &Value) -> Result<Initializer, String> {
        match item {
            Value::String(path) if !path.is_empty() => Ok(Initializer::Script(PathBuf::from(path))),
            Value::String(_) => Err("script path must not be empty".to_string()),
            Value::Array(items) => Ok(Initializer::Form(items.clone())),
            Value::Object(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "object initializer must have exactly one of {}",
                        INITIALIZER_KEYS.join(", ")
                    ));
                }
                let Some((key, value)) = map.iter().next() else {
                    return Err("object initializer is empty".to_string());
                };
                match (key.as_str(), value) {
                    ("script", Value::String(path)) if !path.is_empty() => {
                        Ok(Initializer::Script(PathBuf::from(path)))
                    }
                    ("script", _) => Err("script must be a non-empty string".to_string()),
                    ("call", Value::String(text)) => CallableRef::parse(text)
                        .map(Initializer::Call)
                        .map_err(|e| format!("call: {e}")),
                    ("call", _) => Err("call must be a string".to_string()),
                    ("value", value) => Ok(Initializer::Literal(value.clone())),
                    ("form", Value::Array(items)) => Ok(Initializer::Form(items.clone())),
                    ("form", _) => Err("form must be an array".to_string()),
                    (other, _) => Err(format!("unknown initializer kind `{other}`")),
                }
            }
            _ => Err("initializer must be a string, array or object".to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
