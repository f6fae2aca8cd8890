//! # Document Collaborator
//!
//! A JSON configuration document and the collaborator that builds it.
//!
//! - Schemas declare dotted keys with a type and a required flag
//! - Initializers deep-merge object fragments into the document data
//! - Validation reports missing required keys and type mismatches
//!
//! ## Schema Format
//!
//! ```json
//! { "service.port": { "type": "integer", "required": true } }
//! ```

use crate::error::DocumentError;
use confgraph_core::primitives::MAX_RESOURCE_SIZE;
use confgraph_core::{
    BoxError, CallableRef, ConfigCollaborator, Initializer, RegistryError, ResourceFormat, Schema,
    Validated, toml_to_json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// SCHEMA
// =============================================================================

/// Expected JSON type of a document key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl FieldType {
    /// Check whether `value` has this type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Any => true,
        }
    }

    /// Lowercase type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Any => "any",
        }
    }
}

/// Declaration of one dotted key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(rename = "type", default)]
    pub kind: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.required {
            write!(f, "required {}", self.kind.name())
        } else {
            write!(f, "optional {}", self.kind.name())
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn split_key(key: &str) -> Result<Vec<&str>, DocumentError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(DocumentError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// A schema plus the JSON data it describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub schema: BTreeMap<String, FieldSpec>,
    pub data: Value,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            schema: BTreeMap::new(),
            data: Value::Object(Map::new()),
        }
    }
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one key declaration. Repeating an identical declaration is a no-op.
    pub fn declare(&mut self, key: &str, spec: FieldSpec) -> Result<(), DocumentError> {
        split_key(key)?;
        match self.schema.get(key) {
            Some(existing) if *existing != spec => Err(DocumentError::SchemaConflict {
                key: key.to_string(),
                existing: *existing,
                incoming: spec,
            }),
            Some(_) => Ok(()),
            None => {
                self.schema.insert(key.to_string(), spec);
                Ok(())
            }
        }
    }

    /// Value at a dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.data, |current, segment| current.get(segment))
    }

    /// Set a dotted key, creating intermediate objects.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), DocumentError> {
        let segments = split_key(key)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(DocumentError::InvalidKey(key.to_string()));
        };

        let mut current = &mut self.data;
        for (depth, segment) in parents.iter().enumerate() {
            let Value::Object(map) = current else {
                return Err(DocumentError::NotAnObject {
                    key: key.to_string(),
                    blocked: segments[..depth].join("."),
                });
            };
            current = map
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let Value::Object(map) = current else {
            return Err(DocumentError::NotAnObject {
                key: key.to_string(),
                blocked: parents.join("."),
            });
        };
        map.insert((*last).to_string(), value);
        Ok(())
    }

    /// Remove a dotted key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let (parents, last) = match key.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, key),
        };
        let parent = match parents {
            Some(parents) => parents
                .split('.')
                .try_fold(&mut self.data, |current, segment| current.get_mut(segment))?,
            None => &mut self.data,
        };
        parent.as_object_mut()?.shift_remove(last)
    }

    /// Deep-merge an object fragment into the data.
    pub fn merge(&mut self, fragment: Value, origin: &str) -> Result<(), DocumentError> {
        if !fragment.is_object() {
            return Err(DocumentError::NotAFragment(origin.to_string()));
        }
        deep_merge(&mut self.data, fragment);
        Ok(())
    }

    /// Problems with the data according to the schema, in key order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        let mut diagnostics = Vec::new();
        for (key, spec) in &self.schema {
            match self.get(key) {
                None | Some(Value::Null) => {
                    if spec.required {
                        diagnostics.push(format!("missing required key `{key}`"));
                    }
                }
                Some(value) if !spec.kind.matches(value) => diagnostics.push(format!(
                    "key `{key}` should be {}, found {}",
                    spec.kind.name(),
                    value_kind(value)
                )),
                Some(_) => {}
            }
        }
        diagnostics
    }
}

/// Merge `fragment` into `target`. Objects merge key by key; anything else replaces.
pub fn deep_merge(target: &mut Value, fragment: Value) {
    match (target, fragment) {
        (Value::Object(target), Value::Object(fragment)) => {
            for (key, value) in fragment {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, fragment) => *target = fragment,
    }
}

// =============================================================================
// COLLABORATOR
// =============================================================================

/// A function producing a fragment for a `call` initializer.
pub type InitFn = Box<dyn Fn(&Document) -> Result<Value, BoxError> + Send + Sync>;

/// Builds [`Document`]s for the pipeline.
///
/// Script paths are resolved against `base_dir`.
pub struct DocumentCollaborator {
    base_dir: PathBuf,
    init_fns: BTreeMap<CallableRef, InitFn>,
}

impl fmt::Debug for DocumentCollaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCollaborator")
            .field("base_dir", &self.base_dir)
            .field("init_fns", &self.init_fns.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DocumentCollaborator {
    /// Create a collaborator with no initializer functions.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            init_fns: BTreeMap::new(),
        }
    }

    /// Directory scripts are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Register a function for `call` initializers.
    pub fn register_init<F>(&mut self, key: &str, init: F) -> Result<(), RegistryError>
    where
        F: Fn(&Document) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let key = CallableRef::parse(key).map_err(|source| RegistryError::InvalidKey {
            key: key.to_string(),
            source,
        })?;
        if self.init_fns.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        self.init_fns.insert(key, Box::new(init));
        Ok(())
    }

    /// Registered initializer keys in order.
    pub fn init_keys(&self) -> impl Iterator<Item = &CallableRef> {
        self.init_fns.keys()
    }

    fn load_script(&self, path: &Path) -> Result<Value, DocumentError> {
        let full = if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        };
        let script_error = |reason: String| DocumentError::Script {
            path: full.clone(),
            reason,
        };

        let format = ResourceFormat::from_path(&full)
            .ok_or_else(|| script_error("expected a .json or .toml file".to_string()))?;
        let size = std::fs::metadata(&full)
            .map_err(|e| script_error(e.to_string()))?
            .len();
        if size > MAX_RESOURCE_SIZE {
            return Err(script_error(format!(
                "size {size} bytes exceeds maximum of {MAX_RESOURCE_SIZE} bytes"
            )));
        }
        let text = std::fs::read_to_string(&full).map_err(|e| script_error(e.to_string()))?;

        tracing::debug!(path = %full.display(), ?format, "loading script");
        match format {
            ResourceFormat::Json => {
                serde_json::from_str(&text).map_err(|e| script_error(e.to_string()))
            }
            ResourceFormat::Toml => toml::from_str::<toml::Table>(&text)
                .map_err(|e| script_error(e.to_string()))
                .and_then(|table| toml_to_json(toml::Value::Table(table)).map_err(script_error)),
        }
    }

    fn apply_form(&self, document: &mut Document, form: &[Value]) -> Result<(), DocumentError> {
        let key_at = |index: usize| {
            form.get(index)
                .and_then(Value::as_str)
                .ok_or_else(|| DocumentError::InvalidForm(format!("item {index} must be a key")))
        };

        match (form.first().and_then(Value::as_str), form.len()) {
            (Some("set"), 3) => document.set(key_at(1)?, form[2].clone()),
            (Some("remove"), 2) => {
                document.remove(key_at(1)?);
                Ok(())
            }
            (Some("merge"), 2) => document.merge(form[1].clone(), "merge form"),
            (Some(op @ ("set" | "remove" | "merge")), len) => Err(DocumentError::InvalidForm(
                format!("`{op}` does not take {} argument(s)", len - 1),
            )),
            (Some(op), _) => Err(DocumentError::InvalidForm(format!("unknown operation `{op}`"))),
            (None, _) => Err(DocumentError::InvalidForm(
                "first item must be an operation name".to_string(),
            )),
        }
    }
}

impl ConfigCollaborator for DocumentCollaborator {
    type Config = Document;

    fn init_config(&self, mut blank: Document, schemas: &[Schema]) -> Result<Document, BoxError> {
        for schema in schemas {
            let Value::Object(entries) = schema else {
                return Err(DocumentError::InvalidSchema(format!(
                    "expected an object, found {}",
                    value_kind(schema)
                ))
                .into());
            };
            for (key, spec) in entries {
                let spec: FieldSpec = serde_json::from_value(spec.clone())
                    .map_err(|e| DocumentError::InvalidSchema(format!("`{key}`: {e}")))?;
                blank.declare(key, spec)?;
            }
        }
        Ok(blank)
    }

    fn apply_initializer(
        &self,
        mut config: Document,
        initializer: &Initializer,
    ) -> Result<Document, BoxError> {
        match initializer {
            Initializer::Literal(value) => config.merge(value.clone(), "value initializer")?,
            Initializer::Script(path) => {
                let fragment = self.load_script(path)?;
                config.merge(fragment, &format!("script {}", path.display()))?;
            }
            Initializer::Form(form) => self.apply_form(&mut config, form)?,
            Initializer::Call(key) => {
                let init = self
                    .init_fns
                    .get(key)
                    .ok_or_else(|| DocumentError::from(RegistryError::Unregistered(key.clone())))?;
                let fragment = init(&config)?;
                config.merge(fragment, &format!("call {key}"))?;
            }
        }
        Ok(config)
    }

    fn validate(&self, config: Document, strict: bool) -> Result<Validated<Document>, BoxError> {
        let diagnostics = config.diagnostics();
        if strict && !diagnostics.is_empty() {
            return Err(DocumentError::Invalid(diagnostics).into());
        }
        Ok(Validated::with_diagnostics(config, diagnostics))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: FieldType, required: bool) -> FieldSpec {
        FieldSpec { kind, required }
    }

    #[test]
    fn dotted_set_get_remove() {
        let mut doc = Document::new();
        doc.set("server.http.port", json!(8080)).expect("set");
        assert_eq!(doc.get("server.http.port"), Some(&json!(8080)));
        assert_eq!(doc.data, json!({"server": {"http": {"port": 8080}}}));

        assert_eq!(doc.remove("server.http.port"), Some(json!(8080)));
        assert_eq!(doc.remove("server.http.port"), None);
        assert_eq!(doc.data, json!({"server": {"http": {}}}));
    }

    #[test]
    fn set_through_scalar_rejected() {
        let mut doc = Document::new();
        doc.set("a", json!(1)).expect("set");
        assert!(matches!(
            doc.set("a.b", json!(2)),
            Err(DocumentError::NotAnObject { .. })
        ));
        assert!(matches!(
            doc.set("a..b", json!(2)),
            Err(DocumentError::InvalidKey(_))
        ));
    }

    #[test]
    fn deep_merge_combines_objects() {
        let mut target = json!({"a": {"x": 1, "y": 2}, "b": [1]});
        deep_merge(&mut target, json!({"a": {"y": 3, "z": 4}, "b": [2]}));
        assert_eq!(target, json!({"a": {"x": 1, "y": 3, "z": 4}, "b": [2]}));
    }

    #[test]
    fn schema_merge_is_additive() {
        let collaborator = DocumentCollaborator::new(".");
        let doc = collaborator
            .init_config(
                Document::new(),
                &[
                    json!({"a": {"type": "string", "required": true}}),
                    json!({"a": {"type": "string", "required": true}, "b": {}}),
                ],
            )
            .expect("schemas");
        assert_eq!(doc.schema.len(), 2);
        assert_eq!(doc.schema["b"], spec(FieldType::Any, false));

        let conflict = collaborator.init_config(
            Document::new(),
            &[json!({"a": {"type": "string"}}), json!({"a": {"type": "integer"}})],
        );
        assert!(conflict.is_err());
    }

    #[test]
    fn forms_apply_in_order() {
        let collaborator = DocumentCollaborator::new(".");
        let forms = [
            json!(["merge", {"a": {"b": 1, "c": 2}}]),
            json!(["set", "a.d", true]),
            json!(["remove", "a.b"]),
        ];
        let doc = forms.iter().fold(Document::new(), |doc, form| {
            let Value::Array(items) = form.clone() else {
                unreachable!("forms are arrays");
            };
            collaborator
                .apply_initializer(doc, &Initializer::Form(items))
                .expect("form")
        });
        assert_eq!(doc.data, json!({"a": {"c": 2, "d": true}}));
    }

    #[test]
    fn malformed_forms_rejected() {
        let collaborator = DocumentCollaborator::new(".");
        for form in [
            vec![json!("set"), json!("a")],
            vec![json!("explode")],
            vec![json!(1), json!(2)],
            vec![json!("set"), json!(1), json!(2)],
        ] {
            let result = collaborator.apply_initializer(Document::new(), &Initializer::Form(form));
            assert!(result.is_err());
        }
    }

    #[test]
    fn literal_must_be_object() {
        let collaborator = DocumentCollaborator::new(".");
        let result =
            collaborator.apply_initializer(Document::new(), &Initializer::Literal(json!(3)));
        assert!(result.is_err());
    }

    #[test]
    fn call_uses_registered_function() {
        let mut collaborator = DocumentCollaborator::new(".");
        collaborator
            .register_init("test/seed", |_| Ok(json!({"seeded": true})))
            .expect("register");

        let key = CallableRef::parse("test/seed").expect("key");
        let doc = collaborator
            .apply_initializer(Document::new(), &Initializer::Call(key))
            .expect("call");
        assert_eq!(doc.get("seeded"), Some(&json!(true)));

        let missing = CallableRef::parse("test/missing").expect("key");
        let err = collaborator
            .apply_initializer(Document::new(), &Initializer::Call(missing))
            .expect_err("unregistered");
        assert!(err.to_string().contains("test/missing"));
    }

    #[test]
    fn scripts_resolve_against_base_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("base.toml"), "[server]\nport = 80\n").expect("write");
        std::fs::write(dir.path().join("extra.json"), r#"{"server": {"host": "x"}}"#)
            .expect("write");

        let collaborator = DocumentCollaborator::new(dir.path());
        let doc = [PathBuf::from("base.toml"), PathBuf::from("extra.json")]
            .into_iter()
            .try_fold(Document::new(), |doc, path| {
                collaborator.apply_initializer(doc, &Initializer::Script(path))
            })
            .expect("scripts");
        assert_eq!(doc.data, json!({"server": {"port": 80, "host": "x"}}));

        let unsupported = collaborator.apply_initializer(
            Document::new(),
            &Initializer::Script(PathBuf::from("notes.txt")),
        );
        assert!(unsupported.is_err());
    }

    #[test]
    fn validation_reports_problems() {
        let collaborator = DocumentCollaborator::new(".");
        let mut doc = Document::new();
        doc.declare("name", spec(FieldType::String, true)).expect("declare");
        doc.declare("port", spec(FieldType::Integer, false)).expect("declare");
        doc.set("port", json!("eighty")).expect("set");

        let validated = collaborator.validate(doc.clone(), false).expect("lenient");
        assert_eq!(
            validated.diagnostics,
            vec![
                "missing required key `name`",
                "key `port` should be integer, found string"
            ]
        );
        assert!(collaborator.validate(doc, true).is_err());
    }
}
