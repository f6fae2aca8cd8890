//! # Discovery Module
//!
//! Gathering raw module records and reducing them to a duplicate-free set.
//!
//! ## Strategies
//!
//! Discovery is injected through the [`Discovery`] trait:
//! - `StaticDiscovery`: fixed in-memory records (tests, embedding)
//! - `DirectoryDiscovery`: manifest files found on a search path of directories
//!
//! ## Deduplication
//!
//! The same module may be declared by several resources. A repeat is harmless
//! when it is structurally identical to the first declaration; any difference
//! is a `DuplicateDefinition`.

use crate::definition::DefinitionValidator;
use crate::primitives::{DEFAULT_RESOURCE_NAME, MAX_RESOURCE_SIZE, TOML_MODULE_KEY};
use crate::{ConfgraphError, ModuleDefinition, ModuleName};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// DISCOVERY TRAIT
// =============================================================================

/// Source of raw module records.
///
/// Implementations are read-only and may be shared across concurrent builds.
pub trait Discovery: Send + Sync {
    /// Return every raw record this source knows about, in a stable order.
    fn discover(&self) -> Result<Vec<Value>, ConfgraphError>;
}

/// A fixed list of raw records.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    records: Vec<Value>,
}

impl StaticDiscovery {
    /// Create a discovery that always returns `records`.
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }
}

impl Discovery for StaticDiscovery {
    fn discover(&self) -> Result<Vec<Value>, ConfgraphError> {
        Ok(self.records.clone())
    }
}

// =============================================================================
// RESOURCE FORMATS
// =============================================================================

/// Encoding of a manifest resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceFormat {
    /// `.json`: an object, an array of objects, or `null`.
    Json,
    /// `.toml`: a single module table or a `[[module]]` array of tables.
    Toml,
}

impl ResourceFormat {
    /// Formats in lookup order.
    pub const ALL: [ResourceFormat; 2] = [ResourceFormat::Json, ResourceFormat::Toml];

    /// File extension for this format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ResourceFormat::Json => "json",
            ResourceFormat::Toml => "toml",
        }
    }

    /// Guess the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
        match self {
            ResourceFormat::Json => {
                let value: Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
                match value {
                    Value::Null => Ok(Vec::new()),
                    Value::Array(records) => Ok(records),
                    record @ Value::Object(_) => Ok(vec![record]),
                    _ => Err("expected an object or an array of objects".to_string()),
                }
            }
            ResourceFormat::Toml => {
                let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
                let mut table: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;

                if table.is_empty() {
                    return Ok(Vec::new());
                }

                let Some(modules) = table.remove(TOML_MODULE_KEY) else {
                    return toml_to_json(toml::Value::Table(table)).map(|record| vec![record]);
                };

                if !table.is_empty() {
                    return Err(format!(
                        "`{TOML_MODULE_KEY}` tables cannot be mixed with top-level module keys"
                    ));
                }

                let toml::Value::Array(items) = modules else {
                    return Err(format!("`{TOML_MODULE_KEY}` must be an array of tables"));
                };

                items.into_iter().map(toml_to_json).collect()
            }
        }
    }
}

/// Convert a TOML value to JSON.
///
/// Datetimes become their RFC 3339 text. Non-finite floats have no JSON
/// form and are rejected.
pub fn toml_to_json(value: toml::Value) -> Result<Value, String> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| format!("float {f} has no JSON representation"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(toml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, item)| toml_to_json(item).map(|converted| (key, converted)))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Decode one resource into zero or more raw records.
pub fn decode_resource(
    label: &str,
    bytes: &[u8],
    format: ResourceFormat,
) -> Result<Vec<Value>, ConfgraphError> {
    format
        .decode(bytes)
        .map_err(|reason| ConfgraphError::Resource {
            resource: label.to_string(),
            reason,
        })
}

// =============================================================================
// DIRECTORY DISCOVERY
// =============================================================================

/// A manifest file located by [`DirectoryDiscovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Where the resource was read from.
    pub path: PathBuf,
    /// How to decode it.
    pub format: ResourceFormat,
    /// Raw content.
    pub bytes: Vec<u8>,
}

/// Finds `<dir>/<resource>.json` and `<dir>/<resource>.toml` in each search directory.
///
/// Directories are visited in search-path order, JSON before TOML within a
/// directory. Directories that do not exist are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    search_path: Vec<PathBuf>,
    resource: String,
}

impl DirectoryDiscovery {
    /// Create a discovery over `search_path` using the default resource name.
    #[must_use]
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            resource: DEFAULT_RESOURCE_NAME.to_string(),
        }
    }

    /// Use a different resource base name.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// The directories searched, in order.
    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// The resource base name.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Read every matching resource on the search path.
    pub fn list_resources(&self) -> Result<Vec<Resource>, ConfgraphError> {
        let mut resources = Vec::new();

        for dir in &self.search_path {
            if !dir.is_dir() {
                tracing::debug!(dir = %dir.display(), "search path entry is not a directory, skipping");
                continue;
            }

            for format in ResourceFormat::ALL {
                let path = dir.join(format!("{}.{}", self.resource, format.extension()));
                if !path.is_file() {
                    continue;
                }
                let bytes = read_resource(&path)?;
                tracing::debug!(path = %path.display(), size = bytes.len(), "found module resource");
                resources.push(Resource {
                    path,
                    format,
                    bytes,
                });
            }
        }

        Ok(resources)
    }
}

impl Discovery for DirectoryDiscovery {
    fn discover(&self) -> Result<Vec<Value>, ConfgraphError> {
        let mut records = Vec::new();
        for resource in self.list_resources()? {
            let label = resource.path.display().to_string();
            records.extend(decode_resource(&label, &resource.bytes, resource.format)?);
        }
        Ok(records)
    }
}

fn read_resource(path: &Path) -> Result<Vec<u8>, ConfgraphError> {
    let io_error = |e: std::io::Error| ConfgraphError::Resource {
        resource: path.display().to_string(),
        reason: e.to_string(),
    };

    let size = std::fs::metadata(path).map_err(io_error)?.len();
    if size > MAX_RESOURCE_SIZE {
        return Err(ConfgraphError::Resource {
            resource: path.display().to_string(),
            reason: format!("size {size} bytes exceeds maximum of {MAX_RESOURCE_SIZE} bytes"),
        });
    }

    std::fs::read(path).map_err(io_error)
}

// =============================================================================
// DEFINITION SET
// =============================================================================

/// Definitions keyed by name, kept in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionSet {
    definitions: Vec<ModuleDefinition>,
    index: BTreeMap<ModuleName, usize>,
}

impl DefinitionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set, applying the duplicate rule to every definition.
    pub fn from_definitions<'a>(
        definitions: impl IntoIterator<Item = &'a ModuleDefinition>,
    ) -> Result<Self, ConfgraphError> {
        let mut set = Self::new();
        for definition in definitions {
            set.insert(definition.clone())?;
        }
        Ok(set)
    }

    /// Insert a definition.
    ///
    /// Returns `Ok(true)` if the name was new, `Ok(false)` if an identical
    /// definition was already present, and `DuplicateDefinition` otherwise.
    pub fn insert(&mut self, definition: ModuleDefinition) -> Result<bool, ConfgraphError> {
        if let Some(&position) = self.index.get(&definition.name) {
            let existing = &self.definitions[position];
            if *existing == definition {
                return Ok(false);
            }
            return Err(ConfgraphError::DuplicateDefinition {
                name: definition.name.clone(),
                conflicting: vec![existing.clone(), definition],
            });
        }

        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(true)
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn get(&self, name: &ModuleName) -> Option<&ModuleDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Check whether a name is defined.
    #[must_use]
    pub fn contains(&self, name: &ModuleName) -> bool {
        self.index.contains_key(name)
    }

    /// Number of distinct definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in first-insertion order.
    #[must_use]
    pub fn definitions(&self) -> &[ModuleDefinition] {
        &self.definitions
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &ModuleName> {
        self.index.keys()
    }
}

/// Discover, validate and deduplicate module definitions.
pub fn discover_definitions(discovery: &dyn Discovery) -> Result<DefinitionSet, ConfgraphError> {
    let records = discovery.discover()?;

    let mut set = DefinitionSet::new();
    for record in &records {
        set.insert(DefinitionValidator::validate(record)?)?;
    }

    tracing::debug!(
        records = records.len(),
        modules = set.len(),
        "discovered module definitions"
    );
    Ok(set)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(s: &str) -> ModuleName {
        ModuleName::parse(s).expect("name")
    }

    #[test]
    fn identical_duplicates_collapse() {
        let discovery = StaticDiscovery::new(vec![
            json!({"name": "a", "dependencies": ["b", "c"]}),
            json!({"name": "b"}),
            json!({"name": ":a", "dependencies": ["c", "b"]}),
            json!({"name": "c"}),
        ]);
        let set = discover_definitions(&discovery).expect("discover");
        assert_eq!(set.len(), 3);
        let order: Vec<_> = set.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn conflicting_duplicates_rejected() {
        let discovery = StaticDiscovery::new(vec![
            json!({"name": "a"}),
            json!({"name": "a", "configure": "a/configure"}),
        ]);
        match discover_definitions(&discovery) {
            Err(ConfgraphError::DuplicateDefinition { name: dup, conflicting }) => {
                assert_eq!(dup, name("a"));
                assert_eq!(conflicting.len(), 2);
                assert!(conflicting[0].configure.is_none());
                assert!(conflicting[1].configure.is_some());
            }
            other => unreachable!("expected DuplicateDefinition, got {other:?}"),
        }
    }

    #[test]
    fn invalid_record_fails_discovery() {
        let discovery = StaticDiscovery::new(vec![json!({"name": "a"}), json!({"inits": []})]);
        assert!(matches!(
            discover_definitions(&discovery),
            Err(ConfgraphError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn set_insert_reports_novelty() {
        let mut set = DefinitionSet::new();
        assert!(set.insert(ModuleDefinition::new(name("a"))).expect("insert"));
        assert!(!set.insert(ModuleDefinition::new(name("a"))).expect("insert"));
        assert!(set.contains(&name("a")));
        assert!(set.get(&name("b")).is_none());
    }

    #[test]
    fn json_resource_shapes() {
        let one = decode_resource("one", br#"{"name": "a"}"#, ResourceFormat::Json).expect("one");
        assert_eq!(one.len(), 1);

        let many = decode_resource(
            "many",
            br#"[{"name": "a"}, {"name": "b"}]"#,
            ResourceFormat::Json,
        )
        .expect("many");
        assert_eq!(many.len(), 2);

        let none = decode_resource("none", b"null", ResourceFormat::Json).expect("none");
        assert!(none.is_empty());

        assert!(matches!(
            decode_resource("bad", b"42", ResourceFormat::Json),
            Err(ConfgraphError::Resource { .. })
        ));
    }

    #[test]
    fn toml_resource_shapes() {
        let single = decode_resource(
            "single",
            b"name = \"a\"\ndependencies = [\"b\"]\n",
            ResourceFormat::Toml,
        )
        .expect("single");
        assert_eq!(single, vec![json!({"name": "a", "dependencies": ["b"]})]);

        let tables = decode_resource(
            "tables",
            b"[[module]]\nname = \"a\"\n\n[[module]]\nname = \"b\"\ninits = [{ value = { port = 80 } }]\n",
            ResourceFormat::Toml,
        )
        .expect("tables");
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1]["inits"][0]["value"]["port"], json!(80));

        let empty = decode_resource("empty", b"", ResourceFormat::Toml).expect("empty");
        assert!(empty.is_empty());

        let mixed = decode_resource(
            "mixed",
            b"name = \"x\"\n[[module]]\nname = \"a\"\n",
            ResourceFormat::Toml,
        );
        assert!(matches!(mixed, Err(ConfgraphError::Resource { .. })));
    }

    #[test]
    fn toml_datetimes_become_strings() {
        let records = decode_resource(
            "dated",
            b"[[module]]\nname = \"a\"\ninits = [{ value = { since = 2024-01-02 } }]\n",
            ResourceFormat::Toml,
        )
        .expect("decode");
        assert_eq!(
            records,
            vec![json!({"name": "a", "inits": [{"value": {"since": "2024-01-02"}}]})]
        );

        let converted = toml_to_json(toml::Value::Table(
            toml::from_str("released = 1979-05-27T07:32:00Z\nday = 1979-05-27\nratio = 0.5\n")
                .expect("table"),
        ))
        .expect("convert");
        assert_eq!(
            converted,
            json!({"released": "1979-05-27T07:32:00Z", "day": "1979-05-27", "ratio": 0.5})
        );

        let nan = toml_to_json(toml::Value::Float(f64::NAN));
        assert!(nan.is_err());
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            ResourceFormat::from_path(Path::new("x/modules.JSON")),
            Some(ResourceFormat::Json)
        );
        assert_eq!(
            ResourceFormat::from_path(Path::new("modules.toml")),
            Some(ResourceFormat::Toml)
        );
        assert_eq!(ResourceFormat::from_path(Path::new("modules.yaml")), None);
    }

    #[test]
    fn directory_discovery_reads_search_path_in_order() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            first.path().join("confgraph-modules.toml"),
            "[[module]]\nname = \"b\"\n",
        )
        .expect("write");
        std::fs::write(
            first.path().join("confgraph-modules.json"),
            r#"{"name": "a", "dependencies": ["b"]}"#,
        )
        .expect("write");
        std::fs::write(
            second.path().join("confgraph-modules.json"),
            r#"[{"name": "c"}]"#,
        )
        .expect("write");

        let discovery = DirectoryDiscovery::new(vec![
            first.path().to_path_buf(),
            first.path().join("missing"),
            second.path().to_path_buf(),
        ]);

        let resources = discovery.list_resources().expect("list");
        let formats: Vec<_> = resources.iter().map(|r| r.format).collect();
        assert_eq!(
            formats,
            vec![ResourceFormat::Json, ResourceFormat::Toml, ResourceFormat::Json]
        );

        let set = discover_definitions(&discovery).expect("discover");
        let order: Vec<_> = set.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn directory_discovery_custom_resource_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("mods.json"), r#"{"name": "a"}"#).expect("write");
        std::fs::write(dir.path().join("confgraph-modules.json"), r#"{"name": "z"}"#)
            .expect("write");

        let discovery =
            DirectoryDiscovery::new(vec![dir.path().to_path_buf()]).with_resource("mods");
        assert_eq!(discovery.resource(), "mods");
        let records = discovery.discover().expect("discover");
        assert_eq!(records, vec![json!({"name": "a"})]);
    }

    #[test]
    fn malformed_resource_names_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("confgraph-modules.json");
        std::fs::write(&path, "{not json").expect("write");

        let discovery = DirectoryDiscovery::new(vec![dir.path().to_path_buf()]);
        match discovery.discover() {
            Err(ConfgraphError::Resource { resource, .. }) => {
                assert_eq!(resource, path.display().to_string());
            }
            other => unreachable!("expected Resource error, got {other:?}"),
        }
    }
}
