//! # Settings
//!
//! Optional `confgraph.toml` file:
//!
//! ```toml
//! search_path = ["modules", "/etc/confgraph"]
//! resource = "confgraph-modules"
//! strict = true
//! ```
//!
//! Relative search-path entries are resolved against the directory holding
//! the settings file. Every key is optional.

use crate::error::AppError;
use confgraph_core::DirectoryDiscovery;
use confgraph_core::primitives::DEFAULT_RESOURCE_NAME;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "confgraph.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directories scanned for module resources, in order.
    pub search_path: Vec<PathBuf>,
    /// Resource base name looked up in each directory.
    pub resource: String,
    /// Fail builds on validation problems.
    pub strict: bool,
    /// Directory that relative script paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_path: vec![PathBuf::from(".")],
            resource: DEFAULT_RESOURCE_NAME.to_string(),
            strict: true,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Parse settings text. Paths are left as written.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a settings file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&text).map_err(|e| AppError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        settings.search_path = settings
            .search_path
            .iter()
            .map(|dir| base_dir.join(dir))
            .collect();
        settings.base_dir = base_dir;

        tracing::debug!(path = %path.display(), ?settings, "settings loaded");
        Ok(settings)
    }

    /// Load `explicit` if given, else `confgraph.toml` if it exists, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_SETTINGS_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Discovery over the configured search path.
    #[must_use]
    pub fn discovery(&self) -> DirectoryDiscovery {
        DirectoryDiscovery::new(self.search_path.clone()).with_resource(self.resource.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::from_toml_str("").expect("parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(Settings::from_toml_str("searchpath = []").is_err());
    }

    #[test]
    fn relative_paths_follow_settings_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("confgraph.toml");
        std::fs::write(
            &path,
            "search_path = [\"modules\", \"/abs\"]\nresource = \"mods\"\nstrict = false\n",
        )
        .expect("write");

        let settings = Settings::load(&path).expect("load");
        assert_eq!(
            settings.search_path,
            vec![dir.path().join("modules"), PathBuf::from("/abs")]
        );
        assert_eq!(settings.base_dir, dir.path());
        assert!(!settings.strict);

        let discovery = settings.discovery();
        assert_eq!(discovery.resource(), "mods");
        assert_eq!(discovery.search_path().len(), 2);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = Settings::resolve(Some(dir.path().join("absent.toml").as_path()));
        assert!(matches!(result, Err(AppError::Io { .. })));
    }
}
