//! Catalog source configuration
//!
//! Manages the list of configured catalog sources (sources.yaml): named
//! document URIs with optional explicit mirror roots. Loaded from an
//! explicit path or the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::SourceSpec;
use crate::mirror::derive_mirror_root;

/// File name of the sources configuration.
pub const SOURCES_FILE: &str = "sources.yaml";

/// A configured catalog source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    /// Source name (e.g., "cirros", "mycompany").
    pub name: String,

    /// URI of the catalog document.
    pub uri: String,

    /// Explicit mirror root. Derived from the URI when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_root: Option<String>,

    /// Whether this is the default source.
    #[serde(default)]
    pub is_default: bool,
}

impl CatalogSource {
    /// The mirror root items from this source resolve against.
    pub fn mirror_root(&self) -> String {
        self.mirror_root
            .clone()
            .unwrap_or_else(|| derive_mirror_root(&self.uri))
    }

    /// The aggregation spec for this source.
    pub fn to_spec(&self) -> SourceSpec {
        SourceSpec::new(&self.uri).with_mirror_root(self.mirror_root())
    }
}

/// Sources configuration file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub sources: Vec<CatalogSource>,
}

/// Manages the configured catalog sources.
pub struct SourceManager {
    config: SourceConfig,
    config_path: PathBuf,
}

impl SourceManager {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(config_path)
    }

    /// Load configuration from a specific path. A missing file yields an
    /// empty configuration.
    pub fn load_from_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read source config: {}", config_path.display())
            })?;
            serde_yaml_ng::from_str(&content).with_context(|| {
                format!("Failed to parse source config: {}", config_path.display())
            })?
        } else {
            SourceConfig::default()
        };

        Ok(Self {
            config,
            config_path,
        })
    }

    fn default_config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("dev", "streamcat", "streamcat")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .context("Could not determine config directory")?;

        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Ok(config_dir.join(SOURCES_FILE))
    }

    /// Save the current configuration.
    pub fn save(&self) -> Result<()> {
        let content =
            serde_yaml_ng::to_string(&self.config).context("Failed to serialize source config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write source config: {}",
                self.config_path.display()
            )
        })?;

        Ok(())
    }

    /// All configured sources.
    pub fn sources(&self) -> &[CatalogSource] {
        &self.config.sources
    }

    /// Aggregation specs for every configured source, in file order.
    pub fn to_specs(&self) -> Vec<SourceSpec> {
        self.config.sources.iter().map(CatalogSource::to_spec).collect()
    }

    /// Get a source by name.
    pub fn get_source(&self, name: &str) -> Option<&CatalogSource> {
        self.config.sources.iter().find(|s| s.name == name)
    }

    /// The default source, falling back to the first configured one.
    pub fn default_source(&self) -> Option<&CatalogSource> {
        self.config
            .sources
            .iter()
            .find(|s| s.is_default)
            .or_else(|| self.config.sources.first())
    }

    /// Add a new source.
    pub fn add_source(&mut self, name: &str, uri: &str) -> Result<()> {
        if self.config.sources.iter().any(|s| s.name == name) {
            anyhow::bail!("Source '{}' already exists", name);
        }

        if !uri.starts_with("http://") && !uri.starts_with("https://") && !uri.starts_with("file://")
        {
            anyhow::bail!("Source URI must start with http://, https://, or file://");
        }

        self.config.sources.push(CatalogSource {
            name: name.to_string(),
            uri: uri.to_string(),
            mirror_root: None,
            is_default: false,
        });

        Ok(())
    }

    /// Remove a source by name.
    pub fn remove_source(&mut self, name: &str) -> Result<()> {
        let initial_len = self.config.sources.len();
        self.config.sources.retain(|s| s.name != name);

        if self.config.sources.len() == initial_len {
            anyhow::bail!("Source '{}' not found", name);
        }

        Ok(())
    }
}
