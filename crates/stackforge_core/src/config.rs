//! Template configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DslResult;

/// Default `AWSTemplateFormatVersion`.
pub const DEFAULT_FORMAT_VERSION: &str = "2010-09-09";

/// The flavour of template being built.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    #[default]
    CloudFormation,
    /// Service catalog templates additionally accept `Rules`.
    ServiceCatalog,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::CloudFormation => "cloud_formation",
            TemplateKind::ServiceCatalog => "service_catalog",
        }
    }

    pub fn supports_rules(&self) -> bool {
        matches!(self, TemplateKind::ServiceCatalog)
    }
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings applied when a template root is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateConfig {
    #[serde(default = "default_format_version")]
    pub format_version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: TemplateKind,
}

fn default_format_version() -> String {
    DEFAULT_FORMAT_VERSION.to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
            description: None,
            kind: TemplateKind::default(),
        }
    }
}

impl TemplateConfig {
    pub fn service_catalog() -> Self {
        Self::default().with_kind(TemplateKind::ServiceCatalog)
    }

    pub fn with_kind(mut self, kind: TemplateKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn from_yaml_str(content: &str) -> DslResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> DslResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a configuration file. `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn load(path: impl AsRef<Path>) -> DslResult<Self> {
        let path = path.as_ref();
        debug!("Loading template config from {:?}", path);
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }
}
