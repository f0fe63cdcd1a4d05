use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".apit.yaml";

/// Options handed to a generator.
///
/// The core reads `outdir`, `force` and `sort`; everything backend-specific
/// lives in `params`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Output directory. Empty means stdout.
    pub outdir: String,
    /// Overwrite existing files.
    pub force: bool,
    /// Emit entities sorted by name instead of in declaration order.
    pub sort: bool,
    pub namespace: Option<String>,
    pub params: IndexMap<String, String>,
}

impl GeneratorConfig {
    /// Record a `key=value` parameter. A bare `key` sets it to `"true"`.
    pub fn set_param(&mut self, arg: &str) {
        match arg.split_once('=') {
            Some((k, v)) => self.params.insert(k.trim().to_string(), v.to_string()),
            None => self.params.insert(arg.trim().to_string(), "true".to_string()),
        };
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True when the parameter is set to anything but `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.param(key).is_some_and(|v| v != "false")
    }
}

/// Project configuration loaded from `.apit.yaml`. Command-line flags
/// override these values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApitConfig {
    pub inputs: Vec<PathBuf>,
    pub tags: Vec<String>,
    pub generator: Option<String>,
    pub outdir: Option<String>,
    pub force: bool,
    pub sort: bool,
    pub namespace: Option<String>,
    pub params: IndexMap<String, String>,
}

impl ApitConfig {
    /// The generator options this file provides.
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            outdir: self.outdir.clone().unwrap_or_default(),
            force: self.force,
            sort: self.sort,
            namespace: self.namespace.clone(),
            params: self.params.clone(),
        }
    }
}

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ApitConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: ApitConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params() {
        let mut config = GeneratorConfig::default();
        config.set_param("title=My API");
        config.set_param("toc");
        config.set_param("links=false");
        assert_eq!(config.param("title"), Some("My API"));
        assert!(config.flag("toc"));
        assert!(!config.flag("links"));
        assert!(!config.flag("missing"));
        assert_eq!(config.params.keys().collect::<Vec<_>>(), vec!["title", "toc", "links"]);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
inputs:
  - model/
  - extra.smithy
tags: [public]
generator: markdown
outdir: docs
sort: true
params:
  title: Weather
"#;
        let config: ApitConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.tags, vec!["public"]);
        assert_eq!(config.generator.as_deref(), Some("markdown"));
        let gen_config = config.generator_config();
        assert_eq!(gen_config.outdir, "docs");
        assert!(gen_config.sort);
        assert!(!gen_config.force);
        assert_eq!(gen_config.param("title"), Some("Weather"));
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ApitConfig = serde_yaml_ng::from_str("force: true\n").unwrap();
        assert!(config.force);
        assert!(config.inputs.is_empty());
        assert_eq!(config.generator_config().outdir, "");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap(), None);
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "sort: [oops").unwrap();
        assert!(load_config(&path).is_err());
    }
}
