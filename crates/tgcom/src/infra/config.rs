//! Layered configuration: embedded defaults, global file, workspace file,
//! then environment.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::domain::model::Action;

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
const WORKSPACE_CONFIG_PATH: &str = ".tgcom/config.toml";

/// Effective settings after every layer has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub defaults: Defaults,
    /// User-defined languages keyed by name, merged over the built-in table.
    pub languages: BTreeMap<String, CustomLanguage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Defaults {
    pub action: Action,
    /// Language used when reading standard input without `--language`.
    pub language: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomLanguage {
    pub marker: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// `TGCOM_ACTION` and `TGCOM_LANGUAGE`.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    action: Option<String>,
    language: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            action: env::var("TGCOM_ACTION").ok(),
            language: env::var("TGCOM_LANGUAGE").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(action: &str, language: &str) -> Self {
        Self {
            action: Some(action.to_owned()),
            language: Some(language.to_owned()),
        }
    }
}

/// One configuration file. Keys left unset fall through to lower layers.
#[derive(Debug, Default, Deserialize)]
struct Layer {
    #[serde(default)]
    defaults: DefaultsLayer,
    #[serde(default)]
    languages: BTreeMap<String, CustomLanguage>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsLayer {
    action: Option<Action>,
    language: Option<String>,
    dry_run: Option<bool>,
}

impl Layer {
    fn read(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse TOML config")
    }
}

impl Config {
    /// Load the embedded defaults, then the global and workspace files, then
    /// `TGCOM_*` environment overrides.
    pub fn load() -> Result<Self> {
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, Some(workspace), EnvOverrides::from_env())
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut config = Config::default();
        let defaults = Layer::parse(&DEFAULT_CONFIG)
            .context("embedded default config is invalid")?;
        config.overlay(defaults);

        for (scope, path) in [("global", global), ("workspace", workspace)] {
            let Some(path) = path.filter(|path| path.is_file()) else {
                continue;
            };
            tracing::debug!(scope, path = %path.display(), "loading config layer");
            config.overlay(Layer::read(&path)?);
        }

        apply_env_overrides(config, env_overrides)
    }

    fn overlay(&mut self, layer: Layer) {
        let defaults = layer.defaults;
        if let Some(action) = defaults.action {
            self.defaults.action = action;
        }
        if let Some(language) = defaults.language {
            self.defaults.language = Some(language);
        }
        if let Some(dry_run) = defaults.dry_run {
            self.defaults.dry_run = dry_run;
        }
        self.languages.extend(layer.languages);
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("tgcom").join("config.toml"))
}

// Workspace config lives at the repository root, or in the current
// directory outside a repository.
fn workspace_config_path() -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(root.join(WORKSPACE_CONFIG_PATH))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(action) = env.action {
        config.defaults.action = action
            .parse()
            .context("invalid TGCOM_ACTION environment variable")?;
    }
    if let Some(language) = env.language.filter(|value| !value.trim().is_empty()) {
        config.defaults.language = Some(language);
    }
    Ok(config)
}
