use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use sheet_import::ImportSettings;

/// The prefix for environment variable overrides, i.e. `SHEET_IMPORT__ASSET_EXTENSION`.
const ENV_PREFIX: &str = "SHEET_IMPORT";

/// The tool configuration.
#[derive(Debug, Deserialize)]
pub struct HConfig {
    /// The project directory. Its `Assets` folder holds all generated files.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Where pending import state is kept.
    /// Defaults to `.sheet_import/pending.json` inside the project.
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_source_extension")]
    pub source_extension: String,
    #[serde(default = "default_asset_extension")]
    pub asset_extension: String,
    #[serde(default)]
    pub log: HLogConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct HLogConfig {
    pub default: Option<HLogLevel>,
    #[serde(flatten)]
    pub modules: HashMap<String, HLogLevel>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HLogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<HLogLevel> for log::LevelFilter {
    fn from(value: HLogLevel) -> log::LevelFilter {
        use log::LevelFilter;
        match value {
            HLogLevel::Off => LevelFilter::Off,
            HLogLevel::Error => LevelFilter::Error,
            HLogLevel::Warn => LevelFilter::Warn,
            HLogLevel::Info => LevelFilter::Info,
            HLogLevel::Debug => LevelFilter::Debug,
            HLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl HConfig {
    /// Loads the config from a toml file, if it exists, and applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = config_rs::Config::builder()
            .add_source(config_rs::File::from(path).required(false))
            .add_source(config_rs::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("cannot load config {}", path.display()))?;

        let config = config.try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;

        Ok(config)
    }

    /// Gets the path of the pending state file.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        match &self.state_file {
            Some(path) => self.project_root.join(path),
            None => self.project_root.join(".sheet_import").join("pending.json"),
        }
    }

    #[must_use]
    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            source_extension: self.source_extension.clone(),
            asset_extension: self.asset_extension.clone(),
        }
    }
}

impl HLogConfig {
    /// Sets up the global logger. `RUST_LOG` takes precedence over the configured levels.
    pub fn init_logger(&self) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.default.map_or(log::LevelFilter::Info, Into::into));

        for (module, level) in &self.modules {
            builder.filter_module(module, (*level).into());
        }

        builder
            .format_target(false)
            .parse_default_env()
            .init();
    }
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_source_extension() -> String {
    ImportSettings::default().source_extension
}

fn default_asset_extension() -> String {
    ImportSettings::default().asset_extension
}
