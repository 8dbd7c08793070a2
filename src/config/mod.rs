use anyhow::Context;
use config::{ConfigError, Map, Source, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineConfig;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Prefix of environment overrides, e.g. `BANMAP_PATHS__LOG_FILE`
pub const ENV_PREFIX: &str = "BANMAP";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub settings: SettingsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub log_file: PathBuf,
    pub geoip_city_db: PathBuf,
    pub geoip_asn_db: PathBuf,
    /// Where the latest report is stored
    pub output_json: PathBuf,
    /// Directory containing the dashboard front-end
    /// If None, only the JSON endpoints are served
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub jail_name: String,
    /// Comma-separated MaxMind locales, highest priority first
    pub locales: String,
    pub server_latitude: f64,
    pub server_longitude: f64,
    pub server_name: String,
    pub default_view: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Map view settings handed to the dashboard alongside the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub default_view: String,
}

impl SettingsConfig {
    pub fn locale_list(&self) -> Vec<String> {
        self.locales
            .split(',')
            .map(str::trim)
            .filter(|locale| !locale.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Config {
    /// Load configuration from a file and the environment
    ///
    /// The file is `path` if given, else `$BANMAP_CONFIG`, else `config.ini`.
    /// An explicitly named file must exist; the default one is optional.
    /// Environment variables override file values.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match std::env::var_os("BANMAP_CONFIG") {
                Some(path) => (PathBuf::from(path), true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        let settings = Self::defaults()?
            .add_source(LowercaseSections(
                config::File::from(file.as_path()).required(required),
            ))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?;

        let config: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.settings.jail_name.trim().is_empty() {
            anyhow::bail!("settings.jail_name must not be empty");
        }
        if config.settings.locale_list().is_empty() {
            tracing::warn!("No GeoIP locales configured, falling back to 'en'");
        }

        Ok(config)
    }

    fn defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("paths.log_file", "/var/log/fail2ban.log")?
            .set_default("paths.geoip_city_db", "GeoLite2-City.mmdb")?
            .set_default("paths.geoip_asn_db", "GeoLite2-ASN.mmdb")?
            .set_default("paths.output_json", "data/report.json")?
            .set_default("settings.jail_name", "sshd")?
            .set_default("settings.locales", "zh-CN")?
            .set_default("settings.server_latitude", 0.0)?
            .set_default("settings.server_longitude", 0.0)?
            .set_default("settings.server_name", "server")?
            .set_default("settings.default_view", "native")?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?)
    }

    /// Inputs for a pipeline run
    pub fn pipeline(&self) -> PipelineConfig {
        let mut locales = self.settings.locale_list();
        if locales.is_empty() {
            locales.push("en".to_string());
        }

        PipelineConfig {
            log_file: self.paths.log_file.clone(),
            jail_name: self.settings.jail_name.clone(),
            city_db: self.paths.geoip_city_db.clone(),
            asn_db: self.paths.geoip_asn_db.clone(),
            locales,
        }
    }

    pub fn dashboard_view(&self) -> DashboardView {
        DashboardView {
            lat: self.settings.server_latitude,
            lon: self.settings.server_longitude,
            name: self.settings.server_name.clone(),
            default_view: self.settings.default_view.clone(),
        }
    }
}

/// Wraps a file source so `[Paths]` and `[paths]` name the same section
#[derive(Debug, Clone)]
struct LowercaseSections<S>(S);

impl<S> Source for LowercaseSections<S>
where
    S: Source + Clone + Send + Sync + 'static,
{
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self
            .0
            .collect()?
            .into_iter()
            .map(|(section, value)| (section.to_lowercase(), value))
            .collect())
    }
}
