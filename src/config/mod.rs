use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::config::themes::{ThemeName, ThemeRegistry};
use crate::view::SortSpec;

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Daybook";
const APP_NAME: &str = "daybook";

pub const CONFIG_ENV: &str = "DAYBOOK_CONFIG";
pub const DATA_ENV: &str = "DAYBOOK_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths);
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths);
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());

        Ok(Self {
            config_dir,
            config_file,
            data_dir,
        })
    }

    /// Paths rooted under a single directory, used by tests and portable setups.
    pub fn rooted(root: &Path) -> Self {
        let config_dir = root.join("config");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            data_dir: root.join("data"),
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: String,
    pub date_format: DateFormat,
    /// JSON dataset to load instead of the built-in sample data. Relative
    /// paths resolve against the data directory.
    pub dataset: Option<PathBuf>,
    pub default_sort: SortSpec,
    pub search: SearchOptions,
    pub backup: BackupOptions,
    pub notifications: NotificationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: ThemeName::Light.to_string(),
            date_format: DateFormat::default(),
            dataset: None,
            default_sort: SortSpec::default(),
            search: SearchOptions::default(),
            backup: BackupOptions::default(),
            notifications: NotificationSettings::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) {
        if ThemeRegistry::default().resolve(&self.theme).is_none() {
            tracing::warn!(theme = %self.theme, "unknown theme in config, falling back to light");
            self.theme = ThemeName::Light.to_string();
        }
        if let Some(dataset) = self.dataset.take() {
            self.dataset = Some(if dataset.is_relative() {
                paths.data_dir.join(dataset)
            } else {
                dataset
            });
        }
    }

    pub fn theme_name(&self) -> ThemeName {
        ThemeRegistry::default()
            .resolve(&self.theme)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_results: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { max_results: 200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupOptions {
    /// Pending backups older than this many seconds are failed.
    pub timeout_secs: u64,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl BackupOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub app: bool,
    pub system: bool,
    pub email: bool,
    pub reminder_sound: bool,
    pub daily_summary: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            app: true,
            system: true,
            email: false,
            reminder_sound: true,
            daily_summary: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "yyyy-MM-dd")]
    IsoDash,
    #[serde(rename = "yyyy/MM/dd")]
    IsoSlash,
    #[serde(rename = "dd/MM/yyyy")]
    DayFirst,
    #[serde(rename = "MM/dd/yyyy")]
    MonthFirst,
}

impl DateFormat {
    pub fn format(self, date: Date) -> String {
        let rendered = match self {
            Self::IsoDash => date.format(format_description!("[year]-[month]-[day]")),
            Self::IsoSlash => date.format(format_description!("[year]/[month]/[day]")),
            Self::DayFirst => date.format(format_description!("[day]/[month]/[year]")),
            Self::MonthFirst => date.format(format_description!("[month]/[day]/[year]")),
        };
        rendered.unwrap_or_else(|_| date.to_string())
    }
}
