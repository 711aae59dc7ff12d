use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogError, TableCatalog, TableDefinition};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Mysql,
    #[default]
    Memory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    Disabled,
    #[default]
    Prefer,
    Require,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PasswordSource {
    #[default]
    EnvVar,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: Option<String>,
    #[serde(default)]
    pub tls_mode: TlsMode,
    #[serde(default)]
    pub tls_ca_cert_path: Option<String>,
    #[serde(default)]
    pub password_source: PasswordSource,
    #[serde(default)]
    pub keyring_service: Option<String>,
    #[serde(default)]
    pub keyring_account: Option<String>,
}

impl ConnectionProfile {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 3306,
            user: user.into(),
            database: None,
            tls_mode: TlsMode::Prefer,
            tls_ca_cert_path: None,
            password_source: PasswordSource::EnvVar,
            keyring_service: None,
            keyring_account: None,
        }
    }
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        let mut profile = Self::new("127.0.0.1", "root");
        profile.database = Some("library".to_string());
        profile
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserSettings {
    pub default_table: String,
    pub confirm_delete: bool,
    pub notice_millis: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            default_table: "Books".to_string(),
            confirm_delete: true,
            notice_millis: 1_500,
        }
    }
}

impl BrowserSettings {
    #[must_use]
    pub fn notice_delay(&self) -> Duration {
        Duration::from_millis(self.notice_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub connection: ConnectionProfile,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableDefinition>,
}

impl Settings {
    /// The declared tables, or the library schema when none are configured.
    pub fn catalog(&self) -> Result<TableCatalog, CatalogError> {
        if self.tables.is_empty() {
            return Ok(TableCatalog::library());
        }
        TableCatalog::new(self.tables.clone())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read settings file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to create config directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {source}")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to write settings file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl FileSettingsStore {
    pub fn load_default() -> Result<Self, SettingsError> {
        let path = default_settings_path()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                settings: Settings::default(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| SettingsError::Read {
            path: path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                settings: Settings::default(),
            });
        }

        let settings = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, settings })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Where the log goes unless the settings name a file: next to the settings.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.settings.logging.file.clone().unwrap_or_else(|| {
            self.path
                .parent()
                .map_or_else(|| PathBuf::from("shelf.log"), |dir| dir.join("shelf.log"))
        })
    }

    /// Writes the current settings when no file exists yet; `true` when it wrote one.
    pub fn write_if_missing(&self) -> Result<bool, SettingsError> {
        if self.path.exists() {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<(), SettingsError> {
        if let Some(parent_dir) = self.path.parent() {
            fs::create_dir_all(parent_dir).map_err(|source| SettingsError::CreateDir {
                path: parent_dir.to_path_buf(),
                source,
            })?;
        }

        let rendered = toml::to_string_pretty(&self.settings)
            .map_err(|source| SettingsError::Serialize { source })?;

        fs::write(&self.path, rendered).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    if let Some(custom) = env::var_os("SHELF_CONFIG_DIR") {
        return Ok(PathBuf::from(custom).join("config.toml"));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(SettingsError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(SettingsError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("shelf").join("config.toml"))
}
