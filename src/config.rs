//! Runtime settings.
//!
//! Layered, lowest precedence first: built-in defaults, the TOML settings
//! file, then environment variables and command-line flags (clap merges
//! those two).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::{ScanArgs, StoreArgs};
use crate::error::{Error, Result};
use crate::platform::DEFAULT_CHECK_IP_URL;
use crate::store::sqlite::default_db_path;
use crate::store::DEFAULT_HORIZON;

const SQLITE_PREFIX: &str = "sqlite:";

/// Where snapshots are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSpec {
    Dir(PathBuf),
    Sqlite(PathBuf),
}

impl StoreSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix(SQLITE_PREFIX) {
            Some(path) => StoreSpec::Sqlite(PathBuf::from(path)),
            None => StoreSpec::Dir(PathBuf::from(spec)),
        }
    }
}

impl fmt::Display for StoreSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreSpec::Dir(path) => write!(f, "{}", path.display()),
            StoreSpec::Sqlite(path) => write!(f, "{SQLITE_PREFIX}{}", path.display()),
        }
    }
}

/// Contents of the settings file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub config_store: Option<PathBuf>,
    pub output: Option<String>,
    pub horizon: Option<String>,
    pub diff_only: Option<bool>,
    pub hook_url: Option<String>,
    pub check_ip_url: Option<String>,
}

impl FileSettings {
    /// Reads the settings file. A missing file at the default location is
    /// fine; a missing file the user asked for is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_settings_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(FileSettings::default()),
            },
        };
        let text = std::fs::read_to_string(&path).map_err(|e| Error::io("read settings", &path, e))?;
        Self::parse(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// ~/.config/bucket-inspector/config.toml or platform equivalent
pub fn default_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "bucket-inspector")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_config_store() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "bucket-inspector")
        .map(|dirs| dirs.data_dir().join("config"))
        .ok_or_else(|| Error::Config("could not determine data directory".to_string()))
}

pub fn parse_horizon(text: &str) -> Result<Duration> {
    humantime::parse_duration(text)
        .map_err(|e| Error::Config(format!("invalid horizon '{text}': {e}")))
}

pub struct Settings {
    pub config_store: PathBuf,
    pub output: StoreSpec,
    pub horizon: Duration,
    pub diff_only: bool,
    pub hook_url: Option<String>,
    pub check_ip_url: String,
    pub json_output: bool,
}

impl Settings {
    pub fn from_scan_args(file: FileSettings, args: &ScanArgs) -> Result<Self> {
        let mut settings = Self::from_store_args(&file, &args.store, args.json)?;
        settings.diff_only = args.diff_only || file.diff_only.unwrap_or(false);
        settings.hook_url = args.hook_url.clone().or(file.hook_url);
        settings.check_ip_url = args
            .check_ip_url
            .clone()
            .or(file.check_ip_url)
            .unwrap_or_else(|| DEFAULT_CHECK_IP_URL.to_string());
        Ok(settings)
    }

    pub fn from_store_args(file: &FileSettings, args: &StoreArgs, json_output: bool) -> Result<Self> {
        let config_store = match args.config_store.clone().or_else(|| file.config_store.clone()) {
            Some(path) => path,
            None => default_config_store()?,
        };

        let output = match args.output.as_deref().or(file.output.as_deref()) {
            Some(spec) => StoreSpec::parse(spec),
            None => StoreSpec::Sqlite(default_db_path()?),
        };

        let horizon = match args.horizon.as_deref().or(file.horizon.as_deref()) {
            Some(text) => parse_horizon(text)?,
            None => DEFAULT_HORIZON,
        };

        Ok(Settings {
            config_store,
            output,
            horizon,
            diff_only: false,
            hook_url: None,
            check_ip_url: DEFAULT_CHECK_IP_URL.to_string(),
            json_output,
        })
    }
}
