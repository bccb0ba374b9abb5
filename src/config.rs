use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_RECENT_LIMIT: usize = 10;

/// Per-user data directory holding the database, `config.json` and `logs/`.
static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fyyur")
});

fn default_config_path() -> PathBuf {
    DATA_ROOT.join("config.json")
}

/// Create the directory `path` will be written into. A failure is only
/// logged; the open or write that follows reports the real error.
pub(crate) fn ensure_parent(path: &Path) {
    let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return;
    };
    if let Err(err) = fs::create_dir_all(parent) {
        warn!(dir = %parent.display(), error = %err, "could not create directory");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    /// IANA zone used to read naive submitted times and to render start times.
    pub display_timezone: String,
    /// How many venues and artists the home page lists.
    pub recent_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_dir: None,
            debug: false,
            display_timezone: DEFAULT_TIMEZONE.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.display_timezone
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid display_timezone {:?}: {err}", self.display_timezone))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| DATA_ROOT.join("fyyur.sqlite"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| DATA_ROOT.join("logs"))
    }

    /// Apply a `config set` key. Values are validated before they are stored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "database_path" => self.database_path = Some(PathBuf::from(value)),
            "log_dir" => self.log_dir = Some(PathBuf::from(value)),
            "debug" => self.debug = parse_flag(value),
            "display_timezone" => {
                value
                    .parse::<Tz>()
                    .map_err(|err| anyhow!("invalid display_timezone {value:?}: {err}"))?;
                self.display_timezone = value.to_string();
            }
            "recent_limit" => {
                self.recent_limit = value
                    .parse()
                    .with_context(|| format!("recent_limit must be a number, got {value:?}"))?;
            }
            other => bail!("unknown config key {other:?}"),
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("FYYUR_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var("FYYUR_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Ok(flag) = std::env::var("FYYUR_DEBUG") {
            self.debug = parse_flag(&flag);
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let mut data = read_config(&path)?;
        data.apply_env();
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig) -> Result<()>,
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| anyhow!("config mutex poisoned"))?;
        let mut next = guard.clone();
        transform(&mut next)?;
        write_config(&self.path, &next)?;
        *guard = next;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    ensure_parent(path);
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).with_context(|| format!("failed to write config {}", path.display()))
}
