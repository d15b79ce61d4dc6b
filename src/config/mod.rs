//! Service configuration.
//!
//! Configuration is read from `~/.config/tributary/config.toml` unless a path is
//! given on the command line. If the default file doesn't exist, a commented
//! starter configuration is written there. `$VAR` and `${VAR}` references are
//! expanded from the environment before parsing, so secrets can stay out of the
//! file.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;

/// Default polling interval for non-weather sections.
pub const DEFAULT_SECTION_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Default polling interval for weather sections.
pub const DEFAULT_WEATHER_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Default lifetime of cached API snapshots.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);

const MIN_WEATHER_INTERVAL: Duration = Duration::from_secs(10 * 60);
const MIN_SECTION_INTERVAL: Duration = Duration::from_secs(60);

pub const REGIONS: [&str; 5] = ["top-left", "top-right", "center", "bottom-left", "bottom-right"];

static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
});

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Signed so out-of-range values reach validation instead of failing to parse.
    pub port: i64,
    pub update_interval: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            update_interval: None,
        }
    }
}

impl ServerConfig {
    pub fn update_interval(&self) -> Result<Duration, ConfigError> {
        match &self.update_interval {
            Some(s) => parse_interval(s).map_err(ConfigError::Invalid),
            None => Ok(DEFAULT_UPDATE_INTERVAL),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Weather,
    Rss,
    Calendar,
    #[serde(other)]
    Unknown,
}

/// One dashboard section, backed by a single registered source.
#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub weather: Option<WeatherConfig>,
    #[serde(default)]
    pub rss: Option<RssConfig>,
    #[serde(default)]
    pub calendars: Vec<CalendarSourceConfig>,
}

impl Section {
    /// The configured interval, or the default for this kind of section.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        match &self.interval {
            Some(s) => parse_interval(s).map_err(|e| {
                ConfigError::Invalid(format!("invalid interval '{}' for section '{}': {}", s, self.id, e))
            }),
            None if self.kind == SectionKind::Weather => Ok(DEFAULT_WEATHER_INTERVAL),
            None => Ok(DEFAULT_SECTION_INTERVAL),
        }
    }

    fn min_interval(&self) -> Duration {
        match self.kind {
            SectionKind::Weather => MIN_WEATHER_INTERVAL,
            _ => MIN_SECTION_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub city: String,
    pub units: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RssConfig {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    Ical,
    Caldav,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSourceConfig {
    #[serde(rename = "type")]
    pub kind: CalendarKind,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from the default path if none is given.
    ///
    /// A missing default file is created with starter content. A missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                }
                p
            }
        };

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let expanded = expand_env(&content, |name| std::env::var(name).ok());

        toml::from_str(&expanded).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/tributary/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("tributary").join("config.toml"))
    }

    /// Check everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=65535).contains(&self.server.port) {
            return Err(ConfigError::Invalid(format!(
                "invalid server port: {}",
                self.server.port
            )));
        }
        self.server.update_interval()?;

        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(ConfigError::Invalid("section id must not be empty".into()));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate section id '{}'",
                    section.id
                )));
            }

            if let Some(region) = &section.region {
                if !region.is_empty() && !REGIONS.contains(&region.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "invalid region '{}' for section '{}'",
                        region, section.id
                    )));
                }
            }

            if let Some(raw) = &section.interval {
                let interval = section.interval()?;
                let min = section.min_interval();
                if interval < min {
                    return Err(ConfigError::Invalid(format!(
                        "interval '{}' for section '{}' is too short (minimum {})",
                        raw,
                        section.id,
                        format_interval(min)
                    )));
                }
            }
        }

        Ok(())
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!(path = %path.display(), "created default configuration");
        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# Tributary configuration
#
# Intervals accept "90s", "15m", "1h", "1d" or a number of seconds.
# $VAR and ${VAR} are replaced with environment variables before parsing.

[server]
host = "0.0.0.0"
port = 8080
# Lifetime of snapshots kept for incremental /api/updates responses
update_interval = "5m"

[[sections]]
id = "weather"
type = "weather"
region = "top-left"
interval = "10m"

[sections.weather]
api_key = "${OPENWEATHER_API_KEY}"
city = "London"
units = "metric"

[[sections]]
id = "news"
type = "rss"
region = "top-right"
interval = "15m"

[sections.rss]
url = "https://blog.rust-lang.org/feed.xml"

# [[sections]]
# id = "agenda"
# type = "calendar"
# region = "center"
#
# [[sections.calendars]]
# type = "ical"
# name = "holidays"
# url = "https://example.com/holidays.ics"
#
# [[sections.calendars]]
# type = "caldav"
# name = "family"
# url = "https://dav.example.com/"
# username = "me"
# password = "${CALDAV_PASSWORD}"
"##
    }
}

/// Replace `$NAME` and `${NAME}` with `lookup(NAME)`, or nothing if unset.
pub fn expand_env<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

/// Parse interval string like "1h", "30m", "90s", "1d" or raw seconds.
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60)
    } else if let Some(days) = s.strip_suffix('d') {
        (days, 86400)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(unit))
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
}

/// Format interval for display
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 86400 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}
