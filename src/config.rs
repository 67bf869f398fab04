use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    speaker::RetryPolicy,
};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub speaker: SpeakerConfig,
    pub news: NewsConfig,
    pub weather: WeatherConfig,
    pub health: HealthConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SpeakerConfig {
    /// text to speech program, the text is passed as its last argument
    /// when unset utterances only go to stdout and the log
    pub command: Option<String>,
    pub args: Vec<String>,
    pub retry_interval_secs: u64,
    /// no limit when unset
    pub max_attempts: Option<u32>,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            retry_interval_secs: 5,
            max_attempts: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct NewsConfig {
    pub base_url: String,
    pub key: String,
    pub country: String,
    /// read the article body as well as the headline
    pub extended: bool,
    pub quantity: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2/top-headlines".to_string(),
            key: String::new(),
            country: "gb".to_string(),
            extended: false,
            quantity: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub key: String,
    pub city: String,
    pub extended: bool,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            key: String::new(),
            city: "Exeter".to_string(),
            extended: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HealthConfig {
    pub base_url: String,
    pub area_type: String,
    pub area_name: String,
    pub extended: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coronavirus.data.gov.uk/v1/data".to_string(),
            area_type: "nation".to_string(),
            area_name: "england".to_string(),
            extended: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// show weather and health cards above the news
    pub extras: bool,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// if the file can't be read or isn't valid toml
    pub fn load(path: &Path) -> Result<Self> {
        let config = std::fs::read_to_string(path).map_err(|source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&config)?)
    }

    /// # Errors
    /// if the config dir or file can't be written
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = toml::to_string(self)?;
        let io_err = |source| Error::ConfigIo {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, config).map_err(io_err)
    }

    /// # Errors
    /// if the platform has no notion of a config directory
    pub fn config_path() -> Result<PathBuf> {
        let mut path = directories::ProjectDirs::from("", "", "roosty_reminder")
            .ok_or(Error::NoConfigDir)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    #[must_use]
    pub fn is_config_present() -> bool {
        Self::config_path().is_ok_and(|path| path.exists())
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_secs(self.speaker.retry_interval_secs),
            max_attempts: self.speaker.max_attempts,
        }
    }
}
