use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::mood::{NotificationConfig, SmootherConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorSettings {
    pub use_ollama: bool,
    pub ollama_url: String,
    pub ollama_model: String,
    pub timeout_secs: u64,
    /// Fixed seed for canned reply selection; entropy when absent
    pub seed: Option<u64>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            use_ollama: false,
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "llama2".into(),
            timeout_secs: 30,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub smoother: SmootherConfig,
    pub history_capacity: usize,
    pub alert: NotificationConfig,
    /// Also raise notifications for sustained good moods
    pub celebrate_up: bool,
    pub celebration: NotificationConfig,
    pub generator: GeneratorSettings,
    pub capture: CaptureSettings,
    /// Open sessions quiet for longer than this are treated as crashed at startup
    pub stale_session_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            smoother: SmootherConfig::default(),
            history_capacity: crate::mood::history::DEFAULT_HISTORY_CAPACITY,
            alert: NotificationConfig::default(),
            celebrate_up: false,
            celebration: NotificationConfig::celebration(),
            generator: GeneratorSettings::default(),
            capture: CaptureSettings::default(),
            stale_session_secs: 1800,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> AppSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
