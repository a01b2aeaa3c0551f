use std::path::{Path, PathBuf};

use anyhow::Context;

use super::backend::parse_api_base;
use super::models::RuntimeSettings;

pub const API_BASE_ENV: &str = "RESUME_STUDIO_API_BASE";

const APP_DIR: &str = "ResumeStudio";
const SETTINGS_FILE: &str = "settings.json";

/// Persisted `RuntimeSettings` plus the address overrides that sit above the
/// file: the environment first, then an explicit caller value.
pub struct SettingsStore {
    file_path: PathBuf,
    api_base_overrides: Vec<String>,
}

impl SettingsStore {
    /// Store at the per-user location, honouring `RESUME_STUDIO_API_BASE`.
    pub fn new() -> Self {
        let mut store = Self::new_with_path(app_data_root().join(SETTINGS_FILE));
        if let Ok(value) = std::env::var(API_BASE_ENV) {
            store = store.with_api_base(Some(value));
        }
        store
    }

    pub fn new_with_path(file_path: PathBuf) -> Self {
        Self {
            file_path,
            api_base_overrides: Vec::new(),
        }
    }

    /// Layers another address over the file value. Later layers win; blank
    /// values are skipped.
    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        if let Some(value) = api_base.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.api_base_overrides.push(value);
        }
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// File contents (or defaults) with the overrides applied. The resulting
    /// address must be a usable http(s) base.
    pub async fn load(&self) -> anyhow::Result<RuntimeSettings> {
        let mut settings = self.read_file().await?.unwrap_or_default();
        if let Some(api_base) = self.api_base_overrides.last() {
            settings.api_base = api_base.clone();
        }

        parse_api_base(&settings.api_base)?;
        Ok(settings)
    }

    pub async fn save(&self, settings: &RuntimeSettings) -> anyhow::Result<()> {
        parse_api_base(&settings.api_base)?;
        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.file_path, json)
            .await
            .with_context(|| format!("failed to write settings file {}", self.file_path.display()))
    }

    async fn read_file(&self) -> anyhow::Result<Option<RuntimeSettings>> {
        let content = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read settings file {}", self.file_path.display())
                })
            }
        };

        serde_json::from_str(&content).map(Some).with_context(|| {
            format!("invalid JSON in settings file {}", self.file_path.display())
        })
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn app_data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
