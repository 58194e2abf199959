use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub debug: bool,
    pub database_uri: String,
    pub upload_folder: PathBuf,
    pub allowed_extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secret_key: "your_default_secret_key".to_string(),
            debug: false,
            database_uri: "sqlite:///app.db".to_string(),
            upload_folder: PathBuf::from("uploads/"),
            allowed_extensions: ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    secret_key: Option<String>,
    debug: Option<bool>,
    database_uri: Option<String>,
    upload_folder: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.apply_env();

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        let content = fs::read_to_string(extra)
            .with_context(|| format!("failed to read settings: {}", extra.display()))?;
        let parsed: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse settings: {}", extra.display()))?;
        settings.merge(parsed);
    }

    Ok(settings)
}

impl Settings {
    fn apply_env(&mut self) {
        if let Some(value) = non_empty_env("SECRET_KEY") {
            self.secret_key = value;
        }
        if let Some(value) = non_empty_env("DEBUG") {
            self.debug = matches!(value.to_lowercase().as_str(), "true" | "1");
        }
        if let Some(value) = non_empty_env("DATABASE_URI") {
            self.database_uri = value;
        }
        if let Some(value) = non_empty_env("UPLOAD_FOLDER") {
            self.upload_folder = PathBuf::from(value);
        }
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(key) = server.secret_key {
                if !key.trim().is_empty() {
                    self.secret_key = key;
                }
            }
            if let Some(debug) = server.debug {
                self.debug = debug;
            }
            if let Some(uri) = server.database_uri {
                if !uri.trim().is_empty() {
                    self.database_uri = uri;
                }
            }
            if let Some(folder) = server.upload_folder {
                if !folder.trim().is_empty() {
                    self.upload_folder = PathBuf::from(folder);
                }
            }
        }
    }

    pub fn is_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let lower = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| allowed == &lower)
            })
            .unwrap_or(false)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
