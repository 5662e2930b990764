use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_LOG_FILTER: &str = "info";
const SESSION_DIR: &str = "gym-admin";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Memory,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::File => "file",
            StorageKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub storage: StorageKind,
    pub session_file: PathBuf,
    pub log_filter: String,
}

impl ClientConfig {
    /// Config pointing at `api_base_url` with in-memory session storage.
    pub fn in_memory(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(&api_base_url.into()),
            storage: StorageKind::Memory,
            session_file: default_session_file(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

pub fn load_client_config() -> Result<ClientConfig> {
    let api_base_url = env::var("GYM_API_BASE_URL")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .map(|value| normalize_base_url(&value))
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let storage = env::var("GYM_SESSION_STORAGE")
        .ok()
        .map(|value| parse_storage_kind(&value))
        .transpose()
        .context("Failed to parse GYM_SESSION_STORAGE")?
        .unwrap_or(StorageKind::File);

    let session_file = env::var("GYM_SESSION_FILE")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .map(PathBuf::from)
        .unwrap_or_else(default_session_file);

    let log_filter = env::var("GYM_LOG")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(ClientConfig {
        api_base_url,
        storage,
        session_file,
        log_filter,
    })
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SESSION_DIR)
        .join(SESSION_FILE)
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_storage_kind(value: &str) -> Result<StorageKind> {
    match value.trim().to_ascii_lowercase().as_str() {
        "file" => Ok(StorageKind::File),
        "memory" => Ok(StorageKind::Memory),
        other => Err(anyhow!(
            "Unsupported session storage '{other}'. Use file or memory."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slashes() {
        assert_eq!(normalize_base_url(" http://gym.test/api// "), "http://gym.test/api");
        let config = ClientConfig::in_memory("http://127.0.0.1:5000/api/");
        assert_eq!(config.api_base_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.storage, StorageKind::Memory);
    }

    #[test]
    fn storage_kind_parses_case_insensitively() {
        assert_eq!(parse_storage_kind("Memory").expect("memory"), StorageKind::Memory);
        assert_eq!(parse_storage_kind(" file ").expect("file"), StorageKind::File);
        assert!(parse_storage_kind("redis").is_err());
    }

    #[test]
    fn default_session_file_lives_under_app_dir() {
        let path = default_session_file();
        assert!(path.ends_with("gym-admin/session.json"));
    }

    #[test]
    fn blank_values_are_ignored() {
        assert_eq!(normalize_optional("   "), None);
        assert_eq!(normalize_optional(" debug "), Some("debug".to_string()));
    }
}
