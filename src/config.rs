//! Configuration for the tasklog server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload request body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON document holding every report log
    #[serde(default = "default_logs_path")]
    pub logs_path: PathBuf,

    /// Directory attachment binaries are written to
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// URL prefix stored binaries are served under
    #[serde(default = "default_uploads_url_prefix")]
    pub uploads_url_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,

    #[serde(default = "default_staff_prefix")]
    pub staff_prefix: String,

    /// HS256 secret; without it role claims are read unverified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the task/staff/auth backend
    #[serde(default = "default_remote_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for task list fetches
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay, doubled on every further attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3040
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_logs_path() -> PathBuf {
    PathBuf::from("data/report-logs.json")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("public/uploads")
}

fn default_uploads_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_admin_prefix() -> String {
    "/admin".to_string()
}

fn default_staff_prefix() -> String {
    "/staff".to_string()
}

fn default_remote_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            logs_path: default_logs_path(),
            uploads_dir: default_uploads_dir(),
            uploads_url_prefix: default_uploads_url_prefix(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            login_path: default_login_path(),
            admin_prefix: default_admin_prefix(),
            staff_prefix: default_staff_prefix(),
            jwt_secret: None,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Config {
    /// Default config path
    pub fn default_path() -> Result<PathBuf> {
        // Check environment variable first
        if let Ok(env_path) = std::env::var("TASKLOG_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Ok(local);
        }

        // Docker default
        let data_config = PathBuf::from("/data/config.toml");
        if data_config.exists() {
            return Ok(data_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("tasklog");

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from default path
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let with_comments = format!(
            "# tasklog configuration\n\n\
             {}\n\
             # Set auth.jwt_secret to verify session token signatures.\n",
            content
        );

        std::fs::write(path, with_comments).context("Failed to write config file")?;

        Ok(())
    }
}
