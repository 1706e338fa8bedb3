//! Client configuration.
//!
//! Stored as TOML at `~/.config/televault/config.toml` (or under
//! `$XDG_CONFIG_HOME` when set). The file holds the bot token, so it is
//! written with mode 0600 on Unix.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use televault_index::INDEX_FILE_NAME;
use televault_vault::DEFAULT_MAX_UPLOAD_SIZE;

/// Client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bot API token.
    #[serde(default)]
    pub bot_token: String,

    /// Channel the files are sent to (numeric id or `@name`).
    #[serde(default)]
    pub chat_id: String,

    /// Bot API server, for a self-hosted instance.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Directory holding the file index.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Where downloads land unless `--dest` is given.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

// Keeps the token out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &if self.bot_token.is_empty() { "" } else { "<redacted>" })
            .field("chat_id", &self.chat_id)
            .field("api_base_url", &self.api_base_url)
            .field("data_dir", &self.data_dir)
            .field("download_dir", &self.download_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".into()
}

fn default_data_dir() -> String {
    "~/.config/televault".into()
}

fn default_download_dir() -> String {
    "~/Documents/TeleVault/Download".into()
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base_url: default_api_base_url(),
            data_dir: default_data_dir(),
            download_dir: default_download_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Config {
    /// Loads the configuration at `path`, writing a default one first if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "wrote default configuration");
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Whether the remote credentials are filled in.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    /// Full path of the file index.
    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.data_dir).join(INDEX_FILE_NAME)
    }

    pub fn download_path(&self) -> PathBuf {
        expand_path(&self.download_dir)
    }
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    config_base_dir().join("televault").join("config.toml")
}

fn config_base_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}

/// Expands a leading `~/` to `$HOME`.
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}
