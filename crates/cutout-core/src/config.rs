use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_SEGMENTER_URL: &str = "http://127.0.0.1:7000/api/remove";
pub const DEFAULT_SEGMENTER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_HEIGHT_LIMIT: u32 = 10_000;
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024; // Bot API download cap

/// Top-level config (cutout.toml + CUTOUT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CutoutConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Composition engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Directory holding the background templates (`.png`, `.jpg`, `.jpeg`).
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// rembg-compatible endpoint accepting a multipart `file` field and
    /// answering with a PNG cutout.
    #[serde(default = "default_segmenter_url")]
    pub segmenter_url: String,
    #[serde(default = "default_segmenter_timeout_secs")]
    pub segmenter_timeout_secs: u64,
    /// Largest height (px) a user may request.
    #[serde(default = "default_max_height_limit")]
    pub max_height_limit: u32,
    /// When set, every finished composition is also written here.
    #[serde(default)]
    pub archive_dir: Option<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            segmenter_url: default_segmenter_url(),
            segmenter_timeout_secs: DEFAULT_SEGMENTER_TIMEOUT_SECS,
            max_height_limit: DEFAULT_MAX_HEIGHT_LIMIT,
            archive_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Usernames (with or without `@`), numeric ids, or `"*"`.
    /// An empty list denies everyone.
    #[serde(default = "default_allow_users")]
    pub allow_users: Vec<String>,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
    /// Send results as documents so Telegram does not recompress them.
    #[serde(default)]
    pub send_as_document: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_templates_dir() -> String {
    "templates".to_string()
}
fn default_segmenter_url() -> String {
    DEFAULT_SEGMENTER_URL.to_string()
}
fn default_segmenter_timeout_secs() -> u64 {
    DEFAULT_SEGMENTER_TIMEOUT_SECS
}
fn default_max_height_limit() -> u32 {
    DEFAULT_MAX_HEIGHT_LIMIT
}
fn default_allow_users() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_max_attachment_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cutout/cutout.db", home)
}

impl CutoutConfig {
    /// Load config from a TOML file with CUTOUT_* env var overrides.
    ///
    /// Nested keys use a double underscore: `CUTOUT_TELEGRAM__BOT_TOKEN`.
    /// A missing file is not an error; defaults fill every section.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CutoutConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CUTOUT_").split("__"))
            .extract()
            .map_err(|e| crate::error::CutoutError::Config(e.to_string()))?;

        Ok(config)
    }
}

impl CutoutConfig {
    /// Create the database's parent directory and the archive directory.
    pub fn ensure_dirs(&self) -> crate::error::Result<()> {
        if let Some(parent) = Path::new(&self.database.path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Some(dir) = &self.compose.archive_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cutout/cutout.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = CutoutConfig::load(Some("/nonexistent/cutout.toml")).expect("load");
        assert_eq!(cfg.gateway.port, DEFAULT_PORT);
        assert_eq!(cfg.compose.max_height_limit, DEFAULT_MAX_HEIGHT_LIMIT);
        assert!(cfg.telegram.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"
[compose]
templates_dir = "/srv/templates"
segmenter_timeout_secs = 5
archive_dir = "/srv/output"

[telegram]
bot_token = "123:abc"
"#
        )
        .expect("write");

        let cfg = CutoutConfig::load(file.path().to_str()).expect("load");
        assert_eq!(cfg.compose.templates_dir, "/srv/templates");
        assert_eq!(cfg.compose.segmenter_timeout_secs, 5);
        assert_eq!(cfg.compose.archive_dir.as_deref(), Some("/srv/output"));
        assert_eq!(cfg.compose.segmenter_url, DEFAULT_SEGMENTER_URL);

        let tg = cfg.telegram.expect("telegram section");
        assert_eq!(tg.bot_token, "123:abc");
        assert_eq!(tg.allow_users, vec!["*".to_string()]);
        assert_eq!(tg.max_attachment_bytes, DEFAULT_MAX_ATTACHMENT_BYTES);
        assert!(!tg.send_as_document);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "[gateway]\nport = \"not a number\"").expect("write");
        let err = CutoutConfig::load(file.path().to_str()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn ensure_dirs_creates_db_parent_and_archive() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut cfg = CutoutConfig::default();
        cfg.database.path = root.path().join("data/cutout.db").display().to_string();
        cfg.compose.archive_dir = Some(root.path().join("out/posts").display().to_string());

        cfg.ensure_dirs().expect("ensure_dirs");
        assert!(root.path().join("data").is_dir());
        assert!(root.path().join("out/posts").is_dir());
        assert!(!root.path().join("data/cutout.db").exists());
    }

    #[test]
    fn ensure_dirs_reports_io_failure() {
        let root = tempfile::tempdir().expect("tempdir");
        let blocker = root.path().join("file");
        std::fs::write(&blocker, b"x").expect("write");

        let mut cfg = CutoutConfig::default();
        cfg.database.path = blocker.join("cutout.db").display().to_string();
        let err = cfg.ensure_dirs().unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
    }
}
