//! Host configuration: defaults, optional TOML file, then `MINIHUB__*` environment overrides.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | bind_addr | 127.0.0.1:3000 | Gateway listen address. |
//! | root_dir | . | Base directory; the relative paths below resolve against it. |
//! | apps_dir | apps | Directory holding one subdirectory per app. |
//! | site_dir | site | Landing site served at `/`. |
//! | entry_point | server.js | Host entry-point source carrying the mount blocks. |
//! | mount_marker | `// {{APP_MOUNT_POINT}}` | Sentinel line new blocks are inserted before. |
//! | protected_apps | app-builder, app-manager, md-chat, pic-chat, gen-studio | Infrastructure slugs. |
//! | backend_url | unset | Runtime that executes app route modules; `/api/<slug>` is forwarded there. |
//! | watch_entry_point | true | Rescan the mount registry when the entry point changes on disk. |

use crate::error::HubResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MOUNT_MARKER: &str = "// {{APP_MOUNT_POINT}}";
pub const DEFAULT_LOCAL_API_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

const ENV_CONFIG_PATH: &str = "MINIHUB_CONFIG";
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

fn default_protected_apps() -> Vec<String> {
    ["app-builder", "app-manager", "md-chat", "pic-chat", "gen-studio"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    4096
}

/// Settings for the external text-generation services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API (LM Studio by default).
    #[serde(default = "default_local_api_url")]
    pub local_api_url: String,
    #[serde(default)]
    pub local_api_key: Option<String>,
    /// Model used when a local request does not name one.
    #[serde(default)]
    pub default_local_model: Option<String>,
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,
    /// Falls back to `GEMINI_API_KEY` when unset.
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_gemini_model")]
    pub default_gemini_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout; unset leaves the HTTP client's own behavior in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_local_api_url() -> String {
    DEFAULT_LOCAL_API_URL.to_string()
}

fn default_gemini_api_url() -> String {
    DEFAULT_GEMINI_API_URL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            local_api_url: default_local_api_url(),
            local_api_key: None,
            default_local_model: None,
            gemini_api_url: default_gemini_api_url(),
            gemini_api_key: None,
            default_gemini_model: default_gemini_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

impl GenerationConfig {
    /// Configured Gemini key, else `GEMINI_API_KEY`. Empty values count as unset.
    pub fn gemini_key(&self) -> Option<String> {
        self.gemini_api_key
            .clone()
            .or_else(|| std::env::var(ENV_GEMINI_API_KEY).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub bind_addr: String,
    pub root_dir: PathBuf,
    pub apps_dir: PathBuf,
    pub site_dir: PathBuf,
    pub entry_point: PathBuf,
    pub mount_marker: String,
    #[serde(default = "default_protected_apps")]
    pub protected_apps: Vec<String>,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default = "default_true")]
    pub watch_entry_point: bool,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            root_dir: PathBuf::from("."),
            apps_dir: PathBuf::from("apps"),
            site_dir: PathBuf::from("site"),
            entry_point: PathBuf::from("server.js"),
            mount_marker: DEFAULT_MOUNT_MARKER.to_string(),
            protected_apps: default_protected_apps(),
            backend_url: None,
            watch_entry_point: true,
            generation: GenerationConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load config. Precedence: env `MINIHUB__*` > file at `MINIHUB_CONFIG` (or `config/minihub.toml`) > defaults.
    pub fn load() -> HubResult<Self> {
        let path = std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| "config/minihub.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> HubResult<Self> {
        let builder = config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:3000")?
            .set_default("root_dir", ".")?
            .set_default("apps_dir", "apps")?
            .set_default("site_dir", "site")?
            .set_default("entry_point", "server.js")?
            .set_default("mount_marker", DEFAULT_MOUNT_MARKER)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("MINIHUB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("protected_apps")
                    .try_parsing(true),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root_dir.join(p)
        }
    }

    pub fn apps_path(&self) -> PathBuf {
        self.resolve(&self.apps_dir)
    }

    pub fn site_path(&self) -> PathBuf {
        self.resolve(&self.site_dir)
    }

    pub fn entry_point_path(&self) -> PathBuf {
        self.resolve(&self.entry_point)
    }

    /// Config rooted at `root` with default relative layout (tests and embedding).
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root.into(),
            ..Self::default()
        }
    }
}
