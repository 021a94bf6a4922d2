//! Server configuration.
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional JSON file, `REPORTNAV_*` environment variables, and finally CLI
//! flags applied by the server binary.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Show error codes and messages on error pages.
    pub debug: bool,
    /// Token-signing key. Empty means "generate one at start".
    pub secret: String,
    pub host: String,
    pub port: u16,
    /// Accepted suffixes for uploaded topic files, without the dot.
    pub allowed_extensions: Vec<String>,
    /// identity -> secret
    pub users: BTreeMap<String, String>,
    /// Folder holding one `<id>.json` document per report.
    pub reports_dir: PathBuf,
    /// Mark the session cookie `Secure` (only sent over https).
    pub secure_cookie: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            secret: String::new(),
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_extensions: vec!["json".to_string()],
            users: BTreeMap::new(),
            reports_dir: PathBuf::from("reports"),
            secure_cookie: false,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("debug", &self.debug)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("reports_dir", &self.reports_dir)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn parse_port_env(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|v| v.parse::<u16>().ok())
}

impl ServerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let cfg: ServerConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(cfg)
    }

    /// Defaults, overlaid by `path` (or `REPORTNAV_CONFIG` when `path` is None),
    /// overlaid by the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let env_path = std::env::var("REPORTNAV_CONFIG").ok().map(PathBuf::from);
        let mut cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Some(v) = parse_bool_env("REPORTNAV_DEBUG") { self.debug = v; }
        if let Ok(v) = std::env::var("REPORTNAV_SECRET") { self.secret = v; }
        if let Ok(v) = std::env::var("REPORTNAV_HOST") { self.host = v; }
        if let Some(v) = parse_port_env("REPORTNAV_PORT") { self.port = v; }
        if let Ok(v) = std::env::var("REPORTNAV_REPORTS_DIR") { self.reports_dir = PathBuf::from(v); }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let s = format!("{}:{}", self.host, self.port);
        s.parse::<SocketAddr>().with_context(|| format!("Invalid bind address: {}", s))
    }

    /// True when `filename` has an extension listed in `allowed_extensions`.
    pub fn allowed_file(&self, filename: &str) -> bool {
        let Some((_, ext)) = filename.rsplit_once('.') else { return false };
        self.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext))
    }
}
