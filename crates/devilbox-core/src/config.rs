//! Devilbox `.env` reading and the explicit runtime configuration.
//!
//! The `.env` file is a flat `KEY=VALUE` list. [`EnvMap`] keeps entries in
//! file order so `config get` lists them the way they were written, and
//! [`rewrite_env`] updates a single key without touching any other line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::services;

/// Probe timeout used when `DEVILBOX_PROBE_TIMEOUT` is unset.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Loopback address form used for services forwarded into the PHP container.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Key that overrides the per-probe timeout.
pub const PROBE_TIMEOUT_KEY: &str = "DEVILBOX_PROBE_TIMEOUT";

// ── EnvMap ─────────────────────────────────────────────────────────

/// Ordered `.env` key/value mapping. Later duplicates overwrite earlier values
/// but keep the earlier position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvMap {
    entries: Vec<(String, String)>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `.env` content. Blank lines and `#` comments are skipped,
    /// the value is everything after the first `=`, and one layer of
    /// matching quotes is stripped.
    pub fn parse(content: &str) -> Self {
        let mut env = Self::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            env.insert(key, unquote(value.trim()));
        }
        env
    }

    /// Read and parse a `.env` file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, or `default` when the key is missing or empty.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => default.to_string(),
        }
    }

    /// Interpret a key as a boolean flag. `None` when unset or unrecognised.
    pub fn flag(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            other => {
                warn!(%key, value = %other, "ignoring unrecognised boolean flag");
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Self::new();
        for (k, v) in iter {
            env.insert(k, v);
        }
        env
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// ── Rewriting ──────────────────────────────────────────────────────

fn validate_key(key: &str) -> ConfigResult<()> {
    if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Replace every `KEY=` line in `content` with `KEY=value`, or append one
/// when the key is absent. All other lines are kept verbatim.
pub fn rewrite_env(content: &str, key: &str, value: &str) -> ConfigResult<String> {
    validate_key(key)?;
    if value.contains('\n') {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    let prefix = format!("{key}=");
    let mut found = false;
    let mut lines: Vec<String> = content
        .split('\n')
        .map(|line| {
            if line.trim_start().starts_with(&prefix) {
                found = true;
                format!("{key}={value}")
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        // Keep a trailing newline trailing.
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
            lines.push(format!("{key}={value}"));
            lines.push(String::new());
        } else {
            lines.push(format!("{key}={value}"));
        }
    }

    Ok(lines.join("\n"))
}

/// Update `key` in the `.env` file at `path`, creating the file if needed.
pub fn set_env_value(path: &Path, key: &str, value: &str) -> ConfigResult<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let updated = rewrite_env(&content, key, value)?;
    std::fs::write(path, updated).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), %key, "updated .env");
    Ok(())
}

// ── DevilboxConfig ─────────────────────────────────────────────────

/// Explicit configuration passed to the aggregator, dashboard, and tools.
#[derive(Debug, Clone)]
pub struct DevilboxConfig {
    /// Devilbox project root (holds `.env`, `docker-compose.yml`, `data/www`).
    pub root: PathBuf,
    pub env: EnvMap,
    pub probe_timeout: Duration,
    pub loopback_host: String,
}

impl DevilboxConfig {
    /// Build from an already-loaded env map.
    pub fn from_env_map(root: impl Into<PathBuf>, env: EnvMap) -> Self {
        let probe_timeout = match env.get(PROBE_TIMEOUT_KEY) {
            Some(raw) => parse_duration(raw).unwrap_or_else(|| {
                warn!(key = PROBE_TIMEOUT_KEY, value = %raw, "invalid probe timeout, using default");
                DEFAULT_PROBE_TIMEOUT
            }),
            None => DEFAULT_PROBE_TIMEOUT,
        };
        Self {
            root: root.into(),
            env,
            probe_timeout,
            loopback_host: LOOPBACK_HOST.to_string(),
        }
    }

    /// Load `<root>/.env` (a missing file is an empty map) and overlay the
    /// process environment for the keys the service tables read.
    pub fn load(root: impl Into<PathBuf>) -> ConfigResult<Self> {
        let root = root.into();
        let env_path = root.join(".env");
        let mut env = if env_path.is_file() {
            EnvMap::from_file(&env_path)?
        } else {
            debug!(path = %env_path.display(), "no .env file, using defaults");
            EnvMap::new()
        };

        for key in services::referenced_keys() {
            if let Ok(value) = std::env::var(&key) {
                env.insert(key, value);
            }
        }
        if let Ok(value) = std::env::var(PROBE_TIMEOUT_KEY) {
            env.insert(PROBE_TIMEOUT_KEY, value);
        }

        Ok(Self::from_env_map(root, env))
    }

    pub fn env_path(&self) -> PathBuf {
        self.root.join(".env")
    }

    /// Directory holding one sub-directory per project (virtual host).
    pub fn www_path(&self) -> PathBuf {
        self.root.join("data").join("www")
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is
/// seconds and may be fractional ("0.5").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        parse_seconds(secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        parse_seconds(s)
    }
}

fn parse_seconds(s: &str) -> Option<Duration> {
    let secs = s.trim().parse::<f64>().ok()?;
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}
