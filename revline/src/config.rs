//! Process configuration.
//!
//! Loaded once at startup from a TOML file. Config errors are soft
//! failures: a missing file yields the defaults silently, a parse error is
//! printed to stderr and also yields the defaults. The `ai_endpoint` value
//! exists so any AI-augmented review step receives its endpoint from here
//! instead of reading it ad hoc; the core pipeline never dials it.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the WAL-mode SQLite database.
    pub db_path: String,
    /// Root directory of the filesystem blob store.
    pub blob_root: String,
    /// Bounded parallelism for folder-level batch analysis.
    pub worker_threads: usize,
    /// Optional LLM endpoint for AI-augmented review steps, resolved once
    /// at process start.
    pub ai_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: ".revline/revline.db".to_owned(),
            blob_root: ".revline/blobs".to_owned(),
            worker_threads: 4,
            ai_endpoint: None,
        }
    }
}

impl Config {
    /// Loads config from `path`, falling back to defaults on any failure.
    pub fn load(path: &std::path::Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("revline: config parse error in {path:?}: {e}");
                Self::default()
            }
        }
    }
}

/// Returns the path to the revline config file.
///
/// Prefers `$XDG_CONFIG_HOME/revline/config.toml`; falls back to
/// `~/.config/revline/config.toml` when the env var is absent.
pub fn config_path() -> std::path::PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| std::path::PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| std::path::PathBuf::from(".config"));
    base.join("revline").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let c = Config::load(std::path::Path::new("/no/such/file.toml"));
        assert_eq!(c.worker_threads, 4);
        assert!(c.ai_endpoint.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "worker_threads = 8").unwrap();

        let c = Config::load(&path);
        assert_eq!(c.worker_threads, 8);
        assert_eq!(c.db_path, ".revline/revline.db");
    }

    #[test]
    fn parse_error_falls_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "worker_threads = [not toml").unwrap();
        let c = Config::load(&path);
        assert_eq!(c.worker_threads, 4);
    }
}
