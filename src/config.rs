// Workbench Gate - Configuration
//
// Workspace root, transport host/port, command timeouts, shell allow-list.
// Environment- or file-supplied at startup; no dynamic reconfiguration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    /// The single directory all sandboxed file and command operations
    /// are confined to.
    pub workspace_root: PathBuf,
    /// SQLite database filename, relative to the workspace root.
    pub db_filename: String,
    /// HTTP bridge bind address.
    pub host: String,
    pub port: u16,
    /// Base command names permitted for DEV: run_shell. Deny by default.
    pub shell_allowlist: Vec<String>,
    /// Default wall-clock budget for command tools, seconds.
    pub default_timeout_secs: u64,
    /// Upper bound on any caller-supplied timeout, seconds.
    pub max_timeout_secs: u64,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("./workspace"),
            db_filename: "database.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8070,
            shell_allowlist: vec![
                "ls".to_string(),
                "echo".to_string(),
                "pwd".to_string(),
                "cat".to_string(),
            ],
            default_timeout_secs: 10,
            max_timeout_secs: 120,
        }
    }
}

impl WorkbenchConfig {
    /// Load config from a JSON file, falling back to defaults.
    /// Environment overrides are applied on top either way.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(root) = std::env::var("WORKBENCH_ROOT") {
            self.workspace_root = PathBuf::from(root);
        }
        if let Ok(host) = std::env::var("WORKBENCH_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("WORKBENCH_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(timeout) = std::env::var("WORKBENCH_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.default_timeout_secs = timeout;
            }
        }
    }

    /// Save config to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Absolute, normalized workspace root. Created if missing.
    pub fn ensure_workspace(&self) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.workspace_root)?;
        Ok(self.workspace_root.canonicalize()?)
    }

    /// Clamp a caller-supplied timeout to the configured ceiling.
    pub fn clamp_timeout(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_timeout_secs)
            .min(self.max_timeout_secs)
            .max(1)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = WorkbenchConfig::default();
        assert_eq!(config.db_filename, "database.db");
        assert_eq!(config.shell_allowlist, vec!["ls", "echo", "pwd", "cat"]);
        assert_eq!(config.default_timeout_secs, 10);
    }

    #[test]
    fn timeout_is_clamped_both_ways() {
        let config = WorkbenchConfig::default();
        assert_eq!(config.clamp_timeout(None), 10);
        assert_eq!(config.clamp_timeout(Some(5)), 5);
        assert_eq!(config.clamp_timeout(Some(10_000)), 120);
        assert_eq!(config.clamp_timeout(Some(0)), 1);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = WorkbenchConfig::load(Path::new("/nonexistent/config.json")).unwrap();
        assert_eq!(config.port, WorkbenchConfig::default().port);
    }
}
