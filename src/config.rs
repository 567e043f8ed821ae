use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;

use crate::triage::store::{FINDINGS_FILE, ISSUES_FILE, load_json};

/// Name of the optional config file inside the triage directory.
pub const CONFIG_FILE: &str = "triage.toml";

/// Runtime configuration for the triage server.
///
/// Built from defaults, then `<triage_dir>/triage.toml`, then CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageConfig {
    pub triage_dir: PathBuf,
    pub repo: Option<String>,
    pub host: String,
    pub port: u16,
    pub gh_bin: String,
    pub command_timeout_secs: u64,
    pub static_dir: Option<PathBuf>,
}

impl TriageConfig {
    pub fn with_dir(triage_dir: impl Into<PathBuf>) -> Self {
        Self {
            triage_dir: triage_dir.into(),
            repo: None,
            host: "127.0.0.1".to_string(),
            port: 8765,
            gh_bin: "gh".to_string(),
            command_timeout_secs: 30,
            static_dir: None,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Load `triage.toml` from the triage directory over the defaults.
    /// Returns defaults if the file doesn't exist.
    pub fn load(triage_dir: &Path) -> Result<Self> {
        let mut config = Self::with_dir(triage_dir);
        let config_path = triage_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let toml: TriageToml = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if let Some(repo) = toml.repo {
            config.repo = Some(repo);
        }
        if let Some(server) = toml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(static_dir) = server.static_dir {
                // Relative paths are resolved against the triage directory.
                config.static_dir = Some(triage_dir.join(static_dir));
            }
        }
        if let Some(gh) = toml.gh {
            if let Some(bin) = gh.bin {
                config.gh_bin = bin;
            }
            if let Some(timeout) = gh.timeout_secs {
                config.command_timeout_secs = timeout;
            }
        }

        Ok(config)
    }

    /// Apply CLI flags on top of file/default values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(repo) = overrides.repo {
            self.repo = Some(repo);
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(bin) = overrides.gh_bin {
            self.gh_bin = bin;
        }
        if let Some(timeout) = overrides.command_timeout_secs {
            self.command_timeout_secs = timeout;
        }
        if let Some(dir) = overrides.static_dir {
            self.static_dir = Some(dir);
        }
    }

    /// Resolve `OWNER/REPO`: explicit value first, then the `repo` field of
    /// `findings.json`, then `issues.json`.
    pub fn resolve_repo(&self) -> Result<String> {
        if let Some(repo) = self.repo.as_deref().filter(|r| !r.is_empty()) {
            return Ok(repo.to_string());
        }

        // Only `repo` is read, so documents this version can't fully parse
        // don't block startup.
        for file in [FINDINGS_FILE, ISSUES_FILE] {
            let doc: Value = load_json(&self.triage_dir.join(file))?;
            let repo = doc.get("repo").and_then(Value::as_str);
            if let Some(repo) = repo.filter(|r| !r.is_empty()) {
                return Ok(repo.to_string());
            }
        }

        bail!("--repo required (or findings.json/issues.json must contain repo)")
    }
}

/// Values supplied on the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub gh_bin: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub static_dir: Option<PathBuf>,
}

/// Raw TOML structure for `triage.toml`
#[derive(Debug, Deserialize)]
struct TriageToml {
    repo: Option<String>,
    server: Option<ServerSection>,
    gh: Option<GhSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct GhSection {
    bin: Option<String>,
    timeout_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_config_defaults() {
        let config = TriageConfig::with_dir("/tmp/triage");
        assert_eq!(config.port, 8765);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.gh_bin, "gh");
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert!(config.repo.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TriageConfig::load(dir.path()).unwrap();
        assert_eq!(config, TriageConfig::with_dir(dir.path()));
    }

    #[test]
    fn test_config_load_full() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
repo = "acme/widgets"

[server]
host = "0.0.0.0"
port = 9000
static_dir = "ui"

[gh]
bin = "/usr/local/bin/gh"
timeout_secs = 10
"#,
        )
        .unwrap();

        let config = TriageConfig::load(dir.path()).unwrap();
        assert_eq!(config.repo.as_deref(), Some("acme/widgets"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.static_dir, Some(dir.path().join("ui")));
        assert_eq!(config.gh_bin, "/usr/local/bin/gh");
        assert_eq!(config.command_timeout_secs, 10);
    }

    #[test]
    fn test_config_load_partial() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[server]\nport = 4000\n").unwrap();
        let config = TriageConfig::load(dir.path()).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "127.0.0.1"); // default
        assert_eq!(config.command_timeout_secs, 30); // default
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "not valid toml {{{{").unwrap();
        let err = TriageConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "repo = \"file/repo\"\n[server]\nport = 4000\n").unwrap();
        let mut config = TriageConfig::load(dir.path()).unwrap();
        config.apply_overrides(ConfigOverrides {
            repo: Some("cli/repo".into()),
            port: Some(5000),
            ..Default::default()
        });
        assert_eq!(config.repo.as_deref(), Some("cli/repo"));
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_resolve_repo_prefers_explicit_value() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FINDINGS_FILE), r#"{"repo": "from/findings"}"#).unwrap();
        let mut config = TriageConfig::with_dir(dir.path());
        config.repo = Some("explicit/repo".into());
        assert_eq!(config.resolve_repo().unwrap(), "explicit/repo");
    }

    #[test]
    fn test_resolve_repo_findings_before_issues() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FINDINGS_FILE), r#"{"repo": "from/findings"}"#).unwrap();
        fs::write(dir.path().join(ISSUES_FILE), r#"{"repo": "from/issues", "issues": []}"#).unwrap();
        let config = TriageConfig::with_dir(dir.path());
        assert_eq!(config.resolve_repo().unwrap(), "from/findings");
    }

    #[test]
    fn test_resolve_repo_falls_back_to_issues() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FINDINGS_FILE), r#"{"issues": []}"#).unwrap();
        fs::write(dir.path().join(ISSUES_FILE), r#"{"repo": "from/issues", "issues": []}"#).unwrap();
        let config = TriageConfig::with_dir(dir.path());
        assert_eq!(config.resolve_repo().unwrap(), "from/issues");
    }

    #[test]
    fn test_resolve_repo_ignores_unparseable_findings_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(FINDINGS_FILE),
            r#"{"repo": "from/findings", "issues": [{"number": 1, "verdict": "mystery", "summary": null}]}"#,
        )
        .unwrap();
        let config = TriageConfig::with_dir(dir.path());
        assert_eq!(config.resolve_repo().unwrap(), "from/findings");
    }

    #[test]
    fn test_resolve_repo_missing_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let config = TriageConfig::with_dir(dir.path());
        assert!(config.resolve_repo().unwrap_err().to_string().contains("--repo required"));
    }
}
