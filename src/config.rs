// Workflow Configuration
//
// *La Configuration* - where the working tree lives and where notifications go.
// Built once at startup from a TOML file, the environment, and CLI flags, then
// shared read-only behind an `Arc`.

use crate::errors::{Result, WorkflowError};
use anyhow::Context;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".gitpulse/config.toml";

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "GITPULSE_CONFIG";

/// Environment variable holding the working tree path
pub const ENV_REPO_PATH: &str = "GIT_REPO_PATH";

/// Environment variable holding the Discord webhook URL
pub const ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";

/// Environment variable overriding the push remote
pub const ENV_REMOTE: &str = "GITPULSE_REMOTE";

const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;
const DEFAULT_NOTIFICATION_TIMEOUT_SECS: u64 = 30;

/// Contents of the optional TOML config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// `[workflow]` table
    #[serde(default)]
    pub workflow: WorkflowSection,
}

/// `[workflow]` table of the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkflowSection {
    /// Path to the git working tree
    pub working_directory: Option<PathBuf>,

    /// Discord webhook URL
    pub webhook_url: Option<String>,

    /// Remote that `push` targets
    pub remote: Option<String>,

    /// Upper bound for a single git command
    pub command_timeout_secs: Option<u64>,

    /// Upper bound for a single webhook delivery
    pub notification_timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Load a config file from an explicit path
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load the file named by `explicit`, else the default location if it exists
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(ConfigFile::default())
                }
            }
        }
    }
}

/// Values given on the command line; they win over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--repo`
    pub working_directory: Option<PathBuf>,
    /// `--webhook-url`
    pub webhook_url: Option<String>,
}

/// Webhook endpoint. Treated as a secret: never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookTarget(Url);

impl WebhookTarget {
    /// Parse and check a webhook URL
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim()).map_err(|e| {
            WorkflowError::config_error(
                format!("Invalid webhook URL: {}", e),
                Some(format!("Set {} to the full https:// webhook URL", ENV_WEBHOOK_URL)),
            )
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(WorkflowError::config_error(
                format!("Unsupported webhook URL scheme: {}", url.scheme()),
                Some("Use an https:// URL".to_string()),
            ));
        }

        Ok(Self(url))
    }

    /// Full URL for delivery
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Debug for WebhookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WebhookTarget({}://{}/…)",
            self.0.scheme(),
            self.0.host_str().unwrap_or("?")
        )
    }
}

/// Process-wide workflow configuration
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Absolute path of the git working tree
    pub working_directory: PathBuf,

    /// Where notifications are delivered
    pub notification_target: WebhookTarget,

    /// Remote that `push` targets
    pub remote: String,

    /// Upper bound for a single git command
    pub command_timeout: Duration,

    /// Upper bound for a single webhook delivery
    pub notification_timeout: Duration,
}

impl WorkflowConfig {
    /// Build a config with default remote and timeouts
    pub fn new(working_directory: impl Into<PathBuf>, notification_target: WebhookTarget) -> Self {
        Self {
            working_directory: working_directory.into(),
            notification_target,
            remote: DEFAULT_REMOTE.to_string(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            notification_timeout: Duration::from_secs(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
        }
    }

    /// Resolve the configuration from its three layers
    ///
    /// Precedence is file < environment < CLI overrides. `env` looks up an
    /// environment variable; production passes `std::env::var(..).ok()`.
    ///
    /// A missing webhook URL is fatal.
    pub fn resolve<F>(file: ConfigFile, env: F, overrides: ConfigOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = file.workflow;
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let webhook = non_empty(overrides.webhook_url)
            .or_else(|| non_empty(env(ENV_WEBHOOK_URL)))
            .or_else(|| non_empty(section.webhook_url))
            .ok_or_else(|| {
                WorkflowError::config_error(
                    format!("{} is not set", ENV_WEBHOOK_URL),
                    Some(format!(
                        "Export {} or set workflow.webhook_url in {}",
                        ENV_WEBHOOK_URL, DEFAULT_CONFIG_FILE
                    )),
                )
            })?;
        let notification_target = WebhookTarget::parse(&webhook)?;

        let working_directory = match overrides
            .working_directory
            .or_else(|| non_empty(env(ENV_REPO_PATH)).map(PathBuf::from))
            .or(section.working_directory)
        {
            Some(path) => path,
            None => std::env::current_dir().map_err(|e| {
                WorkflowError::config_error(
                    format!("Cannot determine current directory: {}", e),
                    Some(format!("Set {}", ENV_REPO_PATH)),
                )
            })?,
        };
        if !working_directory.is_absolute() {
            return Err(WorkflowError::config_error(
                format!(
                    "Working directory must be absolute: {}",
                    working_directory.display()
                ),
                Some(format!("Set {} to an absolute path", ENV_REPO_PATH)),
            ));
        }

        let remote = non_empty(env(ENV_REMOTE))
            .or_else(|| non_empty(section.remote))
            .unwrap_or_else(|| DEFAULT_REMOTE.to_string());

        Ok(Self {
            working_directory,
            notification_target,
            remote,
            command_timeout: Duration::from_secs(
                section
                    .command_timeout_secs
                    .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            ),
            notification_timeout: Duration::from_secs(
                section
                    .notification_timeout_secs
                    .unwrap_or(DEFAULT_NOTIFICATION_TIMEOUT_SECS),
            ),
        })
    }

    /// Resolve from the real process environment
    pub fn from_env(file: ConfigFile, overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }

    /// Check that the working directory is an existing git working tree
    pub fn validate(&self) -> Result<()> {
        let dir = &self.working_directory;

        if !dir.is_absolute() {
            return Err(WorkflowError::config_error(
                format!("Working directory must be absolute: {}", dir.display()),
                Some(format!("Set {} to an absolute path", ENV_REPO_PATH)),
            ));
        }

        if !dir.is_dir() {
            return Err(WorkflowError::config_error(
                format!("Working directory does not exist: {}", dir.display()),
                None,
            ));
        }

        if !dir.join(".git").exists() {
            return Err(WorkflowError::config_error(
                format!("Not a git working tree: {}", dir.display()),
                Some("Run `git init` or point to the repository root".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HOOK: &str = "https://discord.com/api/webhooks/1/token";

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_webhook_is_fatal() {
        let result = WorkflowConfig::resolve(
            ConfigFile::default(),
            env_from(&[(ENV_REPO_PATH, "/tmp")]),
            ConfigOverrides::default(),
        );
        assert!(matches!(result, Err(WorkflowError::Configuration { .. })));
    }

    #[test]
    fn test_blank_webhook_is_fatal() {
        let result = WorkflowConfig::resolve(
            ConfigFile::default(),
            env_from(&[(ENV_WEBHOOK_URL, "   ")]),
            ConfigOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_layers_precedence() {
        let file: ConfigFile = toml::from_str(
            r#"
            [workflow]
            working_directory = "/from/file"
            webhook_url = "https://file.example/hook"
            remote = "upstream"
            command_timeout_secs = 7
            "#,
        )
        .unwrap();

        let config = WorkflowConfig::resolve(
            file,
            env_from(&[(ENV_WEBHOOK_URL, HOOK), (ENV_REPO_PATH, "/from/env")]),
            ConfigOverrides {
                working_directory: Some(PathBuf::from("/from/cli")),
                webhook_url: None,
            },
        )
        .unwrap();

        assert_eq!(config.working_directory, PathBuf::from("/from/cli"));
        assert_eq!(config.notification_target.url().as_str(), HOOK);
        assert_eq!(config.remote, "upstream");
        assert_eq!(config.command_timeout, Duration::from_secs(7));
        assert_eq!(config.notification_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_relative_working_directory_is_fatal() {
        let err = WorkflowConfig::resolve(
            ConfigFile::default(),
            env_from(&[(ENV_WEBHOOK_URL, HOOK), (ENV_REPO_PATH, "some/checkout")]),
            ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be absolute"));

        let from_flag = WorkflowConfig::resolve(
            ConfigFile::default(),
            env_from(&[(ENV_WEBHOOK_URL, HOOK)]),
            ConfigOverrides {
                working_directory: Some(PathBuf::from(".")),
                webhook_url: None,
            },
        );
        assert!(from_flag.is_err());
    }

    #[test]
    fn test_rejects_non_http_webhook() {
        assert!(WebhookTarget::parse("ftp://example.com/hook").is_err());
        assert!(WebhookTarget::parse("not a url").is_err());
    }

    #[test]
    fn test_debug_hides_webhook_token() {
        let target = WebhookTarget::parse(HOOK).unwrap();
        let debug = format!("{:?}", target);
        assert!(debug.contains("discord.com"));
        assert!(!debug.contains("token"));
    }

    #[test]
    fn test_validate_requires_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkflowConfig::new(dir.path(), WebhookTarget::parse(HOOK).unwrap());
        assert!(config.validate().is_err());

        fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_directory() {
        let config = WorkflowConfig::new(
            "/definitely/not/here/gitpulse",
            WebhookTarget::parse(HOOK).unwrap(),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_empty_config_file_parses() {
        let file: ConfigFile = toml::from_str("").unwrap();
        assert!(file.workflow.webhook_url.is_none());
    }
}
