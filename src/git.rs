// Git Backend
//
// The mutation backend runs git as an external process in the configured
// working tree. Each call returns raw text or a `BackendError`.

use crate::config::WorkflowConfig;
use crate::errors::{BackendError, Result, WorkflowError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Version-control operations the workflows need
#[async_trait]
pub trait MutationBackend: Send + Sync {
    /// `git status --porcelain`
    async fn status(&self) -> std::result::Result<String, BackendError>;

    /// Unstaged diff
    async fn diff(&self) -> std::result::Result<String, BackendError>;

    /// Staged diff
    async fn staged_diff(&self) -> std::result::Result<String, BackendError>;

    /// Stage the whole working tree
    async fn stage_all(&self) -> std::result::Result<String, BackendError>;

    /// Commit staged changes
    async fn commit(&self, message: &str) -> std::result::Result<String, BackendError>;

    /// Push `branch` and set it as upstream
    async fn push(&self, branch: &str) -> std::result::Result<String, BackendError>;
}

/// `MutationBackend` backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    working_directory: PathBuf,
    remote: String,
    timeout: Duration,
}

impl GitCli {
    /// Create a backend for the configured working tree
    ///
    /// Fails when the working directory does not exist.
    pub fn new(config: &WorkflowConfig) -> Result<Self> {
        let dir = &config.working_directory;
        if !dir.is_dir() {
            return Err(WorkflowError::config_error(
                format!("Working directory does not exist: {}", dir.display()),
                Some(format!("Set {} to a git working tree", crate::config::ENV_REPO_PATH)),
            ));
        }

        Ok(Self {
            program: PathBuf::from("git"),
            working_directory: dir.clone(),
            remote: config.remote.clone(),
            timeout: config.command_timeout,
        })
    }

    /// Run a different git executable, such as a wrapper script
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str], mode: OutputMode) -> std::result::Result<String, BackendError> {
        let command = args.join(" ");
        debug!("git {} (in {})", command, self.working_directory.display());

        let mut git = Command::new(&self.program);
        git.args(args)
            .current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, git.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => return Err(BackendError::Spawn { command, source }),
            Err(_) => {
                return Err(BackendError::Timeout {
                    command,
                    after: self.timeout,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(BackendError::Exit {
                command,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(match mode {
            OutputMode::Stdout => stdout.trim_end().to_string(),
            OutputMode::Combined => combine_output(&stdout, &stderr),
        })
    }
}

/// Which streams a successful command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    /// Machine-readable output; warnings on stderr are not data
    Stdout,
    /// Human-readable summary that git splits across both streams
    Combined,
}

/// Check a branch name against git's ref-name rules
///
/// Names git would parse as an option (leading `-`) are refused too, even
/// though `push` ends its options with `--`.
pub fn check_branch_name(name: &str) -> std::result::Result<(), String> {
    let reason = if name.is_empty() {
        Some("is empty")
    } else if name.starts_with('-') {
        Some("must not start with '-'")
    } else if name == "@" || name == "HEAD" {
        Some("is reserved")
    } else if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        Some("has an empty path component")
    } else if name.ends_with('.') || name.ends_with(".lock") {
        Some("must not end with '.' or '.lock'")
    } else if name.contains("..") || name.contains("@{") {
        Some("must not contain '..' or '@{'")
    } else if name.split('/').any(|part| part.starts_with('.')) {
        Some("has a component starting with '.'")
    } else if name
        .chars()
        .any(|c| c.is_ascii_control() || " ~^:?*[\\".contains(c))
    {
        Some("contains a character git does not allow")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(format!("branch '{}' {}", name, reason)),
        None => Ok(()),
    }
}

/// git prints push summaries on stderr; keep both
fn combine_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim_end();
    let stderr = stderr.trim();
    match (stdout.is_empty(), stderr.is_empty()) {
        (_, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{}\n{}", stdout, stderr),
    }
}

#[async_trait]
impl MutationBackend for GitCli {
    async fn status(&self) -> std::result::Result<String, BackendError> {
        self.run(&["status", "--porcelain"], OutputMode::Stdout).await
    }

    async fn diff(&self) -> std::result::Result<String, BackendError> {
        self.run(&["diff"], OutputMode::Stdout).await
    }

    async fn staged_diff(&self) -> std::result::Result<String, BackendError> {
        self.run(&["diff", "--cached"], OutputMode::Stdout).await
    }

    async fn stage_all(&self) -> std::result::Result<String, BackendError> {
        self.run(&["add", "--", "."], OutputMode::Combined).await
    }

    async fn commit(&self, message: &str) -> std::result::Result<String, BackendError> {
        self.run(&["commit", "-m", message], OutputMode::Combined).await
    }

    async fn push(&self, branch: &str) -> std::result::Result<String, BackendError> {
        self.run(&["push", "-u", "--", &self.remote, branch], OutputMode::Combined).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebhookTarget;
    use rstest::rstest;
    use std::path::Path;

    fn config_for(dir: &Path) -> WorkflowConfig {
        WorkflowConfig::new(
            dir,
            WebhookTarget::parse("https://example.com/hook").unwrap(),
        )
    }

    #[test]
    fn test_new_rejects_missing_directory() {
        let config = config_for(Path::new("/no/such/gitpulse/dir"));
        assert!(matches!(
            GitCli::new(&config),
            Err(WorkflowError::Configuration { .. })
        ));
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output("out\n", ""), "out");
        assert_eq!(combine_output("", "To origin\n"), "To origin");
        assert_eq!(combine_output("a\n", "b\n"), "a\nb");
    }

    #[tokio::test]
    async fn test_status_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(&config_for(dir.path())).unwrap();

        // Either git is missing (Spawn) or it refuses to run outside a repo (Exit).
        let err = git.status().await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Exit { .. } | BackendError::Spawn { .. }
        ));
    }

    #[rstest]
    #[case("main")]
    #[case("feature/login-form")]
    #[case("release-1.2")]
    #[case("user@fix")]
    fn test_valid_branch_names(#[case] name: &str) {
        assert!(check_branch_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("--all")]
    #[case("-n")]
    #[case("--dry-run")]
    #[case("a..b")]
    #[case("topic.lock")]
    #[case("feature/")]
    #[case("a//b")]
    #[case(".hidden")]
    #[case("has space")]
    #[case("what?")]
    #[case("x@{1}")]
    #[case("@")]
    fn test_invalid_branch_names(#[case] name: &str) {
        assert!(check_branch_name(name).is_err());
    }

    #[cfg(unix)]
    mod noisy_git {
        use super::*;
        use crate::workflow::testing::FakeSink;
        use crate::workflow::{Orchestrator, SyncRequest, NO_CHANGES};
        use std::os::unix::fs::PermissionsExt;
        use std::process::Command as StdCommand;
        use std::sync::Arc;

        /// A clean repository plus a git wrapper that warns on stderr
        fn noisy_repo() -> Option<(tempfile::TempDir, PathBuf, PathBuf)> {
            if StdCommand::new("git").arg("--version").output().is_err() {
                return None;
            }

            let root = tempfile::tempdir().unwrap();
            let work = root.path().join("work");
            std::fs::create_dir(&work).unwrap();
            let init = StdCommand::new("git")
                .arg("init")
                .current_dir(&work)
                .output()
                .unwrap();
            assert!(init.status.success());

            let wrapper = root.path().join("noisy-git");
            std::fs::write(
                &wrapper,
                "#!/bin/sh\necho 'warning: unable to access config' >&2\nexec git \"$@\"\n",
            )
            .unwrap();
            std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();

            Some((root, work, wrapper))
        }

        #[tokio::test]
        async fn test_status_ignores_stderr_warnings() {
            let Some((_root, work, wrapper)) = noisy_repo() else { return };
            let git = GitCli::new(&config_for(&work)).unwrap().with_program(&wrapper);

            assert_eq!(git.status().await.unwrap(), "");
            assert_eq!(git.diff().await.unwrap(), "");
        }

        #[tokio::test]
        async fn test_clean_tree_with_warnings_is_noop() {
            let Some((_root, work, wrapper)) = noisy_repo() else { return };
            let config = Arc::new(config_for(&work));
            let git = GitCli::new(&config).unwrap().with_program(&wrapper);
            let orchestrator =
                Orchestrator::new(config, Arc::new(git), Arc::new(FakeSink::default()));

            let report = orchestrator
                .mutate_and_sync(&SyncRequest::default())
                .await
                .unwrap();
            assert_eq!(report, NO_CHANGES);
        }
    }
}
