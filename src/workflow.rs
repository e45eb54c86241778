// Workflow Orchestrator
//
// The three operations exposed to agents: commit-and-push, notify, and the
// compound workflow that chains them. Steps run strictly in order.
//
// Failure policy of `full_workflow`:
// - sync fails: send a failure notification best-effort, return the sync error
// - sync succeeds: the success notification is required, its failure propagates

use crate::config::WorkflowConfig;
use crate::errors::{BackendError, Result, WorkflowError, COMMIT_PUSH_FAILED, PREVIEW_FAILED};
use crate::git::MutationBackend;
use crate::notify::{Notification, NotificationSink, COLOR_DANGER, COLOR_SUCCESS};
use crate::summary::generate_commit_message;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Text returned when the working tree is clean
pub const NO_CHANGES: &str = "No changes to commit.";

/// Text returned after a successful notification
pub const NOTIFICATION_SENT: &str = "Discord notification sent successfully.";

/// Branch pushed when the caller does not name one
pub const DEFAULT_BRANCH: &str = "main";

const PREVIEW_DIFF_LIMIT: usize = 4000;

/// Inputs shared by `mutate_and_sync` and `full_workflow`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Commit message override; generated from the status when absent
    pub custom_message: Option<String>,
    /// Branch to push
    pub branch: String,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            custom_message: None,
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Runs workflows against one working tree and one notification channel
pub struct Orchestrator {
    config: Arc<WorkflowConfig>,
    backend: Arc<dyn MutationBackend>,
    sink: Arc<dyn NotificationSink>,
    // Staging and committing are not re-entrant on a working tree.
    tree_lock: Mutex<()>,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(
        config: Arc<WorkflowConfig>,
        backend: Arc<dyn MutationBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            backend,
            sink,
            tree_lock: Mutex::new(()),
        }
    }

    /// Stage everything, commit, and push
    ///
    /// A clean tree is a successful no-op. Any git failure aborts the
    /// remaining steps; earlier steps are not rolled back.
    #[instrument(skip(self), fields(dir = %self.config.working_directory.display()))]
    pub async fn mutate_and_sync(&self, request: &SyncRequest) -> Result<String> {
        let _guard = self.tree_lock.lock().await;
        let step = |source: BackendError| WorkflowError::backend(COMMIT_PUSH_FAILED, source);

        let status = self.backend.status().await.map_err(step)?;
        if status.trim().is_empty() {
            info!("Working tree clean, nothing to commit");
            return Ok(NO_CHANGES.to_string());
        }

        self.backend.stage_all().await.map_err(step)?;

        let message = match request.custom_message.as_deref() {
            Some(custom) if !custom.trim().is_empty() => custom.to_string(),
            _ => generate_commit_message(&status),
        };

        self.backend.commit(&message).await.map_err(step)?;
        info!("Committed: {}", message);

        let push_output = self.backend.push(&request.branch).await.map_err(step)?;
        info!("Pushed {} to {}", request.branch, self.config.remote);

        Ok(format!(
            "Successfully committed and pushed changes.\n\nCommit message: {}\nBranch: {}\nRemote: {}\n\nPush output:\n{}",
            message, request.branch, self.config.remote, push_output
        ))
    }

    /// Deliver a notification
    pub async fn notify(&self, message: &str, color: u32) -> Result<String> {
        self.sink
            .deliver(&Notification::new(message, color))
            .await?;
        info!("Notification delivered");
        Ok(NOTIFICATION_SENT.to_string())
    }

    /// Commit, push, and announce the outcome
    #[instrument(skip(self))]
    pub async fn full_workflow(&self, request: &SyncRequest) -> Result<String> {
        let sync_report = match self.mutate_and_sync(request).await {
            Ok(report) => report,
            Err(err) => {
                self.notify_best_effort(&format!("Git workflow failed.\n\n{}", err), COLOR_DANGER)
                    .await;
                return Err(err);
            }
        };

        let notify_report = self
            .notify(
                &format!("Git workflow completed.\n\n{}", sync_report),
                COLOR_SUCCESS,
            )
            .await?;

        Ok(format!(
            "Workflow completed successfully.\n\n{}\n\n{}",
            sync_report, notify_report
        ))
    }

    /// Send a diagnostic notification whose failure must never surface
    async fn notify_best_effort(&self, message: &str, color: u32) {
        if let Err(err) = self.notify(message, color).await {
            warn!("Failure notification not delivered: {}", err);
        }
    }

    /// Show pending changes and the message a sync would generate
    pub async fn preview_changes(&self) -> Result<String> {
        let step = |source: BackendError| WorkflowError::backend(PREVIEW_FAILED, source);

        let status = self.backend.status().await.map_err(step)?;
        if status.trim().is_empty() {
            return Ok(NO_CHANGES.to_string());
        }

        let unstaged = self.backend.diff().await.map_err(step)?;
        let staged = self.backend.staged_diff().await.map_err(step)?;

        Ok(format!(
            "Status:\n{}\n\nGenerated commit message: {}\n\nUnstaged diff:\n{}\n\nStaged diff:\n{}",
            status.trim_end(),
            generate_commit_message(&status),
            truncate(&unstaged, PREVIEW_DIFF_LIMIT),
            truncate(&staged, PREVIEW_DIFF_LIMIT),
        ))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "(none)".to_string();
    }
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_clean_tree_is_noop() {
        let backend = Arc::new(FakeBackend::with_status(""));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        let report = orch.mutate_and_sync(&SyncRequest::default()).await.unwrap();

        assert_eq!(report, NO_CHANGES);
        assert_eq!(backend.calls(), vec!["status"]);
    }

    #[tokio::test]
    async fn test_sync_runs_steps_in_order() {
        let backend = Arc::new(FakeBackend::with_status(" M a.txt\n M b.txt\n M c.txt\n"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        let report = orch
            .mutate_and_sync(&SyncRequest {
                custom_message: None,
                branch: "dev".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec![
                "status",
                "add",
                "commit update: modify existing functionality (3 files)",
                "push dev",
            ]
        );
        assert!(report.contains("Commit message: update: modify existing functionality (3 files)"));
        assert!(report.contains("Branch: dev"));
        assert!(report.contains("* main -> main"));
    }

    #[tokio::test]
    async fn test_custom_message_wins() {
        let backend = Arc::new(FakeBackend::with_status("?? new.rs"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        orch.mutate_and_sync(&SyncRequest {
            custom_message: Some("fix: typo".to_string()),
            branch: DEFAULT_BRANCH.to_string(),
        })
        .await
        .unwrap();

        assert!(backend.calls().contains(&"commit fix: typo".to_string()));
    }

    #[tokio::test]
    async fn test_blank_custom_message_falls_back_to_summary() {
        let backend = Arc::new(FakeBackend::with_status("?? new.rs"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        orch.mutate_and_sync(&SyncRequest {
            custom_message: Some("  ".to_string()),
            branch: DEFAULT_BRANCH.to_string(),
        })
        .await
        .unwrap();

        assert!(backend
            .calls()
            .contains(&"commit feat: add new files and functionality".to_string()));
    }

    #[tokio::test]
    async fn test_push_failure_keeps_commit() {
        let backend = Arc::new(FakeBackend::with_status(" M a.txt").failing("push"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        let err = orch
            .mutate_and_sync(&SyncRequest::default())
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.starts_with("Failed to commit and push changes:"));
        assert!(text.contains("push exploded"));
        assert_eq!(backend.calls().len(), 4);
        assert!(backend.calls()[2].starts_with("commit"));
    }

    #[tokio::test]
    async fn test_stage_failure_aborts_remaining_steps() {
        let backend = Arc::new(FakeBackend::with_status(" M a.txt").failing("stage_all"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        assert!(orch.mutate_and_sync(&SyncRequest::default()).await.is_err());
        assert_eq!(backend.calls(), vec!["status", "add"]);
    }

    #[tokio::test]
    async fn test_notify_delivers_payload() {
        let sink = Arc::new(FakeSink::default());
        let orch = orchestrator(Arc::new(FakeBackend::default()), sink.clone());

        let text = orch.notify("deployed", COLOR_SUCCESS).await.unwrap();

        assert_eq!(text, NOTIFICATION_SENT);
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].description, "deployed");
        assert_eq!(delivered[0].color, COLOR_SUCCESS);
    }

    #[tokio::test]
    async fn test_notify_failure() {
        let orch = orchestrator(
            Arc::new(FakeBackend::default()),
            Arc::new(FakeSink::failing()),
        );
        let err = orch.notify("x", COLOR_SUCCESS).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to send Discord notification: 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_full_workflow_success_announces_report() {
        let backend = Arc::new(FakeBackend::with_status("?? a\n M b"));
        let sink = Arc::new(FakeSink::default());
        let orch = orchestrator(backend, sink.clone());

        let report = orch.full_workflow(&SyncRequest::default()).await.unwrap();

        assert!(report.starts_with("Workflow completed successfully."));
        assert!(report.contains(NOTIFICATION_SENT));
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].color, COLOR_SUCCESS);
        assert!(delivered[0]
            .description
            .contains("feat: add new features and update existing functionality (2 files)"));
    }

    #[tokio::test]
    async fn test_full_workflow_failure_sends_diagnostic() {
        let backend = Arc::new(FakeBackend::with_status(" M a").failing("commit"));
        let sink = Arc::new(FakeSink::default());
        let orch = orchestrator(backend, sink.clone());

        let err = orch.full_workflow(&SyncRequest::default()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::BackendExecution { .. }));
        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].color, COLOR_DANGER);
        assert!(delivered[0].description.contains("commit exploded"));
    }

    #[tokio::test]
    async fn test_full_workflow_diagnostic_failure_is_swallowed() {
        let backend = Arc::new(FakeBackend::with_status(" M a").failing("push"));
        let sink = Arc::new(FakeSink::failing());
        let orch = orchestrator(backend, sink.clone());

        let err = orch.full_workflow(&SyncRequest::default()).await.unwrap_err();

        assert_eq!(sink.attempts(), 1);
        assert!(err
            .to_string()
            .starts_with("Failed to commit and push changes:"));
    }

    #[tokio::test]
    async fn test_full_workflow_success_notification_failure_propagates() {
        let backend = Arc::new(FakeBackend::with_status(" M a"));
        let sink = Arc::new(FakeSink::failing());
        let orch = orchestrator(backend.clone(), sink);

        let err = orch.full_workflow(&SyncRequest::default()).await.unwrap_err();

        assert!(matches!(err, WorkflowError::NotificationDelivery { .. }));
        assert_eq!(backend.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_preview_changes() {
        let backend = Arc::new(FakeBackend::with_status(" M a.txt"));
        let orch = orchestrator(backend.clone(), Arc::new(FakeSink::default()));

        let preview = orch.preview_changes().await.unwrap();

        assert!(preview.contains("Generated commit message: update: modify existing functionality"));
        assert!(preview.contains("diff --git a/x b/x"));
        assert!(preview.contains("Staged diff:\n(none)"));
        assert_eq!(backend.calls(), vec!["status", "diff", "diff --cached"]);
    }

    #[tokio::test]
    async fn test_preview_failure_prefix() {
        let backend = Arc::new(FakeBackend::with_status(" M a").failing("diff"));
        let orch = orchestrator(backend, Arc::new(FakeSink::default()));

        let err = orch.preview_changes().await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to preview changes:"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_syncs_do_not_interleave() {
        let backend = Arc::new(FakeBackend::with_status(" M a"));
        let orch = Arc::new(orchestrator(backend.clone(), Arc::new(FakeSink::default())));

        let first = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.mutate_and_sync(&SyncRequest::default()).await })
        };
        let second = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.mutate_and_sync(&SyncRequest::default()).await })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 8);
        for chunk in calls.chunks(4) {
            assert_eq!(chunk[0], "status");
            assert_eq!(chunk[1], "add");
            assert!(chunk[2].starts_with("commit"));
            assert!(chunk[3].starts_with("push"));
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("", 10), "(none)");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc\n... (truncated)");
    }
}
