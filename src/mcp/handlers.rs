// MCP Tool Handlers
//
// This module implements the handlers for each MCP tool that the server exposes.

use super::registry::{Arguments, OperationSchema, ParamKind, ParamSpec};
use crate::errors::{Result, WorkflowError};
use crate::git::check_branch_name;
use crate::notify::COLOR_SUCCESS;
use crate::workflow::{Orchestrator, SyncRequest, DEFAULT_BRANCH};
use serde_json::json;

/// Enum of all tool handlers
///
/// Instead of using trait objects (which don't work well with async),
/// we use an enum to dispatch to the appropriate handler.
#[derive(Clone, Debug)]
pub enum ToolHandler {
    /// Stage, commit and push
    MutateAndSync(MutateAndSyncHandler),
    /// Send a notification
    Notify(NotifyHandler),
    /// Commit, push and announce
    FullWorkflow(FullWorkflowHandler),
    /// Read-only look at pending changes
    PreviewChanges(PreviewChangesHandler),
}

impl ToolHandler {
    /// Every registered tool, in listing order
    pub fn all() -> Vec<ToolHandler> {
        vec![
            ToolHandler::MutateAndSync(MutateAndSyncHandler),
            ToolHandler::Notify(NotifyHandler),
            ToolHandler::FullWorkflow(FullWorkflowHandler),
            ToolHandler::PreviewChanges(PreviewChangesHandler),
        ]
    }

    /// Get the tool name
    pub fn name(&self) -> &'static str {
        match self {
            ToolHandler::MutateAndSync(h) => h.name(),
            ToolHandler::Notify(h) => h.name(),
            ToolHandler::FullWorkflow(h) => h.name(),
            ToolHandler::PreviewChanges(h) => h.name(),
        }
    }

    /// Get the declared schema
    pub fn schema(&self) -> OperationSchema {
        match self {
            ToolHandler::MutateAndSync(h) => h.schema(),
            ToolHandler::Notify(h) => h.schema(),
            ToolHandler::FullWorkflow(h) => h.schema(),
            ToolHandler::PreviewChanges(h) => h.schema(),
        }
    }

    /// Execute the tool with validated arguments
    pub async fn execute(&self, orchestrator: &Orchestrator, args: Arguments) -> Result<String> {
        match self {
            ToolHandler::MutateAndSync(h) => h.execute(orchestrator, args).await,
            ToolHandler::Notify(h) => h.execute(orchestrator, args).await,
            ToolHandler::FullWorkflow(h) => h.execute(orchestrator, args).await,
            ToolHandler::PreviewChanges(h) => h.execute(orchestrator, args).await,
        }
    }
}

/// Parameters shared by the two committing tools
fn sync_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::optional(
            "customMessage",
            ParamKind::String,
            "Commit message to use instead of the generated one",
        ),
        ParamSpec::optional("branch", ParamKind::String, "Branch to push (default: main)")
            .with_default(json!(DEFAULT_BRANCH)),
    ]
}

fn sync_request(operation: &str, args: &Arguments) -> Result<SyncRequest> {
    let branch = args.string("branch").unwrap_or(DEFAULT_BRANCH);
    check_branch_name(branch)
        .map_err(|message| WorkflowError::validation_error(operation, message))?;

    Ok(SyncRequest {
        custom_message: args.string("customMessage").map(str::to_string),
        branch: branch.to_string(),
    })
}

/// Handler for mutate_and_sync
///
/// Stages every change, commits with a generated or supplied message, and
/// pushes the branch.
#[derive(Clone, Debug)]
pub struct MutateAndSyncHandler;

impl MutateAndSyncHandler {
    /// Returns the name of this tool
    pub fn name(&self) -> &'static str {
        "mutate_and_sync"
    }

    /// Returns the schema of this tool
    pub fn schema(&self) -> OperationSchema {
        OperationSchema {
            name: self.name(),
            description: "Stage all changes, commit them, and push to the remote. The commit message is generated from the change status unless customMessage is given.",
            params: sync_params(),
        }
    }

    /// Executes the tool
    pub async fn execute(&self, orchestrator: &Orchestrator, args: Arguments) -> Result<String> {
        orchestrator
            .mutate_and_sync(&sync_request(self.name(), &args)?)
            .await
    }
}

/// Handler for notify
#[derive(Clone, Debug)]
pub struct NotifyHandler;

impl NotifyHandler {
    /// Returns the name of this tool
    pub fn name(&self) -> &'static str {
        "notify"
    }

    /// Returns the schema of this tool
    pub fn schema(&self) -> OperationSchema {
        OperationSchema {
            name: self.name(),
            description: "Send a message to the configured Discord channel.",
            params: vec![
                ParamSpec::required("message", ParamKind::String, "Message to send"),
                ParamSpec::optional(
                    "color",
                    ParamKind::Integer,
                    "Embed color as a decimal RGB integer (default: 65280, green)",
                )
                .with_default(json!(COLOR_SUCCESS)),
            ],
        }
    }

    /// Executes the tool
    pub async fn execute(&self, orchestrator: &Orchestrator, args: Arguments) -> Result<String> {
        let message = args.require_string(self.name(), "message")?;
        let color = match args.integer("color") {
            Some(raw) => u32::try_from(raw)
                .ok()
                .filter(|c| *c <= 0xffffff)
                .ok_or_else(|| {
                    WorkflowError::validation_error(
                        self.name(),
                        format!("color must be between 0 and 16777215, got {}", raw),
                    )
                })?,
            None => COLOR_SUCCESS,
        };

        orchestrator.notify(message, color).await
    }
}

/// Handler for full_workflow
///
/// Commit-and-push followed by a notification of the outcome.
#[derive(Clone, Debug)]
pub struct FullWorkflowHandler;

impl FullWorkflowHandler {
    /// Returns the name of this tool
    pub fn name(&self) -> &'static str {
        "full_workflow"
    }

    /// Returns the schema of this tool
    pub fn schema(&self) -> OperationSchema {
        OperationSchema {
            name: self.name(),
            description: "Commit and push all changes, then announce the result on Discord. Failures are announced too.",
            params: sync_params(),
        }
    }

    /// Executes the tool
    pub async fn execute(&self, orchestrator: &Orchestrator, args: Arguments) -> Result<String> {
        orchestrator
            .full_workflow(&sync_request(self.name(), &args)?)
            .await
    }
}

/// Handler for preview_changes
#[derive(Clone, Debug)]
pub struct PreviewChangesHandler;

impl PreviewChangesHandler {
    /// Returns the name of this tool
    pub fn name(&self) -> &'static str {
        "preview_changes"
    }

    /// Returns the schema of this tool
    pub fn schema(&self) -> OperationSchema {
        OperationSchema {
            name: self.name(),
            description: "Show pending changes, the commit message that would be generated, and the current diffs. Makes no changes.",
            params: Vec::new(),
        }
    }

    /// Executes the tool
    pub async fn execute(&self, orchestrator: &Orchestrator, _args: Arguments) -> Result<String> {
        orchestrator.preview_changes().await
    }
}
