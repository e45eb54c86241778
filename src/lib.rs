// gitpulse - Git Workflow Automation
//
// Commits, pushes, and announces working-tree changes on behalf of an AI
// agent, exposed as MCP tools over stdio or HTTP.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Command-line interface and process wiring
pub mod cli;
/// Configuration layering and validation
pub mod config;
/// Error types and user-facing formatting
pub mod errors;
/// Git mutation backend
pub mod git;
/// MCP JSON-RPC server and tool dispatch
pub mod mcp;
/// Discord webhook notifications
pub mod notify;
/// Porcelain status parsing and commit message generation
pub mod summary;
/// Sync orchestration over the backend and notification sink
pub mod workflow;

pub use config::{ConfigFile, ConfigOverrides, WebhookTarget, WorkflowConfig};
pub use errors::{BackendError, Result, WorkflowError};
pub use git::{GitCli, MutationBackend};
pub use mcp::{Dispatcher, OperationRequest, OperationResult};
pub use notify::{DiscordWebhook, Notification, NotificationSink};
pub use summary::generate_commit_message;
pub use workflow::{Orchestrator, SyncRequest};
