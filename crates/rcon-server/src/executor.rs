//! The command executor capability.
//!
//! `CommandExecutor` is the one collaborator this crate treats as entirely
//! opaque: what a command does, how it is parsed, and what emits its
//! output are out of scope (see the crate-level Non-goals). The read task
//! calls it synchronously and is responsible for applying its own bounded
//! per-call time budget — this trait makes no timeout guarantee itself.

use async_trait::async_trait;
use thiserror::Error;

/// Errors an executor may report back to the connection.
///
/// Both variants are operational, per-command errors (see the crate-level
/// error taxonomy): the connection stays open and a textual
/// `ResponseValue` is sent in place of command output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The executor did not complete within its caller-enforced budget.
    #[error("command timed out")]
    Timeout,

    /// The executor is unavailable (e.g. the game server process it
    /// drives has exited).
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// A capability that runs the text of a command and returns its output.
///
/// Implementations MUST be safe to call concurrently from independent
/// connections' read tasks: each call is logically synchronous from the
/// point of view of the connection that issued it, but distinct
/// connections may call this trait at the same time.
#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    /// Execute `command` (the verbatim `ExecCommand` body) and return its
    /// textual output.
    async fn execute(&self, command: &str) -> Result<String, ExecutorError>;
}

/// Reference executor that echoes the command back, prefixed.
///
/// Used by integration tests and the demo binary; not meant for production
/// use, where the embedding application supplies its own game-server- or
/// process-specific executor.
#[derive(Debug, Default)]
pub struct EchoExecutor;

#[async_trait]
impl CommandExecutor for EchoExecutor {
    async fn execute(&self, command: &str) -> Result<String, ExecutorError> {
        Ok(format!("echo: {command}"))
    }
}
