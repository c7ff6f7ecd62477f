use crate::EntryPoint;
use crate::error::Result;
use async_trait::async_trait;

/// Everything a hosted execution context is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    pub entry: EntryPoint,
    /// Runs before any page script.
    pub before_load: String,
    /// Runs after each load completes.
    pub after_load: String,
    pub offline: bool,
}

/// The surface that actually hosts the document (a web view, a headless
/// browser). Contexts are never reconfigured in place: a connectivity change
/// destroys the current one and creates a fresh one.
///
/// While offline the host must consult
/// [`Orchestrator::allow_navigation`](crate::Orchestrator::allow_navigation)
/// for every top-level navigation, and deliver channel messages to
/// [`Orchestrator::on_message`](crate::Orchestrator::on_message).
#[async_trait]
pub trait Host: Send + Sync {
    async fn create_context(&self, spec: ContextSpec) -> Result<()>;

    async fn destroy_context(&self);
}
