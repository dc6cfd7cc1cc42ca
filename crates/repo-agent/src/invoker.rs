//! The agent invocation capability

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AgentRequest, AgentResponse};

/// Something that can answer an [`AgentRequest`].
///
/// Implementations must map every failure into [`crate::AgentError`] so the
/// retry layer can classify it. One call is one external invocation; an
/// invoker never retries on its own.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Short name used in logs and failure records (e.g., "claude")
    fn name(&self) -> &str;

    /// Perform one invocation
    async fn invoke(&self, request: &AgentRequest) -> Result<AgentResponse>;
}
