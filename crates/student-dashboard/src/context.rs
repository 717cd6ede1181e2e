use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{AdapterError, AdapterResult};
use crate::model::HostContext;

/// The embedding host: initialize once, then ask for the tab context.
#[async_trait]
pub trait HostContextProvider: Send + Sync {
    async fn initialize(&self) -> AdapterResult<()>;
    async fn get_context(&self) -> AdapterResult<HostContext>;
}

/// Runs host initialization followed by context retrieval. Every failure is
/// reported as [`AdapterError::HostUnavailable`] (or `Cancelled`), so callers
/// treat any `Err` as "cannot proceed".
pub async fn get_host_context(
    host: &dyn HostContextProvider,
    cancel: &CancellationToken,
) -> AdapterResult<HostContext> {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AdapterError::Cancelled),
        result = async {
            host.initialize().await?;
            host.get_context().await
        } => result,
    };
    match result {
        Ok(ctx) => {
            debug!(group_id = ?ctx.group_id(), "host context loaded");
            Ok(ctx)
        }
        Err(AdapterError::Cancelled) => Err(AdapterError::Cancelled),
        Err(AdapterError::HostUnavailable(reason)) => {
            error!(%reason, "error initializing host context");
            Err(AdapterError::HostUnavailable(reason))
        }
        Err(other) => {
            error!(error = %other, "error initializing host context");
            Err(AdapterError::HostUnavailable(other.to_string()))
        }
    }
}

/// Host provider backed by a context captured ahead of time, e.g. a JSON
/// dump of the Teams `app.getContext()` result.
#[derive(Debug, Clone)]
pub struct StaticHostContext {
    context: Result<HostContext, String>,
}

impl StaticHostContext {
    pub fn new(context: HostContext) -> Self {
        Self {
            context: Ok(context),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            context: Err(reason.into()),
        }
    }

    pub fn from_json(bytes: &[u8]) -> AdapterResult<Self> {
        let context = serde_json::from_slice::<HostContext>(bytes)
            .map_err(|err| AdapterError::Malformed(format!("invalid host context: {err}")))?;
        Ok(Self::new(context))
    }

    pub fn from_file(path: &Path) -> AdapterResult<Self> {
        let bytes = std::fs::read(path).map_err(|err| {
            AdapterError::HostUnavailable(format!("read {}: {err}", path.display()))
        })?;
        Self::from_json(&bytes)
    }
}

#[async_trait]
impl HostContextProvider for StaticHostContext {
    async fn initialize(&self) -> AdapterResult<()> {
        match &self.context {
            Ok(_) => Ok(()),
            Err(reason) => Err(AdapterError::HostUnavailable(reason.clone())),
        }
    }

    async fn get_context(&self) -> AdapterResult<HostContext> {
        self.context
            .clone()
            .map_err(AdapterError::HostUnavailable)
    }
}
