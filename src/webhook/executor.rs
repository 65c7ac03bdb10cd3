//! Reply execution with failure isolation.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, info, info_span, warn};

use crate::error::ReplyError;
use crate::telemetry::TraceContext;
use crate::webhook::types::ReplyAction;

/// Outbound reply capability.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Deliver one reply. Called at most once per action.
    async fn reply(&self, action: &ReplyAction, trace: &TraceContext) -> Result<(), ReplyError>;
}

/// Runs reply actions against a [`ReplySender`].
///
/// A failed reply is logged here and handed back to the caller to record;
/// it is never retried.
#[derive(Clone)]
pub struct ReplyExecutor {
    sender: Arc<dyn ReplySender>,
}

impl ReplyExecutor {
    pub fn new(sender: Arc<dyn ReplySender>) -> Self {
        Self { sender }
    }

    pub async fn execute(
        &self,
        action: &ReplyAction,
        trace: &TraceContext,
    ) -> Result<(), ReplyError> {
        let trace_id = trace.trace_id().unwrap_or_else(|| "-".to_string());
        let span = info_span!("reply", trace_id = %trace_id);

        let result = self.sender.reply(action, trace).instrument(span).await;
        match &result {
            Ok(()) => info!("Reply delivered"),
            Err(e) => warn!(error = %e, "Reply failed"),
        }
        result
    }
}
