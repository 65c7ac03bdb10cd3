//! Per-delivery dispatch loop.
//!
//! ```text
//! Received → Adapted → Authenticated&Parsed → per event: Matched | Unmatched
//!                                                      → Replied | Failed
//!          → Completed
//! ```
//!
//! Delivery-level errors (adapt, auth, parse) abort before any event runs.
//! Reply failures are recorded per event and never abort the batch.

use std::sync::Arc;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::error::WebhookError;
use crate::telemetry::TraceContext;
use crate::webhook::envelope::EnvelopeAdapter;
use crate::webhook::executor::{ReplyExecutor, ReplySender};
use crate::webhook::parser::WebhookParser;
use crate::webhook::rules::RulesEngine;
use crate::webhook::types::Delivery;

/// What happened to one event of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// No rule matched; nothing was sent.
    Unmatched,
    /// A reply was sent for this reply token.
    Replied { reply_token: String },
    /// A reply was attempted and failed.
    Failed { reply_token: String, reason: String },
}

/// Result of a completed delivery, one outcome per event in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub outcomes: Vec<EventOutcome>,
}

impl DispatchReport {
    pub fn event_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn replied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EventOutcome::Replied { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EventOutcome::Failed { .. }))
            .count()
    }
}

/// The webhook core, parameterized by its two platform capabilities.
#[derive(Clone)]
pub struct Dispatcher {
    adapter: EnvelopeAdapter,
    parser: Arc<dyn WebhookParser>,
    rules: Arc<RulesEngine>,
    executor: ReplyExecutor,
}

impl Dispatcher {
    pub fn new(
        parser: Arc<dyn WebhookParser>,
        rules: RulesEngine,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            adapter: EnvelopeAdapter::new(),
            parser,
            rules: Arc::new(rules),
            executor: ReplyExecutor::new(sender),
        }
    }

    /// Process one delivery to completion.
    ///
    /// Events run sequentially in arrival order. Returns an error only when
    /// the delivery as a whole is rejected.
    pub async fn dispatch(
        &self,
        delivery: Delivery,
        trace: &TraceContext,
    ) -> Result<DispatchReport, WebhookError> {
        let delivery_id = Uuid::new_v4();
        let trace_id = trace.trace_id().unwrap_or_else(|| "-".to_string());
        let span = info_span!("delivery", delivery_id = %delivery_id, trace_id = %trace_id);

        self.run(delivery, trace).instrument(span).await
    }

    async fn run(
        &self,
        delivery: Delivery,
        trace: &TraceContext,
    ) -> Result<DispatchReport, WebhookError> {
        let canonical = self.adapter.adapt(delivery)?;
        let events = self.parser.parse(&canonical)?;

        let mut report = DispatchReport {
            outcomes: Vec::with_capacity(events.len()),
        };

        for (index, event) in events.iter().enumerate() {
            let Some(action) = self.rules.evaluate(event) else {
                report.outcomes.push(EventOutcome::Unmatched);
                continue;
            };

            info!(index, kind = event.kind(), "Event matched trigger rule");
            let outcome = match self.executor.execute(&action, trace).await {
                Ok(()) => EventOutcome::Replied {
                    reply_token: action.reply_token,
                },
                Err(e) => EventOutcome::Failed {
                    reply_token: action.reply_token,
                    reason: e.to_string(),
                },
            };
            report.outcomes.push(outcome);
        }

        info!(
            events = report.event_count(),
            replied = report.replied(),
            failed = report.failed(),
            "Delivery completed"
        );
        Ok(report)
    }
}
