//! Webhook ingestion and dispatch engine.
//!
//! ```text
//! Delivery → EnvelopeAdapter → CanonicalRequest → WebhookParser → [Event]
//!                                                                   ↓
//!                                        RulesEngine → ReplyAction → ReplyExecutor
//! ```

pub mod dispatch;
pub mod envelope;
pub mod executor;
pub mod parser;
pub mod routes;
pub mod rules;
pub mod types;

pub use dispatch::{DispatchReport, Dispatcher, EventOutcome};
pub use envelope::{EnvelopeAdapter, EnvelopeMode, InboundAdapter};
pub use executor::{ReplyExecutor, ReplySender};
pub use parser::{LineWebhookParser, WebhookParser};
pub use routes::{WebhookState, app};
pub use rules::{RulesEngine, TriggerRule};
pub use types::{CanonicalRequest, Delivery, ReplyAction};
