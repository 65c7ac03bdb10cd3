//! LINE platform collaborators: event model, signature check, reply client.

pub mod events;
pub mod messaging;
pub mod signature;

pub use events::{Event, MessageContent, Source, WebhookPayload};
pub use messaging::{LineMessagingClient, ReplyMessage};
