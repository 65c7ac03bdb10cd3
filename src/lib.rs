//! Pingu bot: LINE webhook responder that answers a trigger word with audio.

pub mod config;
pub mod error;
pub mod line;
pub mod telemetry;
pub mod webhook;
