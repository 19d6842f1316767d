//! Offerbot — an affiliate-offers bot core.
//!
//! A conversation state machine with a channel-subscription gate,
//! first-use phone collection, and operator broadcast fan-out.

pub mod audit;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod gate;
pub mod menu;
pub mod session;
pub mod store;
pub mod telegram;
pub mod texts;
pub mod transport;

pub use error::{Error, Result};
