//! Shared types for the rotating poll scheduler: routing keys, rotation
//! targets, polled messages and the typed error taxonomy.

pub mod error;
pub mod message;
pub mod types;

pub use error::RotationError;
pub use message::Message;
pub use types::{KeyDirectory, RoutingKey};
