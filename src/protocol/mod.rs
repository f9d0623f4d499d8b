//! Protocol module for scheduling-center communication
//!
//! Defines the message types and serialization for the executor protocol.
//! All payloads are JSON over HTTP, field names in camelCase.

mod messages;

pub use messages::*;
