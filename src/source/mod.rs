//! Event transports.
//!
//! A transport delivers named events from the supervisor backend and carries
//! the single outbound bootstrap message back. This module provides a trait
//! for that channel plus implementations for in-memory channels, async byte
//! streams (TCP), and recorded sessions.

mod channel;
mod file;
pub mod frame;
mod stream;

pub use channel::{ChannelHandle, ChannelTransport};
pub use file::ReplayTransport;
pub use stream::StreamTransport;

use std::fmt::Debug;

use serde_json::Value;

use crate::error::TransportError;

/// A named event pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// Event name, e.g. `stats-web-ZXA=` or `socket-stats-fds-ZXA=`.
    pub name: String,
    /// Event arguments, usually a JSON object.
    pub payload: Value,
}

impl InboundEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// What a transport reports on each poll.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The connection is open and can send.
    Open,
    /// An inbound event.
    Message(InboundEvent),
    /// The connection closed, with a reason if one is known.
    Closed(Option<String>),
}

/// A persistent bidirectional event channel.
///
/// # Example
///
/// ```
/// use statwatch::source::{ChannelEvent, ChannelTransport, Transport};
///
/// let (handle, mut transport) = ChannelTransport::create("local");
/// handle.open();
/// assert_eq!(transport.poll(), Some(ChannelEvent::Open));
/// transport.send("{}".to_string()).unwrap();
/// ```
pub trait Transport: Send + Debug {
    /// Poll for the next lifecycle change or inbound event.
    ///
    /// Returns `None` when nothing is pending. This method must not block.
    fn poll(&mut self) -> Option<ChannelEvent>;

    /// Send one text frame to the backend.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Human-readable description, shown in the status bar.
    fn description(&self) -> &str;

    /// The last error the transport ran into, if any.
    fn error(&self) -> Option<String>;
}
