//! Channel-based transport.
//!
//! Events are pushed through an in-memory channel instead of a socket. This
//! is useful when another component already owns the connection (a websocket
//! client, a message bus subscriber) and for driving the dashboard in tests.

use serde_json::Value;
use tokio::sync::mpsc;

use super::{ChannelEvent, InboundEvent, Transport};
use crate::error::TransportError;

/// A transport fed through an in-memory channel.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use statwatch::source::{ChannelEvent, ChannelTransport, Transport};
///
/// let (handle, mut transport) = ChannelTransport::create("bridge");
/// handle.open();
/// handle.emit("stats-web-ep", json!({"cpu": 3.0, "mem": 1.0}));
///
/// assert_eq!(transport.poll(), Some(ChannelEvent::Open));
/// assert!(matches!(transport.poll(), Some(ChannelEvent::Message(_))));
/// ```
#[derive(Debug)]
pub struct ChannelTransport {
    receiver: mpsc::UnboundedReceiver<ChannelEvent>,
    outbound: mpsc::UnboundedSender<String>,
    description: String,
    open: bool,
    last_error: Option<String>,
}

/// The producer side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct ChannelHandle {
    events: mpsc::UnboundedSender<ChannelEvent>,
    sent: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    /// Create a transport and the handle that feeds it.
    pub fn create(source_description: &str) -> (ChannelHandle, Self) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let transport = Self {
            receiver: events_rx,
            outbound: sent_tx,
            description: format!("channel: {}", source_description),
            open: false,
            last_error: None,
        };
        let handle = ChannelHandle {
            events: events_tx,
            sent: sent_rx,
        };
        (handle, transport)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl Transport for ChannelTransport {
    fn poll(&mut self) -> Option<ChannelEvent> {
        match self.receiver.try_recv() {
            Ok(event) => {
                match &event {
                    ChannelEvent::Open => {
                        self.open = true;
                        self.last_error = None;
                    }
                    ChannelEvent::Closed(reason) => {
                        self.open = false;
                        self.last_error = reason.clone();
                    }
                    ChannelEvent::Message(_) => {}
                }
                Some(event)
            }
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                if self.open {
                    self.open = false;
                    self.last_error = Some("Channel disconnected".to_string());
                    return Some(ChannelEvent::Closed(self.last_error.clone()));
                }
                None
            }
        }
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

impl ChannelHandle {
    /// Report the connection as open.
    pub fn open(&self) {
        let _ = self.events.send(ChannelEvent::Open);
    }

    /// Push a named event.
    pub fn emit(&self, name: &str, payload: Value) {
        self.push(InboundEvent::new(name, payload));
    }

    pub fn push(&self, event: InboundEvent) {
        let _ = self.events.send(ChannelEvent::Message(event));
    }

    /// Report the connection as closed.
    pub fn close(&self) {
        let _ = self.events.send(ChannelEvent::Closed(None));
    }

    /// Drain the frames the transport has sent so far.
    pub fn sent_messages(&mut self) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            sent.push(text);
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_arrive_in_order() {
        let (handle, mut transport) = ChannelTransport::create("test");
        handle.open();
        handle.emit("a", json!({"cpu": 1}));
        handle.emit("b", json!({"cpu": 2}));

        assert_eq!(transport.poll(), Some(ChannelEvent::Open));
        assert_eq!(
            transport.poll(),
            Some(ChannelEvent::Message(InboundEvent::new("a", json!({"cpu": 1}))))
        );
        assert_eq!(
            transport.poll(),
            Some(ChannelEvent::Message(InboundEvent::new("b", json!({"cpu": 2}))))
        );
        assert_eq!(transport.poll(), None);
    }

    #[test]
    fn test_send_requires_open_connection() {
        let (mut handle, mut transport) = ChannelTransport::create("test");
        assert!(matches!(transport.send("early".into()), Err(TransportError::Closed)));

        handle.open();
        transport.poll();
        transport.send("hello".into()).unwrap();
        assert_eq!(handle.sent_messages(), vec!["hello".to_string()]);

        handle.close();
        transport.poll();
        assert!(!transport.is_open());
        assert!(transport.send("late".into()).is_err());
    }

    #[test]
    fn test_dropped_handle_reports_close_once() {
        let (handle, mut transport) = ChannelTransport::create("test");
        handle.open();
        drop(handle);

        assert_eq!(transport.poll(), Some(ChannelEvent::Open));
        assert!(matches!(transport.poll(), Some(ChannelEvent::Closed(Some(_)))));
        assert_eq!(transport.poll(), None);
        assert_eq!(transport.error().as_deref(), Some("Channel disconnected"));
    }

    #[test]
    fn test_description() {
        let (_handle, transport) = ChannelTransport::create("ws://localhost:8080");
        assert_eq!(transport.description(), "channel: ws://localhost:8080");
    }
}
