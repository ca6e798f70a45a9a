//! File-based transport.
//!
//! Replays a recorded session: a file with one encoded frame per line, as
//! captured from the backend's event stream.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{frame, ChannelEvent, Transport};
use crate::error::TransportError;

/// A transport that replays recorded frames from a file.
///
/// The file is read on the first poll. The replay opens, delivers every
/// decodable frame in order, then closes. Outbound messages have no backend
/// to go to; they are kept so callers can inspect what would have been sent.
#[derive(Debug)]
pub struct ReplayTransport {
    path: PathBuf,
    description: String,
    last_error: Option<String>,
    pending: VecDeque<ChannelEvent>,
    loaded: bool,
    sent: Vec<String>,
}

impl ReplayTransport {
    /// Create a replay of the given file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("replay: {}", path.display());
        Self {
            path,
            description,
            last_error: None,
            pending: VecDeque::new(),
            loaded: false,
            sent: Vec::new(),
        }
    }

    /// Returns the path being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Messages sent during the replay.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Whether every recorded frame has been delivered.
    pub fn is_finished(&self) -> bool {
        self.loaded && self.pending.is_empty()
    }

    /// Read and decode the recording.
    fn load(&mut self) {
        self.loaded = true;
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                self.last_error = Some(format!("Read error: {}", e));
                return;
            }
        };

        self.pending.push_back(ChannelEvent::Open);
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match frame::decode(line) {
                Ok(event) => self.pending.push_back(ChannelEvent::Message(event)),
                Err(e) => {
                    warn!(line = number + 1, "Skipping undecodable frame: {}", e);
                    self.last_error = Some(format!("Parse error on line {}: {}", number + 1, e));
                }
            }
        }
        self.pending.push_back(ChannelEvent::Closed(Some("Replay finished".to_string())));
        debug!(events = self.pending.len(), path = %self.path.display(), "Loaded replay");
    }
}

impl Transport for ReplayTransport {
    fn poll(&mut self) -> Option<ChannelEvent> {
        if !self.loaded {
            self.load();
        }
        self.pending.pop_front()
    }

    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if !self.loaded {
            return Err(TransportError::Closed);
        }
        self.sent.push(text);
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
