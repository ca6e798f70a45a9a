//! Session bootstrap: asking the backend to start streaming.
//!
//! The backend emits no metric or membership events until it receives a
//! `get_stats` message, so every subscription is inert until the transport
//! opens and [`SessionBootstrapper::on_open`] sends it.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TransportError;
use crate::source::Transport;

/// The `get_stats` request sent on every channel open.
///
/// ```
/// use statwatch::session::GetStats;
///
/// let request = GetStats::new(vec!["web".into()], vec![], vec![], vec![]);
/// let json = serde_json::to_string(&request).unwrap();
/// assert!(json.starts_with(r#"{"name":"get_stats","watchers":["web"]"#));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStats {
    /// Always `"get_stats"`.
    pub name: String,
    /// Watchers whose aggregate stats are wanted.
    pub watchers: Vec<String>,
    /// `(watcher, data endpoint)` pairs whose members are wanted.
    #[serde(rename = "watchersWithPids")]
    pub watchers_with_pids: Vec<(String, String)>,
    pub endpoints: Vec<String>,
    pub stats_endpoints: Vec<String>,
}

impl GetStats {
    pub const NAME: &'static str = "get_stats";

    pub fn new(
        watchers: Vec<String>,
        watchers_with_pids: Vec<(String, String)>,
        endpoints: Vec<String>,
        stats_endpoints: Vec<String>,
    ) -> Self {
        Self {
            name: Self::NAME.to_string(),
            watchers,
            watchers_with_pids,
            endpoints,
            stats_endpoints,
        }
    }
}

/// Where the current connection stands with respect to the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No open connection has received the request yet.
    Waiting,
    /// The request went out on the current connection.
    Sent,
}

/// Sends the `get_stats` request exactly once per channel-open event.
#[derive(Debug)]
pub struct SessionBootstrapper {
    request: GetStats,
    state: SessionState,
    sent_count: u64,
}

impl SessionBootstrapper {
    pub fn new(request: GetStats) -> Self {
        Self {
            request,
            state: SessionState::Waiting,
            sent_count: 0,
        }
    }

    /// Called for every open event. Each one sends the request; a failed
    /// send leaves the session [`SessionState::Waiting`].
    ///
    /// Returns `Ok(true)` once the message was sent.
    pub fn on_open(&mut self, transport: &mut dyn Transport) -> Result<bool, TransportError> {
        let text = serde_json::to_string(&self.request)?;
        transport.send(text)?;

        self.state = SessionState::Sent;
        self.sent_count += 1;
        info!(
            watchers = self.request.watchers.len(),
            watchers_with_pids = self.request.watchers_with_pids.len(),
            "Sent get_stats on {}",
            transport.description()
        );
        Ok(true)
    }

    /// Called when the transport closes.
    pub fn on_close(&mut self) {
        self.state = SessionState::Waiting;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of open events the request was sent on.
    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn request(&self) -> &GetStats {
        &self.request
    }
}
