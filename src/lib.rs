//! # statwatch
//!
//! Live CPU, memory and socket graphs for processes run by a process
//! supervisor, plus a terminal dashboard to show them.
//!
//! The supervisor's stats backend pushes named events over a long-lived
//! connection. Each process, socket or watcher aggregate being watched gets
//! a graph binding: a subscription to exactly one event name, a fixed-size
//! rolling buffer, and readouts for its latest values. Watchers can also be
//! declared dynamic, in which case the backend pushes their current PIDs (or
//! socket FDs) and a graph is created for every member not seen before.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Dashboard                            │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐   ┌──────────┐ │
//! │  │ source  │───▶│   bus    │───▶│  graph   │──▶│Presentation││
//! │  │(events) │    │ (routes) │    │(bindings)│   │ (ui)     │ │
//! │  └────┬────┘    └────┬─────┘    └──────────┘   └──────────┘ │
//! │       │              │                                      │
//! │       ▼              ▼                                      │
//! │  ┌─────────┐    ┌──────────┐                                │
//! │  │ session │    │ registry │◀── membership events           │
//! │  │get_stats│    │(watchers)│                                │
//! │  └─────────┘    └──────────┘                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: The [`Transport`] trait with channel, TCP stream and
//!   replay implementations, and the frame codec
//! - **[`bus`]**: Event name to handler routing
//! - **[`graph`]**: [`GraphBinding`]s and the [`GraphFactory`] that creates them
//! - **[`registry`]**: Static and dynamic watchers, keyed graph bookkeeping
//! - **[`session`]**: The one-shot `get_stats` bootstrap per connection
//! - **[`dashboard`]**: Ties the above together and dispatches events
//! - **[`data`]**: Metrics, value formatting and rolling series
//! - **[`config`]**: Graph and dashboard configuration
//! - **[`app`]**, **[`events`]**, **[`ui`]**: The terminal dashboard
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Connect to a backend and graph the web watcher's processes
//! statwatch --connect localhost:8080 --dynamic web=ZXA=,Y3Q=
//!
//! # Replay a recorded session
//! statwatch --replay session.jsonl --config statwatch.toml
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use statwatch::{ChannelTransport, Dashboard, GraphConfig, WatcherEntry};
//! use statwatch::ui::Screen;
//!
//! let mut dashboard = Dashboard::with_watchers(
//!     Arc::new(GraphConfig::default()),
//!     vec![WatcherEntry::new("web", "st")],
//!     vec![],
//!     vec![],
//!     vec!["st".to_string()],
//! );
//!
//! let (handle, mut transport) = ChannelTransport::create("example");
//! handle.open();
//! handle.emit("stats-web-st", json!({"cpu": 12.5, "mem": 3.0}));
//!
//! let mut screen = Screen::new();
//! dashboard.pump(&mut transport, &mut screen, 16);
//!
//! assert_eq!(screen.text("web-st_last_cpu"), Some("12.5%"));
//! ```

pub mod app;
pub mod bus;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod events;
pub mod graph;
pub mod registry;
pub mod session;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::{DashboardConfig, GraphConfig, RgbColor};
pub use dashboard::Dashboard;
pub use data::{Metric, RollingSeries, ValueFormatter};
pub use error::{ConfigError, FrameError, TransportError};
pub use graph::{GraphBinding, GraphFactory, Presentation};
pub use registry::{DynamicWatcherEntry, WatcherEntry, WatcherRegistry};
pub use session::{GetStats, SessionBootstrapper};
pub use source::{ChannelEvent, ChannelTransport, InboundEvent, ReplayTransport, StreamTransport, Transport};
