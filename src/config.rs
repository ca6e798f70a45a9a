//! Graph and dashboard configuration.
//!
//! Configuration is read once at startup from an optional TOML file plus
//! environment overrides, then shared read-only by every graph.
//!
//! ```toml
//! endpoints = ["dGNwOi8vMTI3LjAuMC4xOjU1NTU="]
//! stats_endpoints = ["dGNwOi8vMTI3LjAuMC4xOjU1NTc="]
//!
//! [graph]
//! delay = 10
//! dataSize = 25
//!
//! [graph.colors]
//! cpu = "rgb(122, 185, 76)"
//!
//! [[watchers]]
//! name = "sockets"
//! stats_endpoint = "dGNwOi8vMTI3LjAuMC4xOjU1NTc="
//!
//! [[dynamic_watchers]]
//! name = "web"
//! stats_endpoint = "dGNwOi8vMTI3LjAuMC4xOjU1NTc="
//! data_endpoint = "dGNwOi8vMTI3LjAuMC4xOjU1NTU="
//! ```
//!
//! Any value can be overridden from the environment, e.g.
//! `STATWATCH_CONNECT=127.0.0.1:8080` or `STATWATCH_GRAPH__DELAY=5`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::data::Metric;
use crate::error::ConfigError;
use crate::registry::{DynamicWatcherEntry, WatcherEntry};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "STATWATCH";

/// `STATWATCH_CONNECT`, `STATWATCH_GRAPH__DELAY`: one `_` after the prefix,
/// `__` between nested keys.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

/// An RGB color as written in configuration: `rgb(r, g, b)` or `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for RgbColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ConfigError::Color(s.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(invalid());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let inner = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let channels: Vec<u8> = inner
            .split(',')
            .map(|c| c.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for RgbColor {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Shape and timing of every graph in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Nominal graph width in pixels.
    pub width: u16,
    /// Nominal graph height in pixels.
    pub height: u16,
    /// Seconds between consecutive points.
    pub delay: f64,
    /// Number of points kept per graph.
    #[serde(alias = "dataSize", alias = "datasize")]
    pub data_size: usize,
    /// Line color per metric name.
    pub colors: BTreeMap<String, RgbColor>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            width: 290,
            height: 79,
            delay: 10.0,
            data_size: 25,
            colors: BTreeMap::from([
                (Metric::Mem.name().to_string(), RgbColor::new(93, 170, 204)),
                (Metric::Cpu.name().to_string(), RgbColor::new(122, 185, 76)),
                (Metric::Reads.name().to_string(), RgbColor::new(203, 81, 58)),
            ]),
        }
    }
}

impl GraphConfig {
    /// Color configured for a metric.
    pub fn color(&self, metric: Metric) -> Option<RgbColor> {
        self.colors.get(metric.name()).copied()
    }

    /// Check values that would make graphs meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_size == 0 {
            return Err(ConfigError::Invalid("graph.dataSize must be at least 1".into()));
        }
        if !(self.delay.is_finite() && self.delay > 0.0) {
            return Err(ConfigError::Invalid("graph.delay must be positive".into()));
        }
        Ok(())
    }
}

/// Everything a dashboard session needs: graph settings and what to stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub graph: GraphConfig,
    /// Watchers graphed as a single aggregate.
    pub watchers: Vec<WatcherEntry>,
    /// Watchers whose PIDs (or socket FDs) are graphed individually.
    pub dynamic_watchers: Vec<DynamicWatcherEntry>,
    /// Supervisor control endpoints, passed through to the backend.
    pub endpoints: Vec<String>,
    /// Supervisor stats endpoints, passed through to the backend.
    pub stats_endpoints: Vec<String>,
    /// `host:port` of the event stream.
    pub connect: Option<String>,
}

impl DashboardConfig {
    /// Load from an optional TOML file with environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, environment())
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder.add_source(env).build()?;

        let dashboard: Self = config.try_deserialize()?;
        dashboard.validate()?;
        Ok(dashboard)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        let names = self
            .watchers
            .iter()
            .map(|w| &w.name)
            .chain(self.dynamic_watchers.iter().map(|w| &w.name));
        for name in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("watcher names must not be empty".into()));
            }
        }
        Ok(())
    }
}
