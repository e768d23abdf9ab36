//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Last known reachability of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

impl EndpointStatus {
    pub fn from_outcome(is_up: bool) -> Self {
        if is_up {
            Self::Up
        } else {
            Self::Down
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndpointStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown endpoint status: {}", other)),
        }
    }
}

/// A monitored endpoint and its derived summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub status: EndpointStatus,
    /// Uptime percentage over the aggregation window (0.0 - 100.0).
    pub uptime: f64,
    pub last_check: Option<DateTime<Utc>>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            url: String::new(),
            status: EndpointStatus::Unknown,
            uptime: 100.0,
            last_check: None,
        }
    }
}

/// Registration payload for a new endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEndpoint {
    pub name: String,
    pub url: String,
}

/// A single immutable probe result.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    pub id: i64,
    pub endpoint_id: i64,
    pub checked_at: DateTime<Utc>,
    pub is_up: bool,
    /// Latency in milliseconds, or None when the request never left the client.
    pub response_time_ms: Option<f64>,
}
