//! Session configuration for a monitor run.
//!
//! Feed choice, acknowledgement mode, and display mode are all resolved once
//! before the dispatch loop starts; nothing in here changes per frame.

use std::path::Path;

use crate::filter::FilterCriteria;
use crate::route::FeedKind;
use crate::types::{Result, TdError};

/// Subscription acknowledgement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// Broker auto-acknowledges; no ACK frames are sent.
    Auto,
    /// Durable subscription; every delivered frame is acknowledged
    /// individually using its ack token.
    ClientIndividual,
}

impl AckMode {
    pub fn from_durable(durable: bool) -> Self {
        if durable {
            AckMode::ClientIndividual
        } else {
            AckMode::Auto
        }
    }

    /// Value for the STOMP `ack` subscription header.
    pub fn header_value(&self) -> &'static str {
        match self {
            AckMode::Auto => "auto",
            AckMode::ClientIndividual => "client-individual",
        }
    }
}

/// How decoded events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// No criteria supplied: berth movements from the whole stream.
    Summary,
    /// Criteria supplied: everything the filter selects, in detail.
    Filtered,
}

/// Immutable per-session configuration handed to the dispatch loop.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub feed: FeedKind,
    pub ack_mode: AckMode,
    pub display: DisplayMode,
    pub criteria: FilterCriteria,
}

impl SessionConfig {
    pub fn new(feed: FeedKind, durable: bool, criteria: FilterCriteria) -> Self {
        let display = if criteria.is_empty() {
            DisplayMode::Summary
        } else {
            DisplayMode::Filtered
        };
        SessionConfig {
            feed,
            ack_mode: AckMode::from_durable(durable),
            display,
            criteria,
        }
    }

    /// Broker-side subscription name for durable mode. Must be unique per
    /// account and topic, so it is derived from both.
    pub fn subscription_name(&self, username: &str) -> Option<String> {
        match self.ack_mode {
            AckMode::ClientIndividual => Some(format!("{}{}", username, self.feed.topic())),
            AckMode::Auto => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Feed account credentials, read once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub passcode: String,
}

/// Load credentials from a secrets file holding a two-element JSON array:
/// `["username", "passcode"]`.
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    let text = std::fs::read_to_string(path)?;
    let (username, passcode): (String, String) = serde_json::from_str(&text)
        .map_err(|e| TdError::Config(format!("{}: {e}", path.display())))?;
    Ok(Credentials { username, passcode })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
