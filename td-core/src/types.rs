//! Shared types, error enum, and decoded TD message types for td-core.

use thiserror::Error;

/// All errors produced by td-core.
#[derive(Debug, Error)]
pub enum TdError {
    #[error("frame body is not a JSON array: {0}")]
    InvalidBody(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TdError>;

// ---------------------------------------------------------------------------
// Transport envelope
// ---------------------------------------------------------------------------

/// One delivered frame as seen by the dispatch loop.
///
/// Owned transiently for the duration of a single dispatch; the ack token is
/// only present when the broker expects explicit acknowledgement.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub destination: String,
    pub ack_token: Option<String>,
    pub body: String,
}

// ---------------------------------------------------------------------------
// TD message types
// ---------------------------------------------------------------------------

/// TD message class, keyed by the two-letter `msg_type` code.
///
/// C-class messages describe berth contents; S-class messages carry raw
/// signalling state. Unrecognized codes are preserved verbatim so they still
/// show up in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TdMessageType {
    /// "CA" — description moves from the "from" berth into "to"
    BerthStep,
    /// "CB" — description is erased from the "from" berth
    BerthCancel,
    /// "CC" — description is inserted into the "to" berth
    BerthInterpose,
    /// "CT" — sent periodically by a train describer
    Heartbeat,
    /// "SF" — signalling update
    SignallingUpdate,
    /// "SG" — signalling refresh
    SignallingRefresh,
    /// "SH" — signalling refresh finished
    SignallingRefreshFinished,
    /// Anything else, raw code preserved
    Unknown(String),
}

impl TdMessageType {
    /// Map a raw `msg_type` code. Unknown codes are kept, not dropped.
    pub fn from_code(code: &str) -> Self {
        match code {
            "CA" => TdMessageType::BerthStep,
            "CB" => TdMessageType::BerthCancel,
            "CC" => TdMessageType::BerthInterpose,
            "CT" => TdMessageType::Heartbeat,
            "SF" => TdMessageType::SignallingUpdate,
            "SG" => TdMessageType::SignallingRefresh,
            "SH" => TdMessageType::SignallingRefreshFinished,
            other => TdMessageType::Unknown(other.to_string()),
        }
    }

    /// The two-letter wire code, including for `Unknown`.
    pub fn code(&self) -> &str {
        match self {
            TdMessageType::BerthStep => "CA",
            TdMessageType::BerthCancel => "CB",
            TdMessageType::BerthInterpose => "CC",
            TdMessageType::Heartbeat => "CT",
            TdMessageType::SignallingUpdate => "SF",
            TdMessageType::SignallingRefresh => "SG",
            TdMessageType::SignallingRefreshFinished => "SH",
            TdMessageType::Unknown(code) => code,
        }
    }

    /// True for the three berth-movement types.
    ///
    /// Heartbeats are deliberately not included: they carry the
    /// `data`/`address` payload and bypass the berth filter.
    pub fn is_berth(&self) -> bool {
        matches!(
            self,
            TdMessageType::BerthStep | TdMessageType::BerthCancel | TdMessageType::BerthInterpose
        )
    }
}

// ---------------------------------------------------------------------------
// Decoded event record
// ---------------------------------------------------------------------------

/// One decoded TD event.
///
/// Timestamps stay in epoch milliseconds as delivered; conversion to seconds
/// and local civil time happens at presentation.
///
/// For Berth* types `description`/`from_berth`/`to_berth` come from
/// `descr`/`from`/`to`. For everything else `description` carries the `data`
/// field and `from_berth` the describer `address`; `to_berth` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TdEvent {
    pub msg_type: TdMessageType,
    pub time_ms: i64,
    pub area_id: String,
    pub description: String,
    pub from_berth: String,
    pub to_berth: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
