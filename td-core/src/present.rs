//! Render decoded TD events as human-readable lines.
//!
//! The feed timestamps are UTC epoch milliseconds; operators read them as
//! UK civil time, so rendering goes through Europe/London including the
//! daylight-saving transitions.

use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;

use crate::types::TdEvent;

/// Format an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM:SS` UK local
/// time. Second precision; the division by 1000 happens here, not at decode.
pub fn local_timestamp(time_ms: i64) -> String {
    let utc = DateTime::<Utc>::from_timestamp(time_ms / 1000, 0).unwrap_or(DateTime::UNIX_EPOCH);
    utc.with_timezone(&London)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Summary line for the unfiltered stream.
///
/// Only berth movements are shown; heartbeats and signalling messages are
/// suppressed. Columns: type code, area (2), description (4), from-berth
/// right-aligned and to-berth left-aligned at width 5.
pub fn summary_line(event: &TdEvent) -> Option<String> {
    if !event.msg_type.is_berth() {
        return None;
    }
    Some(format!(
        "{} [{:2}] {:2} {:4} {:>5}->{:<5}",
        local_timestamp(event.time_ms),
        event.msg_type.code(),
        event.area_id,
        event.description,
        event.from_berth,
        event.to_berth,
    ))
}

/// Detail line for events selected by the filter. All message classes are
/// rendered, with the full decoded record included for inspection.
pub fn filtered_line(event: &TdEvent) -> String {
    format!(
        "{} # {:?} # [{}] Area={} Desc={} Berths {}->{}",
        local_timestamp(event.time_ms),
        event,
        event.msg_type.code(),
        event.area_id,
        event.description,
        event.from_berth,
        event.to_berth,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
