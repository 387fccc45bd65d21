//! Route delivered frames to a domain decoder by destination topic.
//!
//! Depending on subscription mode the broker reports the destination either
//! as the bare topic name (`TD_ALL_SIG_AREA`) or with the `/topic/` path
//! segment in front; both forms must classify identically.

/// Which feed a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// TRUST train-movement feed (routed but not decoded here)
    TrainMovement,
    /// TD train-describer feed
    TrainDescriber,
}

impl FeedKind {
    /// The full subscription topic for this feed.
    pub fn topic(&self) -> &'static str {
        match self {
            FeedKind::TrainMovement => "/topic/TRAIN_MVT_ALL_TOC",
            FeedKind::TrainDescriber => "/topic/TD_ALL_SIG_AREA",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::TrainMovement => write!(f, "TRUST"),
            FeedKind::TrainDescriber => write!(f, "TD"),
        }
    }
}

/// Classify a frame's destination header.
///
/// Case-sensitive prefix match. Returns `None` for anything unrecognized;
/// the caller logs the raw destination and drops the frame.
pub fn classify_destination(destination: &str) -> Option<FeedKind> {
    let topic = destination.strip_prefix("/topic/").unwrap_or(destination);
    if topic.starts_with("TRAIN_MVT_") {
        Some(FeedKind::TrainMovement)
    } else if topic.starts_with("TD_") {
        Some(FeedKind::TrainDescriber)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
