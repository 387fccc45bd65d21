//! td-core: Pure decode + filter library for Network Rail TD feed frames.
//!
//! No async, no network I/O — just the dispatch core plus the one-time
//! secrets-file read in `config`. This crate is shared by `td-monitor`
//! (live STOMP consumer) and anything that wants to decode captured frame
//! bodies offline.

pub mod config;
pub mod decode;
pub mod filter;
pub mod present;
pub mod route;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{AckMode, Credentials, DisplayMode, SessionConfig};
pub use decode::decode_body;
pub use filter::FilterCriteria;
pub use route::{classify_destination, FeedKind};
pub use types::*;
