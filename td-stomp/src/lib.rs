//! td-stomp: Minimal STOMP 1.2 client for the Network Rail open data brokers.
//!
//! Covers exactly what a feed consumer needs: connect with credentials and
//! heartbeating, one subscription, a stream of MESSAGE deliveries, and
//! per-frame acknowledgement for durable subscriptions. Not a general
//! broker client.

use thiserror::Error;

pub mod client;
pub mod frame;

pub use client::{Delivery, StompClient, StompConfig};
pub use frame::Frame;

/// All errors produced by td-stomp.
#[derive(Debug, Error)]
pub enum StompError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    BadFrame(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StompError>;
