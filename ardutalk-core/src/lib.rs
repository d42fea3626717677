//! Link engine for the ArduTalk serial protocol
//!
//! This crate ties the wire protocol to a transport:
//!
//! - Link configuration (timeouts, echo) and its persistence
//! - Handler registry and typed dispatch of received frames
//! - Diagnostic events and link statistics
//! - The [`Link`] engine: non-blocking polling, stale frame timeout,
//!   echo of received frames and the send API
//!
//! Everything runs on the caller's thread. [`Link::poll`] drains whatever
//! the byte source has ready and returns; it never blocks.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod link;

pub use config::{ConfigError, LinkConfig, DEFAULT_FRAME_TIMEOUT_MS};
pub use diagnostics::{LinkEvent, LinkStats};
pub use dispatch::{Dispatch, Handlers};
pub use link::{Link, PollSummary, SendError};

pub use serde_json::Value;
