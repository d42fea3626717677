//! ArduTalk Hardware Abstraction Layer
//!
//! This crate defines the transport traits the link engine is written
//! against. A chip-specific UART, a USB CDC endpoint or an in-memory pipe
//! all look the same to the engine once they implement these traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  ardutalk-core (Link engine)            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ardutalk-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-io   │       │   Loopback    │
//! │ (UART, USB)   │       │  (host tests) │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`serial::ByteSource`], [`serial::ByteSink`] - Polled byte transport
//! - [`clock::Clock`] - Monotonic millisecond time base

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod io;
pub mod loopback;
pub mod serial;

// Re-export key traits at crate root for convenience
pub use clock::{Clock, ManualClock};
pub use io::{IoSink, IoSource};
pub use loopback::Loopback;
pub use serial::{ByteSink, ByteSource, UartConfig};
