//! Link configuration
//!
//! The resync history capacity is a const generic on [`Link`](crate::Link)
//! rather than a field here; everything else that tunes a link lives in
//! [`LinkConfig`]. With the `serde` feature the configuration can be stored
//! as postcard binary data, e.g. in flash.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default stale frame timeout
pub const DEFAULT_FRAME_TIMEOUT_MS: u32 = 500;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A zero timeout would abandon every frame between two polls
    ZeroTimeout,
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
}

/// Link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// A frame in progress with no state change for longer than this is
    /// abandoned (milliseconds)
    pub frame_timeout_ms: u32,
    /// Echo received frames (other than requests) back to the sender
    pub echo: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfig {
    /// Default configuration: 500 ms timeout, echo on
    pub const fn new() -> Self {
        Self {
            frame_timeout_ms: DEFAULT_FRAME_TIMEOUT_MS,
            echo: true,
        }
    }

    /// Set the stale frame timeout
    pub const fn with_frame_timeout_ms(mut self, frame_timeout_ms: u32) -> Self {
        self.frame_timeout_ms = frame_timeout_ms;
        self
    }

    /// Enable or disable echo
    pub const fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Serialize into `buffer` with postcard
    ///
    /// Returns the used part of the buffer.
    #[cfg(feature = "serde")]
    pub fn to_slice<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize and validate a stored configuration
    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.frame_timeout_ms, 500);
        assert!(config.echo);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_builder() {
        let config = LinkConfig::new()
            .with_frame_timeout_ms(1_000)
            .with_echo(false);
        assert_eq!(config.frame_timeout_ms, 1_000);
        assert!(!config.echo);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = LinkConfig::new().with_frame_timeout_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_roundtrip() {
        let config = LinkConfig::new().with_frame_timeout_ms(250).with_echo(false);
        let mut buffer = [0u8; 16];
        let bytes = config.to_slice(&mut buffer).unwrap();
        assert_eq!(LinkConfig::from_bytes(bytes), Ok(config));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_stored_zero_timeout_rejected() {
        let config = LinkConfig::new().with_frame_timeout_ms(0);
        let mut buffer = [0u8; 16];
        let bytes = config.to_slice(&mut buffer).unwrap();
        assert_eq!(LinkConfig::from_bytes(bytes), Err(ConfigError::ZeroTimeout));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_truncated_bytes_rejected() {
        assert_eq!(LinkConfig::from_bytes(&[]), Err(ConfigError::Deserialize));
    }
}
