//! The link engine
//!
//! A [`Link`] owns one byte source, one byte sink, a clock, the frame
//! parser and the handler registry. The caller drives it by calling
//! [`Link::poll`] from its main loop:
//!
//! 1. Abandon a frame that has gone stale
//! 2. Read every byte the source has ready and feed it to the parser
//! 3. Dispatch each completed frame to its handler
//! 4. Echo the frame back (except requests) when echo is enabled
//!
//! Nothing on the receive path allocates except JSON parsing and lossy
//! text conversion.

use ardutalk_hal::{ByteSink, ByteSource, Clock};
use ardutalk_protocol::{
    Frame, FrameError, FrameParser, FrameType, Orientation, Payload, ReceivedFrame,
    DEFAULT_RESYNC_CAPACITY,
};
use serde_json::Value;

use crate::config::{ConfigError, LinkConfig};
use crate::diagnostics::{LinkEvent, LinkStats};
use crate::dispatch::{Dispatch, Handlers};

/// Errors from the send API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError<E> {
    /// The payload does not fit in a frame
    Frame(FrameError),
    /// The value could not be serialized
    Encode,
    /// The byte sink failed
    Write(E),
}

/// What a single [`Link::poll`] or [`Link::feed`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollSummary {
    /// Bytes fed to the parser
    pub bytes: usize,
    /// Frames that passed validation
    pub frames: usize,
    /// Frame attempts discarded
    pub rejected: usize,
    /// A stale frame was abandoned before reading
    pub timed_out: bool,
}

/// A framed link over a byte transport
///
/// `N` is the resync history capacity.
pub struct Link<R, W, C, const N: usize = DEFAULT_RESYNC_CAPACITY> {
    source: R,
    sink: W,
    clock: C,
    config: LinkConfig,
    parser: FrameParser<N>,
    handlers: Handlers,
    stats: LinkStats,
}

impl<R, W, C, const N: usize> Link<R, W, C, N>
where
    R: ByteSource,
    W: ByteSink,
    C: Clock,
{
    /// Create a link with a validated configuration
    pub fn new(source: R, sink: W, clock: C, config: LinkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            clock,
            config,
            parser: FrameParser::new(),
            handlers: Handlers::new(),
            stats: LinkStats::new(),
        })
    }

    pub fn on_int(&mut self, handler: impl FnMut(i16) + 'static) {
        self.handlers.on_int(handler);
    }

    pub fn on_float(&mut self, handler: impl FnMut(f32) + 'static) {
        self.handlers.on_float(handler);
    }

    pub fn on_string(&mut self, handler: impl FnMut(&str) + 'static) {
        self.handlers.on_string(handler);
    }

    pub fn on_string_bytes(&mut self, handler: impl FnMut(&[u8]) + 'static) {
        self.handlers.on_string_bytes(handler);
    }

    pub fn on_json(&mut self, handler: impl FnMut(&Value) + 'static) {
        self.handlers.on_json(handler);
    }

    pub fn on_request(&mut self, handler: impl FnMut(u8) + 'static) {
        self.handlers.on_request(handler);
    }

    pub fn on_orientation(&mut self, handler: impl FnMut(Orientation) + 'static) {
        self.handlers.on_orientation(handler);
    }

    pub fn on_echo(&mut self, observer: impl FnMut(&[u8]) + 'static) {
        self.handlers.on_echo(observer);
    }

    pub fn on_event(&mut self, observer: impl FnMut(&LinkEvent) + 'static) {
        self.handlers.on_event(observer);
    }

    /// Check for a stale frame, then drain the byte source
    ///
    /// Returns early with the source's error if a read fails; bytes read
    /// before the failure have been processed.
    pub fn poll(&mut self) -> Result<PollSummary, R::Error> {
        let mut summary = PollSummary {
            timed_out: self.check_timeout(),
            ..PollSummary::default()
        };

        while self.source.bytes_available()? > 0 {
            let byte = self.source.read_byte()?;
            self.process(byte, &mut summary);
        }

        Ok(summary)
    }

    /// Process bytes received outside the byte source
    pub fn feed(&mut self, bytes: &[u8]) -> PollSummary {
        let mut summary = PollSummary::default();
        for &byte in bytes {
            self.process(byte, &mut summary);
        }
        summary
    }

    /// Abandon the frame in progress if it has gone stale
    ///
    /// Returns true if the parser was reset.
    pub fn check_timeout(&mut self) -> bool {
        let state = self.parser.state();
        let now_ms = self.clock.now_ms();
        let timeout_ms = u64::from(self.config.frame_timeout_ms);
        if !self.parser.check_timeout(now_ms, timeout_ms) {
            return false;
        }
        self.emit(LinkEvent::StaleFrameTimeout { state });
        true
    }

    /// Send any typed payload
    pub fn send(&mut self, payload: Payload<'_>) -> Result<(), SendError<W::Error>> {
        let frame = payload.to_frame().map_err(SendError::Frame)?;
        self.send_frame(&frame)
    }

    pub fn send_int(&mut self, value: i16) -> Result<(), SendError<W::Error>> {
        self.send(Payload::Int(value))
    }

    pub fn send_float(&mut self, value: f32) -> Result<(), SendError<W::Error>> {
        self.send(Payload::Float(value))
    }

    pub fn send_string(&mut self, text: &str) -> Result<(), SendError<W::Error>> {
        self.send(Payload::text(text))
    }

    /// Serialize `document` and send it as a JSON frame
    pub fn send_json(&mut self, document: &Value) -> Result<(), SendError<W::Error>> {
        let bytes = serde_json::to_vec(document).map_err(|_| SendError::Encode)?;
        self.send(Payload::Json(&bytes))
    }

    /// Ask the peer to send a value of `kind`
    pub fn send_request(&mut self, kind: FrameType) -> Result<(), SendError<W::Error>> {
        self.send(Payload::request(kind))
    }

    pub fn send_orientation(&mut self, orientation: Orientation) -> Result<(), SendError<W::Error>> {
        self.send(Payload::Orientation(orientation))
    }

    /// Encode and write a pre-built frame, then flush
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), SendError<W::Error>> {
        let bytes = frame.encode_to_vec().map_err(SendError::Frame)?;
        self.sink.write_all(&bytes).map_err(SendError::Write)?;
        self.sink.flush().map_err(SendError::Write)?;
        self.stats.record_send();
        trace!("sent frame type={=u8:#x} len={}", frame.frame_type, bytes.len());
        Ok(())
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Enable or disable echo of received frames
    pub fn set_echo(&mut self, echo: bool) {
        self.config.echo = echo;
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// The receive state machine
    pub fn parser(&self) -> &FrameParser<N> {
        &self.parser
    }

    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Tear the link down, returning the transport and clock
    pub fn into_parts(self) -> (R, W, C) {
        (self.source, self.sink, self.clock)
    }

    fn process(&mut self, byte: u8, summary: &mut PollSummary) {
        summary.bytes += 1;
        self.stats.record_byte();

        let now_ms = self.clock.now_ms();
        match self.parser.feed(byte, now_ms) {
            Ok(None) => {}
            Ok(Some(received)) => {
                summary.frames += 1;
                self.handle_frame(&received);
            }
            Err(rejection) => {
                summary.rejected += 1;
                self.emit(LinkEvent::FrameRejected(rejection));
            }
        }
    }

    fn handle_frame(&mut self, received: &ReceivedFrame) {
        let frame = &received.frame;
        self.emit(LinkEvent::FrameAccepted {
            frame_type: frame.frame_type,
            length: frame.length(),
        });

        match self.handlers.dispatch(frame) {
            Dispatch::Delivered(_) => self.stats.record_dispatch(),
            Dispatch::Unhandled(kind) => trace!("no handler for {:?}", kind),
            Dispatch::Unknown(frame_type) => debug!("unknown frame type {=u8:#x}", frame_type),
            Dispatch::Rejected(error) => self.emit(LinkEvent::PayloadRejected(error)),
        }

        // Dispatch first, then echo, even when the payload was rejected
        if self.config.echo && received.is_echoed() {
            self.echo(received);
        }
    }

    fn echo(&mut self, received: &ReceivedFrame) {
        let bytes = match received.encode_to_vec() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("echo encode failed: {:?}", e);
                return;
            }
        };

        let written = self.sink.write_all(&bytes).and_then(|()| self.sink.flush());
        match written {
            Ok(()) => {
                self.emit(LinkEvent::EchoSent { len: bytes.len() });
                self.handlers.notify_echo(&bytes);
            }
            Err(_) => self.emit(LinkEvent::EchoWriteFailed),
        }
    }

    fn emit(&mut self, event: LinkEvent) {
        self.stats.record(&event);
        match event {
            LinkEvent::FrameRejected(rejection) => {
                warn!("frame rejected: {:?}", rejection);
            }
            LinkEvent::StaleFrameTimeout { state } => {
                warn!("stale frame abandoned in {:?}", state);
            }
            LinkEvent::PayloadRejected(error) => {
                debug!("payload rejected: {:?}", error);
            }
            LinkEvent::EchoWriteFailed => {
                warn!("echo write failed");
            }
            LinkEvent::FrameAccepted { .. } | LinkEvent::EchoSent { .. } => {
                trace!("{:?}", event);
            }
        }
        self.handlers.notify_event(&event);
    }
}
