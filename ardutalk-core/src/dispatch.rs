//! Handler registry and typed dispatch
//!
//! One optional handler per payload kind. Registering a handler replaces
//! the previous one; an empty slot makes delivery a silent no-op.
//!
//! | TYPE        | Handler argument                    |
//! |-------------|-------------------------------------|
//! | INT         | `i16`                               |
//! | FLOAT       | `f32`                               |
//! | STRING      | `&str` (lossy UTF-8) or raw `&[u8]` |
//! | JSON        | `&serde_json::Value`                |
//! | REQUEST     | requested TYPE byte                 |
//! | ORIENTATION | [`Orientation`]                     |

use alloc::boxed::Box;
use alloc::string::String;

use ardutalk_protocol::{Frame, FrameType, Orientation, Payload, PayloadError};
use serde_json::Value;

use crate::diagnostics::LinkEvent;

type Slot<T> = Option<Box<dyn FnMut(T)>>;

/// What happened to a frame handed to [`Handlers::dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// The handler for this kind was called
    Delivered(FrameType),
    /// The payload was valid but no handler is registered
    Unhandled(FrameType),
    /// TYPE byte with no handler slot
    Unknown(u8),
    /// The payload could not be decoded; no handler was called
    Rejected(PayloadError),
}

/// Registered callbacks
#[derive(Default)]
pub struct Handlers {
    int: Slot<i16>,
    float: Slot<f32>,
    string: Option<Box<dyn FnMut(&str)>>,
    string_bytes: Option<Box<dyn FnMut(&[u8])>>,
    json: Option<Box<dyn FnMut(&Value)>>,
    request: Slot<u8>,
    orientation: Slot<Orientation>,
    echo: Option<Box<dyn FnMut(&[u8])>>,
    event: Option<Box<dyn FnMut(&LinkEvent)>>,
}

impl Handlers {
    /// Registry with every slot empty
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_int(&mut self, handler: impl FnMut(i16) + 'static) {
        self.int = Some(Box::new(handler));
    }

    pub fn on_float(&mut self, handler: impl FnMut(f32) + 'static) {
        self.float = Some(Box::new(handler));
    }

    pub fn on_string(&mut self, handler: impl FnMut(&str) + 'static) {
        self.string = Some(Box::new(handler));
    }

    /// The handler receives STRING payloads exactly as sent, valid UTF-8 or not
    ///
    /// Independent of [`Handlers::on_string`]; both run when both are set.
    pub fn on_string_bytes(&mut self, handler: impl FnMut(&[u8]) + 'static) {
        self.string_bytes = Some(Box::new(handler));
    }

    pub fn on_json(&mut self, handler: impl FnMut(&Value) + 'static) {
        self.json = Some(Box::new(handler));
    }

    /// The handler receives the requested TYPE byte, which may be unknown
    pub fn on_request(&mut self, handler: impl FnMut(u8) + 'static) {
        self.request = Some(Box::new(handler));
    }

    pub fn on_orientation(&mut self, handler: impl FnMut(Orientation) + 'static) {
        self.orientation = Some(Box::new(handler));
    }

    /// Observe the exact bytes of every echo written
    pub fn on_echo(&mut self, observer: impl FnMut(&[u8]) + 'static) {
        self.echo = Some(Box::new(observer));
    }

    /// Observe diagnostic events
    pub fn on_event(&mut self, observer: impl FnMut(&LinkEvent) + 'static) {
        self.event = Some(Box::new(observer));
    }

    /// Decode a validated frame and call the matching handler
    ///
    /// Fixed-size kinds with the wrong byte count and JSON that does not
    /// parse are rejected without calling anything. JSON is only parsed
    /// when a handler is registered.
    pub fn dispatch(&mut self, frame: &Frame) -> Dispatch {
        let payload = match Payload::from_frame(frame) {
            Ok(payload) => payload,
            Err(PayloadError::UnknownType(frame_type)) => return Dispatch::Unknown(frame_type),
            Err(error) => return Dispatch::Rejected(error),
        };

        let kind = payload.kind();
        let delivered = match payload {
            Payload::Int(value) => call(&mut self.int, value),
            Payload::Float(value) => call(&mut self.float, value),
            Payload::Request(requested) => call(&mut self.request, requested),
            Payload::Orientation(orientation) => call(&mut self.orientation, orientation),
            Payload::String(bytes) => {
                let raw = match self.string_bytes.as_mut() {
                    Some(handler) => {
                        handler(bytes);
                        true
                    }
                    None => false,
                };
                let text = match self.string.as_mut() {
                    Some(handler) => {
                        handler(&String::from_utf8_lossy(bytes));
                        true
                    }
                    None => false,
                };
                raw || text
            }
            Payload::Json(bytes) => match self.json.as_mut() {
                Some(handler) => match serde_json::from_slice::<Value>(bytes) {
                    Ok(document) => {
                        handler(&document);
                        true
                    }
                    Err(_) => return Dispatch::Rejected(PayloadError::MalformedStructuredPayload),
                },
                None => false,
            },
        };

        if delivered {
            Dispatch::Delivered(kind)
        } else {
            Dispatch::Unhandled(kind)
        }
    }

    pub(crate) fn notify_echo(&mut self, bytes: &[u8]) {
        if let Some(observer) = self.echo.as_mut() {
            observer(bytes);
        }
    }

    pub(crate) fn notify_event(&mut self, event: &LinkEvent) {
        if let Some(observer) = self.event.as_mut() {
            observer(event);
        }
    }
}

fn call<T>(slot: &mut Slot<T>, value: T) -> bool {
    match slot {
        Some(handler) => {
            handler(value);
            true
        }
        None => false,
    }
}
