//! End-to-end link behaviour over in-memory transports

use std::cell::RefCell;
use std::rc::Rc;

use ardutalk_core::{Link, LinkConfig, LinkEvent, Value};
use ardutalk_hal::{Loopback, ManualClock};
use ardutalk_protocol::{
    FrameError, FrameType, Orientation, Payload, PayloadError, Resync, FRAME_HEADER,
};
use proptest::prelude::*;

type TestLink<'a> = Link<Loopback<1024>, Loopback<1024>, &'a ManualClock>;

#[derive(Debug, Clone, PartialEq)]
enum Received {
    Int(i16),
    Float(f32),
    Text(String),
    Json(Value),
    Request(u8),
    Orientation(Orientation),
}

type Log<T> = Rc<RefCell<Vec<T>>>;

/// A link with every handler recording into a shared log
fn recording_link(clock: &ManualClock) -> (TestLink<'_>, Log<Received>) {
    let mut link = Link::new(Loopback::new(), Loopback::new(), clock, LinkConfig::default())
        .expect("default config is valid");
    let log: Log<Received> = Rc::default();

    let sink = log.clone();
    link.on_int(move |v| sink.borrow_mut().push(Received::Int(v)));
    let sink = log.clone();
    link.on_float(move |v| sink.borrow_mut().push(Received::Float(v)));
    let sink = log.clone();
    link.on_string(move |v| sink.borrow_mut().push(Received::Text(v.to_owned())));
    let sink = log.clone();
    link.on_json(move |v| sink.borrow_mut().push(Received::Json(v.clone())));
    let sink = log.clone();
    link.on_request(move |v| sink.borrow_mut().push(Received::Request(v)));
    let sink = log.clone();
    link.on_orientation(move |v| sink.borrow_mut().push(Received::Orientation(v)));

    (link, log)
}

fn event_log(link: &mut TestLink<'_>) -> Log<LinkEvent> {
    let log: Log<LinkEvent> = Rc::default();
    let sink = log.clone();
    link.on_event(move |event| sink.borrow_mut().push(*event));
    log
}

/// Move everything `from` has written into `to` and poll it
fn transfer(from: &mut TestLink<'_>, to: &mut TestLink<'_>) {
    let bytes = from.sink_mut().drain();
    to.source_mut().inject(&bytes).unwrap();
    to.poll().unwrap();
}

/// A HEADER at the first payload byte or in the CRC restarts the parser
fn receivable(wire: &[u8]) -> bool {
    let n = wire.len();
    wire[3] != FRAME_HEADER && wire[n - 3] != FRAME_HEADER && wire[n - 2] != FRAME_HEADER
}

#[test]
fn int_reference_bytes() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);

    link.send_int(-1234).unwrap();
    let wire = link.sink_mut().drain();
    assert_eq!(&wire[..], &[0xAA, 0x03, 0x01, 0xFB, 0x2E, 0xF1, 0x3B, 0x55]);

    link.source_mut().inject(&wire).unwrap();
    link.poll().unwrap();
    assert_eq!(*log.borrow(), [Received::Int(-1234)]);
}

#[test]
fn every_kind_between_two_links() {
    let clock = ManualClock::new(0);
    let (mut sender, _) = recording_link(&clock);
    let (mut receiver, log) = recording_link(&clock);

    sender.send_int(42).unwrap();
    sender.send_float(3.14159).unwrap();
    sender.send_string("hello").unwrap();
    sender.send_json(&serde_json::json!({ "led": true })).unwrap();
    sender.send_request(FrameType::Float).unwrap();
    sender
        .send_orientation(Orientation::new(12.5, -45.25, 180.0))
        .unwrap();
    transfer(&mut sender, &mut receiver);

    assert_eq!(
        *log.borrow(),
        [
            Received::Int(42),
            Received::Float(3.14159),
            Received::Text("hello".to_owned()),
            Received::Json(serde_json::json!({ "led": true })),
            Received::Request(0x02),
            Received::Orientation(Orientation::new(12.5, -45.25, 180.0)),
        ]
    );
    assert_eq!(receiver.stats().frames_received, 6);
    assert_eq!(receiver.stats().frames_dispatched, 6);
    // Everything but the request came back
    assert_eq!(receiver.stats().echoes_sent, 5);
}

#[test]
fn string_echo_is_byte_identical() {
    let clock = ManualClock::new(0);
    let (mut link, _) = recording_link(&clock);
    let echoed: Log<u8> = Rc::default();
    let sink = echoed.clone();
    link.on_echo(move |bytes| sink.borrow_mut().extend_from_slice(bytes));

    let incoming = [
        0xAA, 0x06, 0x03, b'h', b'e', b'l', b'l', b'o', 0x03, 0x92, 0x55,
    ];
    link.source_mut().inject(&incoming).unwrap();
    link.poll().unwrap();

    assert_eq!(&link.sink_mut().drain()[..], &incoming[..]);
    assert_eq!(&echoed.borrow()[..], &incoming[..]);
}

#[test]
fn string_bytes_arrive_unaltered() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);
    let raw: Log<u8> = Rc::default();
    let sink = raw.clone();
    link.on_string_bytes(move |bytes| sink.borrow_mut().extend_from_slice(bytes));

    // 0xC3 starts a two-byte sequence that 'k' does not continue
    let payload = [b'o', 0xC3, b'k'];
    link.send(Payload::String(&payload)).unwrap();
    let wire = link.sink_mut().drain();
    assert!(receivable(&wire));

    link.source_mut().inject(&wire).unwrap();
    link.poll().unwrap();

    assert_eq!(&raw.borrow()[..], &payload[..]);
    assert_eq!(*log.borrow(), [Received::Text("o\u{FFFD}k".to_owned())]);
}

#[test]
fn request_is_not_echoed() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);

    link.source_mut()
        .inject(&[0xAA, 0x02, 0x05, 0x06, 0x82, 0x3C, 0x55])
        .unwrap();
    link.poll().unwrap();

    assert_eq!(*log.borrow(), [Received::Request(0x06)]);
    assert!(link.sink_mut().is_empty());
}

#[test]
fn minimum_length_accepted() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);

    // LENGTH 2: TYPE plus one payload byte
    link.source_mut()
        .inject(&[0xAA, 0x02, 0x05, 0x01, 0xF2, 0xDB, 0x55])
        .unwrap();
    let summary = link.poll().unwrap();

    assert_eq!(summary.frames, 1);
    assert_eq!(*log.borrow(), [Received::Request(0x01)]);
}

#[test]
fn out_of_range_lengths_rejected() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);
    let events = event_log(&mut link);

    link.source_mut().inject(&[0xAA, 0x01, 0x05, 0x01]).unwrap();
    link.poll().unwrap();
    link.source_mut().inject(&[0xAA, 201, 0x03, 0x41]).unwrap();
    link.poll().unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(link.stats().invalid_length, 2);
    let errors: Vec<FrameError> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            LinkEvent::FrameRejected(rejection) => Some(rejection.error),
            _ => None,
        })
        .collect();
    assert_eq!(
        errors,
        [FrameError::InvalidLength(1), FrameError::InvalidLength(201)]
    );
}

#[test]
fn stalled_frame_times_out_and_link_recovers() {
    let clock = ManualClock::new(10_000);
    let (mut link, log) = recording_link(&clock);
    let events = event_log(&mut link);

    // HEADER and LENGTH, then silence
    link.source_mut().inject(&[0xAA, 0x03]).unwrap();
    link.poll().unwrap();
    assert!(!link.parser().is_idle());

    clock.advance(500);
    assert!(!link.poll().unwrap().timed_out);

    clock.advance(1);
    assert!(link.poll().unwrap().timed_out);
    assert!(link.parser().is_idle());
    assert!(events
        .borrow()
        .iter()
        .any(|event| matches!(event, LinkEvent::StaleFrameTimeout { .. })));

    link.source_mut()
        .inject(&[0xAA, 0x03, 0x01, 0x00, 0x07, 0x8B, 0x4B, 0x55])
        .unwrap();
    link.poll().unwrap();
    assert_eq!(*log.borrow(), [Received::Int(7)]);
}

#[test]
fn corrupted_crc_dropped_next_frame_decodes() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);

    let mut corrupted = vec![0xAA, 0x03, 0x01, 0x00, 0x2A, 0x7E, 0x84, 0x55];
    corrupted[4] ^= 0x01;
    link.source_mut().inject(&corrupted).unwrap();
    link.source_mut()
        .inject(&[0xAA, 0x03, 0x01, 0x00, 0x2A, 0x7E, 0x84, 0x55])
        .unwrap();
    let summary = link.poll().unwrap();

    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.frames, 1);
    assert_eq!(*log.borrow(), [Received::Int(42)]);
    assert_eq!(link.stats().crc_mismatch, 1);
}

#[test]
fn resync_candidate_reported() {
    let clock = ManualClock::new(0);
    let (mut link, _) = recording_link(&clock);
    let events = event_log(&mut link);

    // A STRING frame whose payload holds HEADER + plausible LENGTH, with a
    // broken CRC
    link.source_mut()
        .inject(&[0xAA, 0x04, 0x03, 0x00, 0xAA, 0x05, 0x00, 0x00])
        .unwrap();
    link.poll().unwrap();

    assert_eq!(link.stats().resync_found, 1);
    let resync = events.borrow().iter().find_map(|event| match event {
        LinkEvent::FrameRejected(rejection) => Some(rejection.resync),
        _ => None,
    });
    assert_eq!(resync, Some(Resync::Found { position: 4 }));
}

#[test]
fn wrong_size_payload_dropped_but_echoed() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);
    let events = event_log(&mut link);

    // INT frame carrying three bytes
    let incoming = [0xAA, 0x04, 0x01, 0x01, 0x02, 0x03, 0x93, 0x45, 0x55];
    link.source_mut().inject(&incoming).unwrap();
    link.poll().unwrap();

    assert!(log.borrow().is_empty());
    assert!(events.borrow().contains(&LinkEvent::PayloadRejected(
        PayloadError::UnsupportedPayloadSize {
            kind: FrameType::Int,
            expected: 2,
            actual: 3,
        }
    )));
    assert_eq!(&link.sink_mut().drain()[..], &incoming[..]);
}

#[test]
fn malformed_json_dropped() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);
    let events = event_log(&mut link);

    link.source_mut()
        .inject(&[
            0xAA, 0x08, 0x04, b'{', b'"', b'l', b'e', b'd', b'"', b':', 0x88, 0x03, 0x55,
        ])
        .unwrap();
    link.poll().unwrap();

    assert!(log.borrow().is_empty());
    assert!(events.borrow().contains(&LinkEvent::PayloadRejected(
        PayloadError::MalformedStructuredPayload
    )));
    assert_eq!(link.stats().payload_rejected, 1);
}

#[test]
fn unknown_type_echoed_without_callback() {
    let clock = ManualClock::new(0);
    let (mut link, log) = recording_link(&clock);

    let incoming = [0xAA, 0x03, 0x42, 0x01, 0x02, 0xAC, 0x22, 0x55];
    link.source_mut().inject(&incoming).unwrap();
    link.poll().unwrap();

    assert!(log.borrow().is_empty());
    assert_eq!(link.stats().frames_received, 1);
    assert_eq!(&link.sink_mut().drain()[..], &incoming[..]);
}

#[test]
fn echo_write_failure_is_counted_not_returned() {
    let clock = ManualClock::new(0);
    // Sink too small for any frame
    let mut link: Link<Loopback<64>, Loopback<4>, &ManualClock> =
        Link::new(Loopback::new(), Loopback::new(), &clock, LinkConfig::default()).unwrap();
    let events: Log<LinkEvent> = Rc::default();
    let sink = events.clone();
    link.on_event(move |event| sink.borrow_mut().push(*event));

    link.source_mut()
        .inject(&[0xAA, 0x03, 0x01, 0x00, 0x07, 0x8B, 0x4B, 0x55])
        .unwrap();
    let summary = link.poll().unwrap();

    assert_eq!(summary.frames, 1);
    assert_eq!(link.stats().write_failures, 1);
    assert!(events.borrow().contains(&LinkEvent::EchoWriteFailed));
}

proptest! {
    #[test]
    fn header_free_noise_then_frame(
        noise in proptest::collection::vec(
            any::<u8>().prop_filter("no header", |b| *b != FRAME_HEADER),
            0..256,
        ),
        value in any::<i16>(),
    ) {
        let wire = Payload::Int(value).to_frame().unwrap().encode_to_vec().unwrap();
        prop_assume!(receivable(&wire));

        let clock = ManualClock::new(0);
        let (mut link, log) = recording_link(&clock);
        link.source_mut().inject(&noise).unwrap();
        link.source_mut().inject(&wire).unwrap();
        link.poll().unwrap();

        prop_assert_eq!(&*log.borrow(), &[Received::Int(value)]);
    }

    #[test]
    fn noise_then_pause_then_frame(
        noise in proptest::collection::vec(any::<u8>(), 0..256),
        value in any::<i16>(),
    ) {
        let wire = Payload::Int(value).to_frame().unwrap().encode_to_vec().unwrap();
        prop_assume!(receivable(&wire));

        let clock = ManualClock::new(0);
        let (mut link, log) = recording_link(&clock);
        link.source_mut().inject(&noise).unwrap();
        link.poll().unwrap();
        log.borrow_mut().clear();

        clock.advance(501);
        link.source_mut().inject(&wire).unwrap();
        link.poll().unwrap();

        prop_assert_eq!(&*log.borrow(), &[Received::Int(value)]);
    }

    #[test]
    fn text_roundtrip(text in "[ -~]{1,120}") {
        let wire = Payload::text(&text).to_frame().unwrap().encode_to_vec().unwrap();
        prop_assume!(receivable(&wire));

        let clock = ManualClock::new(0);
        let (mut sender, _) = recording_link(&clock);
        let (mut receiver, log) = recording_link(&clock);
        sender.send_string(&text).unwrap();
        transfer(&mut sender, &mut receiver);

        prop_assert_eq!(&*log.borrow(), &[Received::Text(text.clone())]);
        // The echo carries the same bytes the sender wrote
        prop_assert_eq!(&receiver.sink_mut().drain()[..], &wire[..]);
    }

    #[test]
    fn orientation_roundtrip(
        yaw in -327.0f32..327.0,
        roll in -327.0f32..327.0,
        pitch in -327.0f32..327.0,
    ) {
        let orientation = Orientation::new(yaw, roll, pitch);
        let wire = Payload::Orientation(orientation).to_frame().unwrap().encode_to_vec().unwrap();
        prop_assume!(receivable(&wire));

        let clock = ManualClock::new(0);
        let (mut link, log) = recording_link(&clock);
        link.source_mut().inject(&wire).unwrap();
        link.poll().unwrap();

        let log = log.borrow();
        prop_assert_eq!(log.len(), 1);
        match &log[0] {
            Received::Orientation(decoded) => {
                prop_assert!((decoded.yaw - yaw).abs() <= 0.011);
                prop_assert!((decoded.roll - roll).abs() <= 0.011);
                prop_assert!((decoded.pitch - pitch).abs() <= 0.011);
            }
            other => prop_assert!(false, "unexpected callback: {:?}", other),
        }
    }
}
