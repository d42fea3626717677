//! Link task
//!
//! Polls the UART on a fixed tick, logs everything the host sends and
//! answers REQUEST frames.

use alloc::rc::Rc;
use core::cell::Cell;

use ardutalk_core::Link;
use ardutalk_hal::{IoSink, IoSource};
use ardutalk_protocol::Orientation;
use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{Duration, Ticker};

use crate::clock::EmbassyClock;
use crate::responder::respond;
use crate::settings::{LINK, POLL_INTERVAL_MS};

type UartLink = Link<IoSource<BufferedUartRx>, IoSink<BufferedUartTx>, EmbassyClock>;

/// Stats are logged every this many polls
const STATS_EVERY_POLLS: u32 = 5_000;

/// Link task - owns the UART and the link engine
#[embassy_executor::task]
pub async fn link_task(rx: BufferedUartRx, tx: BufferedUartTx) {
    info!("Link task started");

    let mut link: UartLink =
        match Link::new(IoSource::new(rx), IoSink::new(tx), EmbassyClock, LINK) {
            Ok(link) => link,
            Err(e) => {
                // build.rs validates the same settings
                error!("Invalid link settings: {:?}", e);
                return;
            }
        };

    // Requests are answered from the task, outside the dispatch callback
    let pending_request: Rc<Cell<Option<u8>>> = Rc::new(Cell::new(None));
    let last_orientation: Rc<Cell<Orientation>> = Rc::new(Cell::new(Orientation::default()));

    register_handlers(&mut link, &pending_request, &last_orientation);

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    let mut polls: u32 = 0;

    loop {
        ticker.next().await;

        match link.poll() {
            Ok(summary) if summary.frames > 0 || summary.rejected > 0 => {
                trace!("Poll: {:?}", summary);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }

        if let Some(requested) = pending_request.take() {
            if let Err(e) = respond(&mut link, requested, last_orientation.get()) {
                warn!("Reply to request {=u8:#x} failed: {:?}", requested, e);
            }
        }

        polls = polls.wrapping_add(1);
        if polls % STATS_EVERY_POLLS == 0 {
            debug!("Link stats: {:?}", link.stats());
        }
    }
}

fn register_handlers(
    link: &mut UartLink,
    pending_request: &Rc<Cell<Option<u8>>>,
    last_orientation: &Rc<Cell<Orientation>>,
) {
    link.on_int(|value| info!("INT {}", value));
    link.on_float(|value| info!("FLOAT {}", value));
    link.on_string(|text| info!("STRING {=str}", text));
    link.on_json(|document| {
        // Value has no defmt::Format; log its shape only
        match document.as_object() {
            Some(object) => info!("JSON object with {} keys", object.len()),
            None => info!("JSON value"),
        }
    });

    let pending = pending_request.clone();
    link.on_request(move |requested| {
        debug!("REQUEST for type {=u8:#x}", requested);
        if pending.replace(Some(requested)).is_some() {
            warn!("Previous request dropped");
        }
    });

    let last = last_orientation.clone();
    link.on_orientation(move |orientation| {
        info!(
            "ORIENTATION yaw={} roll={} pitch={}",
            orientation.yaw, orientation.roll, orientation.pitch
        );
        last.set(orientation);
    });
}
