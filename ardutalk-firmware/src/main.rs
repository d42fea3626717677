//! ArduTalk - serial link firmware
//!
//! Runs one ArduTalk link on UART0 of an RP2040. Every value the host sends
//! is logged over RTT and echoed back; REQUEST frames are answered with a
//! value of the requested kind.
//!
//! Line settings, frame timeout and poll interval come from `link.toml`,
//! validated and compiled in by `build.rs`.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

mod clock;
mod responder;
mod settings;
mod tasks;

use crate::settings::{uart_config, LINK, POLL_INTERVAL_MS, UART};

// Heap allocator for JSON documents and handler boxes
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 16KB
const HEAP_SIZE: usize = 16 * 1024;

/// UART buffer sizes
const TX_BUF_SIZE: usize = 512;
const RX_BUF_SIZE: usize = 256;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; TX_BUF_SIZE]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; RX_BUF_SIZE]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ArduTalk firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    info!(
        "Link: timeout={}ms echo={} poll={}ms",
        LINK.frame_timeout_ms, LINK.echo, POLL_INTERVAL_MS
    );

    // The receive buffer must not fill up between two polls
    let fill_time_us = UART.byte_time_us() * RX_BUF_SIZE as u32;
    if POLL_INTERVAL_MS * 1000 >= u64::from(fill_time_us) {
        warn!(
            "Poll interval {}ms can overrun the {}-byte RX buffer at {} baud",
            POLL_INTERVAL_MS, RX_BUF_SIZE, UART.baudrate
        );
    }

    let tx_buf = TX_BUF.init([0u8; TX_BUF_SIZE]);
    let rx_buf = RX_BUF.init([0u8; RX_BUF_SIZE]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!("UART0 initialized at {} baud", UART.baudrate);

    spawner.spawn(tasks::link_task(rx, tx)).unwrap();

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
