//! Link settings compiled in from link.toml

use ardutalk_core::LinkConfig;
use ardutalk_hal::serial::{DataBits, Parity, StopBits};
use ardutalk_hal::UartConfig;

include!(concat!(env!("OUT_DIR"), "/settings.rs"));

/// UART driver configuration for the compiled-in line settings
pub fn uart_config() -> embassy_rp::uart::Config {
    let mut config = embassy_rp::uart::Config::default();
    config.baudrate = UART.baudrate;
    config.data_bits = match UART.data_bits {
        DataBits::Seven => embassy_rp::uart::DataBits::DataBits7,
        // build.rs rejects nine data bits
        DataBits::Eight | DataBits::Nine => embassy_rp::uart::DataBits::DataBits8,
    };
    config.parity = match UART.parity {
        Parity::None => embassy_rp::uart::Parity::ParityNone,
        Parity::Even => embassy_rp::uart::Parity::ParityEven,
        Parity::Odd => embassy_rp::uart::Parity::ParityOdd,
    };
    config.stop_bits = match UART.stop_bits {
        StopBits::One => embassy_rp::uart::StopBits::STOP1,
        StopBits::Two => embassy_rp::uart::StopBits::STOP2,
    };
    config
}
