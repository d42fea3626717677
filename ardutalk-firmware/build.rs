//! Build script for ardutalk-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates link.toml and turns it into generated constants

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

fn main() {
    setup_linker();
    let settings = load_settings();
    generate_settings(&settings);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    link: LinkSection,
    uart: UartSection,
    #[serde(default)]
    poll: PollSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkSection {
    frame_timeout_ms: u32,
    #[serde(default = "default_echo")]
    echo: bool,
}

fn default_echo() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UartSection {
    baudrate: u32,
    data_bits: u8,
    parity: String,
    stop_bits: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollSection {
    interval_ms: u32,
}

impl Default for PollSection {
    fn default() -> Self {
        Self { interval_ms: 2 }
    }
}

/// Print a boxed error and abort the build
fn fail(title: &str, details: &[String]) -> ! {
    let body = details
        .iter()
        .map(|line| format!("║  • {:<62} ║", line))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}

/// Read, parse and validate link.toml
fn load_settings() -> Settings {
    println!("cargo:rerun-if-changed=link.toml");

    let path = Path::new("link.toml");
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read link.toml", &[e.to_string()]),
    };

    let settings: Settings = match toml::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => fail(
            "Invalid link.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();
    if settings.link.frame_timeout_ms == 0 {
        errors.push("link.frame_timeout_ms must be greater than 0".to_string());
    }
    if settings.uart.baudrate == 0 {
        errors.push("uart.baudrate must be greater than 0".to_string());
    }
    if !matches!(settings.uart.data_bits, 7 | 8) {
        errors.push(format!(
            "uart.data_bits must be 7 or 8, got {}",
            settings.uart.data_bits
        ));
    }
    if !matches!(settings.uart.parity.as_str(), "none" | "even" | "odd") {
        errors.push(format!(
            "uart.parity must be none, even or odd, got {:?}",
            settings.uart.parity
        ));
    }
    if !matches!(settings.uart.stop_bits, 1 | 2) {
        errors.push(format!(
            "uart.stop_bits must be 1 or 2, got {}",
            settings.uart.stop_bits
        ));
    }
    if settings.poll.interval_ms == 0 {
        errors.push("poll.interval_ms must be greater than 0".to_string());
    }
    if settings.poll.interval_ms >= settings.link.frame_timeout_ms {
        errors.push("poll.interval_ms must be below link.frame_timeout_ms".to_string());
    }

    if !errors.is_empty() {
        fail("Invalid values in link.toml", &errors);
    }

    println!("cargo:warning=link.toml validated successfully");
    settings
}

/// Write the settings as Rust constants to OUT_DIR/settings.rs
fn generate_settings(settings: &Settings) {
    let data_bits = match settings.uart.data_bits {
        7 => "DataBits::Seven",
        _ => "DataBits::Eight",
    };
    let parity = match settings.uart.parity.as_str() {
        "even" => "Parity::Even",
        "odd" => "Parity::Odd",
        _ => "Parity::None",
    };
    let stop_bits = match settings.uart.stop_bits {
        2 => "StopBits::Two",
        _ => "StopBits::One",
    };

    let generated = format!(
        "// Generated by build.rs from link.toml\n\
         \n\
         pub const LINK: LinkConfig = LinkConfig {{\n    \
             frame_timeout_ms: {timeout},\n    \
             echo: {echo},\n\
         }};\n\
         \n\
         pub const UART: UartConfig = UartConfig {{\n    \
             baudrate: {baudrate},\n    \
             data_bits: {data_bits},\n    \
             parity: {parity},\n    \
             stop_bits: {stop_bits},\n\
         }};\n\
         \n\
         pub const POLL_INTERVAL_MS: u64 = {interval};\n",
        timeout = settings.link.frame_timeout_ms,
        echo = settings.link.echo,
        baudrate = settings.uart.baudrate,
        interval = settings.poll.interval_ms,
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("settings.rs"), generated).unwrap();
}
