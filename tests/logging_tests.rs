//! Unit tests for the logging functionality in the `rf95-rs` crate.

use rf95_rs::logging::{init_logger_with_default, log_info};
use rf95_rs::util::logging::{format_frame_hex, log_frame_hex, LogThrottle};

/// Tests that the logging helpers work after the logger is initialised.
#[test]
fn test_logging() {
    init_logger_with_default("debug");
    log_info(format_args!("Received {} bytes from 0x{:02X}", 4, 0x01));
    log_frame_hex("RX", &[0xFF, 0x01, 0x00, 0x00]);
}

/// Tests that initialising the logger twice does not panic.
#[test]
fn test_init_logger_twice() {
    init_logger_with_default("info");
    init_logger_with_default("trace");
}

/// Frames are dumped as lowercase hex with the prefix.
#[test]
fn test_frame_hex_format() {
    assert_eq!(format_frame_hex("TX", &[0x10, 0x01, 0xAB]), "TX: 1001ab");
    assert_eq!(format_frame_hex("RX", &[]), "RX: ");
}

/// Long frames are truncated and report their full size.
#[test]
fn test_frame_hex_truncates() {
    let line = format_frame_hex("RX", &[0u8; 200]);
    assert!(line.starts_with("RX: 0000"));
    assert!(line.ends_with(" ... (200 bytes total)"));
    assert_eq!(line.len(), "RX: ".len() + 128 + " ... (200 bytes total)".len());
}

/// The throttle opens again once its window has passed.
#[test]
fn test_throttle_window_expires() {
    let mut throttle = LogThrottle::new(5, 1);
    assert!(throttle.allow());
    assert!(!throttle.allow());

    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(throttle.allow());
    assert_eq!(throttle.take_suppressed(), 1);
}
