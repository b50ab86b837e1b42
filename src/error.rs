//! # RF95 Error Handling
//!
//! This module defines the Rf95Error enum, which represents the failures the
//! driver core reports to callers. Per-frame receive failures (CRC errors,
//! timeouts, frames addressed elsewhere) are not errors: they are counted and
//! reported as interrupt events.

use crate::radio::hal::HalError;
use crate::radio::interrupt::SlotId;
use thiserror::Error;

/// Represents the different error types that can occur in the RF95 crate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Rf95Error {
    /// Register transport failure.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// The chip did not enter sleep + LoRa mode after reset.
    #[error("Radio did not enter LoRa mode (RegOpMode read back 0x{op_mode:02X})")]
    InitFailure { op_mode: u8 },

    /// Outbound payload longer than a frame can carry.
    #[error("Payload of {len} bytes exceeds maximum of {max}")]
    InvalidLength { len: usize, max: usize },

    /// Channel activity was detected before transmitting.
    #[error("Channel busy")]
    ChannelBusy,

    /// Every interrupt registry slot is taken.
    #[error("Too many driver instances (capacity {capacity})")]
    TooManyInstances { capacity: usize },

    /// The driver already holds a slot in another interrupt registry.
    #[error("Driver already attached to another registry ({slot})")]
    AlreadyAttached { slot: SlotId },

    /// Modem preset index outside the preset table.
    #[error("Invalid modem preset index {0}")]
    InvalidPreset(u8),

    /// Carrier frequency that cannot be encoded.
    #[error("Invalid carrier frequency {0} MHz")]
    InvalidFrequency(f64),

    /// A bounded wait elapsed before the chip completed the operation.
    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    /// Rejected configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
