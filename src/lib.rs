//! # rf95-rs - Packet Driver Core for SX127x LoRa Transceivers
//!
//! The rf95-rs crate turns the register interface of a Semtech SX1276/77/78/79
//! (HopeRF RFM95/96/97/98) into a packet radio: operating-mode management,
//! interrupt-driven transmit and receive completion, header-based addressing, and
//! encoding of the LoRa modem parameters.
//!
//! ## Features
//!
//! - Mode state machine with a pre-transition hook for RF switches
//! - Interrupt handler that drains the FIFO, computes RSSI/SNR and filters by address
//! - 4-byte `{to, from, id, flags}` framing with broadcast and promiscuous receive
//! - Bandwidth, spreading factor, coding rate, CRC and power encoding, with the
//!   low data rate optimization rule applied automatically
//! - Channel activity detection before transmit and a frequency error estimate
//! - Bounded registry dispatching shared interrupt vectors to driver instances
//! - JSON radio configuration and a simulated chip for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rf95_rs::{Rf95, MockChip, RadioConfig, init_logger_with_default};
//!
//! init_logger_with_default("info");
//! let radio = Rf95::new(MockChip::new());
//! radio.init_with_config(&RadioConfig::from_json_str(r#"{"frequency_mhz": 915.0}"#)?)?;
//! radio.set_header_to(0x10);
//! radio.send(b"ping")?;
//! # Ok::<(), rf95_rs::Rf95Error>(())
//! ```
//!
//! The platform calls [`Rf95::handle_interrupt`] (or dispatches through an
//! [`InterruptRegistry`]) whenever the chip's DIO0 line rises.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod radio;
pub mod util;

pub use crate::config::RadioConfig;
pub use crate::error::Rf95Error;
pub use crate::logging::{init_logger_with_default, log_info};

pub use radio::driver::{InterruptEvent, Rf95, RxFailure, RxRejection, Telemetry};
pub use radio::hal::{Hal, HalError, MockChip};
pub use radio::interrupt::{InterruptHandler, InterruptRegistry, SlotId};
pub use radio::irq::IrqFlags;
pub use radio::mode::{ModeObserver, NoopObserver, RadioMode};
pub use radio::modem::{Bandwidth, CodingRate, ModemConfig, ModemPreset, SpreadingFactor};
pub use radio::packet::{Header, PacketCounters, ReceivedFrame};
