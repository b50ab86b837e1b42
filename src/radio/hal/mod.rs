//! # Hardware Abstraction Layer for the SX127x
//!
//! The driver core never touches a bus directly. Platforms implement [`Hal`] over
//! their SPI peripheral and the core issues single-register and burst accesses
//! through it. All methods take `&self` because the same transport is used from the
//! interrupt handler and from mainline code; implementations serialise bus access
//! internally.

use std::time::Duration;
use thiserror::Error;

pub mod mock;

pub use mock::{relay, MockChip};

/// Errors that can occur during HAL operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HalError {
    #[error("SPI communication error")]
    Spi,

    #[error("GPIO operation error")]
    Gpio,

    #[error("Register access error at 0x{0:02X}")]
    Register(u8),
}

/// Register transport for SX127x radios
pub trait Hal {
    /// Read a single register
    fn read_register(&self, addr: u8) -> Result<u8, HalError>;

    /// Write a single register
    fn write_register(&self, addr: u8, value: u8) -> Result<(), HalError>;

    /// Read `buf.len()` bytes starting at `addr` without advancing the address
    /// (used on the FIFO register)
    fn burst_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), HalError>;

    /// Write `data` starting at `addr` without advancing the address
    fn burst_write(&self, addr: u8, data: &[u8]) -> Result<(), HalError>;

    /// Give other contexts a chance to run while spinning on a completion
    fn yield_now(&self) {
        std::thread::yield_now();
    }

    /// Block for `ms` milliseconds
    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

impl<T: Hal + ?Sized> Hal for &T {
    fn read_register(&self, addr: u8) -> Result<u8, HalError> {
        (**self).read_register(addr)
    }

    fn write_register(&self, addr: u8, value: u8) -> Result<(), HalError> {
        (**self).write_register(addr, value)
    }

    fn burst_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), HalError> {
        (**self).burst_read(addr, buf)
    }

    fn burst_write(&self, addr: u8, data: &[u8]) -> Result<(), HalError> {
        (**self).burst_write(addr, data)
    }

    fn yield_now(&self) {
        (**self).yield_now()
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

impl<T: Hal + ?Sized> Hal for std::sync::Arc<T> {
    fn read_register(&self, addr: u8) -> Result<u8, HalError> {
        (**self).read_register(addr)
    }

    fn write_register(&self, addr: u8, value: u8) -> Result<(), HalError> {
        (**self).write_register(addr, value)
    }

    fn burst_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), HalError> {
        (**self).burst_read(addr, buf)
    }

    fn burst_write(&self, addr: u8, data: &[u8]) -> Result<(), HalError> {
        (**self).burst_write(addr, data)
    }

    fn yield_now(&self) {
        (**self).yield_now()
    }

    fn delay_ms(&self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
