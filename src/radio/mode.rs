//! Operating modes and the mode-change hook

use crate::radio::irq::DioMapping;
use crate::radio::registers::{
    LONG_RANGE_MODE, MODE_CAD, MODE_RXCONTINUOUS, MODE_SLEEP, MODE_STDBY, MODE_TX,
};

/// Driver-side view of the chip's operating mode
///
/// `Initialising` is only observed between construction and the first transition
/// made by `init`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadioMode {
    Initialising = 0,
    Sleep = 1,
    Idle = 2,
    Rx = 3,
    Tx = 4,
    Cad = 5,
}

impl RadioMode {
    /// Decode a value previously produced by `as u8`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => RadioMode::Sleep,
            2 => RadioMode::Idle,
            3 => RadioMode::Rx,
            4 => RadioMode::Tx,
            5 => RadioMode::Cad,
            _ => RadioMode::Initialising,
        }
    }

    /// `RegOpMode` value for this mode, LoRa bit included
    pub fn op_mode(self) -> u8 {
        let bits = match self {
            RadioMode::Initialising | RadioMode::Sleep => MODE_SLEEP,
            RadioMode::Idle => MODE_STDBY,
            RadioMode::Rx => MODE_RXCONTINUOUS,
            RadioMode::Tx => MODE_TX,
            RadioMode::Cad => MODE_CAD,
        };
        LONG_RANGE_MODE | bits
    }

    /// DIO0 routing needed in this mode, if any
    pub fn dio_mapping(self) -> Option<DioMapping> {
        match self {
            RadioMode::Rx => Some(DioMapping::RxDone),
            RadioMode::Tx => Some(DioMapping::TxDone),
            RadioMode::Cad => Some(DioMapping::CadDone),
            _ => None,
        }
    }
}

/// Hook invoked before every mode transition
///
/// Implementations typically drive an external RF switch or antenna selector.
/// The hook runs inside the driver's `critical_section::with`, before the
/// OP_MODE write, and must not block. With the `std` critical-section
/// implementation that section is one lock shared by every driver in the
/// process, so a slow hook also stalls transitions and interrupt handling on
/// the other radios.
pub trait ModeObserver {
    fn mode_will_change(&self, from: RadioMode, to: RadioMode);
}

/// Observer that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ModeObserver for NoopObserver {
    fn mode_will_change(&self, _from: RadioMode, _to: RadioMode) {}
}

impl<F> ModeObserver for F
where
    F: Fn(RadioMode, RadioMode),
{
    fn mode_will_change(&self, from: RadioMode, to: RadioMode) {
        self(from, to)
    }
}
