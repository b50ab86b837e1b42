//! # SX127x Interrupt Flags
//!
//! In LoRa mode the chip reports events through the 8-bit `RegIrqFlags` register
//! (0x12). Each bit is cleared by writing a 1 to it. The driver routes a single
//! completion event to the DIO0 pin depending on the operating mode:
//!
//! ```text
//! Mode   DIO0 mapping   Event
//! RX     00             RxDone
//! TX     01             TxDone
//! CAD    10             CadDone
//! ```
//!
//! ## Bit Assignments
//!
//! ```text
//! Bit 7: RxTimeout
//! Bit 6: RxDone
//! Bit 5: PayloadCrcError
//! Bit 4: ValidHeader
//! Bit 3: TxDone
//! Bit 2: CadDone
//! Bit 1: FhssChangeChannel
//! Bit 0: CadDetected
//! ```

use crate::radio::registers::{DIO0_CAD_DONE, DIO0_MASK, DIO0_RX_DONE, DIO0_TX_DONE};
use bitflags::bitflags;

bitflags! {
    /// Contents of `RegIrqFlags`
    ///
    /// ```rust
    /// use rf95_rs::radio::irq::IrqFlags;
    ///
    /// let flags = IrqFlags::from_bits_retain(0x60);
    /// assert!(flags.contains(IrqFlags::RX_DONE));
    /// assert!(flags.is_rx_failure());
    /// ```
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct IrqFlags: u8 {
        /// No packet received within the RX single timeout
        const RX_TIMEOUT = 0x80;
        /// Packet reception complete
        const RX_DONE = 0x40;
        /// Payload CRC check failed
        const PAYLOAD_CRC_ERROR = 0x20;
        /// Valid header received in RX
        const VALID_HEADER = 0x10;
        /// Payload transmission complete
        const TX_DONE = 0x08;
        /// Channel activity detection finished
        const CAD_DONE = 0x04;
        /// FHSS change channel
        const FHSS_CHANGE_CHANNEL = 0x02;
        /// Valid LoRa signal detected during CAD
        const CAD_DETECTED = 0x01;
    }
}

impl IrqFlags {
    /// Value that clears every flag when written to `RegIrqFlags`
    pub const CLEAR_ALL: u8 = 0xFF;

    /// True when the chip reported a receive timeout or a payload CRC error
    pub fn is_rx_failure(&self) -> bool {
        self.intersects(IrqFlags::RX_TIMEOUT | IrqFlags::PAYLOAD_CRC_ERROR)
    }
}

/// Event routed to DIO0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DioMapping {
    RxDone,
    TxDone,
    CadDone,
}

impl DioMapping {
    /// Value for `RegDioMapping1`; the other DIO fields are left at 0
    pub fn register_value(self) -> u8 {
        match self {
            DioMapping::RxDone => DIO0_RX_DONE,
            DioMapping::TxDone => DIO0_TX_DONE,
            DioMapping::CadDone => DIO0_CAD_DONE,
        }
    }

    /// Decode the DIO0 field of `RegDioMapping1`; `None` for the unused code 11
    pub fn from_register(value: u8) -> Option<Self> {
        match value & DIO0_MASK {
            DIO0_RX_DONE => Some(DioMapping::RxDone),
            DIO0_TX_DONE => Some(DioMapping::TxDone),
            DIO0_CAD_DONE => Some(DioMapping::CadDone),
            _ => None,
        }
    }

    /// Flag that asserts DIO0 under this mapping
    pub fn flag(self) -> IrqFlags {
        match self {
            DioMapping::RxDone => IrqFlags::RX_DONE,
            DioMapping::TxDone => IrqFlags::TX_DONE,
            DioMapping::CadDone => IrqFlags::CAD_DONE,
        }
    }
}
