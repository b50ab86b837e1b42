//! # Packet Framing and Addressing
//!
//! Every frame on air starts with a 4-byte header followed by up to 251 payload
//! bytes:
//!
//! ```text
//! +----+------+----+-------+-----------------+
//! | to | from | id | flags | payload (0-251) |
//! +----+------+----+-------+-----------------+
//! ```
//!
//! A received frame is delivered when it is addressed to this node, to the
//! broadcast address, or when the node is promiscuous.

use crate::constants::{RF95_BROADCAST_ADDRESS, RF95_FIFO_SIZE, RF95_HEADER_LEN};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub to: u8,
    pub from: u8,
    pub id: u8,
    pub flags: u8,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            to: RF95_BROADCAST_ADDRESS,
            from: RF95_BROADCAST_ADDRESS,
            id: 0,
            flags: 0,
        }
    }
}

impl Header {
    pub fn from_bytes(bytes: [u8; RF95_HEADER_LEN]) -> Self {
        Self {
            to: bytes[0],
            from: bytes[1],
            id: bytes[2],
            flags: bytes[3],
        }
    }

    pub fn to_bytes(self) -> [u8; RF95_HEADER_LEN] {
        [self.to, self.from, self.id, self.flags]
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == RF95_BROADCAST_ADDRESS
    }
}

/// Receive-side address filter
///
/// Stored as atomics so the interrupt handler can consult it while mainline code
/// reconfigures the node.
#[derive(Debug)]
pub struct AddressFilter {
    this_address: AtomicU8,
    promiscuous: AtomicBool,
}

impl Default for AddressFilter {
    fn default() -> Self {
        Self::new(RF95_BROADCAST_ADDRESS, false)
    }
}

impl AddressFilter {
    pub fn new(this_address: u8, promiscuous: bool) -> Self {
        Self {
            this_address: AtomicU8::new(this_address),
            promiscuous: AtomicBool::new(promiscuous),
        }
    }

    pub fn this_address(&self) -> u8 {
        self.this_address.load(Ordering::Acquire)
    }

    pub fn set_this_address(&self, address: u8) {
        self.this_address.store(address, Ordering::Release);
    }

    pub fn promiscuous(&self) -> bool {
        self.promiscuous.load(Ordering::Acquire)
    }

    pub fn set_promiscuous(&self, promiscuous: bool) {
        self.promiscuous.store(promiscuous, Ordering::Release);
    }

    /// Whether a frame addressed to `to` is for this node
    pub fn accepts(&self, to: u8) -> bool {
        self.promiscuous() || to == self.this_address() || to == RF95_BROADCAST_ADDRESS
    }
}

/// The driver's single inbound frame buffer
#[derive(Debug, Clone)]
pub struct Frame {
    buf: [u8; RF95_FIFO_SIZE + 1],
    len: u8,
    valid: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            buf: [0u8; RF95_FIFO_SIZE + 1],
            len: 0,
            valid: false,
        }
    }

    /// Build a frame from bytes drained out of the FIFO; excess bytes are dropped
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut frame = Self::new();
        let len = bytes.len().min(RF95_FIFO_SIZE);
        frame.buf[..len].copy_from_slice(&bytes[..len]);
        frame.len = len as u8;
        frame
    }

    /// Forget the contents and drop validity
    pub fn clear(&mut self) {
        self.len = 0;
        self.valid = false;
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Raw bytes, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Header, if the frame is long enough to carry one
    pub fn header(&self) -> Option<Header> {
        if self.len() < RF95_HEADER_LEN {
            return None;
        }
        Some(Header::from_bytes([
            self.buf[0],
            self.buf[1],
            self.buf[2],
            self.buf[3],
        ]))
    }

    /// Payload bytes following the header
    pub fn payload(&self) -> &[u8] {
        if self.len() < RF95_HEADER_LEN {
            return &[];
        }
        &self.buf[RF95_HEADER_LEN..self.len()]
    }
}

/// Outcome of validating a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Shorter than a header; nothing changed
    TooShort,
    /// Addressed to this node; the frame is now valid
    Accepted(Header),
    /// Addressed elsewhere; nothing changed
    AddressMismatch(Header),
}

/// Apply addressing rules to a frame drained from the FIFO
///
/// On acceptance the frame is marked valid and `rx_good` is incremented exactly
/// once.
pub fn validate(frame: &mut Frame, filter: &AddressFilter, stats: &PacketStats) -> Validation {
    let Some(header) = frame.header() else {
        return Validation::TooShort;
    };
    if !filter.accepts(header.to) {
        return Validation::AddressMismatch(header);
    }
    frame.valid = true;
    stats.record_rx_good();
    Validation::Accepted(header)
}

/// Monotonic packet counters shared between the interrupt handler and mainline
#[derive(Debug, Default)]
pub struct PacketStats {
    rx_good: AtomicU32,
    rx_bad: AtomicU32,
    tx_good: AtomicU32,
}

/// Point-in-time copy of [`PacketStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketCounters {
    pub rx_good: u32,
    pub rx_bad: u32,
    pub tx_good: u32,
}

impl PacketStats {
    pub fn record_rx_good(&self) {
        self.rx_good.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rx_bad(&self) {
        self.rx_bad.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx_good(&self) {
        self.tx_good.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rx_good(&self) -> u32 {
        self.rx_good.load(Ordering::Relaxed)
    }

    pub fn rx_bad(&self) -> u32 {
        self.rx_bad.load(Ordering::Relaxed)
    }

    pub fn tx_good(&self) -> u32 {
        self.tx_good.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> PacketCounters {
        PacketCounters {
            rx_good: self.rx_good(),
            rx_bad: self.rx_bad(),
            tx_good: self.tx_good(),
        }
    }
}

/// An owned, delivered frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedFrame {
    pub header: Header,
    pub payload: Vec<u8>,
    pub rssi_dbm: i16,
    pub snr_db: i8,
}
