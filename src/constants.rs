//! RF95 Driver Constants
//!
//! Sizes, addresses and crystal parameters shared by the packet layer, the modem
//! encoder and the interrupt registry.

/// Size of the chip's FIFO buffer in bytes
pub const RF95_FIFO_SIZE: usize = 255;

/// Largest payload length the chip accepts in explicit header mode
pub const RF95_MAX_PAYLOAD_LEN: usize = 255;

/// Length of the {to, from, id, flags} header prepended to every frame
pub const RF95_HEADER_LEN: usize = 4;

/// Largest user payload a single frame can carry
pub const RF95_MAX_MESSAGE_LEN: usize = RF95_MAX_PAYLOAD_LEN - RF95_HEADER_LEN;

/// Destination address accepted by every node
pub const RF95_BROADCAST_ADDRESS: u8 = 0xFF;

/// Crystal oscillator frequency in Hz
pub const RF95_FXOSC: f64 = 32_000_000.0;

/// Frequency synthesizer step in Hz (FXOSC / 2^19)
pub const RF95_FSTEP: f64 = RF95_FXOSC / 524_288.0;

/// Carrier frequencies at or above this value (MHz) use the high frequency port
pub const RF95_HF_PORT_THRESHOLD_MHZ: f64 = 779.0;

/// RSSI offset in dB on the high frequency port
pub const RF95_RSSI_OFFSET_HF: i16 = 157;

/// RSSI offset in dB on the low frequency port
pub const RF95_RSSI_OFFSET_LF: i16 = 164;

/// Number of driver instances the interrupt registry can dispatch to
pub const RF95_NUM_INTERRUPTS: usize = 3;

/// Symbol time in milliseconds above which low data rate optimization is required
pub const RF95_LDRO_SYMBOL_TIME_MS: f64 = 16.0;

/// Delay after forcing sleep + LoRa mode during init
pub const RF95_RESET_DELAY_MS: u32 = 10;

/// Default carrier frequency applied by `init` (MHz)
pub const RF95_DEFAULT_FREQUENCY_MHZ: f64 = 434.0;

/// Default transmit power applied by `init` (dBm, PA_BOOST)
pub const RF95_DEFAULT_TX_POWER_DBM: i8 = 13;

/// Default preamble length applied by `init` (symbols)
pub const RF95_DEFAULT_PREAMBLE_LEN: u16 = 8;
