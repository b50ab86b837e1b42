//! # SX127x Register Definitions and Constants
//!
//! Register addresses, operating-mode values and bit field definitions for the
//! Semtech SX1276/77/78/79 (HopeRF RFM95/96/97/98) in LoRa mode. Addresses follow
//! the SX1276 datasheet; the FSK-only registers are omitted.
//!
//! ## Register Map
//!
//! - 0x00-0x0F: FIFO, operating mode, carrier frequency, PA and FIFO pointers
//! - 0x10-0x1F: RX status, IRQ flags, packet telemetry, modem config 1/2
//! - 0x20-0x2F: preamble, payload length, modem config 3, frequency error
//! - 0x40-0x4F: DIO mapping, version, TCXO and PA DAC

// =============================================================================
// Register Addresses
// =============================================================================

/// FIFO read/write access register
pub const REG_00_FIFO: u8 = 0x00;

/// Operating mode and LoRa/FSK selection
pub const REG_01_OP_MODE: u8 = 0x01;

/// RF carrier frequency (MSB)
pub const REG_06_FRF_MSB: u8 = 0x06;

/// RF carrier frequency (MID)
pub const REG_07_FRF_MID: u8 = 0x07;

/// RF carrier frequency (LSB)
pub const REG_08_FRF_LSB: u8 = 0x08;

/// PA selection and output power control
pub const REG_09_PA_CONFIG: u8 = 0x09;

/// PA ramp time
pub const REG_0A_PA_RAMP: u8 = 0x0A;

/// Over current protection
pub const REG_0B_OCP: u8 = 0x0B;

/// LNA settings
pub const REG_0C_LNA: u8 = 0x0C;

/// SPI interface address pointer into the FIFO
pub const REG_0D_FIFO_ADDR_PTR: u8 = 0x0D;

/// Write base address in FIFO data buffer for the TX modulator
pub const REG_0E_FIFO_TX_BASE_ADDR: u8 = 0x0E;

/// Read base address in FIFO data buffer for the RX demodulator
pub const REG_0F_FIFO_RX_BASE_ADDR: u8 = 0x0F;

/// Start address of the last packet received
pub const REG_10_FIFO_RX_CURRENT_ADDR: u8 = 0x10;

/// IRQ mask
pub const REG_11_IRQ_FLAGS_MASK: u8 = 0x11;

/// IRQ flags, write 1 to clear
pub const REG_12_IRQ_FLAGS: u8 = 0x12;

/// Number of payload bytes of the last packet received
pub const REG_13_RX_NB_BYTES: u8 = 0x13;

/// Live LoRa modem status
pub const REG_18_MODEM_STAT: u8 = 0x18;

/// SNR estimate of the last packet, two's complement in 0.25 dB steps
pub const REG_19_PKT_SNR_VALUE: u8 = 0x19;

/// RSSI of the last packet
pub const REG_1A_PKT_RSSI_VALUE: u8 = 0x1A;

/// Current RSSI
pub const REG_1B_RSSI_VALUE: u8 = 0x1B;

/// Hop channel and CRC-on-payload indication of the last header
pub const REG_1C_HOP_CHANNEL: u8 = 0x1C;

/// Bandwidth, coding rate and implicit header mode
pub const REG_1D_MODEM_CONFIG1: u8 = 0x1D;

/// Spreading factor, TX continuous mode and payload CRC
pub const REG_1E_MODEM_CONFIG2: u8 = 0x1E;

/// RX timeout LSB
pub const REG_1F_SYMB_TIMEOUT_LSB: u8 = 0x1F;

/// Preamble length (MSB)
pub const REG_20_PREAMBLE_MSB: u8 = 0x20;

/// Preamble length (LSB)
pub const REG_21_PREAMBLE_LSB: u8 = 0x21;

/// Payload length in implicit mode, TX length in explicit mode
pub const REG_22_PAYLOAD_LENGTH: u8 = 0x22;

/// Maximum payload length accepted by the receiver
pub const REG_23_MAX_PAYLOAD_LENGTH: u8 = 0x23;

/// Frequency hopping period
pub const REG_24_HOP_PERIOD: u8 = 0x24;

/// FIFO address of the last byte written by the receiver
pub const REG_25_FIFO_RX_BYTE_ADDR: u8 = 0x25;

/// Low data rate optimize and AGC auto
pub const REG_26_MODEM_CONFIG3: u8 = 0x26;

/// Estimated frequency error (bits 19..16)
pub const REG_28_FREQ_ERROR_MSB: u8 = 0x28;

/// Estimated frequency error (bits 15..8)
pub const REG_29_FREQ_ERROR_MID: u8 = 0x29;

/// Estimated frequency error (bits 7..0)
pub const REG_2A_FREQ_ERROR_LSB: u8 = 0x2A;

/// Mapping of pins DIO0 to DIO3
pub const REG_40_DIO_MAPPING1: u8 = 0x40;

/// Mapping of pins DIO4 and DIO5
pub const REG_41_DIO_MAPPING2: u8 = 0x41;

/// Silicon revision
pub const REG_42_VERSION: u8 = 0x42;

/// TCXO or crystal input selection
pub const REG_4B_TCXO: u8 = 0x4B;

/// High power PA settings
pub const REG_4D_PA_DAC: u8 = 0x4D;

// =============================================================================
// Operating Modes (REG_01_OP_MODE)
// =============================================================================

/// LoRa (long range) mode bit; only writable in sleep
pub const LONG_RANGE_MODE: u8 = 0x80;

/// Access the shared FSK register page while in LoRa mode
pub const ACCESS_SHARED_REG: u8 = 0x40;

/// Low frequency register page (below 525 MHz)
pub const LOW_FREQUENCY_MODE: u8 = 0x08;

/// Mask of the mode bits within REG_01_OP_MODE
pub const MODE_MASK: u8 = 0x07;

pub const MODE_SLEEP: u8 = 0x00;
pub const MODE_STDBY: u8 = 0x01;
pub const MODE_FSTX: u8 = 0x02;
pub const MODE_TX: u8 = 0x03;
pub const MODE_FSRX: u8 = 0x04;
pub const MODE_RXCONTINUOUS: u8 = 0x05;
pub const MODE_RXSINGLE: u8 = 0x06;
pub const MODE_CAD: u8 = 0x07;

// =============================================================================
// PA Configuration (REG_09_PA_CONFIG, REG_4D_PA_DAC)
// =============================================================================

/// Route output through the PA_BOOST pin
pub const PA_SELECT: u8 = 0x80;

/// Maximum power field, 0x70 selects Pmax = 15 dBm on the RFO pin
pub const MAX_POWER: u8 = 0x70;

/// Output power field mask
pub const OUTPUT_POWER: u8 = 0x0F;

/// Default PA DAC setting
pub const PA_DAC_DISABLE: u8 = 0x04;

/// +20 dBm on PA_BOOST
pub const PA_DAC_ENABLE: u8 = 0x07;

// =============================================================================
// Modem Configuration Bit Fields
// =============================================================================

/// Bandwidth field of REG_1D_MODEM_CONFIG1 (bits 7..4)
pub const BW_MASK: u8 = 0xF0;

/// Coding rate field of REG_1D_MODEM_CONFIG1 (bits 3..1)
pub const CODING_RATE_MASK: u8 = 0x0E;

/// Implicit header mode bit of REG_1D_MODEM_CONFIG1
pub const IMPLICIT_HEADER_MODE_ON: u8 = 0x01;

/// Spreading factor field of REG_1E_MODEM_CONFIG2 (bits 7..4)
pub const SPREADING_FACTOR_MASK: u8 = 0xF0;

/// Payload CRC enable bit of REG_1E_MODEM_CONFIG2
pub const PAYLOAD_CRC_ON: u8 = 0x04;

/// Low data rate optimize bit of REG_26_MODEM_CONFIG3
pub const LOW_DATA_RATE_OPTIMIZE: u8 = 0x08;

/// AGC auto bit of REG_26_MODEM_CONFIG3
pub const AGC_AUTO_ON: u8 = 0x04;

/// CRC-on-payload bit of REG_1C_HOP_CHANNEL, reported from the received header
pub const RX_PAYLOAD_CRC_IS_ON: u8 = 0x40;

/// TCXO input enable bit of REG_4B_TCXO
pub const TCXO_TCXO_INPUT_ON: u8 = 0x10;

// =============================================================================
// DIO Mapping (REG_40_DIO_MAPPING1, DIO0 in bits 7..6)
// =============================================================================

/// DIO0 signals RxDone
pub const DIO0_RX_DONE: u8 = 0x00;

/// DIO0 signals TxDone
pub const DIO0_TX_DONE: u8 = 0x40;

/// DIO0 signals CadDone
pub const DIO0_CAD_DONE: u8 = 0x80;

/// DIO0 field mask
pub const DIO0_MASK: u8 = 0xC0;
