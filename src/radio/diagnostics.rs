//! Link quality computations
//!
//! Conversions from the raw packet telemetry registers to SNR, RSSI and carrier
//! frequency error. The driver reads the registers; everything here is pure.

use crate::constants::{RF95_FXOSC, RF95_RSSI_OFFSET_HF, RF95_RSSI_OFFSET_LF};
use crate::radio::modem::Bandwidth;

/// SNR in dB from `RegPktSnrValue` (two's complement, 0.25 dB per step)
///
/// Division truncates toward zero.
pub fn snr_from_register(raw: u8) -> i8 {
    (raw as i8) / 4
}

/// Packet RSSI in dBm from `RegPktRssiValue`
///
/// Below the noise floor (negative SNR) the SNR is added to the raw reading;
/// otherwise the reading is scaled by 16/15 to correct the chip's linearity. The
/// port offset is then subtracted.
pub fn adjust_rssi(raw: u8, snr_db: i8, hf_port: bool) -> i16 {
    let mut rssi = i16::from(raw);
    if snr_db < 0 {
        rssi += i16::from(snr_db);
    } else {
        rssi = rssi * 16 / 15;
    }
    let offset = if hf_port {
        RF95_RSSI_OFFSET_HF
    } else {
        RF95_RSSI_OFFSET_LF
    };
    rssi - offset
}

/// Sign-extend the 20-bit frequency error estimate
pub fn sign_extend_20(raw: u32) -> i32 {
    let raw = raw & 0x000F_FFFF;
    if raw & 0x0008_0000 != 0 {
        (raw | 0xFFF0_0000) as i32
    } else {
        raw as i32
    }
}

/// Assemble the frequency error estimate from `RegFeiMsb/Mid/Lsb`
pub fn frequency_error_raw(msb: u8, mid: u8, lsb: u8) -> i32 {
    sign_extend_20((u32::from(msb) << 16) | (u32::from(mid) << 8) | u32::from(lsb))
}

/// Carrier frequency error in Hz
///
/// `Ferr = raw * 2^24 / Fxosc * BW[kHz] / 500`. Returns 0 when the bandwidth
/// field does not decode to a known bandwidth. Positive values mean the
/// transmitter is above the receiver's centre frequency.
pub fn frequency_error_hz(raw: i32, bandwidth: Option<Bandwidth>) -> i32 {
    match bandwidth {
        Some(bw) => {
            let scale = f64::from(1u32 << 24) / RF95_FXOSC / 500.0;
            (f64::from(raw) * bw.khz() * scale) as i32
        }
        None => 0,
    }
}
