//! # LoRa Modem Parameter Encoding
//!
//! Pure encoders from modem parameters to SX127x register values. The driver
//! applies these to the chip; the CLI and tests use them directly.
//!
//! | Register | Field | Source |
//! |---|---|---|
//! | 0x1D `ModemConfig1` | bits 7..4 bandwidth, 3..1 coding rate | [`Bandwidth`], [`CodingRate`] |
//! | 0x1E `ModemConfig2` | bits 7..4 spreading factor, bit 2 payload CRC | [`SpreadingFactor`] |
//! | 0x26 `ModemConfig3` | bit 3 low data rate optimize, bit 2 AGC auto | [`low_data_rate_optimize`] |
//! | 0x09 / 0x4D | PA config / PA DAC | [`TxPowerSetting`] |
//! | 0x06..0x08 | carrier frequency word | [`frequency_word`] |

use crate::constants::{RF95_FSTEP, RF95_HF_PORT_THRESHOLD_MHZ, RF95_LDRO_SYMBOL_TIME_MS};
use crate::error::Rf95Error;
use crate::radio::registers::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// LoRa signal bandwidth (Table 13-53 of the SX1276 datasheet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bandwidth {
    Bw7_8 = 0,
    Bw10_4 = 1,
    Bw15_6 = 2,
    Bw20_8 = 3,
    Bw31_25 = 4,
    Bw41_7 = 5,
    Bw62_5 = 6,
    Bw125 = 7,
    Bw250 = 8,
    Bw500 = 9,
}

impl Bandwidth {
    pub const ALL: [Bandwidth; 10] = [
        Bandwidth::Bw7_8,
        Bandwidth::Bw10_4,
        Bandwidth::Bw15_6,
        Bandwidth::Bw20_8,
        Bandwidth::Bw31_25,
        Bandwidth::Bw41_7,
        Bandwidth::Bw62_5,
        Bandwidth::Bw125,
        Bandwidth::Bw250,
        Bandwidth::Bw500,
    ];

    /// Nominal bandwidth in Hz
    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::Bw7_8 => 7_800,
            Bandwidth::Bw10_4 => 10_400,
            Bandwidth::Bw15_6 => 15_600,
            Bandwidth::Bw20_8 => 20_800,
            Bandwidth::Bw31_25 => 31_250,
            Bandwidth::Bw41_7 => 41_700,
            Bandwidth::Bw62_5 => 62_500,
            Bandwidth::Bw125 => 125_000,
            Bandwidth::Bw250 => 250_000,
            Bandwidth::Bw500 => 500_000,
        }
    }

    /// Nominal bandwidth in kHz
    pub fn khz(self) -> f64 {
        f64::from(self.hz()) / 1000.0
    }

    /// Smallest supported bandwidth that is at least `hz`; 500 kHz above the table
    pub fn from_hz(hz: u32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|bw| hz <= bw.hz())
            .unwrap_or(Bandwidth::Bw500)
    }

    /// Decode the bandwidth field of `ModemConfig1`
    pub fn from_register(config1: u8) -> Option<Self> {
        Self::ALL.get(usize::from(config1 >> 4)).copied()
    }

    /// Field value, already shifted into bits 7..4
    pub fn register_bits(self) -> u8 {
        (self as u8) << 4
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.khz())
    }
}

/// LoRa spreading factor, always within 6..=12
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SpreadingFactor(u8);

impl SpreadingFactor {
    pub const MIN: u8 = 6;
    pub const MAX: u8 = 12;

    /// Clamp `sf` into the supported range
    pub fn clamped(sf: u8) -> Self {
        SpreadingFactor(sf.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Decode the spreading factor field of `ModemConfig2`
    pub fn from_register(config2: u8) -> Option<Self> {
        let sf = config2 >> 4;
        (Self::MIN..=Self::MAX).contains(&sf).then_some(SpreadingFactor(sf))
    }

    /// Field value, already shifted into bits 7..4
    pub fn register_bits(self) -> u8 {
        self.0 << 4
    }

    /// Chips per symbol
    pub fn chips(self) -> u32 {
        1 << self.0
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = String;

    fn try_from(sf: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&sf) {
            Ok(SpreadingFactor(sf))
        } else {
            Err(format!("spreading factor {sf} outside {}..={}", Self::MIN, Self::MAX))
        }
    }
}

impl From<SpreadingFactor> for u8 {
    fn from(sf: SpreadingFactor) -> u8 {
        sf.0
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SF{}", self.0)
    }
}

/// Forward error correction coding rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingRate {
    Cr4_5,
    Cr4_6,
    Cr4_7,
    Cr4_8,
}

impl CodingRate {
    /// Map a denominator to a coding rate: 5 or less is 4/5, 8 or more is 4/8
    pub fn from_denominator(denominator: u8) -> Self {
        match denominator {
            0..=5 => CodingRate::Cr4_5,
            6 => CodingRate::Cr4_6,
            7 => CodingRate::Cr4_7,
            _ => CodingRate::Cr4_8,
        }
    }

    pub fn denominator(self) -> u8 {
        match self {
            CodingRate::Cr4_5 => 5,
            CodingRate::Cr4_6 => 6,
            CodingRate::Cr4_7 => 7,
            CodingRate::Cr4_8 => 8,
        }
    }

    /// Field value in bits 3..1 of `ModemConfig1`
    pub fn register_bits(self) -> u8 {
        (self.denominator() - 4) << 1
    }

    /// Decode the coding rate field of `ModemConfig1`
    pub fn from_register(config1: u8) -> Option<Self> {
        match (config1 & CODING_RATE_MASK) >> 1 {
            1 => Some(CodingRate::Cr4_5),
            2 => Some(CodingRate::Cr4_6),
            3 => Some(CodingRate::Cr4_7),
            4 => Some(CodingRate::Cr4_8),
            _ => None,
        }
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "4/{}", self.denominator())
    }
}

/// Raw values of the three modem configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemRegisters {
    /// `ModemConfig1` (0x1D)
    pub config1: u8,
    /// `ModemConfig2` (0x1E)
    pub config2: u8,
    /// `ModemConfig3` (0x26)
    pub config3: u8,
}

/// Canned modem configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModemPreset {
    /// Medium range, the `init` default
    Bw125Cr45Sf128 = 0,
    /// Fast and short range
    Bw500Cr45Sf128 = 1,
    /// Slow and long range
    Bw31_25Cr48Sf512 = 2,
    /// Slow and long range, low data rate optimization on
    Bw125Cr48Sf4096 = 3,
    /// Slow and long range, 4/5 coding
    Bw125Cr45Sf2048 = 4,
}

impl ModemPreset {
    pub const ALL: [ModemPreset; 5] = [
        ModemPreset::Bw125Cr45Sf128,
        ModemPreset::Bw500Cr45Sf128,
        ModemPreset::Bw31_25Cr48Sf512,
        ModemPreset::Bw125Cr48Sf4096,
        ModemPreset::Bw125Cr45Sf2048,
    ];

    pub fn registers(self) -> ModemRegisters {
        let (config1, config2, config3) = match self {
            ModemPreset::Bw125Cr45Sf128 => (0x72, 0x74, 0x04),
            ModemPreset::Bw500Cr45Sf128 => (0x92, 0x74, 0x04),
            ModemPreset::Bw31_25Cr48Sf512 => (0x48, 0x94, 0x04),
            ModemPreset::Bw125Cr48Sf4096 => (0x78, 0xC4, 0x0C),
            ModemPreset::Bw125Cr45Sf2048 => (0x72, 0xB4, 0x04),
        };
        ModemRegisters {
            config1,
            config2,
            config3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ModemPreset::Bw125Cr45Sf128 => "Bw125Cr45Sf128",
            ModemPreset::Bw500Cr45Sf128 => "Bw500Cr45Sf128",
            ModemPreset::Bw31_25Cr48Sf512 => "Bw31_25Cr48Sf512",
            ModemPreset::Bw125Cr48Sf4096 => "Bw125Cr48Sf4096",
            ModemPreset::Bw125Cr45Sf2048 => "Bw125Cr45Sf2048",
        }
    }
}

impl TryFrom<u8> for ModemPreset {
    type Error = Rf95Error;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(Rf95Error::InvalidPreset(index))
    }
}

impl FromStr for ModemPreset {
    type Err = Rf95Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<u8>() {
            return ModemPreset::try_from(index);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Rf95Error::Config(format!("unknown modem preset '{s}'")))
    }
}

impl fmt::Display for ModemPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Symbol duration in milliseconds
pub fn symbol_time_ms(bandwidth_hz: u32, sf: SpreadingFactor) -> f64 {
    1000.0 * f64::from(sf.chips()) / f64::from(bandwidth_hz)
}

/// Whether low data rate optimization is mandated for this bandwidth and SF
///
/// The chip requires it when a symbol lasts longer than 16 ms.
pub fn low_data_rate_optimize(bandwidth: Bandwidth, sf: SpreadingFactor) -> bool {
    symbol_time_ms(bandwidth.hz(), sf) > RF95_LDRO_SYMBOL_TIME_MS
}

/// PA register values for a requested output power
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPowerSetting {
    /// `RegPaConfig` (0x09)
    pub pa_config: u8,
    /// `RegPaDac` (0x4D)
    pub pa_dac: u8,
    /// Output power after clamping, in dBm
    pub dbm: i8,
}

impl TxPowerSetting {
    /// Encode `dbm` for the RFO pin (0..=15 dBm) or the PA_BOOST pin (2..=20 dBm)
    ///
    /// Requests outside the pin's range are clamped. On PA_BOOST anything above
    /// 17 dBm enables the +20 dBm DAC, which adds 3 dB on top of the register
    /// setting.
    pub fn encode(dbm: i8, use_rfo: bool) -> Self {
        if use_rfo {
            let dbm = dbm.clamp(0, 15);
            return TxPowerSetting {
                pa_config: MAX_POWER | dbm as u8,
                pa_dac: PA_DAC_DISABLE,
                dbm,
            };
        }

        let dbm = dbm.clamp(2, 20);
        let (pa_dac, setting) = if dbm > 17 {
            (PA_DAC_ENABLE, dbm - 3)
        } else {
            (PA_DAC_DISABLE, dbm)
        };
        TxPowerSetting {
            pa_config: PA_SELECT | (setting - 2) as u8,
            pa_dac,
            dbm,
        }
    }
}

/// 24-bit carrier frequency word for `centre_mhz`
pub fn frequency_word(centre_mhz: f64) -> Result<u32, Rf95Error> {
    if !centre_mhz.is_finite() || centre_mhz <= 0.0 {
        return Err(Rf95Error::InvalidFrequency(centre_mhz));
    }
    let frf = (centre_mhz * 1_000_000.0) / RF95_FSTEP;
    if frf >= f64::from(1u32 << 24) {
        return Err(Rf95Error::InvalidFrequency(centre_mhz));
    }
    Ok(frf as u32)
}

/// Frequency word split into `RegFrfMsb`, `RegFrfMid`, `RegFrfLsb`
pub fn frequency_bytes(frf: u32) -> [u8; 3] {
    [(frf >> 16) as u8, (frf >> 8) as u8, frf as u8]
}

/// Carrier frequency in MHz represented by a frequency word
pub fn frequency_from_word(frf: u32) -> f64 {
    f64::from(frf) * RF95_FSTEP / 1_000_000.0
}

/// Whether `centre_mhz` is served by the high frequency RF port
pub fn uses_hf_port(centre_mhz: f64) -> bool {
    centre_mhz >= RF95_HF_PORT_THRESHOLD_MHZ
}

/// Modem settings as last applied by the driver
///
/// The chip's registers are never read back to fill this in, apart from the
/// low data rate decision which uses the chip's bandwidth and SF fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModemConfig {
    pub bandwidth: Bandwidth,
    pub spreading_factor: SpreadingFactor,
    pub coding_rate: CodingRate,
    pub low_data_rate_optimize: bool,
    pub payload_crc: bool,
    pub preamble_length: u16,
    pub tx_power_dbm: i8,
    pub use_rfo: bool,
    pub frequency_mhz: f64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        let mut config = Self {
            bandwidth: Bandwidth::Bw125,
            spreading_factor: SpreadingFactor(7),
            coding_rate: CodingRate::Cr4_5,
            low_data_rate_optimize: false,
            payload_crc: false,
            preamble_length: crate::constants::RF95_DEFAULT_PREAMBLE_LEN,
            tx_power_dbm: crate::constants::RF95_DEFAULT_TX_POWER_DBM,
            use_rfo: false,
            frequency_mhz: crate::constants::RF95_DEFAULT_FREQUENCY_MHZ,
        };
        config.apply_registers(ModemPreset::Bw125Cr45Sf128.registers());
        config
    }
}

impl ModemConfig {
    /// Update the tracked fields from raw modem configuration registers
    pub fn apply_registers(&mut self, regs: ModemRegisters) {
        if let Some(bw) = Bandwidth::from_register(regs.config1) {
            self.bandwidth = bw;
        }
        if let Some(cr) = CodingRate::from_register(regs.config1) {
            self.coding_rate = cr;
        }
        if let Some(sf) = SpreadingFactor::from_register(regs.config2) {
            self.spreading_factor = sf;
        }
        self.payload_crc = regs.config2 & PAYLOAD_CRC_ON != 0;
        self.low_data_rate_optimize = regs.config3 & LOW_DATA_RATE_OPTIMIZE != 0;
    }

    /// Effective bit rate in bits per second
    pub fn bit_rate(&self) -> f64 {
        let sf = f64::from(self.spreading_factor.value());
        let cr = 4.0 / f64::from(self.coding_rate.denominator());
        sf * f64::from(self.bandwidth.hz()) / f64::from(self.spreading_factor.chips()) * cr
    }
}
