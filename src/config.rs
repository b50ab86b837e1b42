//! # Radio Configuration
//!
//! Serializable settings applied to a driver after `init`. Every field is
//! optional: `None` leaves the value `init` selected. Files are JSON:
//!
//! ```json
//! {
//!   "frequency_mhz": 868.1,
//!   "tx_power_dbm": 14,
//!   "preset": "Bw125Cr48Sf4096",
//!   "this_address": 16
//! }
//! ```

use crate::constants::{
    RF95_BROADCAST_ADDRESS, RF95_DEFAULT_FREQUENCY_MHZ, RF95_DEFAULT_PREAMBLE_LEN,
    RF95_DEFAULT_TX_POWER_DBM,
};
use crate::error::Rf95Error;
use crate::radio::modem::{frequency_word, ModemPreset, SpreadingFactor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for an RF95 driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Carrier frequency in MHz (default: 434.0)
    pub frequency_mhz: Option<f64>,
    /// Transmit power in dBm (default: 13)
    pub tx_power_dbm: Option<i8>,
    /// Transmit on the RFO pin instead of PA_BOOST (default: false)
    pub use_rfo: Option<bool>,
    /// Canned modem configuration, applied before the individual modem fields
    pub preset: Option<ModemPreset>,
    /// Signal bandwidth in Hz, snapped up to the nearest supported step
    pub bandwidth_hz: Option<u32>,
    /// Spreading factor, 6 to 12
    pub spreading_factor: Option<u8>,
    /// Coding rate denominator, 5 to 8
    pub coding_rate_denominator: Option<u8>,
    /// Append and require a payload CRC
    pub payload_crc: Option<bool>,
    /// Preamble length in symbols (default: 8)
    pub preamble_length: Option<u16>,
    /// This node's address (default: broadcast)
    pub this_address: Option<u8>,
    /// Accept frames regardless of destination (default: false)
    pub promiscuous: Option<bool>,
    /// Run a CAD check before every transmission (default: true)
    pub cad_before_send: Option<bool>,
    /// Clock the chip from a TCXO
    pub tcxo: Option<bool>,
    /// Upper bound for blocking waits; unset waits indefinitely
    pub completion_timeout_ms: Option<u64>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_mhz: Some(RF95_DEFAULT_FREQUENCY_MHZ),
            tx_power_dbm: Some(RF95_DEFAULT_TX_POWER_DBM),
            use_rfo: Some(false),
            preset: Some(ModemPreset::Bw125Cr45Sf128),
            bandwidth_hz: None,
            spreading_factor: None,
            coding_rate_denominator: None,
            payload_crc: None,
            preamble_length: Some(RF95_DEFAULT_PREAMBLE_LEN),
            this_address: Some(RF95_BROADCAST_ADDRESS),
            promiscuous: Some(false),
            cad_before_send: Some(true),
            tcxo: None,
            completion_timeout_ms: None,
        }
    }
}

impl RadioConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, Rf95Error> {
        let config: RadioConfig =
            serde_json::from_str(json).map_err(|e| Rf95Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Rf95Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Rf95Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, Rf95Error> {
        serde_json::to_string_pretty(self).map_err(|e| Rf95Error::Config(e.to_string()))
    }

    /// Reject values the driver would otherwise silently clamp or misencode
    pub fn validate(&self) -> Result<(), Rf95Error> {
        if let Some(mhz) = self.frequency_mhz {
            frequency_word(mhz)?;
        }
        if let Some(sf) = self.spreading_factor {
            SpreadingFactor::try_from(sf).map_err(Rf95Error::Config)?;
        }
        if let Some(d) = self.coding_rate_denominator {
            if !(5..=8).contains(&d) {
                return Err(Rf95Error::Config(format!(
                    "coding rate denominator {d} outside 5..=8"
                )));
            }
        }
        if let Some(hz) = self.bandwidth_hz {
            if hz == 0 || hz > 500_000 {
                return Err(Rf95Error::Config(format!(
                    "bandwidth {hz} Hz outside 1..=500000"
                )));
            }
        }
        if let Some(dbm) = self.tx_power_dbm {
            let (min, max) = if self.use_rfo.unwrap_or(false) {
                (0, 15)
            } else {
                (2, 20)
            };
            if !(min..=max).contains(&dbm) {
                return Err(Rf95Error::Config(format!(
                    "transmit power {dbm} dBm outside {min}..={max}"
                )));
            }
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_init() {
        let config = RadioConfig::default();
        assert_eq!(config.frequency_mhz, Some(434.0));
        assert_eq!(config.tx_power_dbm, Some(13));
        assert_eq!(config.preset, Some(ModemPreset::Bw125Cr45Sf128));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RadioConfig::from_json_str(r#"{"frequency_mhz": 915.0}"#).unwrap();
        assert_eq!(config.frequency_mhz, Some(915.0));
        assert_eq!(config.preamble_length, Some(8));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        assert!(RadioConfig::from_json_str(r#"{"spreading_factor": 13}"#).is_err());
        assert!(RadioConfig::from_json_str(r#"{"coding_rate_denominator": 4}"#).is_err());
        assert!(RadioConfig::from_json_str(r#"{"tx_power_dbm": 17, "use_rfo": true}"#).is_err());
        assert!(RadioConfig::from_json_str(r#"{"frequency_mhz": -5.0}"#).is_err());
        assert!(RadioConfig::from_json_str(r#"{"preset": "Bw9000"}"#).is_err());
    }
}
