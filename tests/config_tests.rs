//! # Radio Configuration Tests
//!
//! Loading JSON configuration files and applying them to a driver.

mod common;

use common::Node;
use rf95_rs::radio::registers::*;
use rf95_rs::{ModemPreset, RadioConfig, RadioMode, Rf95Error};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// A file with a few fields keeps the defaults for the rest
#[test]
fn test_load_partial_file() {
    let file = write_config(r#"{ "frequency_mhz": 868.1, "this_address": 16, "preset": "Bw125Cr48Sf4096" }"#);
    let config = RadioConfig::from_file(file.path()).unwrap();

    assert_eq!(config.frequency_mhz, Some(868.1));
    assert_eq!(config.this_address, Some(16));
    assert_eq!(config.preset, Some(ModemPreset::Bw125Cr48Sf4096));
    assert_eq!(config.tx_power_dbm, Some(13));
    assert_eq!(config.cad_before_send, Some(true));
    assert_eq!(config.completion_timeout(), None);
}

/// Malformed and missing files are configuration errors
#[test]
fn test_load_errors() {
    let file = write_config("{ not json");
    assert!(matches!(RadioConfig::from_file(file.path()), Err(Rf95Error::Config(_))));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("radio.json");
    assert!(matches!(RadioConfig::from_file(&missing), Err(Rf95Error::Config(_))));
}

/// Out of range values are rejected at load time
#[test]
fn test_load_rejects_invalid_values() {
    let file = write_config(r#"{ "bandwidth_hz": 0 }"#);
    assert!(matches!(RadioConfig::from_file(file.path()), Err(Rf95Error::Config(_))));

    let file = write_config(r#"{ "frequency_mhz": 2400.0 }"#);
    assert_eq!(
        RadioConfig::from_file(file.path()),
        Err(Rf95Error::InvalidFrequency(2400.0))
    );
}

/// The template printed by the CLI loads back unchanged
#[test]
fn test_template_reloads() {
    let json = RadioConfig::default().to_json_pretty().unwrap();
    let file = write_config(&json);
    assert_eq!(RadioConfig::from_file(file.path()).unwrap(), RadioConfig::default());
}

/// Individual modem fields override the preset
#[test]
fn test_apply_preset_then_overrides() {
    let node = Node::new();
    let config = RadioConfig::from_json_str(
        r#"{ "preset": "Bw125Cr48Sf4096", "bandwidth_hz": 250000, "frequency_mhz": 915.0, "tx_power_dbm": 20 }"#,
    )
    .unwrap();
    node.radio.apply_config(&config).unwrap();

    assert_eq!(node.chip.register(REG_1D_MODEM_CONFIG1), 0x88);
    assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), 0xC4);
    assert_ne!(node.chip.register(REG_26_MODEM_CONFIG3) & LOW_DATA_RATE_OPTIMIZE, 0);
    assert_eq!(node.chip.register(REG_06_FRF_MSB), 0xE4);
    assert_eq!(node.chip.register(REG_4D_PA_DAC), PA_DAC_ENABLE);

    let modem = node.radio.modem_config();
    assert_eq!(modem.frequency_mhz, 915.0);
    assert_eq!(modem.tx_power_dbm, 20);
}

/// Addressing, CAD and timeout settings reach the driver
#[test]
fn test_apply_node_settings() {
    let node = Node::new();
    let config = RadioConfig::from_json_str(
        r#"{ "this_address": 7, "promiscuous": true, "cad_before_send": false, "completion_timeout_ms": 500 }"#,
    )
    .unwrap();
    node.radio.apply_config(&config).unwrap();

    assert_eq!(node.radio.this_address(), 7);
    assert_eq!(node.radio.default_timeout(), Some(Duration::from_millis(500)));

    // CAD disabled: a send starts transmitting straight away
    node.chip.set_auto_complete(false);
    node.radio.send(b"x").unwrap();
    assert_eq!(node.radio.mode(), RadioMode::Tx);
}

/// Selecting the TCXO from a config leaves the radio idle
#[test]
fn test_apply_tcxo() {
    let node = Node::new();
    let config = RadioConfig {
        tcxo: Some(true),
        ..RadioConfig::default()
    };
    node.radio.apply_config(&config).unwrap();

    assert_ne!(node.chip.register(REG_4B_TCXO) & TCXO_TCXO_INPUT_ON, 0);
    assert_eq!(node.radio.mode(), RadioMode::Idle);
}

/// An invalid configuration is rejected before anything is written
#[test]
fn test_apply_invalid_config_writes_nothing() {
    let node = Node::new();
    node.chip.clear_writes();
    let config = RadioConfig {
        spreading_factor: Some(13),
        ..RadioConfig::default()
    };

    assert!(matches!(node.radio.apply_config(&config), Err(Rf95Error::Config(_))));
    assert!(node.chip.writes().is_empty());
}

/// `init_with_config` brings up a radio in one call
#[test]
fn test_init_with_config() {
    let node = Node::uninitialised();
    let file = write_config(r#"{ "frequency_mhz": 915.0, "spreading_factor": 9, "payload_crc": false }"#);
    let config = RadioConfig::from_file(file.path()).unwrap();

    node.radio.init_with_config(&config).unwrap();
    assert_eq!(node.radio.mode(), RadioMode::Idle);
    assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), 0x90);
    assert!(!node.radio.modem_config().payload_crc);
}
