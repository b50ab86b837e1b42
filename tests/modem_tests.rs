//! # Modem Configuration Tests
//!
//! Register-level effects of the modem setters on the simulated chip, plus
//! property tests for the pure encoders.

mod common;

mod setter_tests {
    use crate::common::{frame, Node};
    use rf95_rs::radio::modem::ModemRegisters;
    use rf95_rs::radio::registers::*;
    use rf95_rs::{Bandwidth, CodingRate, InterruptEvent, ModemPreset, Rf95Error};

    fn sf_field(node: &Node) -> u8 {
        node.chip.register(REG_1E_MODEM_CONFIG2) & SPREADING_FACTOR_MASK
    }

    /// Spreading factors outside 6..=12 are clamped before encoding
    #[test]
    fn test_spreading_factor_clamping() {
        let node = Node::new();
        for (requested, field) in [(1, 0x60), (3, 0x60), (6, 0x60), (7, 0x70), (12, 0xC0), (13, 0xC0), (20, 0xC0)] {
            node.radio.set_spreading_factor(requested).unwrap();
            assert_eq!(sf_field(&node), field, "SF {requested}");
        }
        assert_eq!(node.radio.modem_config().spreading_factor.value(), 12);
    }

    /// Changing the spreading factor leaves the CRC bit alone
    #[test]
    fn test_spreading_factor_preserves_other_bits() {
        let node = Node::new();
        node.radio.set_spreading_factor(9).unwrap();
        assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), 0x94);
    }

    /// Bandwidth requests snap up to the next supported step
    #[test]
    fn test_bandwidth_selection() {
        let node = Node::new();
        for (hz, expected) in [
            (7_800, Bandwidth::Bw7_8),
            (10_000, Bandwidth::Bw10_4),
            (100_000, Bandwidth::Bw125),
            (250_000, Bandwidth::Bw250),
            (600_000, Bandwidth::Bw500),
        ] {
            node.radio.set_signal_bandwidth(hz).unwrap();
            let config1 = node.chip.register(REG_1D_MODEM_CONFIG1);
            assert_eq!(Bandwidth::from_register(config1), Some(expected), "{hz} Hz");
            // coding rate field untouched
            assert_eq!(config1 & CODING_RATE_MASK, 0x02);
        }
        assert_eq!(node.radio.modem_config().bandwidth, Bandwidth::Bw500);
    }

    /// Coding rate denominators map onto 4/5..4/8
    #[test]
    fn test_coding_rate() {
        let node = Node::new();
        for (denominator, bits) in [(4, 0x02), (5, 0x02), (6, 0x04), (7, 0x06), (8, 0x08), (9, 0x08)] {
            node.radio.set_coding_rate_denominator(denominator).unwrap();
            let config1 = node.chip.register(REG_1D_MODEM_CONFIG1);
            assert_eq!(config1 & CODING_RATE_MASK, bits);
            assert_eq!(config1 & BW_MASK, 0x70);
        }
        assert_eq!(node.radio.modem_config().coding_rate, CodingRate::Cr4_8);
    }

    /// Low data rate optimization follows the symbol time
    #[test]
    fn test_low_data_rate_optimization() {
        let node = Node::new();
        let ldro = |node: &Node| node.chip.register(REG_26_MODEM_CONFIG3) & LOW_DATA_RATE_OPTIMIZE != 0;

        node.radio.set_signal_bandwidth(125_000).unwrap();
        node.radio.set_spreading_factor(12).unwrap();
        assert!(ldro(&node));

        node.radio.set_signal_bandwidth(500_000).unwrap();
        assert!(!ldro(&node));

        node.radio.set_signal_bandwidth(62_500).unwrap();
        node.radio.set_spreading_factor(10).unwrap();
        assert!(ldro(&node));
        assert!(node.radio.modem_config().low_data_rate_optimize);

        // AGC auto bit from the preset survives
        assert_ne!(node.chip.register(REG_26_MODEM_CONFIG3) & AGC_AUTO_ON, 0);
    }

    /// Every preset writes its table entry
    #[test]
    fn test_presets() {
        let node = Node::new();
        for (index, preset) in ModemPreset::ALL.iter().enumerate() {
            node.radio.apply_preset_index(index as u8).unwrap();
            let regs = preset.registers();
            assert_eq!(node.chip.register(REG_1D_MODEM_CONFIG1), regs.config1);
            assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), regs.config2);
            assert_eq!(node.chip.register(REG_26_MODEM_CONFIG3), regs.config3);
        }
        assert!(!node.radio.modem_config().low_data_rate_optimize);
    }

    /// Index 5, equal to the table length, is rejected like any index past it,
    /// without touching the chip
    #[test]
    fn test_preset_index_out_of_range() {
        let node = Node::new();
        node.chip.clear_writes();
        assert_eq!(node.radio.apply_preset_index(5), Err(Rf95Error::InvalidPreset(5)));
        assert_eq!(node.radio.apply_preset_index(255), Err(Rf95Error::InvalidPreset(255)));
        assert!(node.chip.writes().is_empty());
    }

    /// Raw registers without the CRC bit stop the driver from requiring one
    #[test]
    fn test_raw_registers_drive_crc_requirement() {
        let node = Node::new();
        node.radio
            .apply_modem_registers(ModemRegisters {
                config1: 0x72,
                config2: 0x70,
                config3: 0x04,
            })
            .unwrap();
        assert!(!node.radio.modem_config().payload_crc);

        node.radio.set_this_address(0x10);
        node.radio.set_mode_rx().unwrap();
        node.chip.inject_rx(&frame(0x10, 0x01, 0, 0, b"plain"), 0, 80, false);
        assert!(matches!(
            node.radio.handle_interrupt().unwrap(),
            InterruptEvent::RxAccepted { len: 9, .. }
        ));
    }

    /// The payload CRC bit is set and cleared in place
    #[test]
    fn test_payload_crc_bit() {
        let node = Node::new();
        node.radio.set_payload_crc(false).unwrap();
        assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), 0x70);
        node.radio.set_payload_crc(true).unwrap();
        assert_eq!(node.chip.register(REG_1E_MODEM_CONFIG2), 0x74);
    }

    /// Transmit power on both pins, with clamping and the +20 dBm DAC
    #[test]
    fn test_tx_power() {
        let node = Node::new();
        let cases = [
            (13, false, 0x8B, PA_DAC_DISABLE, 13),
            (17, false, 0x8F, PA_DAC_DISABLE, 17),
            (20, false, 0x8F, PA_DAC_ENABLE, 20),
            (25, false, 0x8F, PA_DAC_ENABLE, 20),
            (1, false, 0x80, PA_DAC_DISABLE, 2),
            (10, true, 0x7A, PA_DAC_DISABLE, 10),
            (-3, true, 0x70, PA_DAC_DISABLE, 0),
            (18, true, 0x7F, PA_DAC_DISABLE, 15),
        ];
        for (dbm, rfo, pa_config, pa_dac, applied) in cases {
            node.radio.set_tx_power(dbm, rfo).unwrap();
            assert_eq!(node.chip.register(REG_09_PA_CONFIG), pa_config, "{dbm} dBm rfo={rfo}");
            assert_eq!(node.chip.register(REG_4D_PA_DAC), pa_dac, "{dbm} dBm rfo={rfo}");
            assert_eq!(node.radio.modem_config().tx_power_dbm, applied);
        }
    }

    /// Carrier frequency words for common bands
    #[test]
    fn test_frequency_registers() {
        let node = Node::new();
        node.radio.set_frequency(915.0).unwrap();
        assert_eq!(
            [
                node.chip.register(REG_06_FRF_MSB),
                node.chip.register(REG_07_FRF_MID),
                node.chip.register(REG_08_FRF_LSB)
            ],
            [0xE4, 0xC0, 0x00]
        );

        node.radio.set_frequency(868.1).unwrap();
        assert_eq!(node.chip.register(REG_06_FRF_MSB), 0xD9);
        assert_eq!(node.radio.modem_config().frequency_mhz, 868.1);
    }

    /// Frequencies that cannot be encoded are rejected before any write
    #[test]
    fn test_invalid_frequency() {
        let node = Node::new();
        node.chip.clear_writes();
        assert_eq!(node.radio.set_frequency(-1.0), Err(Rf95Error::InvalidFrequency(-1.0)));
        assert_eq!(node.radio.set_frequency(0.0), Err(Rf95Error::InvalidFrequency(0.0)));
        assert_eq!(node.radio.set_frequency(1100.0), Err(Rf95Error::InvalidFrequency(1100.0)));
        assert!(matches!(node.radio.set_frequency(f64::NAN), Err(Rf95Error::InvalidFrequency(_))));
        assert!(node.chip.writes().is_empty());
    }

    /// Preamble length is split across two registers
    #[test]
    fn test_preamble_length() {
        let node = Node::new();
        node.radio.set_preamble_length(0x1234).unwrap();
        assert_eq!(node.chip.register(REG_20_PREAMBLE_MSB), 0x12);
        assert_eq!(node.chip.register(REG_21_PREAMBLE_LSB), 0x34);
        assert_eq!(node.radio.modem_config().preamble_length, 0x1234);
    }

    /// Setter failures on the bus are reported
    #[test]
    fn test_setter_propagates_hal_error() {
        let node = Node::new();
        node.chip.fail_next(rf95_rs::HalError::Register(REG_1E_MODEM_CONFIG2));
        assert_eq!(
            node.radio.set_spreading_factor(9),
            Err(Rf95Error::Hal(rf95_rs::HalError::Register(REG_1E_MODEM_CONFIG2)))
        );
    }
}

mod encoder_tests {
    use rf95_rs::radio::modem::{symbol_time_ms, ModemConfig};
    use rf95_rs::{Bandwidth, ModemPreset, SpreadingFactor};

    /// Presets parse from their index or their name
    #[test]
    fn test_preset_from_str() {
        assert_eq!("3".parse::<ModemPreset>().unwrap(), ModemPreset::Bw125Cr48Sf4096);
        assert_eq!(
            "bw500cr45sf128".parse::<ModemPreset>().unwrap(),
            ModemPreset::Bw500Cr45Sf128
        );
        assert!("5".parse::<ModemPreset>().is_err());
        assert!("fast".parse::<ModemPreset>().is_err());
    }

    /// Symbol time for the long range preset
    #[test]
    fn test_symbol_time() {
        let t = symbol_time_ms(Bandwidth::Bw125.hz(), SpreadingFactor::clamped(12));
        assert!((t - 32.768).abs() < 1e-9);
    }

    /// The default modem settings match what `init` programs
    #[test]
    fn test_default_modem_config() {
        let config = ModemConfig::default();
        assert_eq!(config.bandwidth, Bandwidth::Bw125);
        assert_eq!(config.spreading_factor.value(), 7);
        assert!(config.payload_crc);
        assert!(!config.low_data_rate_optimize);
        assert!((config.bit_rate() - 5468.75).abs() < 1e-6);
    }
}

mod prop_tests {
    use proptest::prelude::*;
    use rf95_rs::constants::RF95_FSTEP;
    use rf95_rs::radio::modem::{
        frequency_from_word, frequency_word, low_data_rate_optimize, symbol_time_ms, TxPowerSetting,
    };
    use rf95_rs::{Bandwidth, CodingRate, SpreadingFactor};

    proptest! {
        #[test]
        fn prop_frequency_word_within_one_step(mhz in 137.0f64..1020.0) {
            let frf = frequency_word(mhz).unwrap();
            prop_assert!(frf < 1 << 24);
            let back = frequency_from_word(frf);
            let error_hz = (mhz - back) * 1_000_000.0;
            prop_assert!(error_hz > -1e-3 && error_hz < RF95_FSTEP);
        }

        #[test]
        fn prop_bandwidth_is_smallest_cover(hz in 1u32..=500_000) {
            let bw = Bandwidth::from_hz(hz);
            prop_assert!(bw.hz() >= hz);
            let index = Bandwidth::ALL.iter().position(|b| *b == bw).unwrap();
            if index > 0 {
                prop_assert!(Bandwidth::ALL[index - 1].hz() < hz);
            }
        }

        #[test]
        fn prop_spreading_factor_in_range(sf in any::<u8>()) {
            let clamped = SpreadingFactor::clamped(sf);
            prop_assert!((6..=12).contains(&clamped.value()));
            prop_assert_eq!(clamped.register_bits() >> 4, clamped.value());
        }

        #[test]
        fn prop_coding_rate_field(denominator in any::<u8>()) {
            let rate = CodingRate::from_denominator(denominator);
            prop_assert_eq!(CodingRate::from_register(rate.register_bits()), Some(rate));
        }

        #[test]
        fn prop_tx_power_within_pin_range(dbm in any::<i8>(), rfo in any::<bool>()) {
            let setting = TxPowerSetting::encode(dbm, rfo);
            let (min, max) = if rfo { (0, 15) } else { (2, 20) };
            prop_assert!((min..=max).contains(&setting.dbm));
            prop_assert_eq!(setting.pa_config & 0x80 != 0, !rfo);
        }

        #[test]
        fn prop_ldro_iff_long_symbols(index in 0usize..10, sf in 6u8..=12) {
            let bw = Bandwidth::ALL[index];
            let sf = SpreadingFactor::clamped(sf);
            prop_assert_eq!(low_data_rate_optimize(bw, sf), symbol_time_ms(bw.hz(), sf) > 16.0);
        }
    }
}
