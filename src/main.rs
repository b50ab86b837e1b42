use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rf95_rs::constants::RF95_MAX_MESSAGE_LEN;
use rf95_rs::logging::init_logger_with_default;
use rf95_rs::radio::diagnostics::{adjust_rssi, frequency_error_hz, sign_extend_20, snr_from_register};
use rf95_rs::radio::hal::{relay, MockChip};
use rf95_rs::radio::modem::{
    frequency_bytes, frequency_word, low_data_rate_optimize, uses_hf_port, Bandwidth, CodingRate,
    ModemPreset, SpreadingFactor, TxPowerSetting,
};
use rf95_rs::{log_info, RadioConfig, Rf95};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rf95-cli")]
#[command(about = "Offline tooling for SX127x LoRa register encoding and packet handling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the canned modem presets
    Presets,
    /// Print the register values for a set of modem parameters
    Encode {
        #[arg(short, long, default_value = "434.0")]
        frequency: f64,
        #[arg(short, long, default_value = "125000")]
        bandwidth: u32,
        #[arg(short, long, default_value = "7")]
        sf: u8,
        #[arg(short, long, default_value = "5")]
        cr: u8,
        #[arg(short, long, default_value = "13", allow_negative_numbers = true)]
        power: i8,
        /// Transmit on the RFO pin instead of PA_BOOST
        #[arg(long)]
        rfo: bool,
    },
    /// Convert raw packet RSSI/SNR register values to dBm/dB
    Rssi {
        #[arg(long)]
        raw: u8,
        #[arg(long, allow_negative_numbers = true)]
        snr_raw: i8,
        /// Carrier on the high frequency port (>= 779 MHz)
        #[arg(long)]
        hf: bool,
    },
    /// Convert a raw 20-bit frequency error estimate to Hz
    FreqError {
        /// Raw RegFei value, decimal or 0x-prefixed hex
        raw: String,
        #[arg(short, long, default_value = "125000")]
        bandwidth: u32,
    },
    /// Print the default radio configuration as JSON
    ConfigTemplate,
    /// Send a message between two simulated radios
    Loopback {
        message: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "100")]
        rssi_raw: u8,
        #[arg(long, default_value = "32", allow_negative_numbers = true)]
        snr_raw: i8,
    },
}

fn main() -> anyhow::Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Presets => {
            for (index, preset) in ModemPreset::ALL.iter().enumerate() {
                let regs = preset.registers();
                let sf = SpreadingFactor::clamped(regs.config2 >> 4);
                let bw = Bandwidth::from_register(regs.config1).context("preset bandwidth")?;
                let cr = CodingRate::from_register(regs.config1).context("preset coding rate")?;
                println!(
                    "{index} {preset:<18} {:>10} {:<5} CR {cr}  [1D={:02X} 1E={:02X} 26={:02X}]",
                    bw.to_string(),
                    sf.to_string(),
                    regs.config1,
                    regs.config2,
                    regs.config3
                );
            }
        }
        Commands::Encode {
            frequency,
            bandwidth,
            sf,
            cr,
            power,
            rfo,
        } => {
            let bw = Bandwidth::from_hz(bandwidth);
            let sf = SpreadingFactor::clamped(sf);
            let cr = CodingRate::from_denominator(cr);
            let ldro = low_data_rate_optimize(bw, sf);
            let frf = frequency_word(frequency)?;
            let [msb, mid, lsb] = frequency_bytes(frf);
            let pa = TxPowerSetting::encode(power, rfo);

            println!("bandwidth      {bw} ({bandwidth} Hz requested)");
            println!("0x06..0x08 FRF {msb:02X} {mid:02X} {lsb:02X}");
            println!("0x09 PaConfig  {:02X} ({} dBm)", pa.pa_config, pa.dbm);
            println!("0x1D Config1   {:02X}", bw.register_bits() | cr.register_bits());
            println!("0x1E Config2   {:02X}", sf.register_bits());
            println!("0x26 Config3   {:02X}", if ldro { 0x08 } else { 0x00 });
            println!("0x4D PaDac     {:02X}", pa.pa_dac);
            println!("HF port        {}", uses_hf_port(frequency));
        }
        Commands::Rssi { raw, snr_raw, hf } => {
            let snr = snr_from_register(snr_raw as u8);
            let rssi = adjust_rssi(raw, snr, hf);
            println!("SNR {snr} dB, RSSI {rssi} dBm");
        }
        Commands::FreqError { raw, bandwidth } => {
            let value = match raw.strip_prefix("0x") {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => raw.parse::<u32>(),
            }
            .with_context(|| format!("invalid raw value '{raw}'"))?;
            let error = frequency_error_hz(sign_extend_20(value), Some(Bandwidth::from_hz(bandwidth)));
            println!("{error} Hz");
        }
        Commands::ConfigTemplate => {
            println!("{}", RadioConfig::default().to_json_pretty()?);
        }
        Commands::Loopback {
            message,
            config,
            rssi_raw,
            snr_raw,
        } => loopback(&message, config, rssi_raw, snr_raw)?,
    }

    Ok(())
}

fn loopback(
    message: &str,
    config: Option<PathBuf>,
    rssi_raw: u8,
    snr_raw: i8,
) -> anyhow::Result<()> {
    if message.len() > RF95_MAX_MESSAGE_LEN {
        bail!("message longer than {RF95_MAX_MESSAGE_LEN} bytes");
    }
    let config = match config {
        Some(path) => RadioConfig::from_file(&path)?,
        None => RadioConfig::default(),
    };
    let timeout = config
        .completion_timeout()
        .unwrap_or(Duration::from_secs(2));

    let tx_chip = Arc::new(MockChip::new());
    let rx_chip = Arc::new(MockChip::new());
    let tx = Arc::new(Rf95::new(Arc::clone(&tx_chip)));
    let rx = Arc::new(Rf95::new(Arc::clone(&rx_chip)));
    tx.init_with_config(&config)?;
    rx.init_with_config(&config)?;
    tx.set_default_timeout(Some(timeout));
    rx.set_this_address(0x01);
    tx.set_header_from(0x02);
    tx.set_header_to(0x01);

    let running = Arc::new(AtomicBool::new(true));
    let air = {
        let running = Arc::clone(&running);
        let (tx, rx, tx_chip, rx_chip) = (
            Arc::clone(&tx),
            Arc::clone(&rx),
            Arc::clone(&tx_chip),
            Arc::clone(&rx_chip),
        );
        thread::spawn(move || -> Result<(), rf95_rs::Rf95Error> {
            while running.load(Ordering::Acquire) {
                if tx_chip.irq_line() {
                    tx.handle_interrupt()?;
                }
                relay(&tx_chip, &rx_chip, snr_raw, rssi_raw);
                if rx_chip.irq_line() {
                    rx.handle_interrupt()?;
                }
                thread::yield_now();
            }
            Ok(())
        })
    };

    rx.available()?;
    tx.send(message.as_bytes())?;
    tx.wait_packet_sent(Some(timeout))?;
    let delivered = rx.wait_available_timeout(timeout)?;
    let frame = if delivered { rx.recv_frame()? } else { None };

    running.store(false, Ordering::Release);
    match air.join() {
        Ok(result) => result?,
        Err(_) => bail!("interrupt thread panicked"),
    }

    match frame {
        Some(frame) => {
            log_info(format_args!(
                "Received {} bytes from 0x{:02X}: {:?}",
                frame.payload.len(),
                frame.header.from,
                String::from_utf8_lossy(&frame.payload)
            ));
            println!(
                "RSSI {} dBm, SNR {} dB, counters tx {:?} rx {:?}",
                frame.rssi_dbm,
                frame.snr_db,
                tx.counters(),
                rx.counters()
            );
        }
        None => bail!("no frame received within {timeout:?}"),
    }
    Ok(())
}
