//! # RF95 Packet Driver
//!
//! Stateful packet radio on top of a stateless register transport. The driver owns
//! one inbound frame slot and the outbound header fields, tracks the chip's
//! operating mode, and turns DIO0 interrupts into delivered or dropped frames.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Application: send / available / recv     │
//! ├──────────────────────────────────────────┤
//! │ Rf95 (this file)                         │
//! │   mode transitions, framing, modem setup │
//! ├────────────────────┬─────────────────────┤
//! │ handle_interrupt() │ InterruptRegistry   │
//! ├────────────────────┴─────────────────────┤
//! │ Hal: register + burst FIFO access        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The interrupt handler and mainline share state through atomics and short
//! `critical_section` blocks. The handler drains the FIFO into a stack buffer
//! outside any critical section and only commits a frame that passed addressing.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use rf95_rs::radio::{driver::Rf95, hal::MockChip};
//! use std::sync::Arc;
//!
//! let radio = Arc::new(Rf95::new(MockChip::new()));
//! radio.init()?;
//! radio.set_frequency(868.1)?;
//! radio.send(b"hello")?;
//!
//! let mut buf = [0u8; 251];
//! if let Some(len) = radio.recv(&mut buf)? {
//!     println!("{:?} at {} dBm", &buf[..len], radio.last_rssi());
//! }
//! # Ok::<(), rf95_rs::Rf95Error>(())
//! ```

use crate::config::RadioConfig;
use crate::constants::*;
use crate::error::Rf95Error;
use crate::radio::diagnostics::{adjust_rssi, frequency_error_hz, frequency_error_raw, snr_from_register};
use crate::radio::hal::Hal;
use crate::radio::interrupt::{InterruptHandler, InterruptRegistry, SlotId};
use crate::radio::irq::IrqFlags;
use crate::radio::mode::{ModeObserver, NoopObserver, RadioMode};
use crate::radio::modem::{
    frequency_bytes, frequency_word, low_data_rate_optimize, uses_hf_port, Bandwidth, CodingRate,
    ModemConfig, ModemPreset, ModemRegisters, SpreadingFactor, TxPowerSetting,
};
use crate::radio::packet::{
    self, AddressFilter, Frame, Header, PacketCounters, PacketStats, ReceivedFrame, Validation,
};
use crate::radio::registers::*;
use crate::util::logging::{format_frame_hex, log_frame_hex, LogThrottle};
use critical_section::Mutex;
use log::{debug, info, trace, warn};
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a received frame was discarded by the chip-status checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxFailure {
    /// `RxTimeout` was raised
    Timeout,
    /// `PayloadCrcError` was raised
    CrcError,
    /// CRC is required locally but the sender's header did not claim one
    CrcMissing,
}

/// Why a clean frame was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxRejection {
    /// Shorter than the 4-byte header
    TooShort { len: usize },
    /// Addressed to another node
    AddressMismatch(Header),
}

/// Outcome of one interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptEvent {
    /// A frame for this node is buffered and the radio went idle
    RxAccepted {
        header: Header,
        len: usize,
        rssi_dbm: i16,
        snr_db: i8,
    },
    /// A clean frame was received but not delivered
    RxRejected(RxRejection),
    /// A frame failed the status checks; counted in `rx_bad`
    RxBad(RxFailure),
    /// Transmission finished; counted in `tx_good`
    TxDone,
    /// Channel activity detection finished
    CadDone { detected: bool },
    /// Nothing to do for these flags in this mode
    Ignored { mode: RadioMode, flags: IrqFlags },
}

impl InterruptEvent {
    /// Whether the radio returns to idle after this event
    pub fn completes_operation(&self) -> bool {
        matches!(
            self,
            InterruptEvent::RxAccepted { .. } | InterruptEvent::TxDone | InterruptEvent::CadDone { .. }
        )
    }
}

/// Link quality of the last received frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Telemetry {
    pub last_rssi_dbm: i16,
    pub last_snr_db: i8,
}

/// Registry slot held by an attached driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attachment {
    registry: usize,
    slot: SlotId,
}

#[derive(Debug, Default)]
struct RxState {
    frame: Frame,
    last_header: Header,
    telemetry: Telemetry,
}

/// Driver for one SX127x in LoRa mode
pub struct Rf95<H: Hal, O: ModeObserver = NoopObserver> {
    hal: H,
    observer: O,
    mode: AtomicU8,
    /// Bumped on every mode change so the handler can tell its mode was replaced
    transitions: AtomicU32,
    filter: AddressFilter,
    stats: PacketStats,
    crc_enabled: AtomicBool,
    using_hf_port: AtomicBool,
    cad_detected: AtomicBool,
    cad_before_send: AtomicBool,
    rx: Mutex<RefCell<RxState>>,
    tx_header: Mutex<Cell<Header>>,
    modem: Mutex<Cell<ModemConfig>>,
    default_timeout: Mutex<Cell<Option<Duration>>>,
    last_event: Mutex<Cell<Option<InterruptEvent>>>,
    bad_frame_log: Mutex<RefCell<LogThrottle>>,
    attachment: Mutex<Cell<Option<Attachment>>>,
}

impl<H: Hal> Rf95<H> {
    pub fn new(hal: H) -> Self {
        Self::with_observer(hal, NoopObserver)
    }
}

impl<H: Hal, O: ModeObserver> Rf95<H, O> {
    /// Create a driver that calls `observer` before every mode transition
    pub fn with_observer(hal: H, observer: O) -> Self {
        Self {
            hal,
            observer,
            mode: AtomicU8::new(RadioMode::Initialising as u8),
            transitions: AtomicU32::new(0),
            filter: AddressFilter::default(),
            stats: PacketStats::default(),
            crc_enabled: AtomicBool::new(true),
            using_hf_port: AtomicBool::new(false),
            cad_detected: AtomicBool::new(false),
            cad_before_send: AtomicBool::new(true),
            rx: Mutex::new(RefCell::new(RxState::default())),
            tx_header: Mutex::new(Cell::new(Header::default())),
            modem: Mutex::new(Cell::new(ModemConfig::default())),
            default_timeout: Mutex::new(Cell::new(None)),
            last_event: Mutex::new(Cell::new(None)),
            bad_frame_log: Mutex::new(RefCell::new(LogThrottle::new(60_000, 5))),
            attachment: Mutex::new(Cell::new(None)),
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Reset the chip into LoRa mode and apply the default configuration
    ///
    /// Defaults: preset `Bw125Cr45Sf128`, preamble 8, 434.0 MHz, 13 dBm on
    /// PA_BOOST. Fails with [`Rf95Error::InitFailure`] when the chip does not report
    /// sleep + LoRa mode afterwards, which usually means no chip is present.
    pub fn init(&self) -> Result<(), Rf95Error> {
        critical_section::with(|_| -> Result<(), Rf95Error> {
            self.observer.mode_will_change(self.mode(), RadioMode::Sleep);
            self.hal
                .write_register(REG_01_OP_MODE, RadioMode::Sleep.op_mode())?;
            self.store_mode(RadioMode::Sleep);
            Ok(())
        })?;
        self.hal.delay_ms(RF95_RESET_DELAY_MS);

        let op_mode = self.hal.read_register(REG_01_OP_MODE)?;
        if op_mode != RadioMode::Sleep.op_mode() {
            warn!("RF95 init failed: RegOpMode read back 0x{op_mode:02X}");
            return Err(Rf95Error::InitFailure { op_mode });
        }

        // Whole FIFO for either direction, never both at once
        self.hal.write_register(REG_0E_FIFO_TX_BASE_ADDR, 0)?;
        self.hal.write_register(REG_0F_FIFO_RX_BASE_ADDR, 0)?;

        self.set_mode_idle()?;
        self.apply_preset(ModemPreset::Bw125Cr45Sf128)?;
        self.set_preamble_length(RF95_DEFAULT_PREAMBLE_LEN)?;
        self.set_frequency(RF95_DEFAULT_FREQUENCY_MHZ)?;
        self.set_tx_power(RF95_DEFAULT_TX_POWER_DBM, false)?;

        info!(
            "RF95 initialised (version 0x{:02X})",
            self.device_version()?
        );
        Ok(())
    }

    /// `init` followed by `apply_config`
    pub fn init_with_config(&self, config: &RadioConfig) -> Result<(), Rf95Error> {
        self.init()?;
        self.apply_config(config)
    }

    /// Apply every field set in `config`
    ///
    /// The preset is applied first so individual modem fields override it.
    pub fn apply_config(&self, config: &RadioConfig) -> Result<(), Rf95Error> {
        config.validate()?;

        if let Some(preset) = config.preset {
            self.apply_preset(preset)?;
        }
        if let Some(hz) = config.bandwidth_hz {
            self.set_signal_bandwidth(hz)?;
        }
        if let Some(sf) = config.spreading_factor {
            self.set_spreading_factor(sf)?;
        }
        if let Some(denominator) = config.coding_rate_denominator {
            self.set_coding_rate_denominator(denominator)?;
        }
        if let Some(on) = config.payload_crc {
            self.set_payload_crc(on)?;
        }
        if let Some(len) = config.preamble_length {
            self.set_preamble_length(len)?;
        }
        if let Some(mhz) = config.frequency_mhz {
            self.set_frequency(mhz)?;
        }
        if let Some(dbm) = config.tx_power_dbm {
            self.set_tx_power(dbm, config.use_rfo.unwrap_or(false))?;
        }
        if let Some(address) = config.this_address {
            self.set_this_address(address);
        }
        if let Some(promiscuous) = config.promiscuous {
            self.set_promiscuous(promiscuous);
        }
        if let Some(cad) = config.cad_before_send {
            self.set_cad_before_send(cad);
        }
        self.set_default_timeout(config.completion_timeout());
        if let Some(on) = config.tcxo {
            self.enable_tcxo(on, config.completion_timeout())?;
            self.set_mode_idle()?;
        }

        let modem = self.modem_config();
        info!(
            "Applied radio config: {:.3} MHz, {} {} CR {}, {} dBm, address 0x{:02X}",
            modem.frequency_mhz,
            modem.bandwidth,
            modem.spreading_factor,
            modem.coding_rate,
            modem.tx_power_dbm,
            self.this_address()
        );
        Ok(())
    }

    // =========================================================================
    // Mode state machine
    // =========================================================================

    pub fn mode(&self) -> RadioMode {
        RadioMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn set_mode_idle(&self) -> Result<(), Rf95Error> {
        self.transition(RadioMode::Idle)
    }

    /// Put the chip to sleep; the next transition wakes it
    pub fn sleep(&self) -> Result<(), Rf95Error> {
        self.transition(RadioMode::Sleep)
    }

    pub fn set_mode_rx(&self) -> Result<(), Rf95Error> {
        self.transition(RadioMode::Rx)
    }

    pub fn set_mode_tx(&self) -> Result<(), Rf95Error> {
        self.transition(RadioMode::Tx)
    }

    pub fn set_mode_cad(&self) -> Result<(), Rf95Error> {
        self.transition(RadioMode::Cad)
    }

    /// Move to `target`, skipping the chip when already there
    ///
    /// The OP_MODE and DIO mapping writes and the observer call all happen
    /// inside one `critical_section::with`. On hosts that section is a single
    /// process-wide lock, so every driver instance waits for the bus writes of
    /// whichever transition holds it.
    fn transition(&self, target: RadioMode) -> Result<(), Rf95Error> {
        critical_section::with(|_| self.transition_locked(target))
    }

    /// Go idle after a finished operation unless mainline has changed the mode
    /// since the handler sampled it as `(mode, transitions)`
    fn finish_operation(&self, sampled: RadioMode, epoch: u32) -> Result<bool, Rf95Error> {
        critical_section::with(|_| {
            if self.mode() != sampled || self.transitions.load(Ordering::Acquire) != epoch {
                debug!("Mode changed to {:?} during interrupt, leaving it", self.mode());
                return Ok(false);
            }
            self.transition_locked(RadioMode::Idle)?;
            Ok(true)
        })
    }

    /// Caller holds the critical section
    fn transition_locked(&self, target: RadioMode) -> Result<(), Rf95Error> {
        let current = self.mode();
        if current == target {
            return Ok(());
        }
        self.observer.mode_will_change(current, target);
        self.hal.write_register(REG_01_OP_MODE, target.op_mode())?;
        if let Some(mapping) = target.dio_mapping() {
            self.hal
                .write_register(REG_40_DIO_MAPPING1, mapping.register_value())?;
        }
        self.store_mode(target);
        trace!("Mode {current:?} -> {target:?}");
        Ok(())
    }

    fn store_mode(&self, mode: RadioMode) {
        self.transitions.fetch_add(1, Ordering::AcqRel);
        self.mode.store(mode as u8, Ordering::Release);
    }

    // =========================================================================
    // Interrupt completion
    // =========================================================================

    /// Service a DIO0 interrupt
    ///
    /// Called by the platform (directly or through an [`InterruptRegistry`]) when
    /// the line rises. The returned event is also kept for [`Rf95::take_event`].
    pub fn handle_interrupt(&self) -> Result<InterruptEvent, Rf95Error> {
        let (mode, epoch, flags, hop_channel) = critical_section::with(|_| -> Result<_, Rf95Error> {
            let flags = IrqFlags::from_bits_retain(self.hal.read_register(REG_12_IRQ_FLAGS)?);
            let hop_channel = self.hal.read_register(REG_1C_HOP_CHANNEL)?;
            self.hal
                .write_register(REG_12_IRQ_FLAGS, IrqFlags::CLEAR_ALL)?;
            Ok((
                self.mode(),
                self.transitions.load(Ordering::Acquire),
                flags,
                hop_channel,
            ))
        })?;
        trace!("IRQ in {mode:?}: flags {flags:?}, hop channel 0x{hop_channel:02X}");

        let outcome = self.complete(mode, flags, hop_channel);

        // Some hosts need the flags cleared more than once before the line drops
        let cleared = self
            .clear_irq_flags()
            .and_then(|()| self.clear_irq_flags());
        let event = outcome?;
        cleared?;

        critical_section::with(|cs| self.last_event.borrow(cs).set(Some(event)));

        // Going idle releases mainline waiters, so it must follow the last clear
        if event.completes_operation() {
            self.finish_operation(mode, epoch)?;
        }
        Ok(event)
    }

    /// The most recent interrupt outcome, if not yet taken
    pub fn take_event(&self) -> Option<InterruptEvent> {
        critical_section::with(|cs| self.last_event.borrow(cs).take())
    }

    fn clear_irq_flags(&self) -> Result<(), Rf95Error> {
        self.hal
            .write_register(REG_12_IRQ_FLAGS, IrqFlags::CLEAR_ALL)?;
        Ok(())
    }

    fn complete(
        &self,
        mode: RadioMode,
        flags: IrqFlags,
        hop_channel: u8,
    ) -> Result<InterruptEvent, Rf95Error> {
        match mode {
            RadioMode::Rx => self.complete_rx(flags, hop_channel),
            RadioMode::Tx if flags.contains(IrqFlags::TX_DONE) => {
                self.stats.record_tx_good();
                debug!("TX done ({} sent)", self.stats.tx_good());
                Ok(InterruptEvent::TxDone)
            }
            RadioMode::Cad if flags.contains(IrqFlags::CAD_DONE) => {
                let detected = flags.contains(IrqFlags::CAD_DETECTED);
                self.cad_detected.store(detected, Ordering::Release);
                trace!("CAD done, activity {detected}");
                Ok(InterruptEvent::CadDone { detected })
            }
            _ => Ok(InterruptEvent::Ignored { mode, flags }),
        }
    }

    fn complete_rx(&self, flags: IrqFlags, hop_channel: u8) -> Result<InterruptEvent, Rf95Error> {
        let crc_missing =
            self.crc_enabled.load(Ordering::Acquire) && hop_channel & RX_PAYLOAD_CRC_IS_ON == 0;

        if flags.is_rx_failure() || crc_missing {
            let failure = if flags.contains(IrqFlags::RX_TIMEOUT) {
                RxFailure::Timeout
            } else if flags.contains(IrqFlags::PAYLOAD_CRC_ERROR) {
                RxFailure::CrcError
            } else {
                RxFailure::CrcMissing
            };
            self.stats.record_rx_bad();
            self.clear_rx_buf();
            self.log_bad_frame(failure);
            return Ok(InterruptEvent::RxBad(failure));
        }

        if !flags.contains(IrqFlags::RX_DONE) {
            return Ok(InterruptEvent::Ignored {
                mode: RadioMode::Rx,
                flags,
            });
        }

        let len = usize::from(self.hal.read_register(REG_13_RX_NB_BYTES)?);
        let current = self.hal.read_register(REG_10_FIFO_RX_CURRENT_ADDR)?;
        self.hal.write_register(REG_0D_FIFO_ADDR_PTR, current)?;
        let mut buf = [0u8; RF95_FIFO_SIZE];
        let len = len.min(buf.len());
        self.hal.burst_read(REG_00_FIFO, &mut buf[..len])?;

        let snr_db = snr_from_register(self.hal.read_register(REG_19_PKT_SNR_VALUE)?);
        let rssi_dbm = adjust_rssi(
            self.hal.read_register(REG_1A_PKT_RSSI_VALUE)?,
            snr_db,
            self.using_hf_port.load(Ordering::Acquire),
        );

        let mut staged = Frame::from_bytes(&buf[..len]);
        let validation = critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            rx.telemetry = Telemetry {
                last_rssi_dbm: rssi_dbm,
                last_snr_db: snr_db,
            };
            let validation = packet::validate(&mut staged, &self.filter, &self.stats);
            if let Validation::Accepted(header) = validation {
                rx.frame = staged;
                rx.last_header = header;
            }
            validation
        });

        match validation {
            Validation::Accepted(header) => {
                log_frame_hex("RX", &buf[..len]);
                debug!(
                    "RX {} bytes from 0x{:02X}, RSSI {rssi_dbm} dBm, SNR {snr_db} dB",
                    len, header.from
                );
                Ok(InterruptEvent::RxAccepted {
                    header,
                    len,
                    rssi_dbm,
                    snr_db,
                })
            }
            Validation::TooShort => {
                trace!("Dropped {len} byte frame shorter than header");
                Ok(InterruptEvent::RxRejected(RxRejection::TooShort { len }))
            }
            Validation::AddressMismatch(header) => {
                trace!("Dropped frame for 0x{:02X}", header.to);
                Ok(InterruptEvent::RxRejected(RxRejection::AddressMismatch(
                    header,
                )))
            }
        }
    }

    fn log_bad_frame(&self, failure: RxFailure) {
        let suppressed = critical_section::with(|cs| {
            let mut throttle = self.bad_frame_log.borrow_ref_mut(cs);
            throttle.allow().then(|| throttle.take_suppressed())
        });
        if let Some(suppressed) = suppressed {
            warn!(
                "Bad frame ({failure:?}), {} bad in total, {suppressed} warnings suppressed",
                self.stats.rx_bad()
            );
        }
    }

    // =========================================================================
    // Packet framing
    // =========================================================================

    /// True when a frame for this node is buffered
    ///
    /// Returns false while transmitting. Otherwise puts the radio into receive
    /// mode if it is not already there.
    pub fn available(&self) -> Result<bool, Rf95Error> {
        if self.mode() == RadioMode::Tx {
            return Ok(false);
        }
        self.set_mode_rx()?;
        Ok(critical_section::with(|cs| {
            self.rx.borrow_ref(cs).frame.is_valid()
        }))
    }

    /// Poll [`Rf95::available`] until a frame arrives or `timeout` elapses
    pub fn wait_available_timeout(&self, timeout: Duration) -> Result<bool, Rf95Error> {
        let start = Instant::now();
        loop {
            if self.available()? {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            self.hal.yield_now();
        }
    }

    /// Copy the buffered payload into `buf`
    ///
    /// Returns `None` without touching `buf` when nothing is buffered. Otherwise
    /// copies as much of the payload as fits, consumes the frame, and returns the
    /// number of bytes copied.
    pub fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, Rf95Error> {
        if !self.available()? {
            return Ok(None);
        }
        Ok(critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            if !rx.frame.is_valid() {
                return None;
            }
            let payload = rx.frame.payload();
            let n = payload.len().min(buf.len());
            buf[..n].copy_from_slice(&payload[..n]);
            rx.frame.clear();
            Some(n)
        }))
    }

    /// Take the buffered frame with its header and link quality
    pub fn recv_frame(&self) -> Result<Option<ReceivedFrame>, Rf95Error> {
        if !self.available()? {
            return Ok(None);
        }
        Ok(critical_section::with(|cs| {
            let mut rx = self.rx.borrow_ref_mut(cs);
            let header = rx.frame.header().filter(|_| rx.frame.is_valid())?;
            let received = ReceivedFrame {
                header,
                payload: rx.frame.payload().to_vec(),
                rssi_dbm: rx.telemetry.last_rssi_dbm,
                snr_db: rx.telemetry.last_snr_db,
            };
            rx.frame.clear();
            Some(received)
        }))
    }

    /// Discard the buffered frame
    pub fn clear_rx_buf(&self) {
        critical_section::with(|cs| self.rx.borrow_ref_mut(cs).frame.clear());
    }

    /// Queue `data` for transmission using the default timeout
    pub fn send(&self, data: &[u8]) -> Result<(), Rf95Error> {
        self.send_timeout(data, self.default_timeout())
    }

    /// Queue `data` for transmission
    ///
    /// Waits for any previous transmission, checks the channel when CAD before
    /// send is enabled, then loads the header and payload into the FIFO and
    /// starts transmitting. Returns as soon as transmission has started;
    /// completion is reported by the interrupt handler. `timeout` bounds each
    /// of the two waits; `None` waits indefinitely.
    pub fn send_timeout(&self, data: &[u8], timeout: Option<Duration>) -> Result<(), Rf95Error> {
        if data.len() > RF95_MAX_MESSAGE_LEN {
            return Err(Rf95Error::InvalidLength {
                len: data.len(),
                max: RF95_MAX_MESSAGE_LEN,
            });
        }

        self.wait_packet_sent(timeout)?;
        self.set_mode_idle()?;

        if self.cad_before_send.load(Ordering::Acquire) && self.is_channel_active_timeout(timeout)? {
            warn!("Channel busy, not transmitting {} bytes", data.len());
            return Err(Rf95Error::ChannelBusy);
        }

        let header = self.tx_header();
        self.hal.write_register(REG_0D_FIFO_ADDR_PTR, 0)?;
        self.hal.burst_write(REG_00_FIFO, &header.to_bytes())?;
        self.hal.burst_write(REG_00_FIFO, data)?;
        self.hal
            .write_register(REG_22_PAYLOAD_LENGTH, (data.len() + RF95_HEADER_LEN) as u8)?;
        self.set_mode_tx()?;

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "{} to 0x{:02X}",
                format_frame_hex("TX", data),
                header.to
            );
        }
        Ok(())
    }

    /// Block until no transmission is in progress
    pub fn wait_packet_sent(&self, timeout: Option<Duration>) -> Result<(), Rf95Error> {
        self.wait_while_mode(RadioMode::Tx, timeout, "transmit completion")
    }

    fn wait_while_mode(
        &self,
        mode: RadioMode,
        timeout: Option<Duration>,
        what: &'static str,
    ) -> Result<(), Rf95Error> {
        let start = Instant::now();
        while self.mode() == mode {
            if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                return Err(Rf95Error::Timeout(what));
            }
            self.hal.yield_now();
        }
        Ok(())
    }

    /// Largest payload `send` accepts
    pub fn max_message_length(&self) -> u8 {
        RF95_MAX_MESSAGE_LEN as u8
    }

    pub fn set_cad_before_send(&self, enabled: bool) {
        self.cad_before_send.store(enabled, Ordering::Release);
    }

    /// Timeout used by `send`; `None` waits indefinitely
    pub fn set_default_timeout(&self, timeout: Option<Duration>) {
        critical_section::with(|cs| self.default_timeout.borrow(cs).set(timeout));
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        critical_section::with(|cs| self.default_timeout.borrow(cs).get())
    }

    // =========================================================================
    // Addressing
    // =========================================================================

    fn update_tx_header(&self, update: impl FnOnce(&mut Header)) {
        critical_section::with(|cs| {
            let cell = self.tx_header.borrow(cs);
            let mut header = cell.get();
            update(&mut header);
            cell.set(header);
        });
    }

    pub fn tx_header(&self) -> Header {
        critical_section::with(|cs| self.tx_header.borrow(cs).get())
    }

    pub fn set_header_to(&self, to: u8) {
        self.update_tx_header(|h| h.to = to);
    }

    pub fn set_header_from(&self, from: u8) {
        self.update_tx_header(|h| h.from = from);
    }

    pub fn set_header_id(&self, id: u8) {
        self.update_tx_header(|h| h.id = id);
    }

    pub fn set_header_flags(&self, flags: u8) {
        self.update_tx_header(|h| h.flags = flags);
    }

    pub fn set_this_address(&self, address: u8) {
        self.filter.set_this_address(address);
    }

    pub fn this_address(&self) -> u8 {
        self.filter.this_address()
    }

    pub fn set_promiscuous(&self, promiscuous: bool) {
        self.filter.set_promiscuous(promiscuous);
    }

    /// Header of the last delivered frame
    pub fn last_header(&self) -> Header {
        critical_section::with(|cs| self.rx.borrow_ref(cs).last_header)
    }

    pub fn header_to(&self) -> u8 {
        self.last_header().to
    }

    pub fn header_from(&self) -> u8 {
        self.last_header().from
    }

    pub fn header_id(&self) -> u8 {
        self.last_header().id
    }

    pub fn header_flags(&self) -> u8 {
        self.last_header().flags
    }

    // =========================================================================
    // Statistics and diagnostics
    // =========================================================================

    pub fn rx_good(&self) -> u32 {
        self.stats.rx_good()
    }

    pub fn rx_bad(&self) -> u32 {
        self.stats.rx_bad()
    }

    pub fn tx_good(&self) -> u32 {
        self.stats.tx_good()
    }

    pub fn counters(&self) -> PacketCounters {
        self.stats.snapshot()
    }

    pub fn telemetry(&self) -> Telemetry {
        critical_section::with(|cs| self.rx.borrow_ref(cs).telemetry)
    }

    /// RSSI of the last received frame in dBm
    pub fn last_rssi(&self) -> i16 {
        self.telemetry().last_rssi_dbm
    }

    /// SNR of the last received frame in dB
    pub fn last_snr(&self) -> i8 {
        self.telemetry().last_snr_db
    }

    /// Run channel activity detection and wait for the result
    pub fn is_channel_active(&self) -> Result<bool, Rf95Error> {
        self.is_channel_active_timeout(None)
    }

    /// Like [`Rf95::is_channel_active`], giving up after `timeout`
    pub fn is_channel_active_timeout(&self, timeout: Option<Duration>) -> Result<bool, Rf95Error> {
        self.set_mode_cad()?;
        self.wait_while_mode(RadioMode::Cad, timeout, "channel activity detection")?;
        Ok(self.cad_detected.load(Ordering::Acquire))
    }

    /// Carrier frequency error of the last received frame, in Hz
    pub fn frequency_error(&self) -> Result<i32, Rf95Error> {
        let raw = frequency_error_raw(
            self.hal.read_register(REG_28_FREQ_ERROR_MSB)?,
            self.hal.read_register(REG_29_FREQ_ERROR_MID)?,
            self.hal.read_register(REG_2A_FREQ_ERROR_LSB)?,
        );
        let bandwidth = Bandwidth::from_register(self.hal.read_register(REG_1D_MODEM_CONFIG1)?);
        Ok(frequency_error_hz(raw, bandwidth))
    }

    /// Silicon revision from `RegVersion`
    pub fn device_version(&self) -> Result<u8, Rf95Error> {
        Ok(self.hal.read_register(REG_42_VERSION)?)
    }

    // =========================================================================
    // Modem configuration
    // =========================================================================

    /// Settings as last applied through this driver
    pub fn modem_config(&self) -> ModemConfig {
        critical_section::with(|cs| self.modem.borrow(cs).get())
    }

    fn update_modem(&self, update: impl FnOnce(&mut ModemConfig)) {
        critical_section::with(|cs| {
            let cell = self.modem.borrow(cs);
            let mut config = cell.get();
            update(&mut config);
            cell.set(config);
        });
    }

    fn modify_register(&self, addr: u8, mask: u8, bits: u8) -> Result<(), Rf95Error> {
        let value = self.hal.read_register(addr)?;
        self.hal
            .write_register(addr, (value & !mask) | (bits & mask))?;
        Ok(())
    }

    pub fn apply_preset(&self, preset: ModemPreset) -> Result<(), Rf95Error> {
        debug!("Applying modem preset {preset}");
        self.apply_modem_registers(preset.registers())
    }

    /// Apply a preset by table index; indices past the table are rejected
    pub fn apply_preset_index(&self, index: u8) -> Result<(), Rf95Error> {
        self.apply_preset(ModemPreset::try_from(index)?)
    }

    /// Write raw `ModemConfig1/2/3` values
    pub fn apply_modem_registers(&self, regs: ModemRegisters) -> Result<(), Rf95Error> {
        self.hal.write_register(REG_1D_MODEM_CONFIG1, regs.config1)?;
        self.hal.write_register(REG_1E_MODEM_CONFIG2, regs.config2)?;
        self.hal.write_register(REG_26_MODEM_CONFIG3, regs.config3)?;
        self.crc_enabled
            .store(regs.config2 & PAYLOAD_CRC_ON != 0, Ordering::Release);
        self.update_modem(|m| m.apply_registers(regs));
        Ok(())
    }

    /// Set the spreading factor, clamped to 6..=12
    pub fn set_spreading_factor(&self, sf: u8) -> Result<(), Rf95Error> {
        let sf = SpreadingFactor::clamped(sf);
        self.modify_register(REG_1E_MODEM_CONFIG2, SPREADING_FACTOR_MASK, sf.register_bits())?;
        self.update_modem(|m| m.spreading_factor = sf);
        self.set_low_data_rate_optimization()
    }

    /// Set the bandwidth to the first supported step at or above `hz`
    pub fn set_signal_bandwidth(&self, hz: u32) -> Result<(), Rf95Error> {
        let bandwidth = Bandwidth::from_hz(hz);
        self.modify_register(REG_1D_MODEM_CONFIG1, BW_MASK, bandwidth.register_bits())?;
        self.update_modem(|m| m.bandwidth = bandwidth);
        self.set_low_data_rate_optimization()
    }

    /// Set the coding rate to 4/`denominator`
    pub fn set_coding_rate_denominator(&self, denominator: u8) -> Result<(), Rf95Error> {
        let rate = CodingRate::from_denominator(denominator);
        self.modify_register(REG_1D_MODEM_CONFIG1, CODING_RATE_MASK, rate.register_bits())?;
        self.update_modem(|m| m.coding_rate = rate);
        Ok(())
    }

    /// Set or clear low data rate optimization from the chip's current bandwidth and SF
    pub fn set_low_data_rate_optimization(&self) -> Result<(), Rf95Error> {
        let config1 = self.hal.read_register(REG_1D_MODEM_CONFIG1)?;
        let config2 = self.hal.read_register(REG_1E_MODEM_CONFIG2)?;
        let sf = SpreadingFactor::clamped(config2 >> 4);
        let enable = Bandwidth::from_register(config1)
            .is_some_and(|bw| low_data_rate_optimize(bw, sf));

        let bits = if enable { LOW_DATA_RATE_OPTIMIZE } else { 0 };
        self.modify_register(REG_26_MODEM_CONFIG3, LOW_DATA_RATE_OPTIMIZE, bits)?;
        self.update_modem(|m| m.low_data_rate_optimize = enable);
        trace!("Low data rate optimization {enable}");
        Ok(())
    }

    /// Enable the payload CRC; received frames without one are then dropped
    pub fn set_payload_crc(&self, on: bool) -> Result<(), Rf95Error> {
        let bits = if on { PAYLOAD_CRC_ON } else { 0 };
        self.modify_register(REG_1E_MODEM_CONFIG2, PAYLOAD_CRC_ON, bits)?;
        self.crc_enabled.store(on, Ordering::Release);
        self.update_modem(|m| m.payload_crc = on);
        Ok(())
    }

    /// Set output power on the RFO pin (`use_rfo`) or PA_BOOST
    pub fn set_tx_power(&self, dbm: i8, use_rfo: bool) -> Result<(), Rf95Error> {
        let setting = TxPowerSetting::encode(dbm, use_rfo);
        self.hal.write_register(REG_4D_PA_DAC, setting.pa_dac)?;
        self.hal.write_register(REG_09_PA_CONFIG, setting.pa_config)?;
        self.update_modem(|m| {
            m.tx_power_dbm = setting.dbm;
            m.use_rfo = use_rfo;
        });
        debug!(
            "TX power {} dBm on {}",
            setting.dbm,
            if use_rfo { "RFO" } else { "PA_BOOST" }
        );
        Ok(())
    }

    /// Tune to `centre_mhz`
    pub fn set_frequency(&self, centre_mhz: f64) -> Result<(), Rf95Error> {
        let frf = frequency_word(centre_mhz)?;
        let [msb, mid, lsb] = frequency_bytes(frf);
        self.hal.write_register(REG_06_FRF_MSB, msb)?;
        self.hal.write_register(REG_07_FRF_MID, mid)?;
        self.hal.write_register(REG_08_FRF_LSB, lsb)?;
        self.using_hf_port
            .store(uses_hf_port(centre_mhz), Ordering::Release);
        self.update_modem(|m| m.frequency_mhz = centre_mhz);
        debug!("Frequency {centre_mhz} MHz (FRF 0x{frf:06X})");
        Ok(())
    }

    pub fn set_preamble_length(&self, symbols: u16) -> Result<(), Rf95Error> {
        let [msb, lsb] = symbols.to_be_bytes();
        self.hal.write_register(REG_20_PREAMBLE_MSB, msb)?;
        self.hal.write_register(REG_21_PREAMBLE_LSB, lsb)?;
        self.update_modem(|m| m.preamble_length = symbols);
        Ok(())
    }

    /// Select the TCXO (`on`) or crystal clock input
    ///
    /// The selection only takes effect in sleep, so this cycles the chip into
    /// sleep until `RegTcxo` reads back as requested. The chip is left asleep.
    pub fn enable_tcxo(&self, on: bool, timeout: Option<Duration>) -> Result<(), Rf95Error> {
        let start = Instant::now();
        loop {
            let value = self.hal.read_register(REG_4B_TCXO)?;
            if (value & TCXO_TCXO_INPUT_ON != 0) == on {
                debug!("TCXO input {}", if on { "enabled" } else { "disabled" });
                return Ok(());
            }
            if timeout.is_some_and(|limit| start.elapsed() >= limit) {
                return Err(Rf95Error::Timeout("TCXO input selection"));
            }
            self.sleep()?;
            let value = self.hal.read_register(REG_4B_TCXO)?;
            let value = if on {
                value | TCXO_TCXO_INPUT_ON
            } else {
                value & !TCXO_TCXO_INPUT_ON
            };
            self.hal.write_register(REG_4B_TCXO, value)?;
            self.hal.yield_now();
        }
    }
}

impl<H, O> InterruptHandler for Rf95<H, O>
where
    H: Hal + Send + Sync,
    O: ModeObserver + Send + Sync,
{
    fn on_interrupt(&self) {
        if let Err(e) = self.handle_interrupt() {
            log::error!("RF95 interrupt handling failed: {e}");
        }
    }
}

impl<H, O> Rf95<H, O>
where
    H: Hal + Send + Sync + 'static,
    O: ModeObserver + Send + Sync + 'static,
{
    /// Register this driver with `registry`
    ///
    /// Repeated calls with the same registry return the slot claimed the first
    /// time. A driver holds at most one slot: attaching to a second registry
    /// fails with [`Rf95Error::AlreadyAttached`] until [`Rf95::detach`].
    pub fn attach(self: &Arc<Self>, registry: &InterruptRegistry) -> Result<SlotId, Rf95Error> {
        let slot = critical_section::with(|cs| {
            let attachment = self.attachment.borrow(cs);
            match attachment.get() {
                Some(held) if held.registry == registry.id() => return Ok(held.slot),
                Some(held) => return Err(Rf95Error::AlreadyAttached { slot: held.slot }),
                None => {}
            }
            let handler: Arc<dyn InterruptHandler> = Arc::clone(self) as Arc<dyn InterruptHandler>;
            let slot = registry.register(handler)?;
            attachment.set(Some(Attachment {
                registry: registry.id(),
                slot,
            }));
            Ok(slot)
        })?;
        info!("RF95 attached to interrupt {slot}");
        Ok(slot)
    }

    /// Release the slot held in `registry`; false if not attached there
    pub fn detach(&self, registry: &InterruptRegistry) -> bool {
        critical_section::with(|cs| {
            let attachment = self.attachment.borrow(cs);
            match attachment.get() {
                Some(held) if held.registry == registry.id() => {
                    attachment.set(None);
                    registry.unregister(held.slot)
                }
                _ => false,
            }
        })
    }

    /// Slot assigned by [`Rf95::attach`]
    pub fn slot(&self) -> Option<SlotId> {
        critical_section::with(|cs| self.attachment.borrow(cs).get().map(|held| held.slot))
    }
}
