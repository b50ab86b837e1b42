//! Simulated SX127x for testing
//!
//! [`MockChip`] implements [`Hal`] over an in-memory register file and FIFO so the
//! driver core can be exercised without hardware. It models the parts of the chip
//! the driver depends on: FIFO pointer auto-increment, write-1-to-clear IRQ flags,
//! DIO0 mapping, LoRa mode latching in sleep and TX/CAD completion.

use super::{Hal, HalError};
use crate::radio::irq::{DioMapping, IrqFlags};
use crate::radio::registers::*;
use std::sync::{Mutex, MutexGuard};

/// Silicon revision reported by SX1276 parts
pub const MOCK_SILICON_VERSION: u8 = 0x12;

#[derive(Debug)]
struct ChipState {
    regs: [u8; 0x80],
    fifo: [u8; 256],
    responsive: bool,
    auto_complete: bool,
    channel_busy: bool,
    fail_next: Option<HalError>,
    writes: Vec<(u8, u8)>,
    transmitted: Vec<Vec<u8>>,
}

impl ChipState {
    fn reset() -> Self {
        let mut regs = [0u8; 0x80];
        regs[REG_01_OP_MODE as usize] = 0x09;
        regs[REG_06_FRF_MSB as usize] = 0x6C;
        regs[REG_07_FRF_MID as usize] = 0x80;
        regs[REG_09_PA_CONFIG as usize] = 0x4F;
        regs[REG_0E_FIFO_TX_BASE_ADDR as usize] = 0x80;
        regs[REG_1D_MODEM_CONFIG1 as usize] = 0x72;
        regs[REG_1E_MODEM_CONFIG2 as usize] = 0x70;
        regs[REG_21_PREAMBLE_LSB as usize] = 0x08;
        regs[REG_22_PAYLOAD_LENGTH as usize] = 0x01;
        regs[REG_23_MAX_PAYLOAD_LENGTH as usize] = 0xFF;
        regs[REG_42_VERSION as usize] = MOCK_SILICON_VERSION;
        regs[REG_4B_TCXO as usize] = 0x09;
        regs[REG_4D_PA_DAC as usize] = 0x84;

        Self {
            regs,
            fifo: [0u8; 256],
            responsive: true,
            auto_complete: true,
            channel_busy: false,
            fail_next: None,
            writes: Vec::new(),
            transmitted: Vec::new(),
        }
    }

    fn reg(&self, addr: u8) -> u8 {
        self.regs[(addr & 0x7F) as usize]
    }

    fn set_reg(&mut self, addr: u8, value: u8) {
        self.regs[(addr & 0x7F) as usize] = value;
    }

    fn irq_flags(&self) -> IrqFlags {
        IrqFlags::from_bits_retain(self.reg(REG_12_IRQ_FLAGS))
    }

    fn raise(&mut self, flags: IrqFlags) {
        let current = self.irq_flags() | flags;
        self.set_reg(REG_12_IRQ_FLAGS, current.bits());
    }

    fn take_failure(&mut self) -> Result<(), HalError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn write_op_mode(&mut self, value: u8) {
        let current = self.reg(REG_01_OP_MODE);
        // LongRangeMode only latches on a write that is in, or enters, sleep
        let in_sleep = current & MODE_MASK == MODE_SLEEP || value & MODE_MASK == MODE_SLEEP;
        let lora = if in_sleep {
            value & LONG_RANGE_MODE
        } else {
            current & LONG_RANGE_MODE
        };
        let latched = (value & !LONG_RANGE_MODE) | lora;
        self.set_reg(REG_01_OP_MODE, latched);

        if !self.auto_complete {
            return;
        }
        match latched & MODE_MASK {
            MODE_TX => self.finish_tx(),
            MODE_CAD => {
                let busy = self.channel_busy;
                self.finish_cad(busy);
            }
            _ => {}
        }
    }

    fn write_tcxo(&mut self, value: u8) {
        // XTA/XTB input selection is only taken in sleep mode
        if self.reg(REG_01_OP_MODE) & MODE_MASK == MODE_SLEEP {
            self.set_reg(REG_4B_TCXO, value);
        }
    }

    fn finish_tx(&mut self) {
        let base = self.reg(REG_0E_FIFO_TX_BASE_ADDR) as usize;
        let len = self.reg(REG_22_PAYLOAD_LENGTH) as usize;
        let frame = (0..len).map(|i| self.fifo[(base + i) & 0xFF]).collect();
        self.transmitted.push(frame);
        self.set_reg(REG_01_OP_MODE, (self.reg(REG_01_OP_MODE) & !MODE_MASK) | MODE_STDBY);
        self.raise(IrqFlags::TX_DONE);
    }

    fn finish_cad(&mut self, detected: bool) {
        self.set_reg(REG_01_OP_MODE, (self.reg(REG_01_OP_MODE) & !MODE_MASK) | MODE_STDBY);
        let mut flags = IrqFlags::CAD_DONE;
        if detected {
            flags |= IrqFlags::CAD_DETECTED;
        }
        self.raise(flags);
    }
}

/// In-memory SX127x implementing [`Hal`]
#[derive(Debug)]
pub struct MockChip {
    state: Mutex<ChipState>,
}

impl Default for MockChip {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChip {
    /// Create a chip with datasheet reset values
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChipState::reset()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Peek a register without recording an access
    pub fn register(&self, addr: u8) -> u8 {
        self.state().reg(addr)
    }

    /// Poke a register directly, bypassing the chip's write side effects
    pub fn set_register(&self, addr: u8, value: u8) {
        self.state().set_reg(addr, value);
    }

    /// When `false` every read returns 0x00 and writes are dropped, as with no chip on the bus
    pub fn set_responsive(&self, responsive: bool) {
        self.state().responsive = responsive;
    }

    /// Complete TX and CAD immediately when the mode is entered (default `true`)
    pub fn set_auto_complete(&self, auto_complete: bool) {
        self.state().auto_complete = auto_complete;
    }

    /// Whether an automatically completed CAD reports activity
    pub fn set_channel_busy(&self, busy: bool) {
        self.state().channel_busy = busy;
    }

    /// Fail the next bus access with `err`
    pub fn fail_next(&self, err: HalError) {
        self.state().fail_next = Some(err);
    }

    /// Finish a transmission started while auto-complete was off
    pub fn complete_tx(&self) {
        self.state().finish_tx();
    }

    /// Finish a CAD started while auto-complete was off
    pub fn complete_cad(&self, detected: bool) {
        self.state().finish_cad(detected);
    }

    /// Place a received packet in the FIFO and raise RxDone
    ///
    /// `snr_raw` and `rssi_raw` are the raw register values; `crc_on` is the
    /// CRC-on-payload indication carried by the packet's LoRa header.
    pub fn inject_rx(&self, packet: &[u8], snr_raw: i8, rssi_raw: u8, crc_on: bool) {
        let mut state = self.state();
        let addr = state.reg(REG_0F_FIFO_RX_BASE_ADDR);
        for (i, byte) in packet.iter().enumerate() {
            state.fifo[(addr as usize + i) & 0xFF] = *byte;
        }
        state.set_reg(REG_10_FIFO_RX_CURRENT_ADDR, addr);
        state.set_reg(REG_13_RX_NB_BYTES, packet.len().min(0xFF) as u8);
        state.set_reg(REG_19_PKT_SNR_VALUE, snr_raw as u8);
        state.set_reg(REG_1A_PKT_RSSI_VALUE, rssi_raw);
        state.set_reg(REG_1C_HOP_CHANNEL, if crc_on { RX_PAYLOAD_CRC_IS_ON } else { 0 });
        state.raise(IrqFlags::RX_DONE | IrqFlags::VALID_HEADER);
    }

    /// Raise arbitrary IRQ flags, e.g. a payload CRC error alongside RxDone
    pub fn raise_irq(&self, flags: IrqFlags) {
        self.state().raise(flags);
    }

    /// Load the 20-bit frequency error estimate registers
    pub fn set_frequency_error_raw(&self, raw: u32) {
        let mut state = self.state();
        state.set_reg(REG_28_FREQ_ERROR_MSB, ((raw >> 16) & 0x0F) as u8);
        state.set_reg(REG_29_FREQ_ERROR_MID, (raw >> 8) as u8);
        state.set_reg(REG_2A_FREQ_ERROR_LSB, raw as u8);
    }

    /// State of the DIO0 line given the current mapping and IRQ flags
    pub fn irq_line(&self) -> bool {
        let state = self.state();
        DioMapping::from_register(state.reg(REG_40_DIO_MAPPING1))
            .is_some_and(|mapping| state.irq_flags().contains(mapping.flag()))
    }

    /// Every single-register write in order
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state().writes.clone()
    }

    /// Writes to one register in order
    pub fn writes_to(&self, addr: u8) -> Vec<u8> {
        self.state()
            .writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Frames (header included) that completed transmission, oldest first
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state().transmitted.clone()
    }

    /// Drain the transmitted frames
    pub fn take_transmitted(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state().transmitted)
    }
}

/// Move the oldest frame transmitted by `from` into `to`'s FIFO
///
/// Nothing is moved while `to` still has an unserviced RxDone. The CRC-on flag
/// of the delivered header follows `from`'s payload CRC setting. Returns true
/// when a frame was delivered.
pub fn relay(from: &MockChip, to: &MockChip, snr_raw: i8, rssi_raw: u8) -> bool {
    if to.register(REG_12_IRQ_FLAGS) & IrqFlags::RX_DONE.bits() != 0 {
        return false;
    }
    let frame = {
        let mut state = from.state();
        if state.transmitted.is_empty() {
            return false;
        }
        state.transmitted.remove(0)
    };
    let crc_on = from.register(REG_1E_MODEM_CONFIG2) & PAYLOAD_CRC_ON != 0;
    to.inject_rx(&frame, snr_raw, rssi_raw, crc_on);
    true
}

impl Hal for MockChip {
    fn read_register(&self, addr: u8) -> Result<u8, HalError> {
        let mut state = self.state();
        state.take_failure()?;
        if !state.responsive {
            return Ok(0x00);
        }
        if addr & 0x7F == REG_00_FIFO {
            let ptr = state.reg(REG_0D_FIFO_ADDR_PTR);
            state.set_reg(REG_0D_FIFO_ADDR_PTR, ptr.wrapping_add(1));
            return Ok(state.fifo[ptr as usize]);
        }
        Ok(state.reg(addr))
    }

    fn write_register(&self, addr: u8, value: u8) -> Result<(), HalError> {
        let mut state = self.state();
        state.take_failure()?;
        state.writes.push((addr & 0x7F, value));
        if !state.responsive {
            return Ok(());
        }
        match addr & 0x7F {
            REG_00_FIFO => {
                let ptr = state.reg(REG_0D_FIFO_ADDR_PTR);
                state.fifo[ptr as usize] = value;
                state.set_reg(REG_0D_FIFO_ADDR_PTR, ptr.wrapping_add(1));
            }
            REG_01_OP_MODE => state.write_op_mode(value),
            REG_12_IRQ_FLAGS => {
                let cleared = state.reg(REG_12_IRQ_FLAGS) & !value;
                state.set_reg(REG_12_IRQ_FLAGS, cleared);
            }
            REG_42_VERSION => {}
            REG_4B_TCXO => state.write_tcxo(value),
            other => state.set_reg(other, value),
        }
        Ok(())
    }

    fn burst_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), HalError> {
        for byte in buf.iter_mut() {
            *byte = self.read_register(addr)?;
        }
        Ok(())
    }

    fn burst_write(&self, addr: u8, data: &[u8]) -> Result<(), HalError> {
        let mut state = self.state();
        state.take_failure()?;
        if !state.responsive {
            return Ok(());
        }
        if addr & 0x7F == REG_00_FIFO {
            for byte in data {
                let ptr = state.reg(REG_0D_FIFO_ADDR_PTR);
                state.fifo[ptr as usize] = *byte;
                state.set_reg(REG_0D_FIFO_ADDR_PTR, ptr.wrapping_add(1));
            }
        } else {
            for (i, byte) in data.iter().enumerate() {
                state.set_reg(addr.wrapping_add(i as u8), *byte);
            }
        }
        Ok(())
    }

    fn delay_ms(&self, _ms: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_pointer_auto_increments() {
        let chip = MockChip::new();
        chip.write_register(REG_0D_FIFO_ADDR_PTR, 0x10).unwrap();
        chip.burst_write(REG_00_FIFO, &[1, 2, 3]).unwrap();
        assert_eq!(chip.register(REG_0D_FIFO_ADDR_PTR), 0x13);

        chip.write_register(REG_0D_FIFO_ADDR_PTR, 0x10).unwrap();
        let mut buf = [0u8; 3];
        chip.burst_read(REG_00_FIFO, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_irq_flags_write_one_to_clear() {
        let chip = MockChip::new();
        chip.raise_irq(IrqFlags::RX_DONE | IrqFlags::VALID_HEADER);
        chip.write_register(REG_12_IRQ_FLAGS, IrqFlags::RX_DONE.bits()).unwrap();
        assert_eq!(chip.register(REG_12_IRQ_FLAGS), IrqFlags::VALID_HEADER.bits());
    }

    #[test]
    fn test_long_range_mode_latches_only_in_sleep() {
        let chip = MockChip::new();
        chip.write_register(REG_01_OP_MODE, LONG_RANGE_MODE | MODE_STDBY).unwrap();
        assert_eq!(chip.register(REG_01_OP_MODE) & LONG_RANGE_MODE, 0);

        chip.write_register(REG_01_OP_MODE, MODE_SLEEP).unwrap();
        chip.write_register(REG_01_OP_MODE, LONG_RANGE_MODE | MODE_SLEEP).unwrap();
        assert_eq!(chip.register(REG_01_OP_MODE), LONG_RANGE_MODE | MODE_SLEEP);
    }

    #[test]
    fn test_irq_line_follows_dio_mapping() {
        let chip = MockChip::new();
        chip.raise_irq(IrqFlags::TX_DONE);
        chip.write_register(REG_40_DIO_MAPPING1, DIO0_RX_DONE).unwrap();
        assert!(!chip.irq_line());
        chip.write_register(REG_40_DIO_MAPPING1, DIO0_TX_DONE).unwrap();
        assert!(chip.irq_line());
    }

    #[test]
    fn test_relay_moves_one_frame_at_a_time() {
        let a = MockChip::new();
        let b = MockChip::new();
        a.write_register(REG_22_PAYLOAD_LENGTH, 5).unwrap();
        a.write_register(REG_0E_FIFO_TX_BASE_ADDR, 0).unwrap();
        a.write_register(REG_01_OP_MODE, MODE_TX).unwrap();
        a.write_register(REG_01_OP_MODE, MODE_TX).unwrap();
        assert_eq!(a.transmitted().len(), 2);

        assert!(relay(&a, &b, 20, 90));
        assert!(!relay(&a, &b, 20, 90));
        assert_eq!(b.register(REG_13_RX_NB_BYTES), 5);

        b.write_register(REG_12_IRQ_FLAGS, 0xFF).unwrap();
        assert!(relay(&a, &b, 20, 90));
        assert!(a.transmitted().is_empty());
    }

    #[test]
    fn test_injected_failure_is_returned_once() {
        let chip = MockChip::new();
        chip.fail_next(HalError::Spi);
        assert_eq!(chip.read_register(REG_42_VERSION), Err(HalError::Spi));
        assert_eq!(chip.read_register(REG_42_VERSION), Ok(MOCK_SILICON_VERSION));
    }
}
