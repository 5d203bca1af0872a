//! Minimal MFRC522 RFID front-end driver over `embedded-hal` SPI.
//!
//! Covers only what a door lock needs: wake a card with REQA and read its
//! cascade-level-1 UID (4 bytes, BCC-checked). No SELECT, no authentication,
//! no block reads.

use embedded_hal::spi::SpiDevice;
use log::{debug, info};

// Registers (datasheet section 9).
const COMMAND_REG: u8 = 0x01;
const COM_IRQ_REG: u8 = 0x04;
const ERROR_REG: u8 = 0x06;
const FIFO_DATA_REG: u8 = 0x09;
const FIFO_LEVEL_REG: u8 = 0x0A;
const BIT_FRAMING_REG: u8 = 0x0D;
const COLL_REG: u8 = 0x0E;
const MODE_REG: u8 = 0x11;
const TX_CONTROL_REG: u8 = 0x14;
const TX_ASK_REG: u8 = 0x15;
const T_MODE_REG: u8 = 0x2A;
const T_PRESCALER_REG: u8 = 0x2B;
const T_RELOAD_REG_H: u8 = 0x2C;
const T_RELOAD_REG_L: u8 = 0x2D;
pub(crate) const VERSION_REG: u8 = 0x37;

// PCD commands.
const CMD_IDLE: u8 = 0x00;
pub(crate) const CMD_TRANSCEIVE: u8 = 0x0C;
const CMD_SOFT_RESET: u8 = 0x0F;

// PICC commands.
pub(crate) const PICC_REQA: u8 = 0x26;
pub(crate) const PICC_ANTICOLL_CL1: u8 = 0x93;

const IRQ_RX: u8 = 0x20;
const IRQ_IDLE: u8 = 0x10;
const IRQ_TIMER: u8 = 0x01;
/// BufferOvfl | ParityErr | ProtocolErr.
const ERROR_MASK: u8 = 0x13;
const START_SEND: u8 = 0x80;

/// Upper bound on IRQ polls per transceive; the chip timer (25 ms) fires first.
const MAX_IRQ_POLLS: u16 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfidError {
    Spi,
    /// VersionReg did not read as an MFRC522.
    NotDetected(u8),
    /// No card answered before the chip timer expired.
    Timeout,
    /// Framing, parity or buffer error reported by the chip.
    Protocol(u8),
    /// UID check byte mismatch.
    Checksum,
    /// Card answered with an unexpected number of bytes.
    ShortFrame(usize),
}

pub struct Mfrc522<D: SpiDevice> {
    spi: D,
}

impl<D: SpiDevice> Mfrc522<D> {
    /// Reset the chip, check its version, and switch the antenna on.
    pub fn new(spi: D) -> Result<Self, RfidError> {
        let mut chip = Self { spi };
        chip.write(COMMAND_REG, CMD_SOFT_RESET)?;

        let version = chip.read(VERSION_REG)?;
        if !matches!(version, 0x88 | 0x90 | 0x91 | 0x92 | 0x12) {
            return Err(RfidError::NotDetected(version));
        }

        // 25 ms receive timeout, 100% ASK, CRC preset 0x6363.
        chip.write(T_MODE_REG, 0x8D)?;
        chip.write(T_PRESCALER_REG, 0x3E)?;
        chip.write(T_RELOAD_REG_L, 30)?;
        chip.write(T_RELOAD_REG_H, 0)?;
        chip.write(TX_ASK_REG, 0x40)?;
        chip.write(MODE_REG, 0x3D)?;

        let tx = chip.read(TX_CONTROL_REG)?;
        if tx & 0x03 != 0x03 {
            chip.write(TX_CONTROL_REG, tx | 0x03)?;
        }
        info!("rfid: MFRC522 version 0x{:02X} ready", version);
        Ok(chip)
    }

    /// UID of a card in the field, if one answers.
    pub fn read_uid(&mut self) -> Result<[u8; 4], RfidError> {
        let mut atqa = [0u8; 2];
        let n = self.transceive(&[PICC_REQA], 7, &mut atqa)?;
        if n != 2 {
            return Err(RfidError::ShortFrame(n));
        }

        // Clear ValuesAfterColl so collisions are reported.
        let coll = self.read(COLL_REG)?;
        self.write(COLL_REG, coll & !0x80)?;

        let mut frame = [0u8; 5];
        let n = self.transceive(&[PICC_ANTICOLL_CL1, 0x20], 0, &mut frame)?;
        if n != 5 {
            return Err(RfidError::ShortFrame(n));
        }
        let uid = [frame[0], frame[1], frame[2], frame[3]];
        if uid.iter().fold(0u8, |acc, b| acc ^ b) != frame[4] {
            return Err(RfidError::Checksum);
        }
        debug!("rfid: uid {:02X?}", uid);
        Ok(uid)
    }

    fn transceive(&mut self, tx: &[u8], last_bits: u8, rx: &mut [u8]) -> Result<usize, RfidError> {
        self.write(COMMAND_REG, CMD_IDLE)?;
        self.write(COM_IRQ_REG, 0x7F)?;
        self.write(FIFO_LEVEL_REG, 0x80)?;
        for &byte in tx {
            self.write(FIFO_DATA_REG, byte)?;
        }
        self.write(BIT_FRAMING_REG, last_bits & 0x07)?;
        self.write(COMMAND_REG, CMD_TRANSCEIVE)?;
        self.write(BIT_FRAMING_REG, (last_bits & 0x07) | START_SEND)?;

        let mut irq = 0;
        for _ in 0..MAX_IRQ_POLLS {
            irq = self.read(COM_IRQ_REG)?;
            if irq & (IRQ_RX | IRQ_IDLE | IRQ_TIMER) != 0 {
                break;
            }
        }
        self.write(BIT_FRAMING_REG, last_bits & 0x07)?;

        if irq & (IRQ_RX | IRQ_IDLE) == 0 {
            return Err(RfidError::Timeout);
        }
        let err = self.read(ERROR_REG)?;
        if err & ERROR_MASK != 0 {
            return Err(RfidError::Protocol(err));
        }

        let level = usize::from(self.read(FIFO_LEVEL_REG)? & 0x7F);
        let n = level.min(rx.len());
        for slot in rx.iter_mut().take(n) {
            *slot = self.read(FIFO_DATA_REG)?;
        }
        Ok(level)
    }

    fn read(&mut self, reg: u8) -> Result<u8, RfidError> {
        let mut buf = [((reg << 1) & 0x7E) | 0x80, 0];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(|_| RfidError::Spi)?;
        Ok(buf[1])
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), RfidError> {
        self.spi
            .write(&[(reg << 1) & 0x7E, value])
            .map_err(|_| RfidError::Spi)
    }
}
