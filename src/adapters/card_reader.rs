//! Card reader adapter.
//!
//! Implements [`CardReaderPort`] on top of the MFRC522 driver. A card held
//! in the field is reported once; it is reported again only after it has
//! been absent for [`ABSENT_POLLS`] consecutive polls.

use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::{CardReaderPort, CardUid};
use crate::drivers::mfrc522::{Mfrc522, RfidError};

/// Misses before the last card is forgotten. A card left in the field
/// alternates between answering and not (REQA only wakes idle cards).
const ABSENT_POLLS: u8 = 3;

pub struct CardReader<D: SpiDevice> {
    chip: Option<Mfrc522<D>>,
    last: Option<[u8; 4]>,
    misses: u8,
}

impl<D: SpiDevice> CardReader<D> {
    pub fn new(chip: Mfrc522<D>) -> Self {
        Self {
            chip: Some(chip),
            last: None,
            misses: 0,
        }
    }

    /// Reader that never reports a card (chip missing at boot).
    pub fn absent() -> Self {
        Self {
            chip: None,
            last: None,
            misses: 0,
        }
    }
}

impl<D: SpiDevice> CardReaderPort for CardReader<D> {
    fn poll_card(&mut self) -> Option<CardUid> {
        let chip = self.chip.as_mut()?;
        match chip.read_uid() {
            Ok(uid) => {
                self.misses = 0;
                if self.last == Some(uid) {
                    return None;
                }
                self.last = Some(uid);
                CardUid::from_slice(&uid).ok()
            }
            Err(e) => {
                if matches!(e, RfidError::Spi) {
                    warn!("rfid: SPI error while polling");
                }
                self.misses = self.misses.saturating_add(1);
                if self.misses >= ABSENT_POLLS {
                    self.last = None;
                }
                None
            }
        }
    }
}
