//! Flash record slot for RP2040
//!
//! The configuration record lives alone in the last 4 KB erase sector of
//! the 2 MB QSPI flash. `memory.x` keeps the program image out of that
//! sector. Every write erases the sector and programs the record from its
//! start; there is no wear leveling.
//!
//! Implements the `RecordSlot` trait from `saccade-hal`.

use embassy_rp::flash::{Blocking, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;

use saccade_hal::{RecordSlot, StorageError};

/// Flash size on the Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Record slot size, one erase sector
pub const SLOT_SIZE: usize = ERASE_SIZE;

/// Offset of the record slot from the start of flash
pub const SLOT_OFFSET: u32 = (FLASH_SIZE - SLOT_SIZE) as u32;

/// Program page size; the record must fit one page
pub const PAGE_SIZE: usize = 256;

/// RP2040 flash record slot
pub struct Rp2040RecordSlot<'d> {
    flash: Flash<'d, FLASH, Blocking, FLASH_SIZE>,
}

impl<'d> Rp2040RecordSlot<'d> {
    /// Create a record slot on the flash peripheral
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }
}

impl<'d> RecordSlot for Rp2040RecordSlot<'d> {
    fn capacity(&self) -> usize {
        PAGE_SIZE
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), StorageError> {
        if buffer.len() > PAGE_SIZE {
            return Err(StorageError::TooLarge);
        }
        self.flash
            .blocking_read(SLOT_OFFSET, buffer)
            .map_err(|_| StorageError::Device)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > PAGE_SIZE {
            return Err(StorageError::TooLarge);
        }

        // Erased flash reads 0xFF; pad the page with the same
        let mut page = [0xFFu8; PAGE_SIZE];
        page[..data.len()].copy_from_slice(data);

        self.flash
            .blocking_erase(SLOT_OFFSET, SLOT_OFFSET + SLOT_SIZE as u32)
            .map_err(|_| StorageError::Device)?;
        self.flash
            .blocking_write(SLOT_OFFSET, &page)
            .map_err(|_| StorageError::Device)
    }
}
