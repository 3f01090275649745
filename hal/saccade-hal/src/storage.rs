//! Persistent record storage
//!
//! The controller keeps exactly one configuration record. There is no
//! key-value map, no wear leveling and no history: a slot is read whole
//! and rewritten whole.

/// Errors from record slot operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Underlying flash/EEPROM operation failed
    Device,
    /// Requested length exceeds the slot capacity
    TooLarge,
}

/// A single fixed-size persistence slot
///
/// Implementations are blocking: persistence only happens at startup or on
/// an explicit command, never inside the motion tick.
pub trait RecordSlot {
    /// Capacity of the slot in bytes
    fn capacity(&self) -> usize;

    /// Read `buffer.len()` bytes from the start of the slot
    ///
    /// A slot that was never written returns whatever the erased medium
    /// holds; validating the content is the caller's job.
    fn read(&mut self, buffer: &mut [u8]) -> Result<(), StorageError>;

    /// Replace the slot content with `data` in one pass
    ///
    /// There is no partial-write protection. A write interrupted by power
    /// loss leaves a record that fails validation on the next read.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

impl<T: RecordSlot + ?Sized> RecordSlot for &mut T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), StorageError> {
        (**self).read(buffer)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(data)
    }
}
