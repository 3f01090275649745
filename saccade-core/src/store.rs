//! Config store
//!
//! Owns the record slot and moves [`ServoConfig`] in and out of it. The
//! store is touched at startup and on explicit SAVE/LOAD/RESETCFG only.

use saccade_hal::{RecordSlot, StorageError};

use crate::config::{InvalidRecord, ServoConfig, RECORD_SIZE};

/// Config store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Slot read or write failed
    Storage(StorageError),
    /// Slot content is not a trustworthy record
    Invalid(InvalidRecord),
}

impl StoreError {
    /// Short reason used in `ERR` replies
    pub const fn reason(self) -> &'static str {
        match self {
            StoreError::Storage(StorageError::Device) => "storage device error",
            StoreError::Storage(StorageError::TooLarge) => "storage slot too small",
            StoreError::Invalid(invalid) => invalid.reason(),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(e: StorageError) -> Self {
        StoreError::Storage(e)
    }
}

impl From<InvalidRecord> for StoreError {
    fn from(e: InvalidRecord) -> Self {
        StoreError::Invalid(e)
    }
}

/// Where the boot configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigOrigin {
    /// The stored record was valid
    Stored,
    /// Defaults replaced an unusable record
    Defaults {
        /// Why the stored record was rejected
        reason: StoreError,
        /// Set if writing the defaults back failed too
        persist_error: Option<StorageError>,
    },
}

/// Record persistence on top of a [`RecordSlot`]
pub struct ConfigStore<S> {
    slot: S,
}

impl<S: RecordSlot> ConfigStore<S> {
    /// Wrap a record slot
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    /// Underlying slot
    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Underlying slot, mutable
    pub fn slot_mut(&mut self) -> &mut S {
        &mut self.slot
    }

    /// Release the underlying slot
    pub fn into_inner(self) -> S {
        self.slot
    }

    /// Compiled defaults
    pub fn defaults() -> ServoConfig {
        ServoConfig::new()
    }

    /// Read and validate the stored record
    pub fn load(&mut self) -> Result<ServoConfig, StoreError> {
        let mut bytes = [0u8; RECORD_SIZE];
        self.slot.read(&mut bytes)?;
        Ok(ServoConfig::from_bytes(&bytes)?)
    }

    /// Seal and write a record
    ///
    /// The checksum is recomputed from the current field values first.
    pub fn save(&mut self, config: &mut ServoConfig) -> Result<(), StoreError> {
        if self.slot.capacity() < RECORD_SIZE {
            return Err(StoreError::Storage(StorageError::TooLarge));
        }
        config.update_checksum();
        self.slot.write(&config.to_bytes())?;
        Ok(())
    }

    /// Load the stored record, falling back to persisted defaults
    ///
    /// Never fails: an unusable record is replaced by defaults, which are
    /// written back immediately so the next load succeeds.
    pub fn load_or_recover(&mut self) -> (ServoConfig, ConfigOrigin) {
        match self.load() {
            Ok(config) => (config, ConfigOrigin::Stored),
            Err(reason) => {
                let mut config = Self::defaults();
                let persist_error = match self.save(&mut config) {
                    Ok(()) => None,
                    Err(StoreError::Storage(e)) => Some(e),
                    Err(StoreError::Invalid(_)) => None,
                };
                (
                    config,
                    ConfigOrigin::Defaults {
                        reason,
                        persist_error,
                    },
                )
            }
        }
    }
}
