//! RP2040-specific HAL for the servo controller firmware
//!
//! This crate provides RP2040 implementations of the shared `saccade-hal`
//! traits:
//!
//! - Flash record slot in the last erase sector (implements
//!   `saccade_hal::RecordSlot`)
//!
//! Serial I/O uses embassy-rp's buffered UART directly through the
//! `embedded-io-async` traits.

#![no_std]

pub mod flash;

// Re-export shared traits from saccade-hal for convenience
pub use saccade_hal::{RecordSlot, StorageError};
