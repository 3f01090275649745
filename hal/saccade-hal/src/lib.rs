//! Saccade Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the servo controller core is
//! written against. Chip-specific crates implement them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  saccade-core (controller, interpreter) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  saccade-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ saccade-hal-  │       │ saccade-      │
//! │    rp2040     │       │   drivers     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`storage::RecordSlot`] - Single fixed-size persistence slot
//! - [`pwm::PwmChannels`] - PWM channel write primitive

#![no_std]
#![deny(unsafe_code)]

pub mod pwm;
pub mod storage;

// Re-export key traits at crate root for convenience
pub use pwm::{PwmChannels, DUTY_MAX, DUTY_RESOLUTION};
pub use storage::{RecordSlot, StorageError};
