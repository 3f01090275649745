//! Board-agnostic core logic for the servo controller firmware
//!
//! This crate contains everything that does not depend on a specific
//! board:
//!
//! - Persisted configuration record and checksum
//! - Config store on top of a record slot
//! - Angle to duty mapping with per-channel output cache
//! - Tween scheduler
//! - Controller owning all live state
//! - Command interpreter and status reporting
//!
//! Data flows one way per control loop pass:
//!
//! ```text
//! bytes ─► Interpreter ─► Controller (config, targets)
//!                              │
//!                 tick(now) ───┤
//!                              ▼
//!                   TweenScheduler ─► mapper ─► OutputCache ─► PwmChannels
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod interpreter;
pub mod mapper;
pub mod status;
pub mod store;
pub mod tween;

pub use controller::{ControlError, Controller, TickReport};
pub use interpreter::{Handled, Interpreter};
pub use store::{ConfigOrigin, ConfigStore, StoreError};
