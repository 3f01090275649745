//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined in
//! saccade-hal:
//!
//! - PWM controllers (PCA9685 over I2C)

#![no_std]
#![deny(unsafe_code)]

pub mod pwm;
