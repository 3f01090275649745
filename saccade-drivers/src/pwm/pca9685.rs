//! PCA9685 16-channel PWM controller (I2C)
//!
//! The PCA9685 runs every output from one internal 25 MHz oscillator
//! divided by a shared prescaler, with a 12-bit counter per period. Each
//! output has ON and OFF counter values; servos only need ON = 0 and OFF =
//! duty.
//!
//! # Frequency changes
//!
//! PRESCALE is only writable while the oscillator sleeps:
//!
//! 1. MODE1 = SLEEP | AI
//! 2. PRESCALE = round(25 MHz / (4096 * f)) - 1
//! 3. MODE1 = AI (wake), wait 500 µs for the oscillator
//! 4. MODE1 = RESTART | AI

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use saccade_hal::{PwmChannels, DUTY_MAX, DUTY_RESOLUTION};

/// PCA9685 register addresses
pub mod reg {
    /// Mode register 1
    pub const MODE1: u8 = 0x00;
    /// Mode register 2
    pub const MODE2: u8 = 0x01;
    /// LED0 ON low byte; each output adds 4
    pub const LED0_ON_L: u8 = 0x06;
    /// Prescaler for the output frequency
    pub const PRESCALE: u8 = 0xFE;
}

/// MODE1 bits
pub mod mode1 {
    /// Restart enabled
    pub const RESTART: u8 = 0x80;
    /// Register auto-increment
    pub const AI: u8 = 0x20;
    /// Low power mode, oscillator off
    pub const SLEEP: u8 = 0x10;
}

/// MODE2 bits
pub mod mode2 {
    /// Totem-pole outputs
    pub const OUTDRV: u8 = 0x04;
}

/// Default 7-bit bus address (A0-A5 low)
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Internal oscillator frequency
pub const OSCILLATOR_HZ: u32 = 25_000_000;

/// Number of outputs on the chip
pub const OUTPUT_COUNT: u8 = 16;

/// Lowest and highest output frequency the prescaler reaches
pub const MIN_FREQUENCY_HZ: u16 = 24;
pub const MAX_FREQUENCY_HZ: u16 = 1526;

/// Oscillator settle time after wake
const WAKE_DELAY_US: u32 = 500;

/// PCA9685 driver configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pca9685Config {
    /// 7-bit I2C address
    pub address: u8,
    /// Output pin for each logical channel
    pub channel_map: [u8; 4],
}

impl Default for Pca9685Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            channel_map: [0, 1, 2, 3],
        }
    }
}

/// PCA9685 driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pca9685Error<E> {
    /// Bus transfer failed
    I2c(E),
    /// Logical channel has no output mapped
    InvalidChannel,
    /// Frequency outside the prescaler range
    InvalidFrequency,
}

/// Prescale value for an output frequency
pub fn prescale_for(hz: u16) -> u8 {
    let divisor = DUTY_RESOLUTION * hz as u32;
    // Rounded division, then the chip adds one
    let prescale = (OSCILLATOR_HZ + divisor / 2) / divisor;
    prescale.saturating_sub(1).clamp(3, 255) as u8
}

/// PCA9685 driver
pub struct Pca9685<I, D> {
    i2c: I,
    delay: D,
    config: Pca9685Config,
}

impl<I: I2c, D: DelayNs> Pca9685<I, D> {
    /// Create a driver; call [`Pca9685::init`] before use
    pub fn new(i2c: I, delay: D, config: Pca9685Config) -> Self {
        Self { i2c, delay, config }
    }

    /// Release the bus and delay
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    /// Configure totem-pole outputs and register auto-increment
    ///
    /// Leaves the oscillator asleep until the first frequency is set.
    pub fn init(&mut self) -> Result<(), Pca9685Error<I::Error>> {
        self.write_register(reg::MODE2, mode2::OUTDRV)?;
        self.write_register(reg::MODE1, mode1::SLEEP | mode1::AI)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Pca9685Error<I::Error>> {
        self.i2c
            .write(self.config.address, &[register, value])
            .map_err(Pca9685Error::I2c)
    }

    fn output_pin(&self, channel: u8) -> Result<u8, Pca9685Error<I::Error>> {
        self.config
            .channel_map
            .get(channel as usize)
            .copied()
            .filter(|&pin| pin < OUTPUT_COUNT)
            .ok_or(Pca9685Error::InvalidChannel)
    }
}

impl<I: I2c, D: DelayNs> PwmChannels for Pca9685<I, D> {
    type Error = Pca9685Error<I::Error>;

    fn set_frequency(&mut self, hz: u16) -> Result<(), Self::Error> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
            return Err(Pca9685Error::InvalidFrequency);
        }
        self.write_register(reg::MODE1, mode1::SLEEP | mode1::AI)?;
        self.write_register(reg::PRESCALE, prescale_for(hz))?;
        self.write_register(reg::MODE1, mode1::AI)?;
        self.delay.delay_us(WAKE_DELAY_US);
        self.write_register(reg::MODE1, mode1::RESTART | mode1::AI)
    }

    fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), Self::Error> {
        let pin = self.output_pin(channel)?;
        let off = duty.min(DUTY_MAX).to_le_bytes();
        let frame = [reg::LED0_ON_L + 4 * pin, 0, 0, off[0], off[1]];
        self.i2c
            .write(self.config.address, &frame)
            .map_err(Pca9685Error::I2c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use heapless::Vec;

    type Frame = (u8, Vec<u8, 8>);

    #[derive(Default)]
    struct RecordingBus {
        frames: Vec<Frame, 16>,
        fail: bool,
    }

    impl ErrorType for RecordingBus {
        type Error = ErrorKind;
    }

    impl I2c for RecordingBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Bus);
            }
            for op in operations {
                if let Operation::Write(bytes) = op {
                    let data = Vec::from_slice(bytes).map_err(|_| ErrorKind::Overrun)?;
                    self.frames
                        .push((address, data))
                        .map_err(|_| ErrorKind::Overrun)?;
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    fn driver(config: Pca9685Config) -> Pca9685<RecordingBus, CountingDelay> {
        Pca9685::new(RecordingBus::default(), CountingDelay::default(), config)
    }

    fn frames(driver: Pca9685<RecordingBus, CountingDelay>) -> Vec<Frame, 16> {
        driver.release().0.frames
    }

    #[test]
    fn test_prescale_values() {
        // 25 MHz / (4096 * 50) = 122.07
        assert_eq!(prescale_for(50), 121);
        // 25 MHz / (4096 * 60) = 101.73
        assert_eq!(prescale_for(60), 101);
        assert_eq!(prescale_for(1526), 3);
        assert_eq!(prescale_for(24), 253);
    }

    #[test]
    fn test_init_sequence() {
        let mut pca = driver(Pca9685Config::default());
        pca.init().unwrap();
        let frames = frames(pca);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, DEFAULT_ADDRESS);
        assert_eq!(&frames[0].1[..], &[reg::MODE2, mode2::OUTDRV]);
        assert_eq!(&frames[1].1[..], &[reg::MODE1, mode1::SLEEP | mode1::AI]);
    }

    #[test]
    fn test_frequency_sequence() {
        let mut pca = driver(Pca9685Config::default());
        pca.set_frequency(50).unwrap();
        let (bus, delay) = pca.release();

        let written: Vec<[u8; 2], 8> = bus
            .frames
            .iter()
            .map(|(_, data)| [data[0], data[1]])
            .collect();
        assert_eq!(
            &written[..],
            &[
                [reg::MODE1, 0x30],
                [reg::PRESCALE, 121],
                [reg::MODE1, 0x20],
                [reg::MODE1, 0xA0],
            ]
        );
        assert!(delay.total_ns >= 500_000);
    }

    #[test]
    fn test_frequency_out_of_range() {
        let mut pca = driver(Pca9685Config::default());
        assert_eq!(pca.set_frequency(10), Err(Pca9685Error::InvalidFrequency));
        assert_eq!(pca.set_frequency(2000), Err(Pca9685Error::InvalidFrequency));
        assert!(frames(pca).is_empty());
    }

    #[test]
    fn test_duty_frame() {
        let mut pca = driver(Pca9685Config::default());
        pca.set_duty(2, 491).unwrap();
        pca.set_duty(0, 5000).unwrap();
        let frames = frames(pca);
        // 491 = 0x01EB
        assert_eq!(&frames[0].1[..], &[0x06 + 8, 0, 0, 0xEB, 0x01]);
        assert_eq!(&frames[1].1[..], &[0x06, 0, 0, 0xFF, 0x0F]);
    }

    #[test]
    fn test_channel_map() {
        let mut pca = driver(Pca9685Config {
            address: 0x41,
            channel_map: [8, 9, 14, 15],
        });
        pca.set_duty(3, 300).unwrap();
        assert_eq!(pca.set_duty(4, 300), Err(Pca9685Error::InvalidChannel));
        let frames = frames(pca);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, 0x41);
        assert_eq!(frames[0].1[0], reg::LED0_ON_L + 4 * 15);
    }

    #[test]
    fn test_unmapped_pin_rejected() {
        let mut pca = driver(Pca9685Config {
            address: DEFAULT_ADDRESS,
            channel_map: [0, 1, 2, 16],
        });
        assert_eq!(pca.set_duty(3, 100), Err(Pca9685Error::InvalidChannel));
    }

    #[test]
    fn test_bus_error_propagates() {
        let mut bus = RecordingBus::default();
        bus.fail = true;
        let mut pca = Pca9685::new(bus, CountingDelay::default(), Pca9685Config::default());
        assert_eq!(
            pca.set_duty(0, 100),
            Err(Pca9685Error::I2c(ErrorKind::Bus))
        );
    }
}
