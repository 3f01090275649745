//! PWM output abstractions
//!
//! The servo core emits `(channel, duty)` pairs with a fixed 12-bit
//! resolution per PWM period. Bus protocol and chip initialization stay
//! behind this trait.

/// Number of duty steps per PWM period
pub const DUTY_RESOLUTION: u32 = 4096;

/// Largest duty value a channel accepts
pub const DUTY_MAX: u16 = (DUTY_RESOLUTION - 1) as u16;

/// Multi-channel PWM output
pub trait PwmChannels {
    /// Error type for output operations
    type Error;

    /// Set the PWM period frequency shared by all channels
    fn set_frequency(&mut self, hz: u16) -> Result<(), Self::Error>;

    /// Set the duty of one logical channel
    ///
    /// `duty` is in ticks out of [`DUTY_RESOLUTION`], at most [`DUTY_MAX`].
    fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), Self::Error>;
}

impl<T: PwmChannels + ?Sized> PwmChannels for &mut T {
    type Error = T::Error;

    fn set_frequency(&mut self, hz: u16) -> Result<(), Self::Error> {
        (**self).set_frequency(hz)
    }

    fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), Self::Error> {
        (**self).set_duty(channel, duty)
    }
}
