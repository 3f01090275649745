//! Channel mapper
//!
//! Converts a logical joint angle into a 12-bit PWM duty value:
//!
//! ```text
//! angle ─► clamp 0..180 ─► invert? (180 - a) ─► + trim, clamp ─► µs ─► ticks
//! ```
//!
//! [`map_to_hardware`] is pure. [`OutputCache`] remembers the last duty
//! sent per channel so that unchanged values never reach the bus.

use saccade_hal::{PwmChannels, DUTY_MAX, DUTY_RESOLUTION};
use saccade_protocol::{ChannelId, CHANNEL_COUNT};

use crate::config::{ChannelCalibration, PwmFrequency, MAX_ANGLE_DEG};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Clamp any integer angle into 0..=180
pub fn clamp_angle(angle: i32) -> u8 {
    angle.clamp(0, MAX_ANGLE_DEG as i32) as u8
}

/// Effective angle after inversion and trim
pub fn effective_angle(calibration: &ChannelCalibration, angle: i32) -> u8 {
    let mut angle = clamp_angle(angle) as i32;
    if calibration.inverted {
        angle = MAX_ANGLE_DEG as i32 - angle;
    }
    clamp_angle(angle + calibration.trim_deg as i32)
}

/// Pulse width in microseconds for an angle
pub fn angle_to_pulse_us(calibration: &ChannelCalibration, angle: i32) -> u32 {
    let angle = effective_angle(calibration, angle) as u32;
    let min = calibration.min_us as u32;
    let span = (calibration.max_us as u32).saturating_sub(min);
    angle * span / MAX_ANGLE_DEG as u32 + min
}

/// Duty ticks for a pulse width at the given frequency
pub fn pulse_to_ticks(pulse_us: u32, frequency: PwmFrequency) -> u16 {
    let ticks = pulse_us as u64 * frequency.hz() as u64 * DUTY_RESOLUTION as u64
        / MICROS_PER_SECOND;
    ticks.min(DUTY_MAX as u64) as u16
}

/// Map a logical angle to hardware duty ticks
pub fn map_to_hardware(
    calibration: &ChannelCalibration,
    frequency: PwmFrequency,
    angle: i32,
) -> u16 {
    pulse_to_ticks(angle_to_pulse_us(calibration, angle), frequency)
}

/// Outcome of pushing one channel value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOutcome {
    /// Value matched the last one sent; nothing written
    Unchanged,
    /// Value was written to the hardware
    Written,
}

/// Last duty value sent per channel
#[derive(Debug, Clone, Default)]
pub struct OutputCache {
    last: [Option<u16>; CHANNEL_COUNT],
}

impl OutputCache {
    /// Create a cache with every channel unset
    pub const fn new() -> Self {
        Self {
            last: [None; CHANNEL_COUNT],
        }
    }

    /// Last duty sent to a channel
    pub fn last(&self, id: ChannelId) -> Option<u16> {
        self.last[id.index()]
    }

    /// Forget every cached value so the next push writes all channels
    pub fn invalidate(&mut self) {
        self.last = [None; CHANNEL_COUNT];
    }

    /// Write `duty` to a channel unless it was the last value sent
    ///
    /// A failed write leaves the channel unset so the next push retries it.
    pub fn push<P: PwmChannels>(
        &mut self,
        pwm: &mut P,
        id: ChannelId,
        duty: u16,
    ) -> Result<WriteOutcome, P::Error> {
        let slot = &mut self.last[id.index()];
        let changed = *slot != Some(duty);
        *slot = Some(duty);
        if !changed {
            return Ok(WriteOutcome::Unchanged);
        }
        if let Err(e) = pwm.set_duty(id as u8, duty) {
            *slot = None;
            return Err(e);
        }
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calibration(min_us: u16, max_us: u16, trim_deg: i8, inverted: bool) -> ChannelCalibration {
        ChannelCalibration {
            min_us,
            max_us,
            trim_deg,
            inverted,
        }
    }

    #[derive(Default)]
    struct RecordingPwm {
        writes: heapless::Vec<(u8, u16), 16>,
        fail: bool,
    }

    impl PwmChannels for RecordingPwm {
        type Error = ();

        fn set_frequency(&mut self, _hz: u16) -> Result<(), ()> {
            Ok(())
        }

        fn set_duty(&mut self, channel: u8, duty: u16) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.writes.push((channel, duty)).map_err(|_| ())
        }
    }

    #[test]
    fn test_extremes_hit_range_ends() {
        let cal = calibration(600, 2400, 0, false);
        assert_eq!(angle_to_pulse_us(&cal, 0), 600);
        assert_eq!(angle_to_pulse_us(&cal, 180), 2400);
        assert_eq!(angle_to_pulse_us(&cal, 90), 1500);
        // 2400 µs at 50 Hz: 2400 * 50 * 4096 / 1e6 = 491.52
        assert_eq!(map_to_hardware(&cal, PwmFrequency::Hz50, 180), 491);
        assert_eq!(map_to_hardware(&cal, PwmFrequency::Hz50, 0), 122);
    }

    #[test]
    fn test_out_of_range_angles_clamp() {
        let cal = calibration(500, 2500, 0, false);
        assert_eq!(angle_to_pulse_us(&cal, -40), 500);
        assert_eq!(angle_to_pulse_us(&cal, 400), 2500);
    }

    #[test]
    fn test_invert_mirrors() {
        let cal = calibration(500, 2500, 0, true);
        assert_eq!(angle_to_pulse_us(&cal, 0), 2500);
        assert_eq!(angle_to_pulse_us(&cal, 180), 500);
        assert_eq!(effective_angle(&cal, 30), 150);
    }

    #[test]
    fn test_trim_applies_after_invert() {
        let cal = calibration(500, 2500, 10, true);
        assert_eq!(effective_angle(&cal, 30), 160);
        assert_eq!(effective_angle(&cal, 0), 180);
        let cal = calibration(500, 2500, -20, false);
        assert_eq!(effective_angle(&cal, 10), 0);
    }

    #[test]
    fn test_ticks_saturate() {
        assert_eq!(pulse_to_ticks(65_535, PwmFrequency::Hz60), DUTY_MAX);
        assert_eq!(pulse_to_ticks(1500, PwmFrequency::Hz60), 368);
    }

    #[test]
    fn test_cache_suppresses_duplicates() {
        let mut pwm = RecordingPwm::default();
        let mut cache = OutputCache::new();

        assert_eq!(cache.push(&mut pwm, ChannelId::Rx, 300), Ok(WriteOutcome::Written));
        assert_eq!(cache.push(&mut pwm, ChannelId::Rx, 300), Ok(WriteOutcome::Unchanged));
        assert_eq!(cache.push(&mut pwm, ChannelId::Rx, 301), Ok(WriteOutcome::Written));
        assert_eq!(cache.push(&mut pwm, ChannelId::Ly, 300), Ok(WriteOutcome::Written));
        assert_eq!(&pwm.writes[..], &[(2, 300), (2, 301), (1, 300)]);
        assert_eq!(cache.last(ChannelId::Rx), Some(301));
        assert_eq!(cache.last(ChannelId::Lx), None);
    }

    #[test]
    fn test_cache_invalidate_rewrites() {
        let mut pwm = RecordingPwm::default();
        let mut cache = OutputCache::new();
        cache.push(&mut pwm, ChannelId::Lx, 100).unwrap();
        cache.invalidate();
        assert_eq!(cache.push(&mut pwm, ChannelId::Lx, 100), Ok(WriteOutcome::Written));
        assert_eq!(pwm.writes.len(), 2);
    }

    #[test]
    fn test_failed_write_retries() {
        let mut pwm = RecordingPwm {
            fail: true,
            ..Default::default()
        };
        let mut cache = OutputCache::new();
        assert_eq!(cache.push(&mut pwm, ChannelId::Ry, 250), Err(()));
        assert_eq!(cache.last(ChannelId::Ry), None);

        pwm.fail = false;
        assert_eq!(cache.push(&mut pwm, ChannelId::Ry, 250), Ok(WriteOutcome::Written));
    }

    proptest! {
        #[test]
        fn prop_double_invert_is_identity(angle in -360i32..=360) {
            let plain = calibration(500, 2500, 0, false);
            let inverted = calibration(500, 2500, 0, true);
            let once = effective_angle(&inverted, angle) as i32;
            prop_assert_eq!(effective_angle(&inverted, once), effective_angle(&plain, angle));
        }

        #[test]
        fn prop_pulse_stays_in_range(
            min in 0u16..3000,
            span in 1u16..3000,
            trim in -90i8..=90,
            inverted in any::<bool>(),
            angle in any::<i32>(),
        ) {
            let cal = calibration(min, min + span, trim, inverted);
            let us = angle_to_pulse_us(&cal, angle);
            prop_assert!(us >= min as u32);
            prop_assert!(us <= (min + span) as u32);
        }

        #[test]
        fn prop_monotonic_without_invert(a in 0i32..180, min in 0u16..3000, span in 1u16..3000) {
            let cal = calibration(min, min + span, 0, false);
            prop_assert!(angle_to_pulse_us(&cal, a) <= angle_to_pulse_us(&cal, a + 1));
        }
    }
}
