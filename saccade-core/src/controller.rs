//! Servo controller
//!
//! One owned value holds all live state: the configuration record, the
//! per-channel motion state, the output cache, the PWM device and the
//! config store. Commands mutate it synchronously; [`Controller::tick`]
//! is the only path that talks to the PWM hardware.

use saccade_hal::{PwmChannels, RecordSlot};
use saccade_protocol::{ChannelId, ChannelSelector};

use crate::config::{PwmFrequency, ServoConfig, TweenConfig, CENTER_DEG, RECORD_SIZE};
use crate::mapper::{map_to_hardware, OutputCache, WriteOutcome};
use crate::store::{ConfigOrigin, ConfigStore, StoreError};
use crate::tween::TweenScheduler;

/// Rejected controller operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Pulse range with `min >= max`
    RangeOrder,
    /// Pulse width outside 0..=65535 µs
    RangeBounds,
    /// Frequency other than 50 or 60 Hz
    UnsupportedFrequency,
    /// Persistence failed
    Store(StoreError),
}

impl ControlError {
    /// Short reason used in `ERR` replies
    pub const fn reason(self) -> &'static str {
        match self {
            ControlError::RangeOrder => "min must be < max",
            ControlError::RangeBounds => "pulse width out of range",
            ControlError::UnsupportedFrequency => "must be 50 or 60",
            ControlError::Store(e) => e.reason(),
        }
    }
}

impl From<StoreError> for ControlError {
    fn from(e: StoreError) -> Self {
        ControlError::Store(e)
    }
}

/// Hardware activity of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Channels whose duty was written
    pub written: u8,
    /// Channel writes that failed
    pub failed: u8,
    /// A pending frequency change failed to apply
    pub frequency_failed: bool,
}

impl TickReport {
    /// Check if any hardware operation failed
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.frequency_failed
    }
}

/// The servo controller
pub struct Controller<P, S> {
    config: ServoConfig,
    motion: TweenScheduler,
    output: OutputCache,
    pwm: P,
    store: ConfigStore<S>,
    /// Frequency must be (re)sent before the next channel push
    frequency_pending: bool,
    /// Mapping changed; push every channel on the next tick
    refresh_pending: bool,
}

impl<P: PwmChannels, S: RecordSlot> Controller<P, S> {
    /// Build a controller from the stored record
    ///
    /// An unusable record is replaced by persisted defaults. Channels start
    /// at rest on the stored angles; the first tick sets the frequency and
    /// writes every channel.
    pub fn new(pwm: P, slot: S) -> (Self, ConfigOrigin) {
        let mut store = ConfigStore::new(slot);
        let (config, origin) = store.load_or_recover();
        let mut motion = TweenScheduler::new();
        motion.seed(&config.last_angle);

        let controller = Self {
            config,
            motion,
            output: OutputCache::new(),
            pwm,
            store,
            frequency_pending: true,
            refresh_pending: true,
        };
        (controller, origin)
    }

    /// Live configuration
    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    /// Live motion state
    pub fn motion(&self) -> &TweenScheduler {
        &self.motion
    }

    /// Last duty values sent
    pub fn output(&self) -> &OutputCache {
        &self.output
    }

    /// PWM device
    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    /// Config store
    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }

    /// Live configuration in record form with a fresh checksum
    pub fn record(&self) -> ServoConfig {
        self.config.sealed()
    }

    /// Live configuration serialized
    pub fn record_bytes(&self) -> [u8; RECORD_SIZE] {
        self.record().to_bytes()
    }

    /// Set targets for a channel group, returning the clamped angle
    pub fn set_target(&mut self, target: ChannelSelector, angle: i32) -> u8 {
        let mut applied = CENTER_DEG;
        for &id in target.channels() {
            applied = self.motion.set_target(id, angle);
        }
        applied
    }

    /// Target every channel at 90°
    pub fn center(&mut self) {
        self.set_target(ChannelSelector::All, CENTER_DEG as i32);
    }

    /// Set the pulse range for a channel group
    ///
    /// Both bounds are checked before any channel changes.
    pub fn set_range(
        &mut self,
        target: ChannelSelector,
        min_us: i32,
        max_us: i32,
    ) -> Result<(u16, u16), ControlError> {
        let min = u16::try_from(min_us).map_err(|_| ControlError::RangeBounds)?;
        let max = u16::try_from(max_us).map_err(|_| ControlError::RangeBounds)?;
        if min >= max {
            return Err(ControlError::RangeOrder);
        }
        for &id in target.channels() {
            self.config.channel_mut(id).set_range(min, max);
        }
        self.refresh_pending = true;
        Ok((min, max))
    }

    /// Set the invert flag for a channel group
    pub fn set_inverted(&mut self, target: ChannelSelector, inverted: bool) {
        for &id in target.channels() {
            self.config.channel_mut(id).inverted = inverted;
        }
        self.refresh_pending = true;
    }

    /// Set the trim for a channel group, returning the clamped trim
    pub fn set_trim(&mut self, target: ChannelSelector, trim_deg: i32) -> i8 {
        let mut applied = 0;
        for &id in target.channels() {
            applied = self.config.channel_mut(id).set_trim(trim_deg);
        }
        self.refresh_pending = true;
        applied
    }

    /// Set the PWM frequency
    ///
    /// The hardware is updated on the next tick, followed by a full
    /// channel rewrite.
    pub fn set_frequency(&mut self, hz: i32) -> Result<PwmFrequency, ControlError> {
        let frequency = PwmFrequency::from_hz(hz).ok_or(ControlError::UnsupportedFrequency)?;
        self.config.frequency = frequency;
        self.frequency_pending = true;
        Ok(frequency)
    }

    /// Set tween parameters, clamped into their stored widths
    pub fn set_tween(&mut self, step_deg: i32, interval_ms: i32) -> TweenConfig {
        self.config.tween = TweenConfig::clamped(step_deg, interval_ms);
        self.config.tween
    }

    /// Persist the live configuration with the current angles
    pub fn save(&mut self) -> Result<(), ControlError> {
        self.config.last_angle = self.motion.current_angles();
        self.store.save(&mut self.config)?;
        Ok(())
    }

    /// Replace the live configuration with the stored record
    ///
    /// Targets move to the stored angles. On failure nothing changes.
    pub fn load(&mut self) -> Result<(), ControlError> {
        let config = self.store.load()?;
        self.install(config);
        Ok(())
    }

    /// Restore compiled defaults and persist them
    ///
    /// The live configuration is reset even if the write fails.
    pub fn reset_config(&mut self) -> Result<(), ControlError> {
        self.install(ConfigStore::<S>::defaults());
        self.store.save(&mut self.config)?;
        Ok(())
    }

    fn install(&mut self, config: ServoConfig) {
        self.motion.retarget(&config.last_angle);
        self.config = config;
        self.frequency_pending = true;
    }

    /// Run one control loop tick at `now_ms`
    ///
    /// Never fails; hardware errors are counted in the report and the
    /// affected channels are retried on a later push.
    pub fn tick(&mut self, now_ms: u32) -> TickReport {
        let mut report = TickReport::default();

        if self.frequency_pending {
            self.frequency_pending = false;
            if self.pwm.set_frequency(self.config.frequency.hz()).is_err() {
                report.frequency_failed = true;
            }
            self.output.invalidate();
            self.refresh_pending = true;
        }

        let mut push = self.motion.advance(now_ms, self.config.tween);
        if self.refresh_pending {
            self.refresh_pending = false;
            push = [true; saccade_protocol::CHANNEL_COUNT];
        }

        for id in ChannelId::ALL {
            if !push[id.index()] {
                continue;
            }
            let angle = self.motion.channel(id).current as i32;
            let duty = map_to_hardware(self.config.channel(id), self.config.frequency, angle);
            match self.output.push(&mut self.pwm, id, duty) {
                Ok(WriteOutcome::Written) => report.written += 1,
                Ok(WriteOutcome::Unchanged) => {}
                Err(_) => report.failed += 1,
            }
        }

        report
    }
}
