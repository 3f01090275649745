//! Motion scheduler
//!
//! Moves each channel's current angle toward its target at a bounded rate.
//! The scheduler never blocks: [`TweenScheduler::advance`] is called once per
//! control loop pass and returns which channels need to go through the
//! mapper.

use saccade_protocol::{ChannelId, CHANNEL_COUNT};

use crate::config::{TweenConfig, CENTER_DEG};
use crate::mapper::clamp_angle;

/// Target and current angle of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMotion {
    /// Commanded angle (0-180)
    pub target: u8,
    /// Angle last pushed to the mapper (0-180)
    pub current: u8,
}

impl ChannelMotion {
    /// Channel resting at `angle`
    pub const fn at(angle: u8) -> Self {
        Self {
            target: angle,
            current: angle,
        }
    }

    /// Check if the channel has reached its target
    pub const fn is_settled(&self) -> bool {
        self.target == self.current
    }

    /// Move `current` toward `target` by at most `step`
    fn step_toward(&mut self, step: u8) {
        if self.current < self.target {
            self.current = self.current.saturating_add(step).min(self.target);
        } else if self.current > self.target {
            self.current = self.current.saturating_sub(step).max(self.target);
        }
    }
}

/// Channels that need a mapper push this pass
pub type PushSet = [bool; CHANNEL_COUNT];

/// Rate-limited convergence of current angles toward targets
#[derive(Debug, Clone)]
pub struct TweenScheduler {
    channels: [ChannelMotion; CHANNEL_COUNT],
    /// Time of the last step pass (ms, wrapping)
    last_step_ms: u32,
}

impl Default for TweenScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TweenScheduler {
    /// All channels resting at center
    pub const fn new() -> Self {
        Self {
            channels: [ChannelMotion::at(CENTER_DEG); CHANNEL_COUNT],
            last_step_ms: 0,
        }
    }

    /// Seed every channel at rest from stored angles
    pub fn seed(&mut self, angles: &[i16; CHANNEL_COUNT]) {
        for (motion, &angle) in self.channels.iter_mut().zip(angles) {
            *motion = ChannelMotion::at(clamp_angle(angle as i32));
        }
    }

    /// Retarget every channel to stored angles without moving them
    pub fn retarget(&mut self, angles: &[i16; CHANNEL_COUNT]) {
        for (motion, &angle) in self.channels.iter_mut().zip(angles) {
            motion.target = clamp_angle(angle as i32);
        }
    }

    /// Motion state of one channel
    pub fn channel(&self, id: ChannelId) -> &ChannelMotion {
        &self.channels[id.index()]
    }

    /// Set one channel's target, clamped to 0..180
    pub fn set_target(&mut self, id: ChannelId, angle: i32) -> u8 {
        let angle = clamp_angle(angle);
        self.channels[id.index()].target = angle;
        angle
    }

    /// Current angles in stored form
    pub fn current_angles(&self) -> [i16; CHANNEL_COUNT] {
        let mut angles = [0; CHANNEL_COUNT];
        for (angle, motion) in angles.iter_mut().zip(&self.channels) {
            *angle = motion.current as i16;
        }
        angles
    }

    /// Check if every channel has reached its target
    pub fn is_settled(&self) -> bool {
        self.channels.iter().all(ChannelMotion::is_settled)
    }

    /// Evaluate one scheduler tick
    ///
    /// With tweening disabled, unsettled channels snap to target. Otherwise
    /// every channel steps once per elapsed interval; the interval check
    /// uses a wrapping difference so a clock rollover neither skips nor
    /// repeats a step.
    pub fn advance(&mut self, now_ms: u32, tween: TweenConfig) -> PushSet {
        let mut push = [false; CHANNEL_COUNT];

        if tween.is_disabled() {
            for (motion, push) in self.channels.iter_mut().zip(push.iter_mut()) {
                if !motion.is_settled() {
                    motion.current = motion.target;
                    *push = true;
                }
            }
            self.last_step_ms = now_ms;
            return push;
        }

        if now_ms.wrapping_sub(self.last_step_ms) < tween.interval_ms as u32 {
            return push;
        }
        self.last_step_ms = now_ms;

        for motion in self.channels.iter_mut() {
            motion.step_toward(tween.step_deg);
        }
        [true; CHANNEL_COUNT]
    }
}
