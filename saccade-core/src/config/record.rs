//! Persisted servo configuration record
//!
//! The record is stored as a fixed 46-byte little-endian image so that a
//! record written by one firmware build is byte-compatible with the next:
//!
//! ```text
//! offset size field
//!      0    4 magic          u32
//!      4    1 version        u8
//!      5    8 min_us         [u16; 4]
//!     13    8 max_us         [u16; 4]
//!     21    4 trim           [i8; 4]
//!     25    4 invert         [u8; 4]
//!     29    8 last_angle     [i16; 4]
//!     37    1 tween step     u8
//!     38    2 tween interval u16
//!     40    2 frequency      u16
//!     42    4 checksum       u32, FNV-1a over bytes 0..42
//! ```

use saccade_protocol::{ChannelId, CHANNEL_COUNT};

/// Magic number to identify a servo record
pub const RECORD_MAGIC: u32 = 0x5344_4343; // "SDCC"

/// Current record layout version
pub const RECORD_VERSION: u8 = 1;

/// Serialized record size in bytes
pub const RECORD_SIZE: usize = 46;

/// Bytes covered by the checksum
pub const CHECKSUM_OFFSET: usize = 42;

/// Center of the angle range in degrees
pub const CENTER_DEG: u8 = 90;

/// Largest commandable angle in degrees
pub const MAX_ANGLE_DEG: u8 = 180;

/// Trim is limited to +/- this many degrees
pub const MAX_TRIM_DEG: i8 = 90;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Reasons a stored record is not trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidRecord {
    /// Magic number does not match
    BadMagic,
    /// Layout version does not match
    BadVersion,
    /// Stored checksum differs from the recomputed one
    ChecksumMismatch,
    /// Checksum matches but a field violates its range
    OutOfRange,
}

impl InvalidRecord {
    /// Short reason used in `ERR` replies
    pub const fn reason(self) -> &'static str {
        match self {
            InvalidRecord::BadMagic => "bad magic",
            InvalidRecord::BadVersion => "bad version",
            InvalidRecord::ChecksumMismatch => "checksum mismatch",
            InvalidRecord::OutOfRange => "field out of range",
        }
    }
}

/// Supported PWM output frequencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PwmFrequency {
    /// 50 Hz, the usual analog servo rate
    #[default]
    Hz50,
    /// 60 Hz
    Hz60,
}

impl PwmFrequency {
    /// Look up a frequency by value in Hz
    pub fn from_hz(hz: i32) -> Option<Self> {
        match hz {
            50 => Some(PwmFrequency::Hz50),
            60 => Some(PwmFrequency::Hz60),
            _ => None,
        }
    }

    /// Frequency in Hz
    pub const fn hz(self) -> u16 {
        match self {
            PwmFrequency::Hz50 => 50,
            PwmFrequency::Hz60 => 60,
        }
    }
}

/// Pulse range and orientation for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelCalibration {
    /// Pulse width at 0° in microseconds
    pub min_us: u16,
    /// Pulse width at 180° in microseconds, always above `min_us`
    pub max_us: u16,
    /// Offset added after inversion, in degrees
    pub trim_deg: i8,
    /// Mirror the angle around 90°
    pub inverted: bool,
}

impl ChannelCalibration {
    /// Default calibration: 500-2500 µs, no trim
    pub const fn new(inverted: bool) -> Self {
        Self {
            min_us: 500,
            max_us: 2500,
            trim_deg: 0,
            inverted,
        }
    }

    /// Set the pulse range, rejecting `min >= max`
    pub fn set_range(&mut self, min_us: u16, max_us: u16) -> bool {
        if min_us >= max_us {
            return false;
        }
        self.min_us = min_us;
        self.max_us = max_us;
        true
    }

    /// Set the trim, clamped to +/- [`MAX_TRIM_DEG`]
    pub fn set_trim(&mut self, trim_deg: i32) -> i8 {
        let limit = MAX_TRIM_DEG as i32;
        self.trim_deg = trim_deg.clamp(-limit, limit) as i8;
        self.trim_deg
    }
}

/// Tween (interpolation) parameters
///
/// A zero step or zero interval disables tweening; targets are then applied
/// on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TweenConfig {
    /// Maximum movement per interval in degrees
    pub step_deg: u8,
    /// Interval between steps in milliseconds
    pub interval_ms: u16,
}

impl TweenConfig {
    /// Build from unchecked values, clamping into the stored widths
    pub fn clamped(step_deg: i32, interval_ms: i32) -> Self {
        Self {
            step_deg: step_deg.clamp(0, u8::MAX as i32) as u8,
            interval_ms: interval_ms.clamp(0, u16::MAX as i32) as u16,
        }
    }

    /// Check if tweening is disabled
    pub const fn is_disabled(&self) -> bool {
        self.step_deg == 0 || self.interval_ms == 0
    }
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            step_deg: 2,
            interval_ms: 10,
        }
    }
}

/// Complete servo configuration as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    /// Magic number for validation
    pub magic: u32,
    /// Layout version
    pub version: u8,
    /// Per-channel calibration, indexed by [`ChannelId::index`]
    pub channels: [ChannelCalibration; CHANNEL_COUNT],
    /// Angles at the last save
    pub last_angle: [i16; CHANNEL_COUNT],
    /// Tween parameters
    pub tween: TweenConfig,
    /// PWM frequency
    pub frequency: PwmFrequency,
    /// FNV-1a checksum over the serialized fields before it
    pub checksum: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoConfig {
    /// Compiled defaults
    ///
    /// The right eye is mounted mirrored, so RX and RY start inverted.
    pub const fn new() -> Self {
        let mut config = Self {
            magic: RECORD_MAGIC,
            version: RECORD_VERSION,
            channels: [
                ChannelCalibration::new(false),
                ChannelCalibration::new(false),
                ChannelCalibration::new(true),
                ChannelCalibration::new(true),
            ],
            last_angle: [CENTER_DEG as i16; CHANNEL_COUNT],
            tween: TweenConfig {
                step_deg: 2,
                interval_ms: 10,
            },
            frequency: PwmFrequency::Hz50,
            checksum: 0,
        };
        let bytes = config.to_bytes_unsealed();
        let (covered, _) = bytes.as_slice().split_at(CHECKSUM_OFFSET);
        config.checksum = fnv1a(covered);
        config
    }

    /// Calibration for one channel
    pub fn channel(&self, id: ChannelId) -> &ChannelCalibration {
        &self.channels[id.index()]
    }

    /// Mutable calibration for one channel
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelCalibration {
        &mut self.channels[id.index()]
    }

    /// Check if magic and version match this build
    pub fn is_valid(&self) -> bool {
        self.magic == RECORD_MAGIC && self.version == RECORD_VERSION
    }

    /// Calculate the checksum over all fields except `checksum`
    pub fn calculate_checksum(&self) -> u32 {
        let bytes = self.to_bytes();
        fnv1a(&bytes[..CHECKSUM_OFFSET])
    }

    /// Update the checksum field
    pub fn update_checksum(&mut self) {
        self.checksum = self.calculate_checksum();
    }

    /// Verify the checksum is correct
    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }

    /// Copy with a freshly computed checksum
    pub fn sealed(&self) -> Self {
        let mut sealed = self.clone();
        sealed.update_checksum();
        sealed
    }

    /// Serialize to the fixed record layout, writing `checksum` as stored
    pub const fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = self.to_bytes_unsealed();
        let checksum = self.checksum.to_le_bytes();
        bytes[42] = checksum[0];
        bytes[43] = checksum[1];
        bytes[44] = checksum[2];
        bytes[45] = checksum[3];
        bytes
    }

    const fn to_bytes_unsealed(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        let magic = self.magic.to_le_bytes();
        bytes[0] = magic[0];
        bytes[1] = magic[1];
        bytes[2] = magic[2];
        bytes[3] = magic[3];
        bytes[4] = self.version;

        let mut i = 0;
        while i < CHANNEL_COUNT {
            let channel = &self.channels[i];
            let min = channel.min_us.to_le_bytes();
            let max = channel.max_us.to_le_bytes();
            let angle = self.last_angle[i].to_le_bytes();
            bytes[5 + 2 * i] = min[0];
            bytes[6 + 2 * i] = min[1];
            bytes[13 + 2 * i] = max[0];
            bytes[14 + 2 * i] = max[1];
            bytes[21 + i] = channel.trim_deg as u8;
            bytes[25 + i] = channel.inverted as u8;
            bytes[29 + 2 * i] = angle[0];
            bytes[30 + 2 * i] = angle[1];
            i += 1;
        }

        bytes[37] = self.tween.step_deg;
        let interval = self.tween.interval_ms.to_le_bytes();
        bytes[38] = interval[0];
        bytes[39] = interval[1];
        let freq = self.frequency.hz().to_le_bytes();
        bytes[40] = freq[0];
        bytes[41] = freq[1];
        bytes
    }

    /// Decode and validate a stored record
    ///
    /// Checks run in order: magic, version, checksum, then field ranges
    /// (pulse range order, invert flag, trim within +/- [`MAX_TRIM_DEG`],
    /// frequency).
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Result<Self, InvalidRecord> {
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != RECORD_MAGIC {
            return Err(InvalidRecord::BadMagic);
        }
        if bytes[4] != RECORD_VERSION {
            return Err(InvalidRecord::BadVersion);
        }
        let checksum = u32::from_le_bytes([bytes[42], bytes[43], bytes[44], bytes[45]]);
        if checksum != fnv1a(&bytes[..CHECKSUM_OFFSET]) {
            return Err(InvalidRecord::ChecksumMismatch);
        }

        let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);

        let mut channels = [ChannelCalibration::new(false); CHANNEL_COUNT];
        let mut last_angle = [0i16; CHANNEL_COUNT];
        for (i, channel) in channels.iter_mut().enumerate() {
            let min_us = u16_at(5 + 2 * i);
            let max_us = u16_at(13 + 2 * i);
            if min_us >= max_us {
                return Err(InvalidRecord::OutOfRange);
            }
            let inverted = match bytes[25 + i] {
                0 => false,
                1 => true,
                _ => return Err(InvalidRecord::OutOfRange),
            };
            let trim_deg = bytes[21 + i] as i8;
            if !(-MAX_TRIM_DEG..=MAX_TRIM_DEG).contains(&trim_deg) {
                return Err(InvalidRecord::OutOfRange);
            }
            *channel = ChannelCalibration {
                min_us,
                max_us,
                trim_deg,
                inverted,
            };
            last_angle[i] = i16::from_le_bytes([bytes[29 + 2 * i], bytes[30 + 2 * i]]);
        }

        let frequency =
            PwmFrequency::from_hz(u16_at(40) as i32).ok_or(InvalidRecord::OutOfRange)?;

        Ok(Self {
            magic,
            version: bytes[4],
            channels,
            last_angle,
            tween: TweenConfig {
                step_deg: bytes[37],
                interval_ms: u16_at(38),
            },
            frequency,
            checksum,
        })
    }
}

/// 32-bit FNV-1a hash
pub const fn fnv1a(data: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let config = ServoConfig::default();
        assert!(config.is_valid());
        assert!(config.verify_checksum());
        assert_eq!(config.checksum, fnv1a(&config.to_bytes()[..CHECKSUM_OFFSET]));
        assert_eq!(ServoConfig::from_bytes(&config.to_bytes()), Ok(config.clone()));
        assert_eq!(config.frequency.hz(), 50);
        assert_eq!(config.tween, TweenConfig::default());
        assert_eq!(config.last_angle, [90; 4]);
        assert!(!config.channel(ChannelId::Lx).inverted);
        assert!(!config.channel(ChannelId::Ly).inverted);
        assert!(config.channel(ChannelId::Rx).inverted);
        assert!(config.channel(ChannelId::Ry).inverted);
        for cal in &config.channels {
            assert_eq!((cal.min_us, cal.max_us, cal.trim_deg), (500, 2500, 0));
        }
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0x811C_9DC5);
        assert_eq!(fnv1a(b"a"), 0xE40C_292C);
        assert_eq!(fnv1a(b"foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_layout_offsets() {
        let mut config = ServoConfig::new();
        config.channels[1].min_us = 0x0102;
        config.channels[3].max_us = 0x0A0B;
        config.channels[2].trim_deg = -5;
        config.last_angle[0] = 0x0123;
        config.tween = TweenConfig {
            step_deg: 7,
            interval_ms: 0x0304,
        };
        config.frequency = PwmFrequency::Hz60;
        config.update_checksum();

        let bytes = config.to_bytes();
        assert_eq!(&bytes[0..4], &[0x43, 0x43, 0x44, 0x53]);
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[7..9], &[0x02, 0x01]);
        assert_eq!(&bytes[19..21], &[0x0B, 0x0A]);
        assert_eq!(bytes[23], (-5i8) as u8);
        assert_eq!(&bytes[25..29], &[0, 0, 1, 1]);
        assert_eq!(&bytes[29..31], &[0x23, 0x01]);
        assert_eq!(bytes[37], 7);
        assert_eq!(&bytes[38..40], &[0x04, 0x03]);
        assert_eq!(&bytes[40..42], &[60, 0]);
        assert_eq!(&bytes[42..46], &config.checksum.to_le_bytes());
        assert_eq!(config.checksum, fnv1a(&bytes[..42]));
    }

    #[test]
    fn test_decode_round_trip() {
        let mut config = ServoConfig::new();
        config.channels[0].set_range(600, 2400);
        config.channels[1].set_trim(-12);
        config.last_angle = [0, 45, 135, 180];
        config.update_checksum();

        let decoded = ServoConfig::from_bytes(&config.to_bytes()).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_checksum_tracks_fields() {
        let mut config = ServoConfig::new();
        assert!(config.verify_checksum());

        config.channels[0].trim_deg = 3;
        assert!(!config.verify_checksum());

        config.update_checksum();
        assert!(config.verify_checksum());
    }

    #[test]
    fn test_decode_rejections() {
        let good = ServoConfig::new().sealed().to_bytes();
        assert!(ServoConfig::from_bytes(&good).is_ok());

        let mut bytes = good;
        bytes[0] ^= 0xFF;
        assert_eq!(ServoConfig::from_bytes(&bytes), Err(InvalidRecord::BadMagic));

        let mut bytes = good;
        bytes[4] = 2;
        assert_eq!(ServoConfig::from_bytes(&bytes), Err(InvalidRecord::BadVersion));

        let mut bytes = good;
        bytes[44] ^= 0x01;
        assert_eq!(
            ServoConfig::from_bytes(&bytes),
            Err(InvalidRecord::ChecksumMismatch)
        );

        // Erased flash reads back as 0xFF
        assert_eq!(
            ServoConfig::from_bytes(&[0xFF; RECORD_SIZE]),
            Err(InvalidRecord::BadMagic)
        );
    }

    #[test]
    fn test_decode_rejects_out_of_range_fields() {
        let mut config = ServoConfig::new();
        config.channels[2].min_us = 2500;
        config.channels[2].max_us = 2500;
        config.update_checksum();
        assert_eq!(
            ServoConfig::from_bytes(&config.to_bytes()),
            Err(InvalidRecord::OutOfRange)
        );

        let mut bytes = ServoConfig::new().to_bytes();
        bytes[40] = 55;
        let checksum = fnv1a(&bytes[..42]).to_le_bytes();
        bytes[42..46].copy_from_slice(&checksum);
        assert_eq!(ServoConfig::from_bytes(&bytes), Err(InvalidRecord::OutOfRange));

        let mut bytes = ServoConfig::new().to_bytes();
        bytes[26] = 2;
        let checksum = fnv1a(&bytes[..42]).to_le_bytes();
        bytes[42..46].copy_from_slice(&checksum);
        assert_eq!(ServoConfig::from_bytes(&bytes), Err(InvalidRecord::OutOfRange));
    }

    #[test]
    fn test_decode_rejects_trim_beyond_limit() {
        let mut config = ServoConfig::new();
        config.channels[0].trim_deg = 127;
        config.update_checksum();
        assert_eq!(
            ServoConfig::from_bytes(&config.to_bytes()),
            Err(InvalidRecord::OutOfRange)
        );

        config.channels[0].trim_deg = -91;
        config.update_checksum();
        assert_eq!(
            ServoConfig::from_bytes(&config.to_bytes()),
            Err(InvalidRecord::OutOfRange)
        );

        config.channels[0].trim_deg = -90;
        config.update_checksum();
        assert!(ServoConfig::from_bytes(&config.to_bytes()).is_ok());
    }

    #[test]
    fn test_set_range_rejects_inverted_bounds() {
        let mut cal = ChannelCalibration::new(false);
        assert!(!cal.set_range(2400, 600));
        assert!(!cal.set_range(1500, 1500));
        assert_eq!((cal.min_us, cal.max_us), (500, 2500));
        assert!(cal.set_range(600, 2400));
        assert_eq!((cal.min_us, cal.max_us), (600, 2400));
    }

    #[test]
    fn test_trim_and_tween_clamping() {
        let mut cal = ChannelCalibration::new(false);
        assert_eq!(cal.set_trim(120), 90);
        assert_eq!(cal.set_trim(-300), -90);
        assert_eq!(cal.set_trim(-5), -5);

        assert_eq!(
            TweenConfig::clamped(-3, 70_000),
            TweenConfig {
                step_deg: 0,
                interval_ms: u16::MAX
            }
        );
        assert!(TweenConfig::clamped(0, 10).is_disabled());
        assert!(TweenConfig::clamped(5, 0).is_disabled());
        assert!(!TweenConfig::clamped(5, 20).is_disabled());
    }

    #[test]
    fn test_frequency_lookup() {
        assert_eq!(PwmFrequency::from_hz(50), Some(PwmFrequency::Hz50));
        assert_eq!(PwmFrequency::from_hz(60), Some(PwmFrequency::Hz60));
        assert_eq!(PwmFrequency::from_hz(55), None);
        assert_eq!(PwmFrequency::Hz60.hz(), 60);
    }

    proptest! {
        #[test]
        fn prop_single_byte_corruption_is_rejected(
            index in 0usize..RECORD_SIZE,
            mask in 1u8..=255,
        ) {
            let good = ServoConfig::new().sealed().to_bytes();
            prop_assert!(ServoConfig::from_bytes(&good).is_ok());

            let mut bytes = good;
            bytes[index] ^= mask;
            prop_assert!(ServoConfig::from_bytes(&bytes).is_err());
        }

        #[test]
        fn prop_valid_fields_round_trip(
            min in 0u16..3000,
            span in 1u16..3000,
            trim in -90i32..=90,
            inverted in any::<bool>(),
            angle in 0i16..=180,
            step in any::<u8>(),
            interval in any::<u16>(),
        ) {
            let mut config = ServoConfig::new();
            config.channels[1] = ChannelCalibration {
                min_us: min,
                max_us: min + span,
                trim_deg: 0,
                inverted,
            };
            config.channels[1].set_trim(trim);
            config.last_angle[3] = angle;
            config.tween = TweenConfig { step_deg: step, interval_ms: interval };
            config.update_checksum();

            prop_assert_eq!(ServoConfig::from_bytes(&config.to_bytes()), Ok(config));
        }
    }
}
