//! JSON object command grammar
//!
//! A line that is a single JSON object may carry any combination of keys:
//!
//! ```text
//! {"X":90,"Y":45}                                   pair targets
//! {"LX":120,"RY":60}                                channel targets
//! {"center":true}
//! {"map":{"ALL":[500,2500]}}  {"map":{"LX":[600,2400]}}
//! {"invert":{"RX":true}}
//! {"trim":{"LY":-4}}
//! {"tween":{"step_deg":2,"interval_ms":10}}
//! {"freq":60}
//! {"save":true} {"load":true} {"dumpcfg":true} {"dumpbin":true}
//! ```
//!
//! Unknown keys are ignored. Values are validated by the controller when
//! applied, one key at a time. Target angles wider than `i32` saturate so
//! they clamp like any other out-of-range angle.

use serde::{Deserialize, Deserializer};

use crate::channel::ChannelId;
use crate::command::{Command, ParseOutcome};

/// Per-channel values keyed by channel name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct PerChannel<T> {
    #[serde(rename = "LX")]
    pub lx: Option<T>,
    #[serde(rename = "LY")]
    pub ly: Option<T>,
    #[serde(rename = "RX")]
    pub rx: Option<T>,
    #[serde(rename = "RY")]
    pub ry: Option<T>,
}

impl<T: Copy> PerChannel<T> {
    /// Value for one channel, if present
    pub fn get(&self, id: ChannelId) -> Option<T> {
        match id {
            ChannelId::Lx => self.lx,
            ChannelId::Ly => self.ly,
            ChannelId::Rx => self.rx,
            ChannelId::Ry => self.ry,
        }
    }

    /// Present values in channel order
    pub fn entries(&self) -> impl Iterator<Item = (ChannelId, T)> + '_ {
        ChannelId::ALL
            .into_iter()
            .filter_map(move |id| self.get(id).map(|value| (id, value)))
    }

    /// Check if no channel key was given
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

/// `map` key: pulse ranges as `[min_us, max_us]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct MapObject {
    /// Range applied to every channel
    #[serde(rename = "ALL")]
    pub all: Option<[i32; 2]>,
    #[serde(rename = "LX")]
    pub lx: Option<[i32; 2]>,
    #[serde(rename = "LY")]
    pub ly: Option<[i32; 2]>,
    #[serde(rename = "RX")]
    pub rx: Option<[i32; 2]>,
    #[serde(rename = "RY")]
    pub ry: Option<[i32; 2]>,
}

impl MapObject {
    /// Per-channel ranges, applied after `ALL`
    pub fn channels(&self) -> PerChannel<[i32; 2]> {
        PerChannel {
            lx: self.lx,
            ly: self.ly,
            rx: self.rx,
            ry: self.ry,
        }
    }
}

/// `tween` key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct TweenObject {
    pub step_deg: Option<i32>,
    pub interval_ms: Option<i32>,
}

/// A decoded JSON command object
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct ObjectCommand {
    /// Horizontal pair target
    #[serde(rename = "X", deserialize_with = "saturating_angle")]
    pub x: Option<i32>,
    /// Vertical pair target
    #[serde(rename = "Y", deserialize_with = "saturating_angle")]
    pub y: Option<i32>,
    #[serde(rename = "LX", deserialize_with = "saturating_angle")]
    pub lx: Option<i32>,
    #[serde(rename = "LY", deserialize_with = "saturating_angle")]
    pub ly: Option<i32>,
    #[serde(rename = "RX", deserialize_with = "saturating_angle")]
    pub rx: Option<i32>,
    #[serde(rename = "RY", deserialize_with = "saturating_angle")]
    pub ry: Option<i32>,
    pub center: Option<bool>,
    pub map: Option<MapObject>,
    pub invert: Option<PerChannel<bool>>,
    pub trim: Option<PerChannel<i32>>,
    pub tween: Option<TweenObject>,
    pub freq: Option<i32>,
    pub save: Option<bool>,
    pub load: Option<bool>,
    pub dumpcfg: Option<bool>,
    pub dumpbin: Option<bool>,
}

impl ObjectCommand {
    /// Per-channel target keys as a [`PerChannel`]
    pub fn channel_targets(&self) -> PerChannel<i32> {
        PerChannel {
            lx: self.lx,
            ly: self.ly,
            rx: self.rx,
            ry: self.ry,
        }
    }
}

fn saturating_angle<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = i64::deserialize(deserializer)?;
    Ok(Some(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32))
}

/// Parse a JSON object command line
///
/// Anything that is not a well-formed object is `NoMatch`, so the caller
/// can hand the line to the keyword grammar.
pub fn parse_object(line: &str) -> ParseOutcome<Command> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return ParseOutcome::NoMatch;
    }
    match serde_json_core::from_str::<ObjectCommand>(trimmed) {
        Ok((object, _consumed)) => ParseOutcome::Parsed(Command::Object(object)),
        Err(_) => ParseOutcome::NoMatch,
    }
}
