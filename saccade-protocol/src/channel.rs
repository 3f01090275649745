//! Channel identity and id resolution
//!
//! The controller drives four servo channels with fixed identities. Hosts
//! address them by two-letter name, by numeric index, or through a group
//! alias. All accepted spellings live in [`SELECTOR_TABLE`]; nothing else in
//! the firmware resolves channel names.

/// Number of servo channels
pub const CHANNEL_COUNT: usize = 4;

/// Logical servo channel
///
/// The discriminant is the hardware index used in the persisted record and
/// in PWM writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChannelId {
    /// Left eye, horizontal
    Lx = 0,
    /// Left eye, vertical
    Ly = 1,
    /// Right eye, horizontal
    Rx = 2,
    /// Right eye, vertical
    Ry = 3,
}

impl ChannelId {
    /// All channels in reporting order (LX, LY, RX, RY)
    pub const ALL: [ChannelId; CHANNEL_COUNT] =
        [ChannelId::Lx, ChannelId::Ly, ChannelId::Rx, ChannelId::Ry];

    /// Hardware index (0-3)
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a channel by hardware index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wire name of the channel
    pub const fn name(self) -> &'static str {
        match self {
            ChannelId::Lx => "LX",
            ChannelId::Ly => "LY",
            ChannelId::Rx => "RX",
            ChannelId::Ry => "RY",
        }
    }
}

/// A set of channels addressed by one command argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelSelector {
    /// Every channel
    All,
    /// Horizontal pair (LX, RX)
    PairX,
    /// Vertical pair (LY, RY)
    PairY,
    /// One channel
    Single(ChannelId),
}

/// Every accepted spelling, matched case-insensitively
const SELECTOR_TABLE: [(&str, ChannelSelector); 11] = [
    ("ALL", ChannelSelector::All),
    ("X", ChannelSelector::PairX),
    ("Y", ChannelSelector::PairY),
    ("LX", ChannelSelector::Single(ChannelId::Lx)),
    ("LY", ChannelSelector::Single(ChannelId::Ly)),
    ("RX", ChannelSelector::Single(ChannelId::Rx)),
    ("RY", ChannelSelector::Single(ChannelId::Ry)),
    ("0", ChannelSelector::Single(ChannelId::Lx)),
    ("1", ChannelSelector::Single(ChannelId::Ly)),
    ("2", ChannelSelector::Single(ChannelId::Rx)),
    ("3", ChannelSelector::Single(ChannelId::Ry)),
];

impl ChannelSelector {
    /// Resolve a command argument to a selector
    pub fn parse(token: &str) -> Option<Self> {
        SELECTOR_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, selector)| *selector)
    }

    /// Channels covered by this selector, in reporting order
    pub fn channels(self) -> &'static [ChannelId] {
        match self {
            ChannelSelector::All => &ChannelId::ALL,
            ChannelSelector::PairX => &[ChannelId::Lx, ChannelId::Rx],
            ChannelSelector::PairY => &[ChannelId::Ly, ChannelId::Ry],
            ChannelSelector::Single(ChannelId::Lx) => &[ChannelId::Lx],
            ChannelSelector::Single(ChannelId::Ly) => &[ChannelId::Ly],
            ChannelSelector::Single(ChannelId::Rx) => &[ChannelId::Rx],
            ChannelSelector::Single(ChannelId::Ry) => &[ChannelId::Ry],
        }
    }

    /// Canonical name used in replies
    pub const fn name(self) -> &'static str {
        match self {
            ChannelSelector::All => "ALL",
            ChannelSelector::PairX => "X",
            ChannelSelector::PairY => "Y",
            ChannelSelector::Single(id) => id.name(),
        }
    }
}

impl From<ChannelId> for ChannelSelector {
    fn from(id: ChannelId) -> Self {
        ChannelSelector::Single(id)
    }
}
