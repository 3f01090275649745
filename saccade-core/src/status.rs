//! Status reporting
//!
//! Text renderings of live state. Line formats are parsed by host tools and
//! must stay stable.

use core::fmt::{self, Write};

use saccade_protocol::ChannelId;

use crate::config::{ServoConfig, RECORD_SIZE};
use crate::tween::TweenScheduler;

/// Bytes per line in a hex dump
pub const HEX_BYTES_PER_LINE: usize = 16;

/// Write the status block
///
/// ```text
/// Angles tgt/cur: LX=90/90 LY=90/90 RX=90/90 RY=90/90
/// Ranges (us): 500-2500 500-2500 500-2500 500-2500
/// Invert: LX=0 LY=0 RX=1 RY=1
/// Trim: 0 0 0 0
/// Freq: 50 Hz
/// Tween: stepDeg=2 intervalMs=10
/// ```
pub fn write_status<W: Write>(
    out: &mut W,
    config: &ServoConfig,
    motion: &TweenScheduler,
) -> fmt::Result {
    out.write_str("Angles tgt/cur:")?;
    for id in ChannelId::ALL {
        let channel = motion.channel(id);
        write!(out, " {}={}/{}", id.name(), channel.target, channel.current)?;
    }
    out.write_str("\r\nRanges (us):")?;
    for cal in &config.channels {
        write!(out, " {}-{}", cal.min_us, cal.max_us)?;
    }
    out.write_str("\r\nInvert:")?;
    for id in ChannelId::ALL {
        write!(out, " {}={}", id.name(), config.channel(id).inverted as u8)?;
    }
    out.write_str("\r\nTrim:")?;
    for cal in &config.channels {
        write!(out, " {}", cal.trim_deg)?;
    }
    write!(
        out,
        "\r\nFreq: {} Hz\r\nTween: stepDeg={} intervalMs={}\r\n",
        config.frequency.hz(),
        config.tween.step_deg,
        config.tween.interval_ms
    )
}

/// Write the record header line
///
/// `record` should be sealed so the checksum matches the fields shown.
pub fn write_record_header<W: Write>(out: &mut W, record: &ServoConfig) -> fmt::Result {
    write!(
        out,
        "Record: magic=0x{:08X} version={} size={} checksum=0x{:08X}\r\n",
        record.magic, record.version, RECORD_SIZE, record.checksum
    )
}

/// Write bytes as uppercase hex pairs, [`HEX_BYTES_PER_LINE`] per line
pub fn write_hex_dump<W: Write>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    for chunk in bytes.chunks(HEX_BYTES_PER_LINE) {
        for (i, byte) in chunk.iter().enumerate() {
            if i > 0 {
                out.write_char(' ')?;
            }
            write!(out, "{:02X}", byte)?;
        }
        out.write_str("\r\n")?;
    }
    Ok(())
}
