//! Command interpreter
//!
//! Turns the serial byte stream into controller operations. Each completed
//! line is parsed and executed synchronously, and answered with exactly one
//! `OK ...` or `ERR ...` line. `HELP`, `GET`, `DUMPCFG` and `DUMPBIN` print
//! their output before that line.

use core::fmt::{self, Write};

use heapless::Vec;
use saccade_hal::{PwmChannels, RecordSlot};
use saccade_protocol::token::HELP_LINES;
use saccade_protocol::{
    parse_line, ChannelSelector, Command, LineBuffer, LineError, ObjectCommand,
    ParseOutcome,
};

use crate::controller::{ControlError, Controller};
use crate::status::{write_hex_dump, write_record_header, write_status};

/// Largest number of distinct keys reported for a JSON object
const MAX_OBJECT_KEYS: usize = 16;

/// Summary of one answered line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handled {
    /// Command keyword, `JSON`, or the rejection reason
    pub command: &'static str,
    /// Reply started with `OK`
    pub ok: bool,
}

impl Handled {
    const fn ok(command: &'static str) -> Self {
        Self { command, ok: true }
    }

    const fn err(command: &'static str) -> Self {
        Self {
            command,
            ok: false,
        }
    }
}

/// Line-buffering command interpreter
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    lines: LineBuffer,
}

impl Interpreter {
    /// Create an interpreter with an empty line buffer
    pub const fn new() -> Self {
        Self {
            lines: LineBuffer::new(),
        }
    }

    /// Feed one input byte
    ///
    /// Returns `Some` when a line was answered. Blank lines are consumed
    /// silently.
    pub fn feed<P, S, W>(
        &mut self,
        byte: u8,
        controller: &mut Controller<P, S>,
        out: &mut W,
    ) -> Result<Option<Handled>, fmt::Error>
    where
        P: PwmChannels,
        S: RecordSlot,
        W: Write,
    {
        match self.lines.feed(byte) {
            Ok(None) => Ok(None),
            Ok(Some(line)) => execute_line(line.as_str(), controller, out),
            Err(LineError::TooLong) => reject(out, "line too long").map(Some),
            Err(LineError::Encoding) => reject(out, "bad encoding").map(Some),
        }
    }

    /// Feed a run of input bytes, returning how many lines were answered
    pub fn feed_all<P, S, W>(
        &mut self,
        bytes: &[u8],
        controller: &mut Controller<P, S>,
        out: &mut W,
    ) -> Result<usize, fmt::Error>
    where
        P: PwmChannels,
        S: RecordSlot,
        W: Write,
    {
        let mut answered = 0;
        for &byte in bytes {
            if self.feed(byte, controller, out)?.is_some() {
                answered += 1;
            }
        }
        Ok(answered)
    }
}

fn reject<W: Write>(out: &mut W, reason: &'static str) -> Result<Handled, fmt::Error> {
    write!(out, "ERR {}\r\n", reason)?;
    Ok(Handled::err(reason))
}

/// Parse and execute one complete line
///
/// Returns `None` for a blank line.
pub fn execute_line<P, S, W>(
    line: &str,
    controller: &mut Controller<P, S>,
    out: &mut W,
) -> Result<Option<Handled>, fmt::Error>
where
    P: PwmChannels,
    S: RecordSlot,
    W: Write,
{
    match parse_line(line) {
        ParseOutcome::NoMatch => Ok(None),
        ParseOutcome::Malformed(e) => reject(out, e.reason()).map(Some),
        ParseOutcome::Parsed(command) => execute(command, controller, out).map(Some),
    }
}

/// Execute a parsed command and write its reply
pub fn execute<P, S, W>(
    command: Command,
    controller: &mut Controller<P, S>,
    out: &mut W,
) -> Result<Handled, fmt::Error>
where
    P: PwmChannels,
    S: RecordSlot,
    W: Write,
{
    match command {
        Command::Help => {
            for line in HELP_LINES {
                write!(out, "{}\r\n", line)?;
            }
            out.write_str("OK HELP\r\n")?;
            Ok(Handled::ok("HELP"))
        }
        Command::Get => {
            write_status(out, controller.config(), controller.motion())?;
            out.write_str("OK GET\r\n")?;
            Ok(Handled::ok("GET"))
        }
        Command::Center => {
            controller.center();
            out.write_str("OK CENTER all=90\r\n")?;
            Ok(Handled::ok("CENTER"))
        }
        Command::Set { target, angle } => {
            let angle = controller.set_target(target, angle);
            write!(out, "OK SET {}={}\r\n", target.name(), angle)?;
            Ok(Handled::ok("SET"))
        }
        Command::Map {
            target,
            min_us,
            max_us,
        } => match controller.set_range(target, min_us, max_us) {
            Ok((min, max)) => {
                write!(out, "OK MAP {} {}-{}\r\n", target.name(), min, max)?;
                Ok(Handled::ok("MAP"))
            }
            Err(e) => command_error(out, "MAP", e),
        },
        Command::Invert { target, inverted } => {
            controller.set_inverted(target, inverted);
            write!(out, "OK INVERT {}={}\r\n", target.name(), inverted as u8)?;
            Ok(Handled::ok("INVERT"))
        }
        Command::Trim { target, trim_deg } => {
            let trim = controller.set_trim(target, trim_deg);
            write!(out, "OK TRIM {}={}\r\n", target.name(), trim)?;
            Ok(Handled::ok("TRIM"))
        }
        Command::Freq(hz) => match controller.set_frequency(hz) {
            Ok(frequency) => {
                write!(out, "OK FREQ {} Hz\r\n", frequency.hz())?;
                Ok(Handled::ok("FREQ"))
            }
            Err(e) => command_error(out, "FREQ", e),
        },
        Command::Tween {
            step_deg,
            interval_ms,
        } => {
            let tween = controller.set_tween(step_deg, interval_ms);
            write!(
                out,
                "OK TWEEN stepDeg={} intervalMs={}\r\n",
                tween.step_deg, tween.interval_ms
            )?;
            Ok(Handled::ok("TWEEN"))
        }
        Command::Save => persistence(out, "SAVE", controller.save()),
        Command::Load => persistence(out, "LOAD", controller.load()),
        Command::ResetConfig => persistence(out, "RESETCFG", controller.reset_config()),
        Command::DumpConfig => {
            write_status(out, controller.config(), controller.motion())?;
            write_record_header(out, &controller.record())?;
            out.write_str("OK DUMPCFG\r\n")?;
            Ok(Handled::ok("DUMPCFG"))
        }
        Command::DumpBinary => {
            write_hex_dump(out, &controller.record_bytes())?;
            out.write_str("OK DUMPBIN\r\n")?;
            Ok(Handled::ok("DUMPBIN"))
        }
        Command::Object(object) => execute_object(&object, controller, out),
    }
}

fn command_error<W: Write>(
    out: &mut W,
    command: &'static str,
    e: ControlError,
) -> Result<Handled, fmt::Error> {
    write!(out, "ERR {} {}\r\n", command, e.reason())?;
    Ok(Handled::err(command))
}

fn persistence<W: Write>(
    out: &mut W,
    command: &'static str,
    result: Result<(), ControlError>,
) -> Result<Handled, fmt::Error> {
    match result {
        Ok(()) => {
            write!(out, "OK {}\r\n", command)?;
            Ok(Handled::ok(command))
        }
        Err(e) => command_error(out, command, e),
    }
}

/// Keys applied and rejected while executing one object
#[derive(Default)]
struct KeyLedger {
    applied: Vec<&'static str, MAX_OBJECT_KEYS>,
    rejected: Vec<&'static str, MAX_OBJECT_KEYS>,
}

impl KeyLedger {
    fn record(&mut self, key: &'static str, ok: bool) {
        let list = if ok {
            &mut self.applied
        } else {
            &mut self.rejected
        };
        if !list.contains(&key) {
            // Every key name is distinct and fits
            let _ = list.push(key);
        }
    }
}

/// Apply a JSON object
///
/// Keys apply in a fixed order: load, targets, center, map, invert, trim,
/// tween, freq, save, then dump output. A rejected key does not stop the
/// others.
fn execute_object<P, S, W>(
    object: &ObjectCommand,
    controller: &mut Controller<P, S>,
    out: &mut W,
) -> Result<Handled, fmt::Error>
where
    P: PwmChannels,
    S: RecordSlot,
    W: Write,
{
    let mut keys = KeyLedger::default();

    if object.load == Some(true) {
        keys.record("load", controller.load().is_ok());
    }

    if let Some(angle) = object.x {
        controller.set_target(ChannelSelector::PairX, angle);
        keys.record("X", true);
    }
    if let Some(angle) = object.y {
        controller.set_target(ChannelSelector::PairY, angle);
        keys.record("Y", true);
    }
    for (id, angle) in object.channel_targets().entries() {
        controller.set_target(id.into(), angle);
        keys.record(id.name(), true);
    }

    if object.center == Some(true) {
        controller.center();
        keys.record("center", true);
    }

    if let Some(map) = &object.map {
        if let Some([min, max]) = map.all {
            let ok = controller.set_range(ChannelSelector::All, min, max).is_ok();
            keys.record("map", ok);
        }
        for (id, [min, max]) in map.channels().entries() {
            let ok = controller.set_range(id.into(), min, max).is_ok();
            keys.record("map", ok);
        }
    }

    if let Some(invert) = &object.invert {
        for (id, inverted) in invert.entries() {
            controller.set_inverted(id.into(), inverted);
            keys.record("invert", true);
        }
    }

    if let Some(trim) = &object.trim {
        for (id, trim_deg) in trim.entries() {
            controller.set_trim(id.into(), trim_deg);
            keys.record("trim", true);
        }
    }

    if let Some(tween) = object.tween {
        let current = controller.config().tween;
        controller.set_tween(
            tween.step_deg.unwrap_or(current.step_deg as i32),
            tween.interval_ms.unwrap_or(current.interval_ms as i32),
        );
        keys.record("tween", true);
    }

    if let Some(hz) = object.freq {
        keys.record("freq", controller.set_frequency(hz).is_ok());
    }

    if object.save == Some(true) {
        keys.record("save", controller.save().is_ok());
    }

    if object.dumpcfg == Some(true) {
        write_status(out, controller.config(), controller.motion())?;
        write_record_header(out, &controller.record())?;
        keys.record("dumpcfg", true);
    }
    if object.dumpbin == Some(true) {
        write_hex_dump(out, &controller.record_bytes())?;
        keys.record("dumpbin", true);
    }

    if keys.rejected.is_empty() {
        out.write_str("OK JSON")?;
        for key in &keys.applied {
            write!(out, " {}", key)?;
        }
        out.write_str("\r\n")?;
        Ok(Handled::ok("JSON"))
    } else {
        out.write_str("ERR JSON rejected")?;
        for key in &keys.rejected {
            write!(out, " {}", key)?;
        }
        out.write_str("\r\n")?;
        Ok(Handled::err("JSON"))
    }
}
