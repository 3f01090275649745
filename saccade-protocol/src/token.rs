//! Keyword command grammar
//!
//! ```text
//! HELP | GET | CENTER
//! SET <id> <angle>
//! MAP <id> <minUs> <maxUs>
//! INVERT <id> <0|1>
//! TRIM <id> <deg>
//! FREQ <50|60>
//! TWEEN <stepDeg> <intervalMs>
//! SAVE | LOAD | RESETCFG | DUMPCFG | DUMPBIN
//! ```
//!
//! Keywords and channel ids are case-insensitive. Trailing tokens beyond the
//! expected arguments are ignored.

use core::num::IntErrorKind;
use core::str::SplitAsciiWhitespace;

use crate::channel::ChannelSelector;
use crate::command::{Command, ParseError, ParseOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Help,
    Get,
    Center,
    Set,
    Map,
    Invert,
    Trim,
    Freq,
    Tween,
    Save,
    Load,
    ResetConfig,
    DumpConfig,
    DumpBinary,
}

const KEYWORDS: [(&str, Keyword); 14] = [
    ("HELP", Keyword::Help),
    ("GET", Keyword::Get),
    ("CENTER", Keyword::Center),
    ("SET", Keyword::Set),
    ("MAP", Keyword::Map),
    ("INVERT", Keyword::Invert),
    ("TRIM", Keyword::Trim),
    ("FREQ", Keyword::Freq),
    ("TWEEN", Keyword::Tween),
    ("SAVE", Keyword::Save),
    ("LOAD", Keyword::Load),
    ("RESETCFG", Keyword::ResetConfig),
    ("DUMPCFG", Keyword::DumpConfig),
    ("DUMPBIN", Keyword::DumpBinary),
];

/// One-line usage per keyword, printed by `HELP`
pub const HELP_LINES: [&str; 14] = [
    "HELP                      this summary",
    "GET                       print status",
    "CENTER                    all targets to 90",
    "SET <id> <angle>          id: ALL X Y LX LY RX RY 0-3",
    "MAP <id> <minUs> <maxUs>  pulse range, min < max",
    "INVERT <id> <0|1>         mirror channel",
    "TRIM <id> <deg>           offset -90..90",
    "FREQ <50|60>              PWM frequency",
    "TWEEN <stepDeg> <ms>      0 disables tweening",
    "SAVE                      persist config",
    "LOAD                      reload persisted config",
    "RESETCFG                  restore and persist defaults",
    "DUMPCFG                   status plus record header",
    "DUMPBIN                   record as hex",
];

impl Keyword {
    fn parse(token: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, keyword)| *keyword)
    }
}

/// Parse a keyword command line
///
/// Returns `NoMatch` for a blank line. Any other line either parses or is
/// `Malformed`.
pub fn parse_tokens(line: &str) -> ParseOutcome<Command> {
    let mut tokens = line.split_ascii_whitespace();
    let Some(first) = tokens.next() else {
        return ParseOutcome::NoMatch;
    };
    let Some(keyword) = Keyword::parse(first) else {
        return ParseOutcome::Malformed(ParseError::UnknownCommand);
    };
    parse_arguments(keyword, &mut tokens).into()
}

fn parse_arguments(
    keyword: Keyword,
    tokens: &mut SplitAsciiWhitespace<'_>,
) -> Result<Command, ParseError> {
    let command = match keyword {
        Keyword::Help => Command::Help,
        Keyword::Get => Command::Get,
        Keyword::Center => Command::Center,
        Keyword::Save => Command::Save,
        Keyword::Load => Command::Load,
        Keyword::ResetConfig => Command::ResetConfig,
        Keyword::DumpConfig => Command::DumpConfig,
        Keyword::DumpBinary => Command::DumpBinary,
        Keyword::Set => {
            let [id, angle] = take::<2>(tokens)?;
            Command::Set {
                target: selector(id)?,
                angle: number(angle)?,
            }
        }
        Keyword::Map => {
            let [id, min_us, max_us] = take::<3>(tokens)?;
            Command::Map {
                target: selector(id)?,
                min_us: number(min_us)?,
                max_us: number(max_us)?,
            }
        }
        Keyword::Invert => {
            let [id, flag_token] = take::<2>(tokens)?;
            Command::Invert {
                target: selector(id)?,
                inverted: flag(flag_token)?,
            }
        }
        Keyword::Trim => {
            let [id, trim] = take::<2>(tokens)?;
            Command::Trim {
                target: selector(id)?,
                trim_deg: number(trim)?,
            }
        }
        Keyword::Freq => {
            let [hz] = take::<1>(tokens)?;
            Command::Freq(number(hz)?)
        }
        Keyword::Tween => {
            let [step, interval] = take::<2>(tokens)?;
            Command::Tween {
                step_deg: number(step)?,
                interval_ms: number(interval)?,
            }
        }
    };
    Ok(command)
}

/// Take exactly `N` argument tokens; too few is an unknown command
fn take<'a, const N: usize>(
    tokens: &mut SplitAsciiWhitespace<'a>,
) -> Result<[&'a str; N], ParseError> {
    let mut args = [""; N];
    for arg in args.iter_mut() {
        *arg = tokens.next().ok_or(ParseError::UnknownCommand)?;
    }
    Ok(args)
}

fn selector(token: &str) -> Result<ChannelSelector, ParseError> {
    ChannelSelector::parse(token).ok_or(ParseError::UnknownChannel)
}

/// Parse an integer argument, saturating at the `i32` bounds
///
/// Every numeric argument is clamped or range-checked where it is applied,
/// so an oversized value behaves like the nearest bound.
fn number(token: &str) -> Result<i32, ParseError> {
    match token.parse::<i32>() {
        Ok(value) => Ok(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i32::MAX),
            IntErrorKind::NegOverflow => Ok(i32::MIN),
            _ => Err(ParseError::BadNumber),
        },
    }
}

fn flag(token: &str) -> Result<bool, ParseError> {
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseError::BadFlag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    fn parsed(line: &str) -> Command {
        match parse_tokens(line) {
            ParseOutcome::Parsed(cmd) => cmd,
            other => panic!("{:?} did not parse: {:?}", line, other),
        }
    }

    #[test]
    fn test_bare_keywords() {
        assert_eq!(parsed("HELP"), Command::Help);
        assert_eq!(parsed("get"), Command::Get);
        assert_eq!(parsed("Center"), Command::Center);
        assert_eq!(parsed("SAVE"), Command::Save);
        assert_eq!(parsed("load"), Command::Load);
        assert_eq!(parsed("RESETCFG"), Command::ResetConfig);
        assert_eq!(parsed("DUMPCFG"), Command::DumpConfig);
        assert_eq!(parsed("dumpbin"), Command::DumpBinary);
    }

    #[test]
    fn test_set_variants() {
        assert_eq!(
            parsed("SET ALL 45"),
            Command::Set {
                target: ChannelSelector::All,
                angle: 45
            }
        );
        assert_eq!(
            parsed("set y -20"),
            Command::Set {
                target: ChannelSelector::PairY,
                angle: -20
            }
        );
        assert_eq!(
            parsed("SET 2 300"),
            Command::Set {
                target: ChannelSelector::Single(ChannelId::Rx),
                angle: 300
            }
        );
    }

    #[test]
    fn test_map() {
        assert_eq!(
            parsed("MAP LX 600 2400"),
            Command::Map {
                target: ChannelSelector::Single(ChannelId::Lx),
                min_us: 600,
                max_us: 2400,
            }
        );
    }

    #[test]
    fn test_invert_flag_values() {
        assert_eq!(
            parsed("INVERT RY 1"),
            Command::Invert {
                target: ChannelSelector::Single(ChannelId::Ry),
                inverted: true,
            }
        );
        assert_eq!(
            parse_tokens("INVERT RY 2"),
            ParseOutcome::Malformed(ParseError::BadFlag)
        );
    }

    #[test]
    fn test_trim_freq_tween() {
        assert_eq!(
            parsed("TRIM LY -7"),
            Command::Trim {
                target: ChannelSelector::Single(ChannelId::Ly),
                trim_deg: -7,
            }
        );
        assert_eq!(parsed("FREQ 60"), Command::Freq(60));
        assert_eq!(
            parsed("TWEEN 5 20"),
            Command::Tween {
                step_deg: 5,
                interval_ms: 20
            }
        );
    }

    #[test]
    fn test_missing_arguments_is_unknown_command() {
        for line in ["SET", "SET LX", "MAP LX 600", "INVERT LX", "FREQ", "TWEEN 5", "TRIM RX"] {
            assert_eq!(
                parse_tokens(line),
                ParseOutcome::Malformed(ParseError::UnknownCommand),
                "{}",
                line
            );
        }
    }

    #[test]
    fn test_bad_arguments() {
        assert_eq!(
            parse_tokens("SET QQ 10"),
            ParseOutcome::Malformed(ParseError::UnknownChannel)
        );
        assert_eq!(
            parse_tokens("SET LX ten"),
            ParseOutcome::Malformed(ParseError::BadNumber)
        );
        assert_eq!(
            parse_tokens("FREQ 50Hz"),
            ParseOutcome::Malformed(ParseError::BadNumber)
        );
    }

    #[test]
    fn test_oversized_numbers_saturate() {
        assert_eq!(
            parsed("SET LX 3000000000"),
            Command::Set {
                target: ChannelSelector::Single(ChannelId::Lx),
                angle: i32::MAX,
            }
        );
        assert_eq!(
            parsed("TRIM RY -99999999999999999999"),
            Command::Trim {
                target: ChannelSelector::Single(ChannelId::Ry),
                trim_deg: i32::MIN,
            }
        );
        assert_eq!(
            parse_tokens("SET LX 3e9"),
            ParseOutcome::Malformed(ParseError::BadNumber)
        );
    }

    #[test]
    fn test_trailing_tokens_ignored() {
        assert_eq!(parsed("GET now please"), Command::Get);
        assert_eq!(parsed("FREQ 50 60"), Command::Freq(50));
    }

    #[test]
    fn test_whitespace_tolerance() {
        assert_eq!(
            parsed("  SET\tX   90  "),
            Command::Set {
                target: ChannelSelector::PairX,
                angle: 90
            }
        );
    }

    #[test]
    fn test_help_covers_every_keyword() {
        for (name, _) in KEYWORDS {
            assert!(
                HELP_LINES.iter().any(|line| line.starts_with(name)),
                "{} missing from help",
                name
            );
        }
    }
}
