//! Parsed controller commands
//!
//! Two grammars share one command type. [`parse_line`] tries the JSON object
//! grammar first and falls back to the keyword grammar when the line is not
//! a well-formed object.

use crate::channel::ChannelSelector;
use crate::object::{self, ObjectCommand};
use crate::token;

/// A command ready to execute against the controller
///
/// Numeric arguments are carried as parsed; range checks happen where the
/// value is applied, so a rejected field never touches live state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Print the command summary
    Help,
    /// Print the status block
    Get,
    /// Set every channel target to 90°
    Center,
    /// Set channel targets
    Set {
        target: ChannelSelector,
        angle: i32,
    },
    /// Set pulse width range in microseconds
    Map {
        target: ChannelSelector,
        min_us: i32,
        max_us: i32,
    },
    /// Set the invert flag
    Invert {
        target: ChannelSelector,
        inverted: bool,
    },
    /// Set the trim offset in degrees
    Trim {
        target: ChannelSelector,
        trim_deg: i32,
    },
    /// Set PWM frequency in Hz
    Freq(i32),
    /// Set tween step (degrees) and interval (milliseconds)
    Tween { step_deg: i32, interval_ms: i32 },
    /// Persist the live configuration
    Save,
    /// Reload the persisted configuration
    Load,
    /// Restore and persist compiled defaults
    ResetConfig,
    /// Print status block plus record header
    DumpConfig,
    /// Print the record as hex bytes
    DumpBinary,
    /// JSON object with any combination of keys
    Object(ObjectCommand),
}

/// Reasons a line was rejected by a grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unrecognized keyword or missing arguments
    UnknownCommand,
    /// Channel id did not resolve
    UnknownChannel,
    /// Argument is not an integer
    BadNumber,
    /// Flag argument is not 0 or 1
    BadFlag,
}

impl ParseError {
    /// Short reason used in `ERR` replies
    pub const fn reason(self) -> &'static str {
        match self {
            ParseError::UnknownCommand => "unknown command",
            ParseError::UnknownChannel => "unknown channel",
            ParseError::BadNumber => "bad number",
            ParseError::BadFlag => "flag must be 0 or 1",
        }
    }
}

/// Result of running one grammar over a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// The grammar recognized the line
    Parsed(T),
    /// The line is not in this grammar; try the next one
    NoMatch,
    /// The line is in this grammar but invalid
    Malformed(ParseError),
}

impl<T> ParseOutcome<T> {
    /// Check if the grammar did not recognize the line
    pub fn is_no_match(&self) -> bool {
        matches!(self, ParseOutcome::NoMatch)
    }
}

impl<T> From<Result<T, ParseError>> for ParseOutcome<T> {
    fn from(result: Result<T, ParseError>) -> Self {
        match result {
            Ok(value) => ParseOutcome::Parsed(value),
            Err(e) => ParseOutcome::Malformed(e),
        }
    }
}

/// Parse one input line in either grammar
///
/// Returns `NoMatch` only for blank lines.
pub fn parse_line(line: &str) -> ParseOutcome<Command> {
    match object::parse_object(line) {
        ParseOutcome::NoMatch => token::parse_tokens(line),
        outcome => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    #[test]
    fn test_object_grammar_first() {
        let outcome = parse_line(r#"{"LX":120}"#);
        match outcome {
            ParseOutcome::Parsed(Command::Object(obj)) => assert_eq!(obj.lx, Some(120)),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_token_grammar_fallback() {
        assert_eq!(
            parse_line("SET LX 120"),
            ParseOutcome::Parsed(Command::Set {
                target: ChannelSelector::Single(ChannelId::Lx),
                angle: 120,
            })
        );
    }

    #[test]
    fn test_broken_object_falls_to_tokens() {
        // Not a well-formed object, and not a keyword either
        assert_eq!(
            parse_line(r#"{"LX":120"#),
            ParseOutcome::Malformed(ParseError::UnknownCommand)
        );
    }

    #[test]
    fn test_blank_line_no_match() {
        assert!(parse_line("").is_no_match());
        assert!(parse_line("   \t ").is_no_match());
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            parse_line("FOO BAR"),
            ParseOutcome::Malformed(ParseError::UnknownCommand)
        );
    }
}
