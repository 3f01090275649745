//! Saccade serial command protocol
//!
//! This crate defines the line-oriented text protocol spoken between a host
//! (GUI, face tracker, terminal) and the servo controller. Every line is
//! either a JSON object or a whitespace separated keyword command:
//!
//! ```text
//! {"LX":120,"tween":{"step_deg":2,"interval_ms":10}}\n
//! SET X 45\n
//! ```
//!
//! Lines end with `\n`; `\r` is ignored wherever it appears. The controller
//! answers every command with exactly one line starting with `OK` or `ERR`.

#![no_std]
#![deny(unsafe_code)]

pub mod channel;
pub mod command;
pub mod line;
pub mod object;
pub mod token;

pub use channel::{ChannelId, ChannelSelector, CHANNEL_COUNT};
pub use command::{parse_line, Command, ParseError, ParseOutcome};
pub use line::{Line, LineBuffer, LineError, MAX_LINE_LEN};
pub use object::{MapObject, ObjectCommand, PerChannel, TweenObject};
