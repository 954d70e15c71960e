//! # Arm Equipment Commands
//!
//! Commands understood by the arm firmware and the replies it sends back. The text encoding of
//! each command is part of the firmware interface and must not change.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Stop the arm and move it into its safe position.
pub const STOP_COMMAND: &str = "stop";

/// Prefix of a smooth move to the given joint angles.
pub const MOVE_TO_COMMAND: &str = "moveTo:";

/// Prefix of a direct set of the given joint angles.
pub const SET_COMMAND: &str = "set:";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command to be sent to the arm.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// Stop all motion and return to the safe position.
    Stop,

    /// Move to the given joint angles (degrees) along the firmware's own trajectory.
    MoveTo(Vec<f64>),

    /// Set the given joint angles (degrees).
    Set(Vec<f64>),
}

/// Errors in decoding a reply from the arm.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReplyError {
    #[error("The arm sent no reply")]
    Empty,

    #[error("Expected a 0/1 acceptance flag but the reply was {0:?}")]
    MalformedFlag(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The lines received from the arm in response to a single command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceReply {
    pub lines: Vec<String>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DeviceCommand {
    /// Encode the command into the payload of a frame.
    ///
    /// `Set` angles are formatted to two decimal places, `MoveTo` angles use the shortest
    /// representation that round-trips.
    pub fn encode(&self) -> String {
        match self {
            DeviceCommand::Stop => STOP_COMMAND.to_string(),
            DeviceCommand::MoveTo(angles) => format!(
                "{}{}",
                MOVE_TO_COMMAND,
                angles.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(",")
            ),
            DeviceCommand::Set(angles) => format!(
                "{}{}",
                SET_COMMAND,
                angles.iter().map(|a| format!("{:.2}", a)).collect::<Vec<_>>().join(",")
            ),
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl DeviceReply {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Decode the acceptance flag from the first character of the first line.
    ///
    /// `'1'` means the command was accepted, `'0'` that it was rejected. Anything else, including
    /// leading whitespace, is malformed.
    pub fn flag(&self) -> Result<bool, ReplyError> {
        let first = self.lines.first().ok_or(ReplyError::Empty)?;

        match first.chars().next() {
            Some('1') => Ok(true),
            Some('0') => Ok(false),
            _ => Err(ReplyError::MalformedFlag(first.clone())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_set() {
        let cmd = DeviceCommand::Set(vec![0.0, 15.0, 74.99999, 90.005, -0.5, 0.0]);
        assert_eq!(cmd.encode(), "set:0.00,15.00,75.00,90.00,-0.50,0.00");
    }

    #[test]
    fn test_encode_other() {
        assert_eq!(DeviceCommand::Stop.encode(), "stop");
        assert_eq!(
            DeviceCommand::MoveTo(vec![0.0, 45.5, 90.0]).to_string(),
            "moveTo:0,45.5,90"
        );
    }

    #[test]
    fn test_reply_flag() {
        assert_eq!(DeviceReply::new(vec!["1".into()]).flag(), Ok(true));
        assert_eq!(DeviceReply::new(vec!["0 out of range".into()]).flag(), Ok(false));
        assert_eq!(DeviceReply::new(vec![]).flag(), Err(ReplyError::Empty));
        assert_eq!(
            DeviceReply::new(vec!["ok".into()]).flag(),
            Err(ReplyError::MalformedFlag("ok".into()))
        );
        assert_eq!(
            DeviceReply::new(vec![" 1".into()]).flag(),
            Err(ReplyError::MalformedFlag(" 1".into()))
        );
    }
}
