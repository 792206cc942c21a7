//! Parse errors.

use std::fmt;

use serde::Serialize;

use crate::validate::SchemaError;

/// Category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownFlag,
    MissingValue,
    InvalidValue,
    UnexpectedPositional,
    RequiredMissing,
    UnknownCommand,
    CommandRequired,
    DuplicateDefinition,
    InvalidDefinition,
    /// Not a failure: the message holds the rendered help text.
    HelpRequested,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownFlag => "unknown_flag",
            Self::MissingValue => "missing_value",
            Self::InvalidValue => "invalid_value",
            Self::UnexpectedPositional => "unexpected_positional",
            Self::RequiredMissing => "required_missing",
            Self::UnknownCommand => "unknown_command",
            Self::CommandRequired => "command_required",
            Self::DuplicateDefinition => "duplicate_definition",
            Self::InvalidDefinition => "invalid_definition",
            Self::HelpRequested => "help_requested",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parse failure or a help request.
///
/// # Examples
///
/// ```
/// use flagtree_core::{Command, ErrorKind, OptionParser, OptionSpec};
///
/// let root = Command::new("prog").with_option(OptionSpec::flag(Some('v'), Some("verbose")));
/// let mut parser = OptionParser::new(root).unwrap();
///
/// let err = parser.parse(["--nope"]).unwrap_err();
/// assert_eq!(err.kind, ErrorKind::UnknownFlag);
/// assert_eq!(err.to_string(), "unknown flag `nope'");
///
/// let help = parser.parse(["--help"]).unwrap_err();
/// assert!(help.is_help());
/// assert!(help.message.starts_with("Usage:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this is a help request rather than a failure.
    pub fn is_help(&self) -> bool {
        self.kind == ErrorKind::HelpRequested
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
