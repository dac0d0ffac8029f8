//! Module for errors.
use std::{
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
};

/// Error from the archive pipeline.
#[derive(Debug)]
pub enum IgraDataErr {
    /// A malformed fixed-width line, with file and line context attached.
    Parse(ParseError),

    // Inherited errors from std
    /// Error forwarded from std
    IO(::std::io::Error),

    // Other forwarded errors
    /// Database error
    Database(::rusqlite::Error),
    /// Error forwarded from the strum crate
    StrumError(strum::ParseError),
    /// General error with any cause information erased and replaced by a string
    GeneralError(String),

    // My own errors from this crate
    /// The database structure is wrong.
    InvalidSchema,
    /// No level rows with a usable height, so no partitions can be planned.
    EmptyArchive,
    /// The partition bucket width must be a positive number of meters.
    InvalidBucketWidth(i64),
    /// The observed height range has its minimum above its maximum.
    InvertedRange {
        /// Observed minimum height.
        min: i64,
        /// Observed maximum height.
        max: i64,
    },
    /// There was an internal logic error.
    LogicError(&'static str),
}

impl Display for IgraDataErr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::IgraDataErr::*;

        match self {
            Parse(err) => write!(f, "{}", err),

            IO(err) => write!(f, "std lib io error: {}", err),

            Database(err) => write!(f, "database error: {}", err),
            StrumError(err) => write!(f, "error forwarded from strum crate: {}", err),
            GeneralError(msg) => write!(f, "general error forwarded: {}", msg),

            InvalidSchema => write!(f, "invalid store format"),
            EmptyArchive => write!(f, "no level data with a usable height in the store"),
            InvalidBucketWidth(width) => write!(f, "invalid bucket width: {}", width),
            InvertedRange { min, max } => {
                write!(f, "inverted height range: min {} > max {}", min, max)
            }
            LogicError(msg) => write!(f, "internal logic error: {}", msg),
        }
    }
}

impl Error for IgraDataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IgraDataErr::IO(err) => Some(err),
            IgraDataErr::Database(err) => Some(err),
            IgraDataErr::StrumError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for IgraDataErr {
    fn from(err: ParseError) -> IgraDataErr {
        IgraDataErr::Parse(err)
    }
}

impl From<::std::io::Error> for IgraDataErr {
    fn from(err: ::std::io::Error) -> IgraDataErr {
        IgraDataErr::IO(err)
    }
}

impl From<::rusqlite::Error> for IgraDataErr {
    fn from(err: ::rusqlite::Error) -> IgraDataErr {
        IgraDataErr::Database(err)
    }
}

impl From<strum::ParseError> for IgraDataErr {
    fn from(err: strum::ParseError) -> IgraDataErr {
        IgraDataErr::StrumError(err)
    }
}

impl From<Box<dyn Error>> for IgraDataErr {
    fn from(err: Box<dyn Error>) -> IgraDataErr {
        IgraDataErr::GeneralError(err.to_string())
    }
}

/// A parse failure for a single fixed-width line, located in its source file.
#[derive(Debug)]
pub struct ParseError {
    /// The file the offending line came from.
    pub file: PathBuf,
    /// One-based line number within that file.
    pub line: u64,
    /// The name of the field that failed to decode.
    pub field: &'static str,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "parse error in {} line {}, field {}: {}",
            self.file.display(),
            self.line,
            self.field,
            self.kind
        )
    }
}

/// The ways a fixed-width line can fail to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The line ended before the field's columns.
    ShortLine {
        /// Length of the line in bytes.
        len: usize,
        /// Bytes needed to reach the end of the field.
        need: usize,
    },
    /// A numeric field held something other than a number.
    BadNumber(String),
    /// A required field was entirely blank.
    Blank,
    /// A level line arrived before any header line in the file.
    OrphanLevel,
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        use crate::errors::ParseErrorKind::*;

        match self {
            ShortLine { len, need } => {
                write!(f, "line too short ({} bytes, field needs {})", len, need)
            }
            BadNumber(text) => write!(f, "not a number: {:?}", text),
            Blank => write!(f, "required field is blank"),
            OrphanLevel => write!(f, "level line before any header line"),
        }
    }
}

/// A parse failure before file and line context are known.
///
/// The parser is pure and never sees a file; the ingestion coordinator calls
/// [`LineError::at`] to attach the context and produce a full [`ParseError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// The name of the field that failed to decode.
    pub field: &'static str,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl LineError {
    /// Locate this error in its source file.
    pub fn at(self, file: &Path, line: u64) -> ParseError {
        ParseError {
            file: file.to_path_buf(),
            line,
            field: self.field,
            kind: self.kind,
        }
    }
}

impl Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "field {}: {}", self.field, self.kind)
    }
}
