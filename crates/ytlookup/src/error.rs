use std::fmt;

use crate::resolve::FormatSelection;

/// Failures surfaced by the search and resolve operations.
#[derive(Debug)]
pub enum LookupError {
    /// A required argument was missing or blank.
    Usage(String),
    /// The extractor returned no usable entry for the query.
    NoResults { query: String },
    /// The top entry did not carry a requested format matching the selection.
    UnsupportedFormatLayout {
        selection: FormatSelection,
        available: usize,
    },
    /// The extractor could not be run or its output could not be read.
    External(String),
}

impl LookupError {
    pub fn external(message: impl Into<String>) -> Self {
        Self::External(message.into())
    }

    /// Process exit code used by the binary for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            LookupError::Usage(_) => 1,
            LookupError::NoResults { .. } => 2,
            LookupError::UnsupportedFormatLayout { .. } => 3,
            LookupError::External(_) => 4,
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Usage(message) => write!(f, "usage error: {message}"),
            LookupError::NoResults { query } => write!(f, "no results found for '{query}'"),
            LookupError::UnsupportedFormatLayout {
                selection,
                available,
            } => write!(
                f,
                "unsupported format layout: wanted {selection} but the top entry lists {available} requested format(s)"
            ),
            LookupError::External(message) => write!(f, "extractor failed: {message}"),
        }
    }
}

impl std::error::Error for LookupError {}
