use thiserror::Error;

/// A malformed pattern. `at` is a byte offset into the pattern.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unmatched `)` at {at}")]
    UnmatchedParen { at: usize },

    #[error("group opened at {at} is never closed")]
    UnclosedGroup { at: usize },

    #[error("character class opened at {at} is never closed")]
    UnclosedClass { at: usize },

    #[error("empty character class at {at}")]
    EmptyClass { at: usize },

    #[error("range {start:?}-{end:?} at {at} has endpoints of different lengths")]
    RangeLength {
        at: usize,
        start: String,
        end: String,
    },

    #[error("range {start:?}-{end:?} at {at} is out of order")]
    ReversedRange {
        at: usize,
        start: String,
        end: String,
    },

    #[error("lazy marker at {at} does not follow a quantifier")]
    DanglingLazy { at: usize },

    #[error("quantifier at {at} has nothing to repeat")]
    NothingToRepeat { at: usize },

    #[error("pattern ends with an escape at {at}")]
    TrailingEscape { at: usize },

    /// The builder was asked to attach a node under a terminal node.
    #[error("malformed pattern at {at}")]
    Malformed { at: usize },
}

impl SyntaxError {
    /// Byte offset into the pattern where the error was found.
    pub fn at(&self) -> usize {
        match *self {
            Self::UnmatchedParen { at }
            | Self::UnclosedGroup { at }
            | Self::UnclosedClass { at }
            | Self::EmptyClass { at }
            | Self::RangeLength { at, .. }
            | Self::ReversedRange { at, .. }
            | Self::DanglingLazy { at }
            | Self::NothingToRepeat { at }
            | Self::TrailingEscape { at }
            | Self::Malformed { at } => at,
        }
    }
}
