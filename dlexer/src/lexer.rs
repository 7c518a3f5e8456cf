//! A tokenizer that owns its input and can be reprogrammed between tokens.
//!
//! ```
//! use dlexer::Lexer;
//!
//! let mut lexer = Lexer::new("[a-z]+");
//! lexer.set_input("let x = y");
//! let mut token = String::new();
//! let mut tokens = Vec::new();
//! while lexer.get_token(&mut token)? {
//!     tokens.push(token.clone());
//! }
//! assert_eq!(tokens, ["let", "x", "y"]);
//! # Ok::<(), dlexer::regex::SyntaxError>(())
//! ```
#[cfg(feature = "codegen")]
use std::path::Path;

use tracing::debug;

#[cfg(feature = "codegen")]
use crate::codegen::{CodegenError, Program};
use crate::regex::{Context, Cursor, Regex, Span, SyntaxError};

#[derive(Debug)]
pub struct Lexer {
    regex: Result<Regex, SyntaxError>,
    input: String,
    cursor: Cursor,
}

impl Lexer {
    /// Creates a lexer for `pattern` with empty input.
    ///
    /// A malformed pattern is reported by the first call that needs it.
    pub fn new(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern),
            input: String::new(),
            cursor: Cursor::new(),
        }
    }

    /// Replaces the pattern and rewinds to the start of the input.
    ///
    /// On error the lexer holds no usable pattern until the next successful
    /// `reprogram`.
    pub fn reprogram(&mut self, pattern: &str) -> Result<(), SyntaxError> {
        debug!(pattern, "reprogram");
        self.cursor.reset();
        self.regex = Regex::new(pattern);
        self.regex.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    /// Replaces the input and rewinds to its start.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
        self.cursor.reset();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn regex(&self) -> Result<&Regex, &SyntaxError> {
        self.regex.as_ref()
    }

    /// Finds the next token and returns its byte offsets in the input.
    pub fn get_span(&mut self) -> Result<Option<Span>, SyntaxError> {
        let regex = self.regex.as_ref().map_err(Clone::clone)?;
        let mut cx = Context::with_cursor(&self.input, std::mem::take(&mut self.cursor));
        let span = regex.next_span(&mut cx);
        self.cursor = cx.into_cursor();
        Ok(span)
    }

    /// Copies the next token into `out`, replacing its contents. Returns
    /// whether a token was found.
    pub fn get_token(&mut self, out: &mut String) -> Result<bool, SyntaxError> {
        out.clear();
        let Some(span) = self.get_span()? else {
            return Ok(false);
        };
        // Spans of valid UTF-8 input always fall on char boundaries.
        if let Some(token) = self.input.get(span.range()) {
            out.push_str(token);
        }
        Ok(true)
    }

    /// Span of capturing group `i` in the last token.
    pub fn group(&self, i: usize) -> Option<Span> {
        Context::with_cursor(&self.input, self.cursor.clone()).group(i)
    }

    /// Writes a C program that tokenizes its input with the current pattern.
    #[cfg(feature = "codegen")]
    pub fn generate_program(&self, path: impl AsRef<Path>) -> Result<(), CodegenError> {
        let regex = self.regex.as_ref().map_err(|e| CodegenError::NoPattern(e.clone()))?;
        Program::default().write(regex, path)
    }
}
