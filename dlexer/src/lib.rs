/*!
A small backtracking regex engine for streaming tokenization, with a C code
generator.

## Features
- Patterns are matched over UTF-8 clusters, so `.`-free classes like `[а-я]`
  work on multi-byte characters. Invalid bytes are matched one at a time.
- Tokenization is resumable: a [`Context`](regex::Context) remembers where the
  last token ended, and its [`Cursor`](regex::Cursor) can be parked and
  resumed over the same input with another pattern.
- Capturing groups, ordered alternation, greedy and lazy quantifiers and line
  anchors with a configurable line terminator.
- A compiled pattern can be [lowered to a C program](codegen) that tokenizes
  its input the same way.
*/
//! ## Usage
//! ```
//! use dlexer::regex::Regex;
//!
//! let hay = "let x1 = 42";
//! let re = Regex::new("[a-z]+|[0-9]+")?;
//! let tokens: Vec<&str> = re.tokens(hay).map(|t| &hay[t.span.range()]).collect();
//! assert_eq!(tokens, ["let", "x", "1", "42"]);
//! # Ok::<(), dlexer::regex::SyntaxError>(())
//! ```
//!
//! With a [`Lexer`] owning its input:
//! ```
//! use dlexer::Lexer;
//!
//! let mut lexer = Lexer::new("[0-9]+");
//! lexer.set_input("a1b22");
//! assert_eq!(lexer.get_span()?.map(|s| s.range()), Some(1..2));
//! lexer.reprogram("[a-z]")?;
//! assert_eq!(lexer.get_span()?.map(|s| s.range()), Some(0..1));
//! # Ok::<(), dlexer::regex::SyntaxError>(())
//! ```
//!
//! ## Performance
//! The following `Cargo.toml` settings are recommended if best performance is desired:
//! ```toml
//! [profile.release]
//! lto = "fat"
//! codegen-units = 1
//! ```
//!
//! ## Crate features
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(feature = "doc", doc = document_features::document_features!())]

#[cfg(feature = "codegen")]
pub mod codegen;
pub mod lexer;
pub mod regex;

pub use dlexer_unit as unit;
pub use lexer::Lexer;

#[cfg(test)]
mod tests {
    use crate::{regex::Regex, Lexer};

    #[test]
    fn regex_and_lexer_agree() {
        let pattern = "([a-z]+)|[0-9]+|[^ ]";
        let input = "x1 + y22 - λ";
        let re = Regex::new(pattern).unwrap();
        let from_regex: Vec<_> = re
            .tokens(input)
            .map(|t| input[t.span.range()].to_owned())
            .collect();

        let mut lexer = Lexer::new(pattern);
        lexer.set_input(input);
        let mut token = String::new();
        let mut from_lexer = Vec::new();
        while lexer.get_token(&mut token).unwrap() {
            from_lexer.push(token.clone());
        }
        assert_eq!(from_regex, from_lexer);
        assert_eq!(from_lexer, ["x", "1", "+", "y", "22", "-", "λ"]);
    }
}
