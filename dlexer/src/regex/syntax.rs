use logos::Logos;

/// One character of a pattern.
///
/// Every token covers exactly one character, so token indices double as
/// character indices when checking adjacency.
#[derive(Logos, Clone, Copy, Debug, PartialEq)]
pub(crate) enum PatternToken {
    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token("^")]
    Caret,

    #[token("$")]
    Dollar,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    /// Only special inside brackets.
    #[token("-")]
    Dash,

    #[token(r"\")]
    Escape,

    /// Any other character, including multi-byte ones.
    #[regex(r"[^()|*+?^$\[\]\-\\]")]
    Literal,
}

impl PatternToken {
    pub fn is_quantifier(self) -> bool {
        matches!(self, Self::Star | Self::Plus | Self::Question)
    }
}
