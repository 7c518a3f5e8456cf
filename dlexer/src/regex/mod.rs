/*!
A backtracking regex engine for pulling tokens out of text.

## Syntax
- Literal characters, including multi-byte ones. There is no `.` wildcard.
- `(...)`: capturing group.
- `a|b`: alternation. Branches are tried left to right and the first one that
  leads to a match wins.
- `*`, `+`, `?`: greedy quantifiers. Follow one with `?` to make it lazy.
- `^`: matches anywhere but in the middle of a line, i.e. at the start of the
  input, next to a line terminator, or at the end of the input.
- `$`: matches next to a line terminator or at the end of the input.
- `[abc]`, `[a-z]`, `[^a-z]`: character classes. Range endpoints must encode
  to the same number of bytes. A `-` at either end of a class is literal.
- `\`: the next character is a literal.

## Example
```
use dlexer::regex::Regex;

let re = Regex::new("[a-z]+|[0-9]+")?;
let mut cx = re.context("abc 123");
assert_eq!(re.next_token(&mut cx), Some(&b"abc"[..]));
assert_eq!(re.next_token(&mut cx), Some(&b"123"[..]));
assert_eq!(re.next_token(&mut cx), None);
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Empty matches
A pattern that can match the empty string yields an empty token wherever
nothing longer matches, and the search then steps one character forward.
`a*` over `"a b"` yields `"a"`, `""` (at the space), `""` (at `b`) and `""`
(at the end of the input).
*/
use std::{ops::Range, sync::Arc};

use bon::bon;

mod backtrack;
mod compile;
mod error;
pub mod graph;
mod syntax;

pub use backtrack::{Context, Cursor, LineState};
pub use error::SyntaxError;
use graph::Graph;

/// Byte offsets of a match in a haystack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.range()
    }
}

/// A match and the spans of its capturing groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub span: Span,
    pub groups: Vec<Option<Span>>,
}

/// A compiled pattern.
///
/// Compiling is the only expensive step. A `Regex` is immutable and cheap to
/// clone, and can be shared between threads as long as each thread searches
/// with its own [`Context`].
///
/// # Example
/// ```
/// use dlexer::regex::{Regex, Span};
///
/// let re = Regex::new("([a-z]+)|([0-9]+)")?;
/// let mut cx = re.context("abc 123");
/// assert_eq!(re.next_span(&mut cx), Some(Span::new(0, 3)));
/// assert_eq!(cx.group(0), Some(Span::new(0, 3)));
/// assert_eq!(cx.group(1), None);
/// assert_eq!(re.next_span(&mut cx), Some(Span::new(4, 7)));
/// assert_eq!(cx.group(0), None);
/// assert_eq!(cx.group(1), Some(Span::new(4, 7)));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug)]
pub struct Regex {
    pattern: Arc<str>,
    graph: Arc<Graph>,
    line_terminator: u8,
}

#[bon]
impl Regex {
    pub fn new(pattern: &str) -> Result<Self, SyntaxError> {
        Self::builder().build(pattern)
    }

    /// Return a builder for configuring the construction of a `Regex`.
    ///
    /// # Example: change the line terminator
    /// ```
    /// use dlexer::regex::Regex;
    ///
    /// let re = Regex::builder().line_terminator(b'\0').build("^a$")?;
    /// let tokens: Vec<_> = re.tokens("a\0ba\0a").map(|t| t.span.range()).collect();
    /// assert_eq!(tokens, vec![0..1, 5..6]);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    #[builder(builder_type = Builder, finish_fn(name = build, doc {
    /// Compiles `pattern`.
    ///
    /// Fails with a [`SyntaxError`] if the pattern is malformed.
    }))]
    pub fn builder(
        #[builder(finish_fn)] pattern: &str,
        /// The byte that separates lines for `^` and `$`. Defaults to `\n`.
        #[builder(default = b'\n')]
        line_terminator: u8,
    ) -> Result<Self, SyntaxError> {
        let graph = compile::compile(pattern, line_terminator)?;
        Ok(Self {
            pattern: pattern.into(),
            graph: Arc::new(graph),
            line_terminator,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Number of capturing groups.
    pub fn group_count(&self) -> usize {
        self.graph.group_count()
    }

    pub fn line_terminator(&self) -> u8 {
        self.line_terminator
    }

    /// The compiled node graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Starts a search over `haystack`.
    pub fn context<'h, H: AsRef<[u8]> + ?Sized>(&self, haystack: &'h H) -> Context<'h> {
        Context::new(haystack)
    }

    /// Finds the next match at or after the context's position and moves the
    /// context past it.
    ///
    /// Returns `None` once the input is exhausted, and on every call after
    /// that.
    pub fn next_span(&self, cx: &mut Context<'_>) -> Option<Span> {
        backtrack::next_span(&self.graph, self.line_terminator, cx)
    }

    /// Like [`Regex::next_span`] but returns the matched bytes.
    pub fn next_token<'h>(&self, cx: &mut Context<'h>) -> Option<&'h [u8]> {
        let span = self.next_span(cx)?;
        cx.haystack().get(span.range())
    }

    /// Copies the next match into `out`, replacing its contents. Returns
    /// whether a match was found; `out` is left empty if not.
    pub fn get_token(&self, out: &mut Vec<u8>, cx: &mut Context<'_>) -> bool {
        out.clear();
        match self.next_token(cx) {
            Some(token) => {
                out.extend_from_slice(token);
                true
            }
            None => false,
        }
    }

    /// Iterates over all tokens in `haystack`.
    pub fn tokens<'r, 'h, H: AsRef<[u8]> + ?Sized>(&'r self, haystack: &'h H) -> Tokens<'r, 'h> {
        Tokens {
            regex: self,
            cx: self.context(haystack),
        }
    }
}

/// Iterator returned by [`Regex::tokens`].
#[derive(Debug)]
pub struct Tokens<'r, 'h> {
    regex: &'r Regex,
    cx: Context<'h>,
}

impl Iterator for Tokens<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let span = self.regex.next_span(&mut self.cx)?;
        Some(Token {
            span,
            groups: self.cx.groups().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    fn tokens(pattern: &str, haystack: &str) -> Vec<String> {
        let re = Regex::new(pattern).unwrap();
        let mut cx = re.context(haystack);
        let mut out = Vec::new();
        let mut tokens = Vec::new();
        while re.get_token(&mut out, &mut cx) {
            tokens.push(String::from_utf8(out.clone()).unwrap());
        }
        tokens
    }

    fn check(pattern: &str, haystack: &str, expected: &[&str]) {
        assert_eq!(
            tokens(pattern, haystack),
            expected,
            "{pattern:?} over {haystack:?}"
        );
    }

    #[test]
    fn literals() {
        check("a", "a", &["a"]);
        check("a", "aa", &["a", "a"]);
        check("aa", "aa", &["aa"]);
        check("b", "ab", &["b"]);
        check("b", "a", &[]);
        check("ab", "aab", &["ab"]);
        check("a", "", &[]);
        check("я", "яблоко", &["я"]);
    }

    #[test]
    fn alternation() {
        check("a|b", "ab", &["a", "b"]);
        check("ab|ba", "aba abba", &["ab", "ab", "ba"]);
        check("(a|b|c)", "abc", &["a", "b", "c"]);
        check("(a|b|c)*", "abc", &["abc", ""]);
        check("(a)|b", "ab", &["a", "b"]);
        check("a(b)c|d", "abc d", &["abc", "d"]);
        check("[a]b|c", "ab c", &["ab", "c"]);
        check("(ab)*c|d", "abc d c", &["abc", "d", "c"]);
    }

    #[test]
    fn repetition() {
        check("a*", "a", &["a", ""]);
        check("a*", "a aa aaa", &["a", "", "aa", "", "aaa", ""]);
        check("ba*", "a ba baa", &["ba", "baa"]);
        check("a*", " ", &["", ""]);
        check("(a*)", " ", &["", ""]);
        check("(a)*", " ", &["", ""]);
        check("(ab)*", "abab", &["abab", ""]);
        check("(ab)+", "abab", &["abab"]);
        check("(aa)+", "a aa aaa", &["aa", "aa"]);
        check("ab?c", "ac abc abbc", &["ac", "abc"]);
    }

    #[test]
    fn ordered_choice() {
        check("aa|(ab)*", "ababaa", &["abab", "aa", ""]);
        check("aa|(a|b)*", "ababaa", &["ababaa", ""]);
        check("(ab)*|aa", "ababaa", &["abab", "", "", ""]);
    }

    #[test]
    fn anchors() {
        check("^a", "aa", &["a"]);
        check("^a|ba", "aba", &["a", "ba"]);
        check("(^a)|ba", "aba", &["a", "ba"]);
        check("^(a)|ba", "aba", &["a", "ba"]);
        check("^(a)$", "a\na", &["a", "a"]);
        check("(^(a)$\n^)|b", "a\na\nb", &["a\n", "a\n", "b"]);
        check("a$", "ab a", &["a"]);
    }

    #[test]
    fn line_end_at_input_start() {
        let re = Regex::new("$").unwrap();
        let got: Vec<_> = re.tokens("\nx").map(|t| t.span.range()).collect();
        assert_eq!(got, vec![0..0, 1..1, 2..2]);
    }

    #[test]
    fn escapes() {
        check(r"\^", "^", &["^"]);
        check(r"^\^", "^^", &["^"]);
        check(r"\(a(ab)", "aab(aab (aab", &["(aab", "(aab"]);
        check(r"\[\*\]", "[*]", &["[*]"]);
    }

    #[test]
    fn classes() {
        check("[^a]", "abcaa", &["b", "c"]);
        check("[^a-z]", "abc123", &["1", "2", "3"]);
        check("[^a-z]*", "abc123ая", &["", "", "", "123ая", ""]);
        check("[a-z]*|[1-9]*", "abc123ая", &["abc", "", "", "", "", "", ""]);
        check("[1-9]*|[a-z]*", "abc123ая", &["", "", "", "123", "", "", ""]);
        check("[1-9]+|[a-z]*", "abc123ая", &["abc", "123", "", "", ""]);
        check("[1-9]+|[a-z]+", "abc123ая", &["abc", "123"]);
        check("[-+]?[0-9]+", "x-1 +22 3", &["-1", "+22", "3"]);
    }

    #[test]
    fn laziness() {
        assert_eq!(tokens("(ab)*?a", "aba")[0], "a");
        check("(ab)*?a", "aba", &["a", "a"]);
        check("(ab)+?a", "aba", &["aba"]);
        check("[а-ю]*?я", "абв абвабв", &[]);
        check("[а-ю]*?я", "абвя абвабвя", &["абвя", "абвабвя"]);
        check("a??b", "ab b", &["ab", "b"]);
        check("<a+?", "<aaa", &["<a"]);
    }

    #[test]
    fn nested_empty_loops_terminate() {
        check("(a*)*", "aab", &["aa", "", ""]);
        check("(a*)+b", "aab b", &["aab", "b"]);
        check("(a|b*)*c", "abbc", &["abbc"]);
    }

    #[test]
    fn captures() {
        let re = Regex::new("([a-z]+)|([0-9]+)").unwrap();
        let got: Vec<_> = re
            .tokens("abc 123 a1")
            .map(|t| {
                (
                    t.span.range(),
                    t.groups
                        .iter()
                        .map(|g| g.map(|g| g.range()))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();
        assert_eq!(
            got,
            vec![
                (0..3, vec![Some(0..3), None]),
                (4..7, vec![None, Some(4..7)]),
                (8..9, vec![Some(8..9), None]),
                (9..10, vec![None, Some(9..10)]),
            ]
        );
    }

    #[test]
    fn captures_keep_last_stamp() {
        // The abandoned second iteration still stamped the group start, and
        // the accepted path never revisits the group.
        let re = Regex::new("(ab)*a").unwrap();
        let token = re.tokens("aba").next().unwrap();
        assert_eq!(token.span, Span::new(0, 3));
        assert_eq!(token.groups, vec![Some(Span::new(2, 2))]);

        // A start without a later end reads as unset.
        let re = Regex::new("x(a)?y").unwrap();
        let token = re.tokens("xy").next().unwrap();
        assert_eq!(token.groups, vec![None]);
    }

    #[test]
    fn exhaustion_is_sticky() {
        let re = Regex::new("a*").unwrap();
        let mut cx = re.context("a");
        assert_eq!(re.next_span(&mut cx), Some(Span::new(0, 1)));
        assert!(!cx.is_exhausted());
        assert_eq!(re.next_span(&mut cx), Some(Span::new(1, 1)));
        assert!(cx.is_exhausted());
        assert_eq!(cx.line_state(), LineState::PastEnd);
        assert_eq!(re.next_span(&mut cx), None);
        assert_eq!(re.next_span(&mut cx), None);

        cx.reset();
        assert_eq!(re.next_span(&mut cx), Some(Span::new(0, 1)));
    }

    #[test]
    fn get_token_clears_buffer() {
        let re = Regex::new("b").unwrap();
        let mut cx = re.context("a");
        let mut out = b"stale".to_vec();
        assert!(!re.get_token(&mut out, &mut cx));
        assert!(out.is_empty());
    }

    #[test]
    fn malformed_input_steps_bytewise() {
        let re = Regex::new("[^a]").unwrap();
        let hay: &[u8] = &[0xD1, b'a', 0x80, 0xF0, 0x9F, 0x98, 0x80];
        let got: Vec<_> = re.tokens(hay).map(|t| t.span.range()).collect();
        assert_eq!(got, vec![0..1, 2..3, 3..7]);
    }

    #[test]
    fn shared_between_threads() {
        let re = Regex::new("[0-9]+").unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let re = re.clone();
                std::thread::spawn(move || {
                    let text = format!("{i} x {i}{i}");
                    re.tokens(&text)
                        .map(|t| t.span.len())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![1, 2]);
        }
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            Regex::new("(a"),
            Err(SyntaxError::UnclosedGroup { at: 0 })
        ));
        assert_eq!(Regex::new("a)").unwrap_err().at(), 1);
        assert_eq!(
            Regex::new("[a-я]").unwrap_err().to_string(),
            r#"range "a"-"я" at 2 has endpoints of different lengths"#
        );
    }

    proptest! {
        #[test]
        fn recompiling_is_idempotent(
            pattern in "[ab()|*+?]{0,8}",
            haystack in "[ab \n]{0,16}",
        ) {
            if let Ok(first) = Regex::new(&pattern) {
                let second = Regex::new(&pattern).unwrap();
                let a: Vec<_> = first.tokens(&haystack).collect();
                let b: Vec<_> = second.tokens(&haystack).collect();
                prop_assert_eq!(a, b);
            }
        }

        #[test]
        fn spans_move_forward(
            pattern in "[ab()|*+?\\[\\]^$-]{0,8}",
            haystack in "[abя \n]{0,16}",
        ) {
            if let Ok(re) = Regex::new(&pattern) {
                let mut last_end = 0;
                let mut last_start = None;
                for token in re.tokens(&haystack) {
                    prop_assert!(token.span.start() >= last_end);
                    prop_assert!(last_start.map_or(true, |s| token.span.start() > s));
                    prop_assert!(token.span.end() <= haystack.len());
                    prop_assert!(haystack.is_char_boundary(token.span.start()));
                    prop_assert!(haystack.is_char_boundary(token.span.end()));
                    last_end = token.span.end();
                    last_start = Some(token.span.start());
                }
            }
        }

        #[test]
        fn literal_count(n in 0usize..8, gap in "[b ]{1,3}") {
            let haystack = vec!["ab"; n].join(&gap);
            let re = Regex::new("ab").unwrap();
            prop_assert_eq!(re.tokens(&haystack).count(), n);
        }
    }
}
