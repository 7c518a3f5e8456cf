//! Pattern to graph, in one left-to-right pass.
//!
//! The compiler never builds a syntax tree. It keeps a *spine*, the path from
//! the start node to the node most recently attached, and grafts each new
//! construct onto it:
//! - Literals, anchors, groups and classes attach at the tip of the spine.
//! - A quantifier wraps the tip.
//! - `|` searches the spine backward for the nearest node with precedence of
//!   at least 2 (the start node, an open group or an alternation), closes the
//!   branch being built with an `End`, and opens a new branch there.
//! - `)` closes the branch and turns every `End` inside the group into the
//!   group's end node.
use std::ops::Range;

use dlexer_unit::Unit;
use logos::Logos;
use tracing::{debug, trace};

use super::{
    graph::{Graph, NodeId, NodeKind, RepeatMode},
    syntax::PatternToken,
    SyntaxError,
};

const OR_PRECEDENCE: u8 = 2;

enum Member {
    Unit(Unit),
    Range(Unit, Unit),
}

struct Compiler<'p> {
    pattern: &'p str,
    tokens: Vec<(PatternToken, Range<usize>)>,
    line_terminator: u8,
    graph: Graph,
    spine: Vec<NodeId>,
    /// Open group starts and the offsets of their `(`.
    open: Vec<(NodeId, usize)>,
    captures: usize,
    /// Token index of the last quantifier.
    last_quantifier: Option<usize>,
    /// Token index of the last lazy marker.
    last_lazy: Option<usize>,
}

pub(crate) fn compile(pattern: &str, line_terminator: u8) -> Result<Graph, SyntaxError> {
    let tokens = PatternToken::lexer(pattern)
        .spanned()
        .map(|(token, span)| match token {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(SyntaxError::Malformed { at: span.start }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut compiler = Compiler {
        pattern,
        tokens,
        line_terminator,
        graph: Graph::new(),
        spine: Vec::new(),
        open: Vec::new(),
        captures: 0,
        last_quantifier: None,
        last_lazy: None,
    };
    compiler.spine.push(compiler.graph.start());
    compiler.run()?;

    let graph = compiler.graph;
    debug!(
        pattern,
        nodes = graph.len(),
        groups = graph.group_count(),
        "compiled pattern"
    );
    Ok(graph)
}

impl Compiler<'_> {
    fn run(&mut self) -> Result<(), SyntaxError> {
        let mut i = 0;
        while i < self.tokens.len() {
            let (token, span) = self.tokens[i].clone();
            let at = span.start;
            match token {
                PatternToken::Literal | PatternToken::Dash | PatternToken::CloseBracket => {
                    self.literal(span)?
                }
                PatternToken::Escape => {
                    i += 1;
                    let span = self.escaped(i, at)?;
                    self.literal(span)?;
                }
                PatternToken::OpenParen => {
                    let (start, _) = self.graph.push_group_pair(Some(self.captures));
                    self.captures += 1;
                    self.attach(start, at)?;
                    self.open.push((start, at));
                }
                PatternToken::CloseParen => self.close_group(at)?,
                PatternToken::Pipe => self.alternate(at)?,
                PatternToken::Star => self.repeat(i, RepeatMode::ZeroOrMore, at)?,
                PatternToken::Plus => self.repeat(i, RepeatMode::OneOrMore, at)?,
                PatternToken::Question => self.question(i, at)?,
                PatternToken::Caret => {
                    let node = self.graph.push(NodeKind::AtStart);
                    self.attach(node, at)?;
                }
                PatternToken::Dollar => {
                    if self.terminator_follows(i) {
                        // `$` then the line terminator: consume the terminator
                        // first so the anchor is checked on the far side of it.
                        i += 1;
                        let unit = self.graph.push(NodeKind::Unit(Unit::from_byte(
                            self.line_terminator,
                        )));
                        self.attach(unit, at)?;
                    }
                    let node = self.graph.push(NodeKind::AtEnd);
                    self.attach(node, at)?;
                }
                PatternToken::OpenBracket => i = self.class(i)?,
            }
            i += 1;
        }

        if let Some(&(_, at)) = self.open.last() {
            return Err(SyntaxError::UnclosedGroup { at });
        }
        self.close_tip(self.pattern.len())?;
        self.graph.set_group_count(self.captures);
        Ok(())
    }

    fn tip(&self) -> NodeId {
        // The start node is never popped.
        self.spine[self.spine.len() - 1]
    }

    /// The span of the token after an escape at `at`.
    fn escaped(&self, i: usize, at: usize) -> Result<Range<usize>, SyntaxError> {
        match self.tokens.get(i) {
            Some((_, span)) => Ok(span.clone()),
            None => Err(SyntaxError::TrailingEscape { at }),
        }
    }

    fn unit(&self, span: Range<usize>) -> Result<Unit, SyntaxError> {
        self.pattern
            .get(span.clone())
            .and_then(|s| Unit::decode(s.as_bytes()))
            .ok_or(SyntaxError::Malformed { at: span.start })
    }

    fn adapt(&mut self, parent: NodeId, child: NodeId, at: usize) -> Result<(), SyntaxError> {
        trace!(?parent, ?child, kind = ?self.graph[child].kind(), "graft");
        if self.graph.adapt_child(parent, child) {
            Ok(())
        } else {
            Err(SyntaxError::Malformed { at })
        }
    }

    /// Attaches `node` at the tip and makes it the new tip.
    fn attach(&mut self, node: NodeId, at: usize) -> Result<(), SyntaxError> {
        self.adapt(self.tip(), node, at)?;
        self.spine.push(node);
        Ok(())
    }

    /// Ends the branch under construction.
    fn close_tip(&mut self, at: usize) -> Result<(), SyntaxError> {
        let end = self.graph.push(NodeKind::End);
        self.adapt(self.tip(), end, at)
    }

    fn literal(&mut self, span: Range<usize>) -> Result<(), SyntaxError> {
        let at = span.start;
        let unit = self.unit(span)?;
        let node = self.graph.push(NodeKind::Unit(unit));
        self.attach(node, at)
    }

    /// Whether token `i` is a `$` followed by a literal line terminator that
    /// is not itself quantified.
    fn terminator_follows(&self, i: usize) -> bool {
        let Some((PatternToken::Literal, span)) = self.tokens.get(i + 1) else {
            return false;
        };
        let quantified = matches!(self.tokens.get(i + 2), Some((t, _)) if t.is_quantifier());
        self.pattern.as_bytes().get(span.clone()) == Some(&[self.line_terminator][..])
            && !quantified
    }

    /// Index into the spine of the node a new node of precedence `precedence`
    /// attaches to. Literals, anchors and closed groups on the way all have
    /// precedence 1 and are stepped over.
    fn find_superior(&self, precedence: u8) -> usize {
        self.spine
            .iter()
            .rposition(|&id| self.graph[id].precedence() >= precedence)
            .unwrap_or(0)
    }

    fn alternate(&mut self, at: usize) -> Result<(), SyntaxError> {
        let tip = self.spine.len() - 1;
        let i = self.find_superior(OR_PRECEDENCE);
        let superior = self.spine[i];

        if let NodeKind::Or { .. } = self.graph[superior].kind() {
            // Another branch of an existing alternation.
            self.close_tip(at)?;
            self.spine.truncate(i + 1);
            return Ok(());
        }

        let or = self.graph.push(NodeKind::Or { negated: false });
        if i == tip {
            // Nothing before the `|`: the first branch is empty.
            let end = self.graph.push(NodeKind::End);
            self.adapt(or, end, at)?;
            self.adapt(superior, or, at)?;
        } else {
            self.close_tip(at)?;
            self.graph.wrap_last_child(superior, or);
        }
        self.spine.truncate(i + 1);
        self.spine.push(or);
        Ok(())
    }

    fn close_group(&mut self, at: usize) -> Result<(), SyntaxError> {
        let (start, _) = self
            .open
            .pop()
            .ok_or(SyntaxError::UnmatchedParen { at })?;
        let NodeKind::Group { paired: end, .. } = *self.graph[start].kind() else {
            return Err(SyntaxError::Malformed { at });
        };
        self.close_tip(at)?;
        self.graph.rewire_ends(start, end);
        self.graph.close_group(start);

        let i = self
            .spine
            .iter()
            .rposition(|&id| id == start)
            .ok_or(SyntaxError::Malformed { at })?;
        self.spine.truncate(i + 1);
        self.spine.push(end);
        Ok(())
    }

    fn repeat(&mut self, i: usize, mode: RepeatMode, at: usize) -> Result<(), SyntaxError> {
        let tip = self.tip();
        let (head, tail) = match *self.graph[tip].kind() {
            NodeKind::Unit(_) | NodeKind::Range { .. } => (tip, tip),
            NodeKind::Group {
                paired, end: true, ..
            } => (paired, tip),
            _ => return Err(SyntaxError::NothingToRepeat { at }),
        };
        let repeat = self.graph.wrap_repeat(head, tail, mode);
        trace!(?head, ?tail, ?repeat, ?mode, "repeat");

        let head_at = self
            .spine
            .iter()
            .rposition(|&id| id == head)
            .ok_or(SyntaxError::Malformed { at })?;
        self.spine.truncate(head_at);
        self.spine.push(repeat);
        self.last_quantifier = Some(i);
        Ok(())
    }

    /// `?` is a lazy marker right after a quantifier and a quantifier anywhere
    /// else.
    fn question(&mut self, i: usize, at: usize) -> Result<(), SyntaxError> {
        if self.last_quantifier.is_some_and(|q| q + 1 == i) {
            if !self.graph.set_lazy(self.tip()) {
                return Err(SyntaxError::Malformed { at });
            }
            self.last_quantifier = None;
            self.last_lazy = Some(i);
            return Ok(());
        }
        if self.last_lazy.is_some_and(|l| l + 1 == i) {
            return Err(SyntaxError::DanglingLazy { at });
        }
        self.repeat(i, RepeatMode::ZeroOrOne, at)
    }

    /// Parses `[...]` starting at token `i` and returns the index of the `]`.
    fn class(&mut self, i: usize) -> Result<usize, SyntaxError> {
        let open_at = self.tokens[i].1.start;
        let mut j = i + 1;
        let negated = matches!(self.tokens.get(j), Some((PatternToken::Caret, _)));
        if negated {
            j += 1;
        }

        let mut members = Vec::new();
        loop {
            let Some((token, span)) = self.tokens.get(j).cloned() else {
                return Err(SyntaxError::UnclosedClass { at: open_at });
            };
            match token {
                PatternToken::CloseBracket if members.is_empty() => {
                    return Err(SyntaxError::EmptyClass { at: open_at });
                }
                PatternToken::CloseBracket => break,
                PatternToken::Escape => {
                    j += 1;
                    let span = self.escaped(j, span.start)?;
                    members.push(Member::Unit(self.unit(span)?));
                }
                PatternToken::Dash
                    if matches!(members.last(), Some(Member::Unit(_)))
                        && !matches!(
                            self.tokens.get(j + 1),
                            None | Some((PatternToken::CloseBracket, _))
                        ) =>
                {
                    j += 1;
                    let end_span = match self.tokens[j] {
                        (PatternToken::Escape, ref escape) => {
                            j += 1;
                            self.escaped(j, escape.start)?
                        }
                        (_, ref span) => span.clone(),
                    };
                    let end = self.unit(end_span)?;
                    let Some(Member::Unit(start)) = members.pop() else {
                        return Err(SyntaxError::Malformed { at: span.start });
                    };
                    members.push(Self::range(start, end, span.start)?);
                }
                _ => members.push(Member::Unit(self.unit(span)?)),
            }
            j += 1;
        }

        self.build_class(members, negated, open_at)?;
        Ok(j)
    }

    fn range(start: Unit, end: Unit, at: usize) -> Result<Member, SyntaxError> {
        let text = |u: Unit| String::from_utf8_lossy(u.as_bytes()).into_owned();
        if start.len() != end.len() {
            return Err(SyntaxError::RangeLength {
                at,
                start: text(start),
                end: text(end),
            });
        }
        if start > end {
            return Err(SyntaxError::ReversedRange {
                at,
                start: text(start),
                end: text(end),
            });
        }
        Ok(Member::Range(start, end))
    }

    /// A class is an internal group around an alternation of its members.
    ///
    /// A negated class leads every member into a shared `Fail` and puts the
    /// group end last, so the alternation only continues when no member
    /// accepts the cluster.
    fn build_class(
        &mut self,
        members: Vec<Member>,
        negated: bool,
        at: usize,
    ) -> Result<(), SyntaxError> {
        let (open, close) = self.graph.push_group_pair(None);
        let or = self.graph.push(NodeKind::Or { negated });
        self.adapt(open, or, at)?;

        let next = if negated {
            self.graph.push(NodeKind::Fail)
        } else {
            close
        };
        for member in members {
            let node = self.graph.push(match member {
                Member::Unit(unit) => NodeKind::Unit(unit),
                Member::Range(start, end) => NodeKind::Range { start, end },
            });
            self.adapt(node, next, at)?;
            self.adapt(or, node, at)?;
        }
        if negated {
            self.adapt(or, close, at)?;
        }
        self.graph.close_group(open);

        self.attach(open, at)?;
        self.spine.push(close);
        Ok(())
    }
}
