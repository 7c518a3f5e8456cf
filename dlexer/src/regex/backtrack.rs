/*!
An iterative backtracking matcher.

The search is a depth-first walk of the [`Graph`] on an explicit stack of
frames, each holding a node and the index of the next child to try. Children
are tried in order and the first path that reaches an `End` node wins, so
alternation is ordered and quantifiers are greedy unless marked lazy.

When every path from a start position fails, the search moves the start
position forward by one cluster and tries again.
*/
use dlexer_unit::{cluster, Unit};
use tracing::trace;

use super::{
    graph::{Graph, NodeId, NodeKind, UnitUsage},
    Span,
};

/// Where the cursor sits relative to line boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineState {
    /// At the start of the input.
    LineStart,
    MidLine,
    /// Right before or right after a line terminator.
    LineEnd,
    EndOfInput,
    /// Searching is over. Every further search reports no match.
    PastEnd,
}

impl LineState {
    fn at(haystack: &[u8], pos: usize, terminator: u8) -> Self {
        if pos >= haystack.len() {
            Self::EndOfInput
        } else if haystack[pos] == terminator || (pos > 0 && haystack[pos - 1] == terminator) {
            Self::LineEnd
        } else if pos == 0 {
            Self::LineStart
        } else {
            Self::MidLine
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Slot {
    start: Option<usize>,
    end: Option<usize>,
}

impl Slot {
    fn span(self) -> Option<Span> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Some(Span { start, end }),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Frame {
    node: NodeId,
    /// Next child to try.
    next: usize,
    /// Cursor position after the node was entered.
    at: usize,
    /// The node consumed the cluster before `at`.
    consumed: bool,
}

/// The resumable part of a [`Context`], detached from its haystack.
///
/// A cursor remembers the search position, whether the input is exhausted,
/// and the captures of the last match. Its frame stack is kept between
/// searches to reuse the allocation.
#[derive(Clone, Debug, Default)]
pub struct Cursor {
    pos: usize,
    past_end: bool,
    stack: Vec<Frame>,
    groups: Vec<Slot>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset where the next search starts.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Rewinds to the start of the input.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.past_end = false;
        self.stack.clear();
        self.groups.clear();
    }
}

/// A haystack and the position of the search in it.
///
/// A `Context` is created once per input and passed to every call of
/// [`Regex::next_span`](super::Regex::next_span). It can be used with
/// different regexes, but never by two threads at once.
#[derive(Clone, Debug)]
pub struct Context<'h> {
    haystack: &'h [u8],
    cursor: Cursor,
}

impl<'h> Context<'h> {
    pub fn new<H: AsRef<[u8]> + ?Sized>(haystack: &'h H) -> Self {
        Self::with_cursor(haystack, Cursor::new())
    }

    /// Resumes a search over `haystack` from a parked cursor.
    ///
    /// A cursor parked past the end of `haystack` resumes at its end.
    pub fn with_cursor<H: AsRef<[u8]> + ?Sized>(haystack: &'h H, mut cursor: Cursor) -> Self {
        let haystack = haystack.as_ref();
        if cursor.pos > haystack.len() {
            cursor.pos = haystack.len();
            cursor.stack.clear();
        }
        Self { haystack, cursor }
    }

    /// Detaches the cursor from the haystack.
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }

    pub fn haystack(&self) -> &'h [u8] {
        self.haystack
    }

    pub fn position(&self) -> usize {
        self.cursor.pos
    }

    /// Line state at the current position with `\n` as the terminator.
    pub fn line_state(&self) -> LineState {
        self.line_state_with(b'\n')
    }

    pub fn line_state_with(&self, terminator: u8) -> LineState {
        if self.cursor.past_end {
            LineState::PastEnd
        } else {
            LineState::at(self.haystack, self.cursor.pos, terminator)
        }
    }

    /// Whether the input is exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.cursor.past_end
    }

    /// Span of capturing group `i` (0-based, in order of `(`) in the last
    /// match, or `None` if the group did not take part in it.
    pub fn group(&self, i: usize) -> Option<Span> {
        self.cursor.groups.get(i).and_then(|slot| slot.span())
    }

    /// Spans of all capturing groups in the last match.
    pub fn groups(&self) -> impl Iterator<Item = Option<Span>> + '_ {
        self.cursor.groups.iter().map(|slot| slot.span())
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    fn step_over(&self, pos: usize) -> Option<usize> {
        match cluster::width(&self.haystack[pos.min(self.haystack.len())..]) {
            0 => None,
            n => Some(pos + n),
        }
    }
}

enum Eval {
    Fail,
    Enter { seed: usize, consumed: usize },
    Accept,
}

/// Finds the next match at or after the context's position.
pub(crate) fn next_span(graph: &Graph, terminator: u8, cx: &mut Context<'_>) -> Option<Span> {
    if cx.cursor.past_end {
        return None;
    }
    let mut start = cx.cursor.pos;
    loop {
        cx.cursor.pos = start;
        cx.cursor.stack.clear();
        cx.cursor.groups.clear();
        cx.cursor.groups.resize(graph.group_count(), Slot::default());

        if search(graph, terminator, cx) {
            let end = cx.cursor.pos;
            if start == end {
                // An empty match still moves the search forward.
                match cx.step_over(end) {
                    Some(next) => cx.cursor.pos = next,
                    None => cx.cursor.past_end = true,
                }
            }
            trace!(start, end, "match");
            return Some(Span { start, end });
        }

        match cx.step_over(start) {
            Some(next) => start = next,
            None => {
                trace!(start, "exhausted");
                cx.cursor.pos = cx.haystack.len();
                cx.cursor.past_end = true;
                return None;
            }
        }
    }
}

/// Runs one anchored search from the cursor position. On success the cursor
/// is left at the end of the match.
fn search(graph: &Graph, terminator: u8, cx: &mut Context<'_>) -> bool {
    cx.cursor.stack.push(Frame {
        node: graph.start(),
        next: 0,
        at: cx.cursor.pos,
        consumed: false,
    });

    while let Some(top) = cx.cursor.stack.last() {
        let Some(&child) = graph[top.node].children().get(top.next) else {
            pop(cx);
            continue;
        };
        match eval(graph, terminator, cx, child) {
            Eval::Accept => return true,
            Eval::Fail => {
                if let Some(top) = cx.cursor.stack.last_mut() {
                    top.next += 1;
                }
            }
            Eval::Enter { seed, consumed } => {
                cx.cursor.pos += consumed;
                cx.cursor.stack.push(Frame {
                    node: child,
                    next: seed,
                    at: cx.cursor.pos,
                    consumed: consumed > 0,
                });
            }
        }
    }
    false
}

/// Drops the top frame, rewinding the cluster it consumed, and moves its
/// parent on to the next child.
///
/// Capture stamps are left as they are: a later path through the same group
/// overwrites them.
fn pop(cx: &mut Context<'_>) {
    let Some(frame) = cx.cursor.stack.pop() else {
        return;
    };
    if frame.consumed {
        cx.cursor.pos = frame.at - cluster::len_backward(&cx.haystack[..frame.at]);
    }
    if let Some(parent) = cx.cursor.stack.last_mut() {
        parent.next += 1;
    }
}

fn eval(graph: &Graph, terminator: u8, cx: &mut Context<'_>, id: NodeId) -> Eval {
    let node = &graph[id];
    let pos = cx.cursor.pos;
    let unit = match node.usage() {
        UnitUsage::Consume => match Unit::decode(&cx.haystack[pos..]) {
            Some(unit) => Some(unit),
            None => return Eval::Fail,
        },
        UnitUsage::NoUnit => None,
    };
    let enter = |consumed| Eval::Enter { seed: 0, consumed };

    match *node.kind() {
        NodeKind::Unit(_) | NodeKind::Range { .. } => match unit {
            Some(unit) if node.accepts(&unit) => enter(unit.len()),
            _ => Eval::Fail,
        },
        NodeKind::Or { negated: false } => enter(0),
        NodeKind::Or { negated: true } => {
            let Some(unit) = unit else {
                return Eval::Fail;
            };
            let Some((_, excluded)) = node.children().split_last() else {
                return Eval::Fail;
            };
            if excluded.iter().any(|&c| graph[c].accepts(&unit)) {
                return Eval::Fail;
            }
            // Only the last child continues.
            Eval::Enter {
                seed: excluded.len(),
                consumed: unit.len(),
            }
        }
        NodeKind::Repeat { .. } => {
            // Re-entering a loop without consuming anything cannot lead
            // anywhere new.
            let looping = cx
                .cursor
                .stack
                .iter()
                .rev()
                .find(|frame| frame.node == id)
                .is_some_and(|frame| frame.at == pos);
            if looping {
                Eval::Fail
            } else {
                enter(0)
            }
        }
        NodeKind::Group { id: None, .. } => enter(0),
        NodeKind::Group {
            id: Some(i), end, ..
        } => {
            let slots = &mut cx.cursor.groups;
            if i >= slots.len() {
                slots.resize(i + 1, Slot::default());
            }
            if end {
                slots[i].end = Some(pos);
            } else {
                slots[i].start = Some(pos);
            }
            enter(0)
        }
        NodeKind::AtStart => match LineState::at(cx.haystack, pos, terminator) {
            LineState::MidLine => Eval::Fail,
            _ => enter(0),
        },
        NodeKind::AtEnd => match LineState::at(cx.haystack, pos, terminator) {
            LineState::LineEnd | LineState::EndOfInput => enter(0),
            _ => Eval::Fail,
        },
        NodeKind::End => Eval::Accept,
        NodeKind::Start | NodeKind::Fail => Eval::Fail,
    }
}
