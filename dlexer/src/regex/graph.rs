/*!
The node graph a pattern compiles into.

All nodes live in one arena owned by [`Graph`] and refer to each other by
[`NodeId`]. Edges are the ordered `children` of a node; the order is the order
in which the matcher tries them. Repetition is a cycle: the tail of a repeated
subtree links back to its [`Repeat`](NodeKind::Repeat) node.

The compiler keeps these invariants, and both the matcher and the code
generator rely on them:
- Every leaf reachable from [`Graph::start`] is [`End`](NodeKind::End) or
  [`Fail`](NodeKind::Fail).
- Every group start has exactly one paired group end and vice versa.
*/
use std::ops::Index;

use dlexer_unit::Unit;

/// A handle to a node in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatMode {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `?`
    ZeroOrOne,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Matches one literal cluster.
    Unit(Unit),
    /// The root. Never matched itself.
    Start,
    /// One half of a parenthesis pair.
    ///
    /// `id` is the capture slot, `None` for the internal groups that wrap
    /// character classes.
    Group {
        id: Option<usize>,
        paired: NodeId,
        end: bool,
    },
    /// Alternation.
    ///
    /// An inclusive `Or` tries each child in order and consumes nothing. A
    /// negated `Or` consumes one cluster, fails if any child but the last
    /// accepts it, and otherwise continues with the last child.
    Or { negated: bool },
    /// A quantifier. `tail` is the last node of the repeated subtree.
    Repeat {
        mode: RepeatMode,
        lazy: bool,
        tail: NodeId,
    },
    /// A successful match path ends here.
    End,
    /// `^`
    AtStart,
    /// `$`
    AtEnd,
    /// Any cluster in `start..=end`, which have the same length.
    Range { start: Unit, end: Unit },
    /// A path that always fails.
    Fail,
}

/// Whether evaluating a node needs the next cluster of the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitUsage {
    Consume,
    NoUnit,
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
    precedence: u8,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        let precedence = match kind {
            NodeKind::Start => 6,
            // A group end sits after its group, never around a later branch.
            NodeKind::Group { end: false, .. } | NodeKind::Or { .. } => 2,
            _ => 1,
        };
        Self {
            kind,
            children: Vec::new(),
            precedence,
        }
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attachment priority used while compiling. Higher values bind looser:
    /// an alternation attaches to the nearest node on the current path whose
    /// precedence is at least its own.
    #[inline]
    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn usage(&self) -> UnitUsage {
        match self.kind {
            NodeKind::Unit(_) | NodeKind::Range { .. } | NodeKind::Or { negated: true } => {
                UnitUsage::Consume
            }
            _ => UnitUsage::NoUnit,
        }
    }

    /// `End` and `Fail` never take children.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::End | NodeKind::Fail)
    }

    /// Whether a literal node accepts `unit`. Structural nodes accept nothing.
    pub fn accepts(&self, unit: &Unit) -> bool {
        match &self.kind {
            NodeKind::Unit(u) => u == unit,
            NodeKind::Range { start, end } => unit.within(start, end),
            _ => false,
        }
    }
}

/// A compiled pattern's node arena.
#[derive(Clone, Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    groups: usize,
}

#[allow(clippy::len_without_is_empty)]
impl Graph {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Start)],
            groups: 0,
        }
    }

    /// The root node.
    #[inline]
    pub fn start(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena, including unreachable ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of capturing groups.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// Returns the first reachable leaf that is neither `End` nor `Fail`.
    pub fn find_dangling_leaf(&self) -> Option<NodeId> {
        self.reachable()
            .into_iter()
            .find(|&id| self[id].children.is_empty() && !self[id].is_terminal())
    }

    /// Nodes reachable from the start, in depth-first preorder with children
    /// visited in order.
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![self.start()];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(self[id].children.iter().rev());
        }
        order
    }

    pub(crate) fn set_group_count(&mut self, groups: usize) {
        self.groups = groups;
    }

    pub(crate) fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(kind));
        id
    }

    /// Allocates a group start and its end, linked to each other.
    pub(crate) fn push_group_pair(&mut self, id: Option<usize>) -> (NodeId, NodeId) {
        let start = NodeId(self.nodes.len() as u32);
        let end = NodeId(start.0 + 1);
        self.nodes.push(Node::new(NodeKind::Group {
            id,
            paired: end,
            end: false,
        }));
        self.nodes.push(Node::new(NodeKind::Group {
            id,
            paired: start,
            end: true,
        }));
        (start, end)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Attaches `child` after `parent` the way `parent` wants it.
    ///
    /// Most nodes append. A lazy `Repeat` puts the continuation before its
    /// loop, and a `?` also continues from the tail of its subtree.
    ///
    /// Returns `false` if `parent` is terminal.
    pub(crate) fn adapt_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        match self.nodes[parent.index()].kind {
            NodeKind::End | NodeKind::Fail => return false,
            NodeKind::Repeat { mode, lazy, tail } => {
                let children = &mut self.node_mut(parent).children;
                if lazy {
                    children.insert(0, child);
                } else {
                    children.push(child);
                }
                if mode == RepeatMode::ZeroOrOne {
                    self.node_mut(tail).children.push(child);
                }
            }
            _ => self.node_mut(parent).children.push(child),
        }
        true
    }

    /// Replaces the last child of `parent` with `wrapper` and moves it under
    /// `wrapper`.
    pub(crate) fn wrap_last_child(&mut self, parent: NodeId, wrapper: NodeId) {
        let last = self.node_mut(parent).children.pop();
        self.node_mut(parent).children.push(wrapper);
        self.node_mut(wrapper).children.extend(last);
    }

    /// Builds a `Repeat` around the subtree `head..=tail`.
    pub(crate) fn wrap_repeat(&mut self, head: NodeId, tail: NodeId, mode: RepeatMode) -> NodeId {
        let repeat = self.push(NodeKind::Repeat {
            mode,
            lazy: false,
            tail,
        });
        if mode != RepeatMode::OneOrMore {
            self.redirect_edges(head, repeat);
        }
        self.node_mut(repeat).children.push(head);
        if mode != RepeatMode::ZeroOrOne {
            self.node_mut(tail).children.push(repeat);
        }
        repeat
    }

    pub(crate) fn set_lazy(&mut self, repeat: NodeId) -> bool {
        match &mut self.node_mut(repeat).kind {
            NodeKind::Repeat { lazy, .. } => {
                *lazy = true;
                true
            }
            _ => false,
        }
    }

    /// Points every edge into `from` at `to` instead.
    fn redirect_edges(&mut self, from: NodeId, to: NodeId) {
        for node in &mut self.nodes {
            for child in &mut node.children {
                if *child == from {
                    *child = to;
                }
            }
        }
    }

    /// Replaces every `End` reachable from `start` with `end`.
    pub(crate) fn rewire_ends(&mut self, start: NodeId, end: NodeId) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            for i in 0..self[id].children.len() {
                let child = self[id].children[i];
                if self[child].kind == NodeKind::End {
                    self.node_mut(id).children[i] = end;
                } else {
                    stack.push(child);
                }
            }
        }
    }

    /// A closed group no longer collects alternatives.
    pub(crate) fn close_group(&mut self, start: NodeId) {
        self.node_mut(start).precedence = 1;
    }
}

impl Index<NodeId> for Graph {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}
