/*!
Lowers a compiled pattern into a self-contained C program.

Every reachable node of the [`Graph`] becomes one `case` of a single
`match` function that reproduces what the matcher does at that node and then
tries the node's children in order. The start node becomes a driver loop that
retries the search at successive positions, with the same empty-match and
exhaustion rules as [`Regex::next_span`].

The generated text is the concatenation of:
1. `#define`s describing the pattern (line terminator, group and loop slots).
2. The prelude template: the `Cursor` type and cluster helpers.
3. The generated `match` and `next_token` functions.
4. The postlude template: a `main` that prints the tokens of `argv[1]` or
   stdin.

## Example
```
use dlexer::{codegen::Program, regex::Regex};

let re = Regex::new("[0-9]+")?;
let c = Program::builder().function_prefix("digits_").build().emit(&re)?;
assert!(c.contains("static int digits_next_token(Cursor* c)"));
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
use std::{fmt::Write as _, path::Path};

use bon::Builder;
use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use crate::regex::{
    graph::{Graph, Node, NodeId, NodeKind, RepeatMode},
    Regex, SyntaxError,
};

/// Cursor type and cluster helpers.
pub const PRELUDE: &str = include_str!("../../templates/regex/prelude.c");
/// Demo `main`.
pub const POSTLUDE: &str = include_str!("../../templates/regex/post.c");

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("node {node} is a leaf but neither an end nor a fail node")]
    DanglingLeaf { node: usize },

    #[error("negated class at node {node} excludes a node that is not a literal")]
    Malformed { node: usize },

    #[error("no pattern to generate from")]
    NoPattern(#[source] SyntaxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}

/// Code generation settings.
#[derive(Builder, Clone, Debug)]
pub struct Program {
    /// Text placed before the generated functions. Must define `Cursor`,
    /// `unit_at()`, `unit_is()`, `unit_in()` and `line_at()`.
    #[builder(default = PRELUDE.to_owned(), into)]
    prelude: String,
    /// Text placed after the generated functions.
    #[builder(default = POSTLUDE.to_owned(), into)]
    postlude: String,
    /// Prefix of the generated function names.
    #[builder(default = "dl_".to_owned(), into)]
    function_prefix: String,
}

impl Default for Program {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Program {
    /// Generates the program for `regex`.
    pub fn emit(&self, regex: &Regex) -> Result<String, CodegenError> {
        let out = self.emit_graph(regex.graph(), regex.line_terminator(), regex.as_str())?;
        debug!(pattern = regex.as_str(), bytes = out.len(), "generated program");
        Ok(out)
    }

    /// Generates the program for `regex` and writes it to `path`.
    pub fn write(&self, regex: &Regex, path: impl AsRef<Path>) -> Result<(), CodegenError> {
        let out = self.emit(regex)?;
        std::fs::write(path, out)?;
        Ok(())
    }

    pub(crate) fn emit_graph(
        &self,
        graph: &Graph,
        line_terminator: u8,
        pattern: &str,
    ) -> Result<String, CodegenError> {
        let order = graph.reachable();
        let mut labels = vec![0; graph.len()];
        for (label, id) in order.iter().enumerate() {
            labels[id.index()] = label;
        }
        // Loop guard slot of each repeat.
        let mut loops = vec![0; graph.len()];
        let mut repeats = 0usize;
        for &id in &order {
            if let NodeKind::Repeat { .. } = graph[id].kind() {
                loops[id.index()] = repeats;
                repeats += 1;
            }
        }

        let emitter = Emitter {
            graph,
            labels: &labels,
            loops: &loops,
            prefix: &self.function_prefix,
        };
        let mut out = String::new();
        writeln!(
            out,
            "/* Generated by dlexer from {} */",
            pattern.escape_debug().to_string().replace("*/", "*\\/")
        )?;
        writeln!(out, "#define LINE_TERMINATOR 0x{line_terminator:02x}")?;
        writeln!(out, "#define GROUP_COUNT {}", graph.group_count())?;
        writeln!(out, "#define GROUP_SLOTS {}", (2 * graph.group_count()).max(1))?;
        writeln!(out, "#define REPEAT_SLOTS {}", repeats.max(1))?;
        writeln!(out, "#define NEXT_TOKEN {}next_token", self.function_prefix)?;
        out.push_str(&self.prelude);
        out.push('\n');

        let p = &self.function_prefix;
        writeln!(out, "static int {p}match(Cursor* c, int node, size_t pos);")?;
        writeln!(out)?;
        writeln!(out, "static int {p}match(Cursor* c, int node, size_t pos) {{")?;
        writeln!(out, "    switch (node) {{")?;
        for &id in &order {
            if id != graph.start() {
                emitter.case(&mut out, id)?;
            }
        }
        writeln!(out, "    }}")?;
        writeln!(out, "    return 0;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
        emitter.driver(&mut out)?;

        out.push_str(&self.postlude);
        Ok(out)
    }
}

/// Generates the program for `regex` with the bundled templates.
pub fn emit(regex: &Regex) -> Result<String, CodegenError> {
    Program::default().emit(regex)
}

struct Emitter<'a> {
    graph: &'a Graph,
    labels: &'a [usize],
    loops: &'a [usize],
    prefix: &'a str,
}

impl Emitter<'_> {
    fn label(&self, id: NodeId) -> usize {
        self.labels[id.index()]
    }

    /// `match(child1) || match(child2) || ...`
    fn chain(&self, node: &Node, pos: &str) -> String {
        node.children()
            .iter()
            .map(|&c| format!("{}match(c, {}, {pos})", self.prefix, self.label(c)))
            .join(" || ")
    }

    fn case(&self, out: &mut String, id: NodeId) -> Result<(), CodegenError> {
        let node = &self.graph[id];
        if node.children().is_empty() && !node.is_terminal() {
            return Err(CodegenError::DanglingLeaf { node: id.index() });
        }
        let label = self.label(id);
        let chain = self.chain(node, "pos");

        match node.kind() {
            NodeKind::Unit(_) | NodeKind::Range { .. } => {
                writeln!(out, "    case {label}: /* {} */", describe(node))?;
                writeln!(out, "        if (!{}) return 0;", test(node, id)?)?;
                writeln!(out, "        pos += {};", unit_len(node))?;
                writeln!(out, "        return {chain};")?;
            }
            NodeKind::Start | NodeKind::Or { negated: false } | NodeKind::Group { id: None, .. } => {
                writeln!(out, "    case {label}: /* {} */", describe(node))?;
                writeln!(out, "        return {chain};")?;
            }
            NodeKind::Or { negated: true } => {
                let Some((&last, excluded)) = node.children().split_last() else {
                    return Err(CodegenError::DanglingLeaf { node: id.index() });
                };
                writeln!(out, "    case {label}: /* negated class */")?;
                writeln!(out, "        if (unit_at(c, pos) == 0) return 0;")?;
                if !excluded.is_empty() {
                    let tests = excluded
                        .iter()
                        .map(|&m| test(&self.graph[m], id))
                        .collect::<Result<Vec<_>, _>>()?;
                    writeln!(out, "        if ({}) return 0;", tests.iter().join(" || "))?;
                }
                writeln!(out, "        pos += unit_at(c, pos);")?;
                writeln!(
                    out,
                    "        return {}match(c, {}, pos);",
                    self.prefix,
                    self.label(last)
                )?;
            }
            NodeKind::Group {
                id: Some(group),
                end,
                ..
            } => {
                let slot = 2 * group + usize::from(*end);
                let side = if *end { "end" } else { "start" };
                writeln!(out, "    case {label}: /* group {group} {side} */")?;
                writeln!(out, "        c->groups[{slot}] = (long)pos;")?;
                writeln!(out, "        return {chain};")?;
            }
            NodeKind::Repeat { .. } => {
                let k = self.loops[id.index()];
                writeln!(out, "    case {label}: {{ /* {} */", describe(node))?;
                writeln!(out, "        long saved = c->loops[{k}];")?;
                writeln!(out, "        if (saved == (long)pos) return 0;")?;
                writeln!(out, "        c->loops[{k}] = (long)pos;")?;
                writeln!(out, "        if ({chain}) return 1;")?;
                writeln!(out, "        c->loops[{k}] = saved;")?;
                writeln!(out, "        return 0;")?;
                writeln!(out, "    }}")?;
            }
            NodeKind::AtStart => {
                writeln!(out, "    case {label}: /* ^ */")?;
                writeln!(out, "        if (line_at(c, pos) == LINE_MID) return 0;")?;
                writeln!(out, "        return {chain};")?;
            }
            NodeKind::AtEnd => {
                writeln!(out, "    case {label}: /* $ */")?;
                writeln!(
                    out,
                    "        if (line_at(c, pos) != LINE_END && line_at(c, pos) != LINE_EOF) return 0;"
                )?;
                writeln!(out, "        return {chain};")?;
            }
            NodeKind::End => {
                writeln!(out, "    case {label}: /* end */")?;
                writeln!(out, "        c->end = pos;")?;
                writeln!(out, "        return 1;")?;
            }
            NodeKind::Fail => {
                writeln!(out, "    case {label}: /* fail */")?;
                writeln!(out, "        return 0;")?;
            }
        }
        Ok(())
    }

    fn driver(&self, out: &mut String) -> Result<(), CodegenError> {
        let p = self.prefix;
        let chain = self.chain(&self.graph[self.graph.start()], "start");
        if chain.is_empty() {
            return Err(CodegenError::DanglingLeaf {
                node: self.graph.start().index(),
            });
        }
        write!(
            out,
            r#"static int {p}next_token(Cursor* c) {{
    size_t start, step, i;
    if (c->exhausted) return 0;
    start = c->pos;
    for (;;) {{
        for (i = 0; i < GROUP_SLOTS; i++) c->groups[i] = -1;
        for (i = 0; i < REPEAT_SLOTS; i++) c->loops[i] = -1;
        if ({chain}) {{
            c->start = start;
            if (c->end == start) {{
                step = unit_at(c, start);
                if (step == 0) c->exhausted = 1;
                else c->pos = start + step;
            }} else {{
                c->pos = c->end;
            }}
            return 1;
        }}
        step = unit_at(c, start);
        if (step == 0) {{
            c->pos = c->len;
            c->exhausted = 1;
            return 0;
        }}
        start += step;
    }}
}}
"#
        )?;
        Ok(())
    }
}

/// A C string literal holding `bytes`, every byte escaped.
fn c_bytes(bytes: &[u8]) -> String {
    format!("\"{}\"", bytes.iter().format_with("", |b, f| f(&format_args!("\\x{b:02x}"))))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).join(" ")
}

fn unit_len(node: &Node) -> usize {
    match node.kind() {
        NodeKind::Unit(u) => u.len(),
        NodeKind::Range { start, .. } => start.len(),
        _ => 0,
    }
}

/// The C condition for a literal node accepting the unit at `pos`.
fn test(node: &Node, owner: NodeId) -> Result<String, CodegenError> {
    match node.kind() {
        NodeKind::Unit(u) => Ok(format!(
            "unit_is(c, pos, {}, {})",
            u.len(),
            c_bytes(u.as_bytes())
        )),
        NodeKind::Range { start, end } => Ok(format!(
            "unit_in(c, pos, {}, {}, {})",
            start.len(),
            c_bytes(start.as_bytes()),
            c_bytes(end.as_bytes())
        )),
        _ => Err(CodegenError::Malformed {
            node: owner.index(),
        }),
    }
}

fn describe(node: &Node) -> String {
    match node.kind() {
        NodeKind::Unit(u) => format!("unit {}", hex(u.as_bytes())),
        NodeKind::Range { start, end } => {
            format!("range {}..{}", hex(start.as_bytes()), hex(end.as_bytes()))
        }
        NodeKind::Start => "start".to_owned(),
        NodeKind::Or { .. } => "or".to_owned(),
        NodeKind::Group { .. } => "class".to_owned(),
        NodeKind::Repeat { mode, lazy, .. } => {
            let op = match mode {
                RepeatMode::ZeroOrMore => "*",
                RepeatMode::OneOrMore => "+",
                RepeatMode::ZeroOrOne => "?",
            };
            format!("repeat {op}{}", if *lazy { "?" } else { "" })
        }
        NodeKind::End => "end".to_owned(),
        NodeKind::AtStart => "^".to_owned(),
        NodeKind::AtEnd => "$".to_owned(),
        NodeKind::Fail => "fail".to_owned(),
    }
}
