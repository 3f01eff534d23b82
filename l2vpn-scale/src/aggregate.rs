//! Payload aggregation and structural negation.
//!
//! A deprovision payload is derived from the same blocks a provision run
//! renders. Each block is parsed into an indentation tree and undone stanza by
//! stanza, last stanza first:
//!
//! ```text
//! ethernet evc EVC-0001
//! interface Gi0/0/1
//!  service instance 1 ethernet EVC-0001
//!   encapsulation dot1q 1
//! ```
//!
//! becomes
//!
//! ```text
//! interface Gi0/0/1
//!  no service instance 1 ethernet EVC-0001
//! no ethernet evc EVC-0001
//! ```

use std::fmt;

use crate::render::RenderedBlock;

/// Whether blocks are applied or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Provision,
    Deprovision,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Provision => "provision",
            Mode::Deprovision => "deprovision",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stanza headers whose children are removed one by one instead of removing
/// the stanza itself.
pub const DEFAULT_CONTAINERS: &[&str] = &["interface", "ethernet cfm domain", "router"];

/// The ordered configuration for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    mode: Mode,
    blocks: Vec<String>,
}

impl Payload {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The blocks, in order.
    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(String::as_str)
    }

    /// Blocks concatenated, each ending in a newline.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for block in &self.blocks {
            text.push_str(block);
            if !block.ends_with('\n') {
                text.push('\n');
            }
        }
        text
    }

    /// Lines to send to a device: blanks and `!` comments removed, trailing
    /// whitespace trimmed.
    pub fn commands(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .flat_map(|block| block.lines())
            .map(str::trim_end)
            .filter(|line| is_command(line))
            .collect()
    }
}

/// Combines rendered blocks into a [`Payload`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    containers: Vec<String>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::with_containers(DEFAULT_CONTAINERS.iter().copied())
    }
}

impl Aggregator {
    /// Use a different set of container prefixes.
    pub fn with_containers<I, S>(containers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            containers: containers.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the payload for `mode`; deprovision negates every block.
    pub fn aggregate(&self, mode: Mode, blocks: &[RenderedBlock]) -> Payload {
        let blocks = blocks
            .iter()
            .map(|block| match mode {
                Mode::Provision => block.text.clone(),
                Mode::Deprovision => self.negate_block(&block.text),
            })
            .filter(|text| !text.is_empty())
            .collect();

        Payload { mode, blocks }
    }

    /// Build a deprovision payload from blocks already rendered with an undo
    /// template; their text is used as is.
    pub fn aggregate_undo(&self, blocks: &[RenderedBlock]) -> Payload {
        Payload {
            mode: Mode::Deprovision,
            blocks: blocks.iter().map(|block| block.text.clone()).collect(),
        }
    }

    /// Undo one block.
    ///
    /// Lines already in `no` form are skipped: the state they replaced is
    /// unknown, so there is nothing safe to restore.
    pub fn negate_block(&self, block: &str) -> String {
        let mut out = Vec::new();

        for stanza in parse_tree(block).iter().rev() {
            if self.is_container(&stanza.line) {
                let children: Vec<String> = stanza
                    .children
                    .iter()
                    .rev()
                    .filter(|child| !is_negated(&child.line))
                    .map(|child| format!(" {}", negate_line(&child.line)))
                    .collect();

                if !children.is_empty() {
                    out.push(stanza.line.clone());
                    out.extend(children);
                }
            } else if !is_negated(&stanza.line) {
                out.push(negate_line(&stanza.line));
            }
        }

        if out.is_empty() {
            return String::new();
        }
        out.join("\n") + "\n"
    }

    fn is_container(&self, header: &str) -> bool {
        self.containers.iter().any(|prefix| {
            header
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
        })
    }
}

/// Toggle the `no` form of one command.
pub fn negate_line(line: &str) -> String {
    let line = line.trim();
    match line.strip_prefix("no ") {
        Some(rest) => rest.trim_start().to_string(),
        None => format!("no {line}"),
    }
}

fn is_negated(line: &str) -> bool {
    line.starts_with("no ")
}

fn is_command(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('!')
}

/// A configuration line and the lines indented beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    line: String,
    children: Vec<Node>,
}

/// Parse indented configuration into a forest, one tree per stanza.
fn parse_tree(text: &str) -> Vec<Node> {
    let lines: Vec<(usize, &str)> = text
        .lines()
        .filter(|line| is_command(line))
        .map(|line| {
            let trimmed = line.trim_start();
            (line.len() - trimmed.len(), trimmed.trim_end())
        })
        .collect();

    let mut pos = 0;
    let mut roots = Vec::new();
    while pos < lines.len() {
        roots.push(parse_node(&lines, &mut pos));
    }
    roots
}

/// Parse the node at `pos` and everything indented deeper than it.
fn parse_node(lines: &[(usize, &str)], pos: &mut usize) -> Node {
    let (indent, line) = lines[*pos];
    *pos += 1;

    let mut children = Vec::new();
    while *pos < lines.len() && lines[*pos].0 > indent {
        children.push(parse_node(lines, pos));
    }

    Node {
        line: line.to_string(),
        children,
    }
}
