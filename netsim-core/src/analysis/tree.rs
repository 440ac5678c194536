//! Byte-range annotated dissection trees.

use std::fmt::Write as _;

use serde::Serialize;

/// A leaf: one labelled byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisItem {
    pub label: String,
    /// Offset relative to the parent's start.
    pub start: usize,
    pub length: usize,
}

/// A child of an [`AnalysisTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisNode {
    Item(AnalysisItem),
    Tree(AnalysisTree),
}

impl AnalysisNode {
    fn start(&self) -> usize {
        match self {
            AnalysisNode::Item(item) => item.start,
            AnalysisNode::Tree(tree) => tree.start,
        }
    }

    fn end(&self) -> usize {
        match self {
            AnalysisNode::Item(item) => item.start + item.length,
            AnalysisNode::Tree(tree) => tree.start + tree.length,
        }
    }
}

/// A labelled byte range owning an ordered list of children.
///
/// Child offsets are relative to this tree's start. A root tree places every
/// new child right after the furthest-reaching existing child, so layers can
/// be appended without tracking absolute positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisTree {
    pub label: String,
    pub start: usize,
    pub length: usize,
    pub children: Vec<AnalysisNode>,
    #[serde(skip)]
    auto_offset: bool,
}

/// One rendered line of a tree walk, with absolute offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine<'a> {
    pub depth: usize,
    pub label: &'a str,
    pub start: usize,
    pub length: usize,
}

impl AnalysisTree {
    pub fn new(label: impl Into<String>, start: usize, length: usize) -> Self {
        Self {
            label: label.into(),
            start,
            length,
            children: Vec::new(),
            auto_offset: false,
        }
    }

    /// A root tree covering `length` bytes that auto-places its children.
    pub fn root(label: impl Into<String>, length: usize) -> Self {
        Self {
            auto_offset: true,
            ..Self::new(label, 0, length)
        }
    }

    pub fn is_root(&self) -> bool {
        self.auto_offset
    }

    /// Offset a root tree assigns to its next child.
    pub fn next_offset(&self) -> usize {
        self.children.iter().map(AnalysisNode::end).max().unwrap_or(0)
    }

    pub fn add_item(&mut self, label: impl Into<String>, start: usize, length: usize) {
        let start = if self.auto_offset { self.next_offset() } else { start };
        self.children.push(AnalysisNode::Item(AnalysisItem {
            label: label.into(),
            start,
            length,
        }));
    }

    /// Append a subtree and return its child index.
    pub fn add_tree(&mut self, mut tree: AnalysisTree) -> usize {
        if self.auto_offset {
            tree.start = self.next_offset();
        }
        self.children.push(AnalysisNode::Tree(tree));
        self.children.len() - 1
    }

    /// Subtree at child `index`, if that child is a tree.
    pub fn subtree_mut(&mut self, index: usize) -> Option<&mut AnalysisTree> {
        match self.children.get_mut(index) {
            Some(AnalysisNode::Tree(tree)) => Some(tree),
            _ => None,
        }
    }

    pub fn subtrees(&self) -> impl Iterator<Item = &AnalysisTree> {
        self.children.iter().filter_map(|child| match child {
            AnalysisNode::Tree(tree) => Some(tree),
            AnalysisNode::Item(_) => None,
        })
    }

    /// Depth-first walk with absolute offsets, this tree first at depth 0.
    pub fn walk(&self) -> Vec<TreeLine<'_>> {
        let mut lines = Vec::new();
        self.walk_into(0, 0, &mut lines);
        lines
    }

    fn walk_into<'a>(&'a self, base: usize, depth: usize, lines: &mut Vec<TreeLine<'a>>) {
        let start = base + self.start;
        lines.push(TreeLine {
            depth,
            label: &self.label,
            start,
            length: self.length,
        });
        for child in &self.children {
            match child {
                AnalysisNode::Item(item) => lines.push(TreeLine {
                    depth: depth + 1,
                    label: &item.label,
                    start: start + item.start,
                    length: item.length,
                }),
                AnalysisNode::Tree(tree) => tree.walk_into(start, depth + 1, lines),
            }
        }
    }

    /// Indented text rendering, one line per node.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in self.walk() {
            let _ = writeln!(
                out,
                "{:indent$}{} [{}..{}]",
                "",
                line.label,
                line.start,
                line.start + line.length,
                indent = line.depth * 4
            );
        }
        out
    }
}
