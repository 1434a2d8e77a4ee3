//! Screen line representation
//!
//! A line is a row of cells plus the line-scoped bookkeeping the renderer
//! needs: whether the line ends in a hard break or continues onto the next
//! screen line, a sparse column→URL map for OSC 8 links (URLs are far too
//! large to embed in every cell), the element records referenced by element
//! cells, and namespaced metadata attached by APC sequences.

use std::collections::HashMap;

use crate::element::Element;
use crate::node::Node;

/// Sentinel for clear operations extending to the end of the line.
pub(crate) const END_OF_LINE: usize = usize::MAX;

/// A single screen line.
#[derive(Debug, Clone)]
pub(crate) struct ScreenLine {
    /// Cells in this line. Never longer than the window width when
    /// wrapping is enabled.
    pub nodes: Vec<Node>,
    /// true for a hard line break, false when the line soft-wrapped onto
    /// the next screen line.
    pub newline: bool,
    /// Hyperlink URL sidecar, populated only at columns whose cell has the
    /// hyperlink style flag set.
    pub hyperlinks: HashMap<usize, String>,
    /// Element records; element cells hold indices into this table.
    pub elements: Vec<Element>,
    /// Line metadata: namespace → key → value.
    pub metadata: HashMap<String, HashMap<String, String>>,
}

impl ScreenLine {
    /// Creates an empty line backed by the given (possibly recycled) node
    /// storage.
    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            newline: true,
            hyperlinks: HashMap::new(),
            elements: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// The hyperlink URL recorded at a column, or "" when there is none.
    pub fn link_at(&self, col: usize) -> &str {
        self.hyperlinks.get(&col).map(String::as_str).unwrap_or("")
    }

    /// Clears the inclusive cell range `[x_start, x_end]`. Ranges starting
    /// past the end of the line are a no-op; ranges reaching the last cell
    /// truncate the line instead of storing trailing empties.
    pub fn clear(&mut self, x_start: usize, x_end: usize) {
        if x_end < x_start || x_start >= self.nodes.len() {
            return;
        }
        if x_end >= self.nodes.len() - 1 {
            self.nodes.truncate(x_start);
            self.hyperlinks.retain(|&col, _| col < x_start);
            return;
        }
        for node in &mut self.nodes[x_start..=x_end] {
            *node = Node::EMPTY;
        }
        self.hyperlinks
            .retain(|&col, _| col < x_start || col > x_end);
    }

    /// Empties the line and restores the hard line break. Metadata is kept:
    /// a cleared line still knows when it happened.
    pub fn clear_all(&mut self) {
        self.nodes.clear();
        self.hyperlinks.clear();
        self.elements.clear();
        self.newline = true;
    }

    /// Adds an element record, returning its table index.
    pub fn push_element(&mut self, element: Element) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Merges `data` into this line's metadata under `namespace`,
    /// overwriting on key collision.
    pub fn merge_metadata(&mut self, namespace: &str, data: HashMap<String, String>) {
        self.metadata
            .entry(namespace.to_string())
            .or_default()
            .extend(data);
    }
}

impl Default for ScreenLine {
    fn default() -> Self {
        Self::with_nodes(Vec::new())
    }
}
