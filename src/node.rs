//! Screen cell representation
//!
//! A node is the atom of the screen: one Unicode scalar plus a packed
//! style, four bytes each. When the style's element bit is set the scalar
//! slot is reinterpreted as an index into the owning line's element table,
//! which keeps element-bearing cells pointer-free.

use serde::{Deserialize, Serialize};

use crate::style::Style;

/// A single cell on the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unicode scalar value, or an element-table index when
    /// `style.element()` is set.
    blob: u32,
    /// Packed display style.
    pub style: Style,
}

impl Node {
    /// The empty cell: a plain space.
    pub const EMPTY: Node = Node {
        blob: ' ' as u32,
        style: Style::PLAIN,
    };

    /// Creates a cell holding a character.
    pub fn new(c: char, style: Style) -> Self {
        Self {
            blob: c as u32,
            style,
        }
    }

    /// Creates a cell referring to the owning line's element table.
    pub(crate) fn element(index: usize, mut style: Style) -> Self {
        style.set_element(true);
        Self {
            blob: index as u32,
            style,
        }
    }

    /// The character stored in this cell. Element cells read as a space.
    pub fn rune(&self) -> char {
        if self.style.element() {
            return ' ';
        }
        char::from_u32(self.blob).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// The element-table index, if this cell is an element cell.
    pub fn element_index(&self) -> Option<usize> {
        self.style.element().then_some(self.blob as usize)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::EMPTY
    }
}
