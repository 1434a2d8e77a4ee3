//! The terminal screen
//!
//! Holds the line buffer, cursor, current style and link brush, and the
//! window/scrollback configuration. The parser drives the screen one
//! operation at a time; serialization walks the buffer.
//!
//! Cursor coordinates are window-relative: the window is always the last
//! `lines` screen lines of the buffer (or the whole buffer while it is
//! still shorter than that). Lines materialize lazily when the cursor
//! first writes to them, and when a `max_lines` cap is configured the
//! oldest complete logical lines are scrolled out of the top to make room,
//! optionally delivered to a callback as rendered HTML.

use std::collections::HashMap;
use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::bk::BK_NAMESPACE;
use crate::element::Element;
use crate::error::ScreenError;
use crate::line::{ScreenLine, END_OF_LINE};
use crate::node::Node;
use crate::output;
use crate::parser::Parser;
use crate::style::Style;

/// Initial cell capacity for fresh lines.
const INITIAL_LINE_CAPACITY: usize = 80;

/// Screen configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenOptions {
    /// Window width in columns. 0 disables soft wrapping.
    pub cols: usize,
    /// Window height in screen lines.
    pub lines: usize,
    /// Upper bound on `cols`. 0 = unbounded.
    pub max_cols: usize,
    /// Scrollback cap: the buffer never holds more screen lines than this.
    /// 0 = unbounded.
    pub max_lines: usize,
    /// Render `bk` timestamp metadata as `<time>` tags.
    pub timestamps: bool,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            cols: 0,
            lines: 300,
            max_cols: 0,
            max_lines: 0,
            timestamps: true,
        }
    }
}

/// Read-only emulation counters. All counters are monotonically
/// non-decreasing across writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Screen lines evicted from the top of the buffer.
    pub lines_scrolled_out: usize,
    /// Cursor movements clamped at a window edge, per direction.
    pub cursor_up_oob: usize,
    pub cursor_down_oob: usize,
    pub cursor_forward_oob: usize,
    pub cursor_back_oob: usize,
}

type ScrollOutFn = Box<dyn FnMut(&str)>;

/// A terminal screen: cursor, window, line buffer and scrollback policy.
pub struct Screen {
    /// Cursor column. `x == cols` is a transient past-end state resolved
    /// by the next write (wrap to the next line).
    x: usize,
    /// Cursor row, relative to the top of the window.
    y: usize,
    /// The line buffer; the window is its last `window_lines` entries.
    lines: Vec<ScreenLine>,
    /// Style applied to subsequently written cells.
    style: Style,
    /// URL applied to subsequently written cells while inside an OSC 8
    /// link.
    link_brush: String,
    /// Cursor position stored by ESC 7, restored by ESC 8.
    saved_cursor: (usize, usize),
    /// Escape-sequence parser, including carry-over between writes.
    parser: Parser,
    cols: usize,
    window_lines: usize,
    max_lines: usize,
    timestamps: bool,
    scroll_out: Option<ScrollOutFn>,
    /// Recycled node storage from scrolled-out lines.
    pool: Vec<Vec<Node>>,
    stats: Stats,
}

impl Screen {
    /// Creates a screen with the given options.
    pub fn new(opts: ScreenOptions) -> Result<Self, ScreenError> {
        if opts.lines == 0 {
            return Err(ScreenError::ZeroWindowHeight);
        }
        if opts.max_lines > 0 && opts.lines > opts.max_lines {
            return Err(ScreenError::WindowTooTall {
                lines: opts.lines,
                max_lines: opts.max_lines,
            });
        }
        if opts.max_cols > 0 && (opts.cols == 0 || opts.cols > opts.max_cols) {
            return Err(ScreenError::WindowTooWide {
                cols: opts.cols,
                max_cols: opts.max_cols,
            });
        }

        Ok(Self {
            x: 0,
            y: 0,
            lines: Vec::new(),
            style: Style::PLAIN,
            link_brush: String::new(),
            saved_cursor: (0, 0),
            parser: Parser::default(),
            cols: opts.cols,
            window_lines: opts.lines,
            max_lines: opts.max_lines,
            timestamps: opts.timestamps,
            scroll_out: None,
            pool: Vec::new(),
            stats: Stats::default(),
        })
    }

    /// Installs a callback invoked with the rendered HTML (including a
    /// trailing newline) of each logical line scrolled out of the buffer.
    /// Invoked synchronously from within a write.
    pub fn on_scroll_out(&mut self, f: impl FnMut(&str) + 'static) {
        self.scroll_out = Some(Box::new(f));
    }

    /// Renders the current screen contents as HTML. The final trailing
    /// newline is trimmed. Idempotent.
    pub fn as_html(&self) -> String {
        let mut buf = String::new();
        let mut start = 0;
        for (i, line) in self.lines.iter().enumerate() {
            if line.newline {
                buf.push_str(&output::logical_line_html(
                    &self.lines[start..=i],
                    self.timestamps,
                ));
                start = i + 1;
            }
        }
        if start < self.lines.len() {
            buf.push_str(&output::logical_line_html(
                &self.lines[start..],
                self.timestamps,
            ));
        }
        if buf.ends_with('\n') {
            buf.pop();
        }
        buf
    }

    /// Renders the current screen contents as plain text, without markup.
    /// The final trailing newline is trimmed. Idempotent.
    pub fn as_plain_text(&self) -> String {
        output::plain_text(&self.lines)
    }

    /// Emulation counters.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Number of screen lines currently held in the buffer.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    // --- geometry -------------------------------------------------------

    /// Number of buffer lines currently covered by the window.
    fn window_len(&self) -> usize {
        self.lines.len().min(self.window_lines)
    }

    /// Buffer index of the top of the window.
    fn top(&self) -> usize {
        self.lines.len() - self.window_len()
    }

    /// Buffer index of the cursor row. May point past the end of the
    /// buffer when the row has not materialized yet.
    fn cursor_row(&self) -> usize {
        self.top() + self.y
    }

    fn current_line(&self) -> Option<&ScreenLine> {
        self.lines.get(self.cursor_row())
    }

    fn current_line_mut(&mut self) -> Option<&mut ScreenLine> {
        let row = self.cursor_row();
        self.lines.get_mut(row)
    }

    /// Largest column the cursor may rest on.
    fn max_x(&self) -> usize {
        if self.cols > 0 {
            self.cols - 1
        } else {
            usize::MAX - 1
        }
    }

    pub(crate) fn at_line_start(&self) -> bool {
        self.x == 0
    }

    // --- materialization and scroll-out ---------------------------------

    /// Returns the cursor's line, materializing it (and any rows between
    /// the end of the buffer and the cursor) first, and padding its cells
    /// out to the cursor column. Scrolls lines out of the top as needed to
    /// honor `max_lines`.
    fn current_line_for_writing(&mut self) -> &mut ScreenLine {
        let mut row = self.cursor_row();
        while row >= self.lines.len() {
            if self.max_lines > 0 && self.lines.len() >= self.max_lines {
                row -= self.scroll_out_top();
            }
            let nodes = self
                .pool
                .pop()
                .unwrap_or_else(|| Vec::with_capacity(INITIAL_LINE_CAPACITY));
            self.lines.push(ScreenLine::with_nodes(nodes));
        }
        // Keep the cursor window-relative as the window slides.
        self.y = row - self.top();

        let x = self.x;
        let line = &mut self.lines[row];
        if line.nodes.len() <= x {
            line.nodes.resize(x + 1, Node::EMPTY);
        }
        line
    }

    /// Scrolls the leading logical line out of the buffer: the prefix up
    /// to and including the first hard line break, bounded so that visible
    /// window lines are never scrolled out, falling back to a single
    /// screen line when the window sits at the buffer top. Returns the
    /// number of screen lines dropped.
    fn scroll_out_top(&mut self) -> usize {
        let limit = self.top();
        let first_break = self
            .lines
            .iter()
            .position(|line| line.newline)
            .map(|i| i + 1)
            .unwrap_or(self.lines.len());
        let count = if limit == 0 { 1 } else { first_break.min(limit) };

        if self.scroll_out.is_some() {
            let html = output::logical_line_html(&self.lines[..count], self.timestamps);
            if let Some(callback) = &mut self.scroll_out {
                callback(&html);
            }
        }

        for mut line in self.lines.drain(..count) {
            line.nodes.clear();
            self.pool.push(std::mem::take(&mut line.nodes));
        }
        self.stats.lines_scrolled_out += count;
        tracing::trace!(lines = count, "scrolled out of buffer");
        count
    }

    // --- writing --------------------------------------------------------

    /// Writes a character at the cursor and advances it, soft-wrapping
    /// first if the cursor is past the end of the window.
    pub(crate) fn append_rune(&mut self, c: char) {
        if self.cols > 0 && self.x == self.cols {
            // The wrapped line continues without a hard break; an explicit
            // newline later promotes it back.
            if let Some(line) = self.current_line_mut() {
                line.newline = false;
            }
            self.x = 0;
            self.y += 1;
        }
        self.write_rune(c);
        self.x += 1;
    }

    /// Writes a character at the cursor without advancing it.
    pub(crate) fn write_rune(&mut self, c: char) {
        let style = self.style;
        let link = style
            .hyperlink()
            .then(|| self.link_brush.clone());
        let x = self.x;
        let line = self.current_line_for_writing();
        line.nodes[x] = Node::new(c, style);
        match link {
            Some(url) => {
                line.hyperlinks.insert(x, url);
            }
            None => {
                line.hyperlinks.remove(&x);
            }
        }
    }

    /// Writes a string of ordinary characters.
    pub(crate) fn append_str(&mut self, s: &str) {
        for c in s.chars() {
            self.append_rune(c);
        }
    }

    /// Appends an element cell at the cursor.
    pub(crate) fn append_element(&mut self, element: Element) {
        let style = self.style;
        let x = self.x;
        let line = self.current_line_for_writing();
        let idx = line.push_element(element);
        line.nodes[x] = Node::element(idx, style);
        self.x += 1;
    }

    /// Merges metadata into the current line under `namespace`.
    pub(crate) fn set_line_metadata(&mut self, namespace: &str, data: HashMap<String, String>) {
        self.current_line_for_writing()
            .merge_metadata(namespace, data);
    }

    /// Sets the OSC 8 URL brush. A non-empty URL turns the hyperlink style
    /// flag on; an empty URL ends the link.
    pub(crate) fn set_link_brush(&mut self, url: String) {
        self.style.set_hyperlink(!url.is_empty());
        self.link_brush = url;
    }

    /// Clears the whole of the current line, if it exists.
    pub(crate) fn clear_current_line(&mut self) {
        if let Some(line) = self.current_line_mut() {
            line.clear(0, END_OF_LINE);
        }
    }

    // --- cursor ---------------------------------------------------------

    /// Carriage return plus advance to the next line. Promotes the current
    /// line back to a hard break: an explicit newline after a soft wrap
    /// means the source really did break here.
    pub(crate) fn newline(&mut self) {
        self.x = 0;
        if let Some(line) = self.current_line_mut() {
            line.newline = true;
        }
        self.y += 1;
    }

    /// Reverse linefeed (ESC M): up one line, same column.
    pub(crate) fn reverse_newline(&mut self) {
        if self.y > 0 {
            self.y -= 1;
        }
    }

    pub(crate) fn carriage_return(&mut self) {
        self.x = 0;
    }

    pub(crate) fn backspace(&mut self) {
        if self.x > 0 {
            self.x -= 1;
        }
    }

    pub(crate) fn save_cursor(&mut self) {
        self.saved_cursor = (self.x, self.y);
    }

    pub(crate) fn restore_cursor(&mut self) {
        (self.x, self.y) = self.saved_cursor;
    }

    /// Vertical movement lands the cursor on a real column: a cursor left
    /// in the past-end state by a wrap is pulled back inside the window.
    fn leave_past_end(&mut self) {
        if self.cols > 0 && self.x == self.cols {
            self.x = self.cols - 1;
        }
    }

    pub(crate) fn up(&mut self, arg: &str) {
        let target = self.y as i128 - ansi_int(arg) as i128;
        let y = clamp_counting(target, self.window_lines - 1, &mut self.stats.cursor_up_oob);
        if y != self.y {
            self.leave_past_end();
        }
        self.y = y;
    }

    pub(crate) fn down(&mut self, arg: &str) {
        let target = self.y as i128 + ansi_int(arg) as i128;
        let y = clamp_counting(target, self.window_lines - 1, &mut self.stats.cursor_down_oob);
        if y != self.y {
            self.leave_past_end();
        }
        self.y = y;
    }

    pub(crate) fn forward(&mut self, arg: &str) {
        let target = self.x as i128 + ansi_int(arg) as i128;
        self.x = clamp_counting(target, self.max_x(), &mut self.stats.cursor_forward_oob);
    }

    pub(crate) fn backward(&mut self, arg: &str) {
        let target = self.x as i128 - ansi_int(arg) as i128;
        self.x = clamp_counting(target, self.max_x(), &mut self.stats.cursor_back_oob);
    }

    // --- escape dispatch ------------------------------------------------

    /// Applies a terminal CSI sequence. `code` is the (uppercased) final
    /// byte and `instructions` the parameter strings.
    pub(crate) fn apply_escape(&mut self, code: char, instructions: &[String]) {
        let first = instructions.first().map(String::as_str).unwrap_or("");
        if first.starts_with('?') {
            // DEC private modes (cursor visibility, alternate screen, …)
            // are acknowledged and ignored wholesale.
            tracing::trace!(code = %code, params = %first, "ignoring private mode sequence");
            return;
        }

        match code {
            'A' => self.up(first),
            'B' => self.down(first),
            'C' => self.forward(first),
            'D' => self.backward(first),
            'E' => {
                self.x = 0;
                self.down(first);
            }
            'F' => {
                self.x = 0;
                self.up(first);
            }
            'G' => {
                let col = ansi_int(first) as i128 - 1;
                self.x = col.clamp(0, self.max_x() as i128) as usize;
            }
            'H' => self.cursor_home(instructions),
            'J' => self.erase_in_display(first),
            'K' => self.erase_in_line(first),
            'M' => self.style = self.style.apply_sgr(instructions),
            _ => {}
        }
    }

    /// Absolute cursor positioning, approximately: the emitting program's
    /// real window geometry is unknowable here, so row targeting is
    /// replaced by an implicit newline (carrying this line's timestamp
    /// metadata forward) before jumping to the requested column.
    fn cursor_home(&mut self, instructions: &[String]) {
        let col = ansi_int(instructions.get(1).map(String::as_str).unwrap_or("")) as i128 - 1;
        if self.current_line().is_some_and(|line| !line.nodes.is_empty()) {
            let carried = self
                .current_line()
                .and_then(|line| line.metadata.get(BK_NAMESPACE).cloned());
            self.newline();
            if let Some(data) = carried {
                self.set_line_metadata(BK_NAMESPACE, data);
            }
        }
        self.x = col.clamp(0, self.max_x() as i128) as usize;
    }

    fn erase_in_display(&mut self, arg: &str) {
        let row = self.cursor_row();
        match arg {
            "0" | "" => {
                let x = self.x;
                if let Some(line) = self.lines.get_mut(row) {
                    line.clear(x, END_OF_LINE);
                }
                for line in self.lines.iter_mut().skip(row + 1) {
                    line.clear_all();
                }
            }
            "1" => {
                let x = self.x;
                if let Some(line) = self.lines.get_mut(row) {
                    line.clear(0, x);
                }
                let top = self.top();
                let end = row.min(self.lines.len());
                for line in &mut self.lines[top..end] {
                    line.clear_all();
                }
            }
            "2" => {
                let top = self.top();
                for line in &mut self.lines[top..] {
                    line.clear_all();
                }
            }
            "3" => {
                for line in &mut self.lines {
                    line.clear_all();
                }
            }
            _ => {}
        }
    }

    fn erase_in_line(&mut self, arg: &str) {
        let row = self.cursor_row();
        let x = self.x;
        let Some(line) = self.lines.get_mut(row) else {
            return;
        };
        match arg {
            "0" | "" => line.clear(x, END_OF_LINE),
            "1" => line.clear(0, x),
            "2" => line.clear(0, END_OF_LINE),
            _ => {}
        }
    }
}

impl Default for Screen {
    /// A screen with default options. Default options always validate.
    fn default() -> Self {
        match Self::new(ScreenOptions::default()) {
            Ok(screen) => screen,
            Err(_) => unreachable!("default options are valid"),
        }
    }
}

impl io::Write for Screen {
    /// Feeds bytes to the emulator. Always consumes the entire slice;
    /// partial escape sequences at the end are carried over to the next
    /// write internally.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut parser = std::mem::take(&mut self.parser);
        parser.feed(self, buf);
        self.parser = parser;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("lines", &self.lines.len())
            .field("cols", &self.cols)
            .field("window_lines", &self.window_lines)
            .field("max_lines", &self.max_lines)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Parses an ANSI movement parameter: empty means 1, malformed means 0.
fn ansi_int(s: &str) -> i64 {
    if s.is_empty() {
        return 1;
    }
    s.parse().unwrap_or(0)
}

/// Clamps `value` to `[0, max]`, bumping `oob` when clamping occurred.
fn clamp_counting(value: i128, max: usize, oob: &mut usize) -> usize {
    let clamped = value.clamp(0, max as i128);
    if clamped != value {
        *oob += 1;
    }
    clamped as usize
}
