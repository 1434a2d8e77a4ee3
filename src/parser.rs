//! Streaming escape sequence parser
//!
//! A byte-at-a-time state machine that drives the screen directly. Input
//! arrives in arbitrary chunks, so the parser keeps an internal buffer:
//! after each write, any unresolved escape-sequence tail (from the byte
//! where the escape began) is retained and the next write resumes there,
//! with all indices rebased. A truncated UTF-8 scalar at the end of a
//! write is likewise retained rather than decoded as garbage.
//!
//! Recognized sequences:
//!
//! - C0 controls: LF, CR, BS
//! - `ESC [` CSI with numeric parameters (cursor movement, erase, SGR)
//! - `ESC ]` OSC elements (links, images), terminated by BEL or `ESC \`
//! - `ESC _` APC metadata (`bk;…`), same terminators
//! - `ESC (` / `ESC )` charset designations (acknowledged, ignored)
//! - `ESC M`, `ESC 7`, `ESC 8`, `ESC =`, `ESC >`
//!
//! Anything else aborts: the ESC byte is dropped silently and scanning
//! resumes at the byte after it in the normal state.

use crate::bk::{parse_buildkite_apc, BK_NAMESPACE};
use crate::element::{parse_element_sequence, ElementKind};
use crate::screen::Screen;
use crate::utf8::{decode_scalar, Decoded};

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Ordinary text.
    #[default]
    Normal,
    /// After ESC.
    Escape,
    /// Inside `ESC [`, collecting parameters (CSI).
    Control,
    /// Inside `ESC ]`, collecting the payload.
    Osc,
    /// Inside an OSC payload, after an ESC that may start `ESC \`.
    OscEsc,
    /// Inside `ESC _`, collecting the payload.
    Apc,
    /// Inside an APC payload, after an ESC.
    ApcEsc,
    /// After `ESC (` or `ESC )`: one designation character follows.
    Charset,
}

/// The streaming parser. Owns the carry-over buffer and the running
/// timestamp used by `bk` metadata sequences.
#[derive(Debug, Default)]
pub(crate) struct Parser {
    state: State,
    /// Carry-over from previous writes plus the current input.
    buffer: Vec<u8>,
    /// Byte offset of the scalar currently being examined.
    cursor: usize,
    /// Byte offset of the ESC that opened the current sequence.
    escape_started_at: usize,
    /// Byte offset where the current CSI parameter or string payload
    /// began.
    instruction_started_at: usize,
    /// CSI parameters committed so far.
    instructions: Vec<String>,
    /// Running clock for bk timestamp metadata, milliseconds since epoch.
    last_timestamp: i64,
}

impl Parser {
    /// Parses `input`, mutating `screen`. Unfinished sequences are carried
    /// over to the next call.
    pub(crate) fn feed(&mut self, screen: &mut Screen, input: &[u8]) {
        self.buffer.extend_from_slice(input);

        while self.cursor < self.buffer.len() {
            let (c, len) = match decode_scalar(&self.buffer[self.cursor..]) {
                Decoded::Scalar(c, len) => (c, len),
                Decoded::Incomplete => break,
            };
            let mut next = self.cursor + len;

            match self.state {
                State::Normal => self.handle_normal(screen, c),
                State::Escape => self.handle_escape(screen, c, &mut next),
                State::Control => self.handle_control(screen, c, &mut next),
                State::Osc => self.handle_osc(screen, c),
                State::OscEsc => self.handle_osc_esc(screen, c),
                State::Apc => self.handle_apc(screen, c),
                State::ApcEsc => self.handle_apc_esc(screen, c),
                State::Charset => self.state = State::Normal,
            }

            self.cursor = next;
        }

        // Shed resolved bytes, keeping any unfinished tail.
        let base = match self.state {
            State::Normal => self.cursor,
            _ => self.escape_started_at,
        };
        self.buffer.drain(..base);
        self.cursor -= base;
        self.escape_started_at = self.escape_started_at.saturating_sub(base);
        self.instruction_started_at = self.instruction_started_at.saturating_sub(base);
    }

    fn handle_normal(&mut self, screen: &mut Screen, c: char) {
        match c {
            '\n' => screen.newline(),
            '\r' => screen.carriage_return(),
            '\u{08}' => screen.backspace(),
            '\x1b' => {
                self.escape_started_at = self.cursor;
                self.state = State::Escape;
            }
            c => screen.append_rune(c),
        }
    }

    fn handle_escape(&mut self, screen: &mut Screen, c: char, next: &mut usize) {
        match c {
            '[' => {
                self.state = State::Control;
                self.instructions.clear();
                self.instruction_started_at = self.cursor + 1;
            }
            ']' => {
                self.state = State::Osc;
                self.instruction_started_at = self.cursor + 1;
            }
            '_' => {
                self.state = State::Apc;
                self.instruction_started_at = self.cursor + 1;
            }
            '(' | ')' => self.state = State::Charset,
            'M' => {
                screen.reverse_newline();
                self.state = State::Normal;
            }
            '7' => {
                screen.save_cursor();
                self.state = State::Normal;
            }
            '8' => {
                screen.restore_cursor();
                self.state = State::Normal;
            }
            '=' | '>' => self.state = State::Normal,
            _ => self.abort(next),
        }
    }

    fn handle_control(&mut self, screen: &mut Screen, c: char, next: &mut usize) {
        match c {
            // Parameters accumulate in place and are sliced out of the
            // buffer when committed. A leading '?' marks DEC private
            // sequences; it travels with the parameter.
            '0'..='9' | '?' => {}
            ';' => {
                self.commit_instruction(self.cursor);
                self.instruction_started_at = self.cursor + 1;
            }
            c if c.is_ascii_alphabetic() => match c.to_ascii_uppercase() {
                code @ ('A'..='H' | 'J' | 'K' | 'M' | 'Q') => {
                    self.commit_instruction(self.cursor);
                    let instructions = std::mem::take(&mut self.instructions);
                    screen.apply_escape(code, &instructions);
                    self.state = State::Normal;
                }
                'I' | 'L' | 'N' => {
                    // Set-mode family: swallowed without effect.
                    self.instructions.clear();
                    self.state = State::Normal;
                }
                _ => self.abort(next),
            },
            _ => self.abort(next),
        }
    }

    fn handle_osc(&mut self, screen: &mut Screen, c: char) {
        match c {
            '\x07' => {
                self.process_osc(screen, self.cursor);
                self.state = State::Normal;
            }
            '\x1b' => self.state = State::OscEsc,
            // Payload bytes accumulate in place.
            _ => {}
        }
    }

    fn handle_osc_esc(&mut self, screen: &mut Screen, c: char) {
        match c {
            // `ESC \` is a string terminator; the payload ends before the
            // ESC byte.
            '\\' => {
                self.process_osc(screen, self.cursor - 1);
                self.state = State::Normal;
            }
            // The ESC was spurious; it stays in the payload.
            _ => self.state = State::Osc,
        }
    }

    fn handle_apc(&mut self, screen: &mut Screen, c: char) {
        match c {
            '\x07' => {
                self.process_apc(screen, self.cursor);
                self.state = State::Normal;
            }
            '\x1b' => self.state = State::ApcEsc,
            _ => {}
        }
    }

    fn handle_apc_esc(&mut self, screen: &mut Screen, c: char) {
        match c {
            '\\' => {
                self.process_apc(screen, self.cursor - 1);
                self.state = State::Normal;
            }
            _ => self.state = State::Apc,
        }
    }

    /// Abandons the current escape sequence: the ESC byte is dropped and
    /// everything after it is re-examined as ordinary text.
    fn abort(&mut self, next: &mut usize) {
        tracing::debug!("aborting unrecognized escape sequence");
        *next = self.escape_started_at + 1;
        self.state = State::Normal;
    }

    /// Commits the parameter accumulated since `instruction_started_at`.
    fn commit_instruction(&mut self, end: usize) {
        let param = String::from_utf8_lossy(&self.buffer[self.instruction_started_at..end]);
        self.instructions.push(param.into_owned());
    }

    fn payload(&self, end: usize) -> String {
        String::from_utf8_lossy(&self.buffer[self.instruction_started_at..end]).into_owned()
    }

    /// Handles a complete OSC payload.
    fn process_osc(&mut self, screen: &mut Screen, end: usize) {
        let payload = self.payload(end);
        match parse_element_sequence(&payload) {
            // OSC 8 is a style toggle, not a standalone element: writes
            // that follow pick the URL up from the brush.
            Ok(Some(elem)) if elem.kind == ElementKind::Osc8Link => {
                screen.set_link_brush(elem.url);
            }
            // External links render inline with the surrounding text.
            Ok(Some(elem)) if elem.kind == ElementKind::Link => screen.append_element(elem),
            // Images sit on a line of their own.
            Ok(Some(elem)) => {
                if !screen.at_line_start() {
                    screen.newline();
                }
                screen.clear_current_line();
                screen.append_element(elem);
                screen.newline();
            }
            Ok(None) => {
                tracing::debug!("ignoring unsupported OSC sequence");
            }
            Err(err) => {
                screen.append_str(&format!(
                    "*** Error parsing custom element escape sequence: {err}"
                ));
                screen.newline();
            }
        }
    }

    /// Handles a complete APC payload.
    fn process_apc(&mut self, screen: &mut Screen, end: usize) {
        let payload = self.payload(end);
        match parse_buildkite_apc(&mut self.last_timestamp, &payload) {
            Ok(Some(data)) => screen.set_line_metadata(BK_NAMESPACE, data),
            Ok(None) => {}
            Err(err) => {
                screen.append_str(&format!(
                    "*** Error parsing buildkite metadata escape sequence: {err}"
                ));
                screen.newline();
            }
        }
    }
}
