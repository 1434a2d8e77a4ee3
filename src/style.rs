//! Packed per-cell style
//!
//! Every cell on the screen carries a `Style`: a single 32-bit word packing
//! the foreground and background color indices plus a set of attribute
//! flags. Keeping the style a plain integer makes cell comparison (used by
//! the span-coalescing renderer) a single word compare and keeps the node
//! array dense.

use serde::{Deserialize, Serialize};

// Bit layout:
//
//   0......7  8.....15  16...............23  24       25
//   fg color  bg color  attribute flags      element  hyperlink
//
// The element and hyperlink bits drive separate tags during rendering and
// are excluded from style comparison.

const FG_EXTENDED: u32 = 1 << 16;
const BG_EXTENDED: u32 = 1 << 17;
const BOLD: u32 = 1 << 18;
const FAINT: u32 = 1 << 19;
const ITALIC: u32 = 1 << 20;
const UNDERLINE: u32 = 1 << 21;
const STRIKE: u32 = 1 << 22;
const BLINK: u32 = 1 << 23;
const ELEMENT: u32 = 1 << 24;
const HYPERLINK: u32 = 1 << 25;

/// Style comparison ignores the element bit, the hyperlink bit and the
/// unused high bits.
const COMPARISON_MASK: u32 = 0x00ff_ffff;

/// A packed cell style.
///
/// The zero value is the plain (unstyled) style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Style(u32);

impl Style {
    /// The plain style: default colors, no attributes.
    pub const PLAIN: Style = Style(0);

    /// Reports whether no styling information is set. Cells that only have
    /// the element or hyperlink bit set are still considered plain.
    pub fn is_plain(self) -> bool {
        self.0 & COMPARISON_MASK == 0
    }

    /// Compares two styles for span-grouping purposes, ignoring the
    /// element and hyperlink bits.
    pub fn same_appearance(self, other: Style) -> bool {
        self.0 & COMPARISON_MASK == other.0 & COMPARISON_MASK
    }

    pub fn fg_color(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub fn bg_color(self) -> u8 {
        ((self.0 & 0xff00) >> 8) as u8
    }

    pub fn fg_extended(self) -> bool {
        self.0 & FG_EXTENDED != 0
    }

    pub fn bg_extended(self) -> bool {
        self.0 & BG_EXTENDED != 0
    }

    pub fn bold(self) -> bool {
        self.0 & BOLD != 0
    }

    pub fn faint(self) -> bool {
        self.0 & FAINT != 0
    }

    pub fn italic(self) -> bool {
        self.0 & ITALIC != 0
    }

    pub fn underline(self) -> bool {
        self.0 & UNDERLINE != 0
    }

    pub fn strike(self) -> bool {
        self.0 & STRIKE != 0
    }

    pub fn blink(self) -> bool {
        self.0 & BLINK != 0
    }

    pub fn element(self) -> bool {
        self.0 & ELEMENT != 0
    }

    pub fn hyperlink(self) -> bool {
        self.0 & HYPERLINK != 0
    }

    fn set_fg_color(&mut self, v: u8) {
        self.0 = (self.0 & !0xff) | v as u32;
    }

    fn set_bg_color(&mut self, v: u8) {
        self.0 = (self.0 & !0xff00) | ((v as u32) << 8);
    }

    fn set_flag(&mut self, flag: u32, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }

    pub(crate) fn set_element(&mut self, on: bool) {
        self.set_flag(ELEMENT, on);
    }

    pub(crate) fn set_hyperlink(&mut self, on: bool) {
        self.set_flag(HYPERLINK, on);
    }

    /// Applies a sequence of SGR parameters to this style, returning the
    /// updated style. Parameters are the decimal strings between the
    /// semicolons of a `CSI … m` sequence. An empty list, or a single empty
    /// or `0` parameter, resets all attributes. Unrecognized parameters are
    /// ignored.
    pub fn apply_sgr(self, params: &[String]) -> Style {
        if params.is_empty() || (params.len() == 1 && (params[0] == "0" || params[0].is_empty())) {
            // Reset everything except the element and hyperlink bits.
            return Style(self.0 & !COMPARISON_MASK);
        }

        let mut s = self;
        let mut mode = ColorMode::Normal;

        for param in params {
            let Ok(cc) = param.parse::<u8>() else {
                continue;
            };

            // Extended-color sequences (38;5;N, 48;5;N, 38;2;R;G;B, …)
            // consume the parameters that follow them.
            match mode {
                ColorMode::FgIntro => {
                    mode = match cc {
                        5 => ColorMode::FgExtended,
                        2 => ColorMode::Direct(3),
                        _ => ColorMode::Normal,
                    };
                    continue;
                }
                ColorMode::BgIntro => {
                    mode = match cc {
                        5 => ColorMode::BgExtended,
                        2 => ColorMode::Direct(3),
                        _ => ColorMode::Normal,
                    };
                    continue;
                }
                ColorMode::FgExtended => {
                    s.set_fg_color(cc);
                    s.set_flag(FG_EXTENDED, true);
                    mode = ColorMode::Normal;
                    continue;
                }
                ColorMode::BgExtended => {
                    s.set_bg_color(cc);
                    s.set_flag(BG_EXTENDED, true);
                    mode = ColorMode::Normal;
                    continue;
                }
                ColorMode::Direct(remaining) => {
                    // 24-bit color components are accepted but not stored;
                    // class emission has no representation for them.
                    mode = if remaining > 1 {
                        ColorMode::Direct(remaining - 1)
                    } else {
                        ColorMode::Normal
                    };
                    continue;
                }
                ColorMode::Normal => {}
            }

            match cc {
                0 => s.0 &= !COMPARISON_MASK,
                1 => {
                    s.set_flag(BOLD, true);
                    s.set_flag(FAINT, false);
                }
                2 => {
                    s.set_flag(FAINT, true);
                    s.set_flag(BOLD, false);
                }
                3 => s.set_flag(ITALIC, true),
                4 => s.set_flag(UNDERLINE, true),
                5 | 6 => s.set_flag(BLINK, true),
                9 => s.set_flag(STRIKE, true),
                21 | 22 => {
                    s.set_flag(BOLD, false);
                    s.set_flag(FAINT, false);
                }
                23 => s.set_flag(ITALIC, false),
                24 => s.set_flag(UNDERLINE, false),
                25 => s.set_flag(BLINK, false),
                29 => s.set_flag(STRIKE, false),
                38 => mode = ColorMode::FgIntro,
                39 => {
                    s.set_fg_color(0);
                    s.set_flag(FG_EXTENDED, false);
                }
                48 => mode = ColorMode::BgIntro,
                49 => {
                    s.set_bg_color(0);
                    s.set_flag(BG_EXTENDED, false);
                }
                30..=37 | 90..=97 => {
                    s.set_fg_color(cc);
                    s.set_flag(FG_EXTENDED, false);
                }
                40..=47 | 100..=107 => {
                    s.set_bg_color(cc);
                    s.set_flag(BG_EXTENDED, false);
                }
                _ => {}
            }
        }
        s
    }

    /// Emits the CSS classes for this style, in a deterministic order:
    /// foreground color, background color, then attribute flags.
    pub fn css_classes(self) -> Vec<String> {
        let mut classes = Vec::new();

        let fg = self.fg_color();
        if self.fg_extended() {
            classes.push(format!("term-fgx{fg}"));
        } else if fg > 38 {
            // High-intensity colors keep a legacy class name.
            classes.push(format!("term-fgi{fg}"));
        } else if fg > 0 {
            classes.push(format!("term-fg{fg}"));
        }

        let bg = self.bg_color();
        if self.bg_extended() {
            classes.push(format!("term-bgx{bg}"));
        } else if bg > 48 {
            classes.push(format!("term-bgi{bg}"));
        } else if bg > 0 {
            classes.push(format!("term-bg{bg}"));
        }

        if self.bold() {
            classes.push("term-fg1".to_string());
        }
        if self.faint() {
            classes.push("term-fg2".to_string());
        }
        if self.italic() {
            classes.push("term-fg3".to_string());
        }
        if self.underline() {
            classes.push("term-fg4".to_string());
        }
        if self.blink() {
            classes.push("term-fg5".to_string());
        }
        if self.strike() {
            classes.push("term-fg9".to_string());
        }

        classes
    }
}

/// State machine for the multi-parameter extended-color sequences.
#[derive(Debug, Clone, Copy)]
enum ColorMode {
    Normal,
    /// Saw 38; the next parameter selects the color mode.
    FgIntro,
    /// Saw 48.
    BgIntro,
    /// Saw 38;5; the next parameter is an XTerm 256-color index.
    FgExtended,
    /// Saw 48;5.
    BgExtended,
    /// Saw 38;2 or 48;2; this many RGB components remain to be consumed.
    Direct(u8),
}
