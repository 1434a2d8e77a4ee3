//! Renderer fixtures: byte input to expected HTML
//!
//! Each case feeds a complete input through a fresh screen and compares
//! the HTML. The same table is replayed with one-byte writes to verify
//! that chunk boundaries never change the output.

use std::io::Write as _;

use termstream::{render, render_plain, Screen};

struct Case {
    name: &'static str,
    input: &'static [u8],
    want: &'static str,
}

const CASES: &[Case] = &[
    Case {
        name: "input that ends in a newline will not include that newline",
        input: b"hello\n",
        want: "hello",
    },
    Case {
        name: "closes colors that get opened",
        input: b"he\x1b[32mllo",
        want: "he<span class=\"term-fg32\">llo</span>",
    },
    Case {
        name: "treats multi-byte unicode characters as individual runes",
        input: "€€€€€€\u{8}\u{8}\u{8}aaa".as_bytes(),
        want: "€€€aaa",
    },
    Case {
        name: "skips over colors when backspacing",
        input: b"he\x1b[32m\x1b[33m\x08llo",
        want: "h<span class=\"term-fg33\">llo</span>",
    },
    Case {
        name: "handles CSI m with no parameter as a reset",
        input: b"\x1b[36mthis has a color\x1b[mthis is normal now\r\n",
        want: "<span class=\"term-fg36\">this has a color</span>this is normal now",
    },
    Case {
        name: "treats CSI 39m as a foreground reset",
        input: b"\x1b[36mthis has a color\x1b[39mthis is normal now\r\n",
        want: "<span class=\"term-fg36\">this has a color</span>this is normal now",
    },
    Case {
        name: "starts overwriting characters after a carriage return",
        input: b"hello\rb",
        want: "bello",
    },
    Case {
        name: "colors span multiple lines",
        input: b"\x1b[32mhello\n\nfriend\x1b[0m",
        want: "<span class=\"term-fg32\">hello</span>\n&nbsp;\n<span class=\"term-fg32\">friend</span>",
    },
    Case {
        name: "cursor forward pads with spaces",
        input: b"this is\x1b[4Cpoop and stuff",
        want: "this is    poop and stuff",
    },
    Case {
        name: "cursor down past the bottom of the buffer",
        input: b"this is great \x1b[1Bhello",
        want: "this is great\n              hello",
    },
    Case {
        name: "cursor backward",
        input: b"this is good\x1b[4Dpoop and stuff",
        want: "this is poop and stuff",
    },
    Case {
        name: "cursor backward further than the start of the line",
        input: b"this is good\x1b[100Dpoop and stuff",
        want: "poop and stuff",
    },
    Case {
        name: "backspace past the start of the line",
        input: b"hi\x08\x08\x08\x08\x08\x08\x08\x08bye",
        want: "bye",
    },
    Case {
        name: "cursor upward",
        input: b"1234\n56\x1b[1A78\x1b[B",
        want: "1278\n56",
    },
    Case {
        name: "cursor up and down through a grid",
        input: b"aaaa\nbbbb\ncccc\x1b[2A\x1b[1B\r1234\x1b[1B",
        want: "aaaa\n1234\ncccc",
    },
    Case {
        name: "CSI 1K clears everything before the cursor",
        input: b"hello\x1b[1Kfriend!",
        want: "     friend!",
    },
    Case {
        name: "CSI 0K clears everything after the cursor",
        input: b"hello\nfriend!\x1b[A\r\x1b[0K",
        want: "&nbsp;\nfriend!",
    },
    Case {
        name: "CSI G jumps to the start of the line",
        input: b"hello friend\x1b[Ggoodbye buddy!",
        want: "goodbye buddy!",
    },
    Case {
        name: "preserves characters already written in a certain color",
        input: "  \x1b[90m․\x1b[0m\x1b[90m․\x1b[0m\x1b[0G\x1b[90m․\x1b[0m\x1b[90m․\x1b[0m".as_bytes(),
        want: "<span class=\"term-fgi90\">․․․․</span>",
    },
    Case {
        name: "replaces empty lines with non-breaking spaces",
        input: b"hello\n\nfriend",
        want: "hello\n&nbsp;\nfriend",
    },
    Case {
        name: "preserves opening colors when jumping to the start of the line",
        input: b"\x1b[33mhello\x1b[0m\x1b[33m\x1b[44m\x1b[0Ggoodbye",
        want: "<span class=\"term-fg33 term-bg44\">goodbye</span>",
    },
    Case {
        name: "cursor position approximates the row with an implicit newline",
        input: b"line 1\nline 2\nline 3\n\x1b[2;3Hm",
        want: "line 1\nline 2\nline 3\n  m",
    },
    Case {
        name: "clears lines below the cursor in place",
        input: b"foo\nbar\x1b[A\x1b[Jbaz",
        want: "foobaz\n&nbsp;",
    },
    Case {
        name: "clearing lines below when there are none",
        input: b"foobar\x1b[0J",
        want: "foobar",
    },
    Case {
        name: "clears lines above the cursor in place",
        input: b"foo\nbar\nbaz\x1b[A\x1b[1Jqux",
        want: "&nbsp;\n   qux\nbaz",
    },
    Case {
        name: "clearing lines above when there are none",
        input: b"\x1b[1Jfoobar",
        want: "foobar",
    },
    Case {
        name: "CSI 2J clears every window line in place",
        input: b"one\ntwo\nthree\n\n\x1b[2Jhey presto",
        want: "&nbsp;\n&nbsp;\n&nbsp;\n&nbsp;\nhey presto",
    },
    Case {
        name: "CSI 3J clears every buffer line in place",
        input: b"one\ntwo\nthree\n\n\x1b[3Jhey presto",
        want: "&nbsp;\n&nbsp;\n&nbsp;\n&nbsp;\nhey presto",
    },
    Case {
        name: "erases the current line up to the cursor",
        input: b"hello friend\x1b[1K!",
        want: "            !",
    },
    Case {
        name: "clears the whole current line",
        input: b"hello friend\x1b[2K!",
        want: "            !",
    },
    Case {
        name: "does not close spans that were never opened",
        input: b"hello \x1b[0mfriend",
        want: "hello friend",
    },
    Case {
        name: "CSI K then carriage return rewrites the line",
        input: b"remote: Compressing objects:   0% (1/3342)\x1b[K\rremote: Compressing objects:   1% (34/3342)",
        want: "remote: Compressing objects:   1% (34&#47;3342)",
    },
    Case {
        name: "handles reverse linefeed",
        input: b"meow\npurr\nnyan\x1bMrawr",
        want: "meow\npurrrawr\nnyan",
    },
    Case {
        name: "collapses spans of the same color",
        input: "\x1b[90m․\x1b[90m․\x1b[90m․\x1b[90m․\n\x1b[90m․\x1b[90m․\x1b[90m․\x1b[90m․".as_bytes(),
        want: "<span class=\"term-fgi90\">․․․․</span>\n<span class=\"term-fgi90\">․․․․</span>",
    },
    Case {
        name: "escapes HTML in cell text",
        input: b"hello <strong>friend</strong>",
        want: "hello &lt;strong&gt;friend&lt;&#47;strong&gt;",
    },
    Case {
        name: "escapes HTML in aborted color codes",
        input: b"hello \x1b[\"hellomfriend",
        want: "hello [&quot;hellomfriend",
    },
    Case {
        name: "handles background colors",
        input: b"\x1b[30;42m\x1b[2KOK (244 tests, 558 assertions)",
        want: "<span class=\"term-fg30 term-bg42\">OK (244 tests, 558 assertions)</span>",
    },
    Case {
        name: "does not nest CSS spans when colors change midway",
        input: b"Some plain text\x1b[0;30;42m yay a green background \x1b[0m\x1b[0;33;49mnow this has no background but is yellow \x1b[0m",
        want: "Some plain text<span class=\"term-fg30 term-bg42\"> yay a green background </span><span class=\"term-fg33\">now this has no background but is yellow </span>",
    },
    Case {
        name: "handles xterm 256 colors",
        input: b"\x1b[38;5;169;48;5;50mhello\x1b[0m \x1b[38;5;179mgoodbye",
        want: "<span class=\"term-fgx169 term-bgx50\">hello</span> <span class=\"term-fgx179\">goodbye</span>",
    },
    Case {
        name: "handles non-xterm codes on the same line as xterm colors",
        input: b"\x1b[38;5;228;5;1mblinking and bold\x1b",
        want: "<span class=\"term-fgx228 term-fg1 term-fg5\">blinking and bold</span>",
    },
    Case {
        name: "ignores broken escapes, stripping the escape byte",
        input: b"hi amazing \x1b[12 nom nom nom friends",
        want: "hi amazing [12 nom nom nom friends",
    },
    Case {
        name: "handles colors with multiple attributes",
        input: b"\x1b[0;10;4m\x1b[1m\x1b[34mgood news\x1b[0;10m\n\neveryone",
        want: "<span class=\"term-fg34 term-fg1 term-fg4\">good news</span>\n&nbsp;\neveryone",
    },
    Case {
        name: "ends underlining with CSI 24m",
        input: b"\x1b[4mbegin\x1b[24m\r\nend",
        want: "<span class=\"term-fg4\">begin</span>\nend",
    },
    Case {
        name: "ends bold with CSI 21m",
        input: b"\x1b[1mbegin\x1b[21m\r\nend",
        want: "<span class=\"term-fg1\">begin</span>\nend",
    },
    Case {
        name: "ends bold with CSI 22m",
        input: b"\x1b[1mbegin\x1b[22m\r\nend",
        want: "<span class=\"term-fg1\">begin</span>\nend",
    },
    Case {
        name: "ends crossed out with CSI 29m",
        input: b"\x1b[9mbegin\x1b[29m\r\nend",
        want: "<span class=\"term-fg9\">begin</span>\nend",
    },
    Case {
        name: "ends italic with CSI 23m",
        input: b"\x1b[3mbegin\x1b[23m\r\nend",
        want: "<span class=\"term-fg3\">begin</span>\nend",
    },
    Case {
        name: "ends decreased intensity with CSI 22m",
        input: b"\x1b[2mbegin\x1b[22m\r\nend",
        want: "<span class=\"term-fg2\">begin</span>\nend",
    },
    Case {
        name: "ignores cursor show and hide",
        input: b"\x1b[?25ldoing a thing without a cursor\x1b[?25h",
        want: "doing a thing without a cursor",
    },
    Case {
        name: "renders inline images on their own line",
        input: b"hi\x1b]1337;File=name=MS5naWY=;inline=1:AA==\x07hello",
        want: "hi\n<img alt=\"1.gif\" src=\"data:image/gif;base64,AA==\">\nhello",
    },
    Case {
        name: "keeps images at the start of a line in place",
        input: b"\x1b]1337;File=name=MS5naWY=;inline=1:AA==\x07",
        want: "<img alt=\"1.gif\" src=\"data:image/gif;base64,AA==\">",
    },
    Case {
        name: "silently ignores unsupported OSC numbers",
        input: b"abc\x1b]9999\x07ghi",
        want: "abcghi",
    },
    Case {
        name: "drops images that are not marked inline",
        input: b"hi\x1b]1337;File=name=MS5naWY=;inline=0:AA==\x07hello",
        want: "hihello",
    },
    Case {
        name: "renders external images",
        input: b"\x1b]1338;url=http://foo.com/foobar.gif;alt=foo bar\x07",
        want: "<img alt=\"foo bar\" src=\"http://foo.com/foobar.gif\">",
    },
    Case {
        name: "suppresses external images with denied schemes",
        input: b"before\x1b]1338;url=javascript:alert(1);alt=hello\x07after",
        want: "before\n&nbsp;\nafter",
    },
    Case {
        name: "renders links inline with other content",
        input: b"a link to \x1b]1339;url=http://google.com;content=google\x07.",
        want: "a link to <a href=\"http://google.com\">google</a>.",
    },
    Case {
        name: "renders OSC 8 links",
        input: b"a link to \x1b]8;;http://google.com\x1b\\google\x1b]8;;\x1b\\.",
        want: "a link to <a href=\"http://google.com\">google</a>.",
    },
    Case {
        name: "re-nests color spans straddling an OSC 8 link boundary",
        input: b"five \x1b]8;;http://example.com\x1b\\six \x1b[35mseven \x1b]8;;\x1b\\eight\x1b[0m",
        want: "five <a href=\"http://example.com\">six <span class=\"term-fg35\">seven </span></a><span class=\"term-fg35\">eight</span>",
    },
    Case {
        name: "uses the URL as link content when content is missing",
        input: b"\x1b]1339;url=http://google.com\x07",
        want: "<a href=\"http://google.com\">http://google.com</a>",
    },
    Case {
        name: "escapes HTML in inline image attributes",
        input: b"hi\x1b]1337;File=name=PHNjcmlwdD4ucGRm;inline=1:AA==\x07hello",
        want: "hi\n<img alt=\"&lt;script&gt;.pdf\" src=\"data:application/pdf;base64,AA==\">\nhello",
    },
    Case {
        name: "escapes HTML in external image attributes",
        input: b"\x1b]1338;url=\"https://example.com/a.gif&a=<b>&c='d'\";alt=foo&bar;width=\"<wat>\";height=2px\x07",
        want: "<img alt=\"foo&amp;bar\" src=\"https://example.com/a.gif&amp;a=&lt;b&gt;&amp;c=&#39;d&#39;\" width=\"&lt;wat&gt;em\" height=\"2px\">",
    },
    Case {
        name: "escapes HTML in link attributes and content",
        input: b"\x1b]1339;url=\"https://example.com/a.gif&a=<b>&c='d'\";content=<h1>hello</h1>\x07",
        want: "<a href=\"https://example.com/a.gif&amp;a=&lt;b&gt;&amp;c=&#39;d&#39;\">&lt;h1&gt;hello&lt;/h1&gt;</a>",
    },
    Case {
        name: "escapes HTML in OSC 8 link hrefs and text",
        input: b"a link to \x1b]8;;https://example.com/a.gif&a=<b>&c='d'\x1b\\<h1>hello</h1>\x1b]8;;\x1b\\.",
        want: "a link to <a href=\"https://example.com/a.gif&amp;a=&lt;b&gt;&amp;c=&#39;d&#39;\">&lt;h1&gt;hello&lt;&#47;h1&gt;</a>.",
    },
    Case {
        name: "replaces javascript scheme link URLs",
        input: b"\x1b]1339;url=javascript:alert(1);content=hello\x07",
        want: "<a href=\"#\">hello</a>",
    },
    Case {
        name: "replaces javascript scheme OSC 8 URLs",
        input: b"\x1b]8;;javascript:alert(1)\x07XSS!\x1b]8;;\x1b\\",
        want: "<a href=\"#\">XSS!</a>",
    },
    Case {
        name: "allows artifact scheme link URLs",
        input: b"\x1b]1339;url=artifact://hello.txt\x07\n",
        want: "<a href=\"artifact://hello.txt\">artifact://hello.txt</a>",
    },
    Case {
        name: "allows artifact scheme OSC 8 URLs",
        input: b"\x1b]8;;artifact://hello.txt\x07the hello.txt artifact\x1b]8;;\x07\n",
        want: "<a href=\"artifact://hello.txt\">the hello.txt artifact</a>",
    },
    Case {
        name: "renders bk timestamps followed by text",
        input: b"\x1b_bk;t=123\x07hello",
        want: "<time datetime=\"1970-01-01T00:00:00.123Z\">1970-01-01T00:00:00.123Z</time>hello",
    },
    Case {
        name: "renders bk timestamps surrounded by text",
        input: b"hello \x1b_bk;t=123\x07world",
        want: "<time datetime=\"1970-01-01T00:00:00.123Z\">1970-01-01T00:00:00.123Z</time>hello world",
    },
    Case {
        name: "the last timestamp on a line wins",
        input: b"hello\x1b_bk;t=123\x07 world\x1b_bk;t=456\x07!",
        want: "<time datetime=\"1970-01-01T00:00:00.456Z\">1970-01-01T00:00:00.456Z</time>hello world!",
    },
    Case {
        name: "timestamps track across multiple lines",
        input: b"hello\x1b_bk;t=123\x07 world\x1b_bk;t=234\x07!\nanother\x1b_bk;t=345\x07 line\x1b_bk;t=456\x07!",
        want: "<time datetime=\"1970-01-01T00:00:00.234Z\">1970-01-01T00:00:00.234Z</time>hello world!\n<time datetime=\"1970-01-01T00:00:00.456Z\">1970-01-01T00:00:00.456Z</time>another line!",
    },
    Case {
        name: "delta timestamps accumulate",
        input: b"hello\x1b_bk;t=123\x07 world\x1b_bk;dt=111\x07!\nanother\x1b_bk;dt=111\x07 line\x1b_bk;dt=111\x07!",
        want: "<time datetime=\"1970-01-01T00:00:00.234Z\">1970-01-01T00:00:00.234Z</time>hello world!\n<time datetime=\"1970-01-01T00:00:00.456Z\">1970-01-01T00:00:00.456Z</time>another line!",
    },
];

#[test]
fn renderer_against_cases() {
    for case in CASES {
        let got = render(case.input);
        assert_eq!(got, case.want, "case {:?}", case.name);
    }
}

#[test]
fn renderer_is_chunking_agnostic() {
    for case in CASES {
        let mut screen = Screen::default();
        for byte in case.input {
            screen.write_all(std::slice::from_ref(byte)).unwrap();
        }
        assert_eq!(
            screen.as_html(),
            case.want,
            "case {:?} with one-byte writes",
            case.name
        );
    }
}

#[test]
fn extraction_is_idempotent() {
    for case in CASES {
        let mut screen = Screen::default();
        screen.write_all(case.input).unwrap();
        assert_eq!(screen.as_html(), screen.as_html(), "case {:?}", case.name);
        assert_eq!(
            screen.as_plain_text(),
            screen.as_plain_text(),
            "case {:?}",
            case.name
        );
    }
}

#[test]
fn plain_text_rendering() {
    assert_eq!(render_plain(b"hello\n"), "hello");
    assert_eq!(render_plain(b"he\x1b[32mllo\x1b[0m"), "hello");
    assert_eq!(render_plain(b"hello\rbye"), "byelo");
    assert_eq!(render_plain(b"a\n\nb"), "a\n\nb");
    // Elements do not contribute to plain text.
    assert_eq!(
        render_plain(b"a link to \x1b]1339;url=http://google.com;content=google\x07."),
        "a link to ."
    );
    // Trailing whitespace is trimmed at hard line breaks.
    assert_eq!(render_plain(b"hi   \nthere"), "hi\nthere");
}
