//! Incremental UTF-8 decoding over the parser's byte buffer
//!
//! The parser examines one scalar at a time and may be handed input that
//! ends mid-sequence; a truncated-but-valid prefix must be kept for the
//! next write rather than decoded as garbage.

/// Result of decoding the scalar at the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// A scalar and the number of bytes it occupied. Invalid sequences
    /// decode as U+FFFD spanning the offending bytes.
    Scalar(char, usize),
    /// The slice ends with the valid prefix of a multi-byte sequence.
    Incomplete,
}

/// Decodes the first Unicode scalar in `bytes`, which must be non-empty.
pub(crate) fn decode_scalar(bytes: &[u8]) -> Decoded {
    // ASCII fast path.
    if bytes[0] < 0x80 {
        return Decoded::Scalar(bytes[0] as char, 1);
    }

    let probe = &bytes[..bytes.len().min(4)];
    match std::str::from_utf8(probe) {
        Ok(s) => first_char(s),
        Err(err) if err.valid_up_to() > 0 => {
            match std::str::from_utf8(&probe[..err.valid_up_to()]) {
                Ok(s) => first_char(s),
                // from_utf8 vouched for this prefix; unreachable in practice.
                Err(_) => Decoded::Scalar(char::REPLACEMENT_CHARACTER, 1),
            }
        }
        Err(err) => match err.error_len() {
            // Unexpected end of input: a valid sequence may complete in
            // the next write.
            None => Decoded::Incomplete,
            Some(len) => Decoded::Scalar(char::REPLACEMENT_CHARACTER, len),
        },
    }
}

fn first_char(s: &str) -> Decoded {
    match s.chars().next() {
        Some(c) => Decoded::Scalar(c, c.len_utf8()),
        None => Decoded::Scalar(char::REPLACEMENT_CHARACTER, 1),
    }
}
