//! Buildkite APC metadata sequences
//!
//! The build agent interleaves `ESC _ bk;…` Application Program Commands
//! with the job output to attach metadata to lines, most importantly
//! millisecond timestamps: `t=<abs>` sets an absolute timestamp and
//! `dt=<delta>` advances the previous one. Both are stored on the line as
//! an absolute value under the `t` key.

use std::collections::HashMap;

use thiserror::Error;

use crate::element::{tokenize, TokenizeError};

/// Namespace used for line metadata set by these sequences.
pub(crate) const BK_NAMESPACE: &str = "bk";

/// Errors from APC metadata parsing, rendered into the screen as error
/// text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("failed to read key=value from token {0:?}")]
    MalformedToken(String),
    #[error("{key} key has non-integer value {value:?}")]
    NonIntegerTimestamp { key: &'static str, value: String },
}

/// Parses an APC payload, which may or may not be a Buildkite sequence,
/// e.g. `bk;t=1234;llamas=blah`.
///
/// Returns `Ok(None)` for non-Buildkite payloads. `last_timestamp` is the
/// parser's running clock: `t` replaces it and `dt` advances it, and the
/// resulting absolute value is stored under `t` in the returned metadata.
pub(crate) fn parse_buildkite_apc(
    last_timestamp: &mut i64,
    payload: &str,
) -> Result<Option<HashMap<String, String>>, MetadataError> {
    let Some(rest) = payload.strip_prefix("bk;") else {
        return Ok(None);
    };

    let mut data = HashMap::new();

    for token in tokenize(rest, ';', '\\')? {
        let Some((key, value)) = token.split_once('=') else {
            return Err(MetadataError::MalformedToken(token));
        };
        match key {
            "t" => {
                let t = value.parse::<i64>().map_err(|_| {
                    MetadataError::NonIntegerTimestamp {
                        key: "t",
                        value: value.to_string(),
                    }
                })?;
                *last_timestamp = t;
                data.insert("t".to_string(), value.to_string());
            }
            "dt" => {
                let dt = value.parse::<i64>().map_err(|_| {
                    MetadataError::NonIntegerTimestamp {
                        key: "dt",
                        value: value.to_string(),
                    }
                })?;
                // Deltas are converted to absolute timestamps on storage.
                *last_timestamp += dt;
                data.insert("t".to_string(), last_timestamp.to_string());
            }
            _ => {
                data.insert(key.to_string(), value.to_string());
            }
        }
    }

    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_bk_payload() {
        let mut ts = 0;
        assert_eq!(parse_buildkite_apc(&mut ts, "llamas;t=1").unwrap(), None);
        assert_eq!(ts, 0);
    }

    #[test]
    fn test_absolute_timestamp() {
        let mut ts = 0;
        let data = parse_buildkite_apc(&mut ts, "bk;t=123").unwrap().unwrap();
        assert_eq!(ts, 123);
        assert_eq!(data.get("t").unwrap(), "123");
    }

    #[test]
    fn test_delta_timestamp() {
        let mut ts = 123;
        let data = parse_buildkite_apc(&mut ts, "bk;dt=111").unwrap().unwrap();
        assert_eq!(ts, 234);
        assert_eq!(data.get("t").unwrap(), "234");
    }

    #[test]
    fn test_other_keys_stored_verbatim() {
        let mut ts = 0;
        let data = parse_buildkite_apc(&mut ts, "bk;t=1;llamas=blah")
            .unwrap()
            .unwrap();
        assert_eq!(data.get("llamas").unwrap(), "blah");
    }

    #[test]
    fn test_malformed_token() {
        let mut ts = 0;
        assert!(matches!(
            parse_buildkite_apc(&mut ts, "bk;novalue"),
            Err(MetadataError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_non_integer_timestamp() {
        let mut ts = 0;
        assert!(matches!(
            parse_buildkite_apc(&mut ts, "bk;t=llama"),
            Err(MetadataError::NonIntegerTimestamp { key: "t", .. })
        ));
        assert!(matches!(
            parse_buildkite_apc(&mut ts, "bk;dt=llama"),
            Err(MetadataError::NonIntegerTimestamp { key: "dt", .. })
        ));
    }
}
