//! Error types for the matchgate crate.
//!
//! Every failure class gets its own enum so callers can pattern match on
//! the exact condition: decode failures on the event stream, build failures
//! on configuration updates, evaluation failures, and sink failures. The
//! top-level [`EngineError`] wraps all of them.

use thiserror::Error;

/// Result type alias for matchgate operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while decoding one raw event record.
///
/// Decoding is all-or-nothing: any of these means no `Event` was produced
/// and the record must be dropped by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("record truncated: needed {needed} more byte(s) at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("unknown field wire tag {tag:#04x} at offset {offset}")]
    UnknownFieldTag { tag: u8, offset: usize },

    #[error("invalid bool byte {byte:#04x}, expected 0 or 1")]
    InvalidBool { byte: u8 },

    #[error("string payload is not valid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{count} trailing byte(s) after the last declared field")]
    TrailingBytes { count: usize },
}

/// Errors raised while encoding an event as a wire record.
///
/// The wire format carries the field count and each string length as u16;
/// an event past either cap has no wire representation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("event has {count} fields, the wire format caps the count at 65535")]
    TooManyFields { count: usize },

    #[error("string field at position {position} is {len} bytes, the wire format caps strings at 65535")]
    StringTooLong { position: usize, len: usize },
}

/// Errors raised while building a matcher graph from a configuration.
///
/// A build failure rejects the whole configuration; the processor keeps the
/// previously active graph for that source untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("duplicate matcher name '{name}'")]
    DuplicateName { name: String },

    #[error("matcher '{matcher}' references unknown matcher '{reference}'")]
    UnresolvedReference { matcher: String, reference: String },

    #[error("matcher '{name}' participates in a reference cycle")]
    CyclicGraph { name: String },

    #[error("combination matcher '{name}' has no children")]
    EmptyCombination { name: String },

    #[error("simple matcher '{name}' lists no categories")]
    NoCategories { name: String },

    #[error("matcher '{name}': predicate op '{op}' cannot apply to {value}")]
    InvalidPredicate {
        name: String,
        op: String,
        value: String,
    },

    #[error("matcher '{name}': invalid regex '{pattern}': {message}")]
    InvalidRegex {
        name: String,
        pattern: String,
        message: String,
    },

    #[error("target '{name}' does not name a defined matcher")]
    UnknownTarget { name: String },
}

/// Errors raised during graph evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("target index {index} out of range for graph with {node_count} node(s)")]
    InvalidTarget { index: u32, node_count: usize },
}

/// Errors raised by a match sink while persisting a matched event.
///
/// Sink failures never abort the event stream; the processor logs them and
/// keeps evaluating.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("sink error: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::new(err.to_string())
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        SinkError::new(err.to_string())
    }
}

/// Top-level error type for the matchgate crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl EngineError {
    /// Returns true if this error came from the event decoder.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if this error came from a configuration build.
    #[must_use]
    pub const fn is_build(&self) -> bool {
        matches!(self, Self::Build(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Truncated {
            offset: 12,
            needed: 4,
        };
        assert_eq!(
            err.to_string(),
            "record truncated: needed 4 more byte(s) at offset 12"
        );

        let err = DecodeError::UnknownFieldTag {
            tag: 0x09,
            offset: 15,
        };
        assert_eq!(err.to_string(), "unknown field wire tag 0x09 at offset 15");

        let err = DecodeError::InvalidBool { byte: 0x07 };
        assert_eq!(err.to_string(), "invalid bool byte 0x07, expected 0 or 1");

        let err = DecodeError::TrailingBytes { count: 3 };
        assert_eq!(
            err.to_string(),
            "3 trailing byte(s) after the last declared field"
        );
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::TooManyFields { count: 70_000 };
        assert_eq!(
            err.to_string(),
            "event has 70000 fields, the wire format caps the count at 65535"
        );

        let err = EncodeError::StringTooLong {
            position: 2,
            len: 70_000,
        };
        assert_eq!(
            err.to_string(),
            "string field at position 2 is 70000 bytes, the wire format caps strings at 65535"
        );
    }

    #[test]
    fn test_build_error_display() {
        let err = BuildError::DuplicateName {
            name: "M_login".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate matcher name 'M_login'");

        let err = BuildError::UnresolvedReference {
            matcher: "M_target".to_string(),
            reference: "M_missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "matcher 'M_target' references unknown matcher 'M_missing'"
        );

        let err = BuildError::CyclicGraph {
            name: "M_loop".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "matcher 'M_loop' participates in a reference cycle"
        );
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::InvalidTarget {
            index: 9,
            node_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "target index 9 out of range for graph with 3 node(s)"
        );
    }

    #[test]
    fn test_sink_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let sink_err: SinkError = io_err.into();
        assert!(sink_err.message.contains("pipe closed"));
    }

    #[test]
    fn test_engine_error_from_conversions() {
        let err: EngineError = DecodeError::InvalidBool { byte: 2 }.into();
        assert!(err.is_decode());
        assert!(!err.is_build());

        let err: EngineError = BuildError::Parse("bad yaml".to_string()).into();
        assert!(err.is_build());
        assert!(err.to_string().contains("bad yaml"));

        let err: EngineError = EvalError::InvalidTarget {
            index: 1,
            node_count: 0,
        }
        .into();
        assert!(matches!(err, EngineError::Eval(_)));

        let err: EngineError = SinkError::new("disk full").into();
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_equality() {
        let a = BuildError::DuplicateName {
            name: "x".to_string(),
        };
        let b = BuildError::DuplicateName {
            name: "x".to_string(),
        };
        let c = BuildError::DuplicateName {
            name: "y".to_string(),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_result_type_alias() {
        fn ok_path() -> Result<u32> {
            Ok(7)
        }
        fn err_path() -> Result<u32> {
            Err(BuildError::Parse("broken".to_string()).into())
        }

        assert_eq!(ok_path().unwrap(), 7);
        assert!(err_path().is_err());
    }
}
