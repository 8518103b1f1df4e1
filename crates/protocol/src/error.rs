//! Codec error types

use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while translating between wire and canonical forms
#[derive(Debug, Error)]
pub enum CodecError {
    /// Path string or wire path contained no elements
    #[error("empty path")]
    EmptyPath,

    /// A path element had no name
    #[error("empty element name in path '{path}'")]
    EmptyElementName {
        /// The offending path in string form
        path: String,
    },

    /// A key constraint was not of the form `[name=value]`
    #[error("malformed key '{key}' in path element '{elem}'")]
    MalformedKey { elem: String, key: String },

    /// The same key name appeared twice within one element
    #[error("duplicate key '{key}' in path element '{elem}'")]
    DuplicateKey { elem: String, key: String },

    /// The configured encoding is not one the codec can decode
    ///
    /// This is a configuration error: fatal at session start, never retried.
    #[error("unsupported encoding '{0}'")]
    UnsupportedEncoding(String),

    /// The configured subscription or stream mode is not recognized
    #[error("unknown subscription mode '{0}'")]
    UnknownMode(String),

    /// A TypedValue carried no value at all
    #[error("typed value carries no value")]
    EmptyValue,

    /// A JSON payload failed to parse
    ///
    /// Carries the raw bytes for diagnostics. The single update is dropped
    /// and counted; the session keeps streaming.
    #[error("failed to decode {encoding} payload ({} bytes): {source}", raw.len())]
    Decode {
        /// Which wire encoding the payload claimed to be
        encoding: &'static str,
        /// The raw payload bytes
        raw: Vec<u8>,
        #[source]
        source: serde_json::Error,
    },
}
