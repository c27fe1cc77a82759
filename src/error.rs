//! Unified error type for all store operations.

use crate::value::ValueKind;

/// Things that can go wrong when using a store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The store was used before its bootstrap load finished.
    #[error("store is not loaded yet")]
    NotLoaded,
    /// The bootstrap load hit an I/O error; the store is unusable.
    #[error("store failed to load: {0}")]
    LoadFailed(String),
    /// A typed read found a different kind of value under the key.
    #[error("type mismatch for key {key:?}: expected {expected}, found {found}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// Kind the caller asked for.
        expected: ValueKind,
        /// Kind actually stored.
        found: ValueKind,
    },
    /// An editor staged a value that cannot be persisted (NaN or infinity).
    /// The whole batch was discarded.
    #[error("cannot store key {key:?}: {value} has no JSON form")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The rejected value, formatted.
        value: String,
    },
    /// A physical write did not reach disk.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// File system problem (read, write, rename, delete).
    #[error("i/o error: {0}")]
    Io(String),
    /// Failed to serialize the map to bytes.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// Failed to deserialize bytes back into the map.
    #[error("deserialization error: {0}")]
    Deserialize(String),
    /// Bad configuration (empty path, etc.).
    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() {
            Error::Deserialize(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(Error::NotLoaded.to_string(), "store is not loaded yet");
        let e = Error::TypeMismatch {
            key: "volume".into(),
            expected: ValueKind::Int,
            found: ValueKind::String,
        };
        assert_eq!(
            e.to_string(),
            "type mismatch for key \"volume\": expected int, found string"
        );
    }

    #[test]
    fn json_syntax_error_maps_to_deserialize() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{oops").unwrap_err();
        assert!(matches!(Error::from(err), Error::Deserialize(_)));
    }
}
