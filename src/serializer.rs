//! Serialization layer. Defaults to JSON via serde_json.
//!
//! Implement [`Serializer`] if you need a different on-disk format. The only
//! hard requirement is that all five [`Value`](crate::Value) kinds survive a
//! round trip, in particular that integers come back as integers and floats as
//! floats.

use crate::error::{Error, Result};
use crate::value::PrefMap;

/// Converts a store's map to and from bytes for persistence.
pub trait Serializer: Send + Sync {
    /// Encode a map to bytes.
    fn encode(&self, data: &PrefMap) -> Result<Vec<u8>>;

    /// Decode bytes back into a map.
    fn decode(&self, bytes: &[u8]) -> Result<PrefMap>;
}

/// JSON serializer with optional pretty-printing.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON (single line, no extra whitespace).
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-printed JSON with indentation, easier to read by hand.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Serializer for JsonSerializer {
    fn encode(&self, data: &PrefMap) -> Result<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)
        } else {
            serde_json::to_vec(data)
        };
        bytes.map_err(|e| Error::Serialize(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<PrefMap> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialize(e.to_string()))
    }
}
