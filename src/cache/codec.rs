//! Pluggable serialization for the distributed cache tier.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("codec: {0}")]
pub struct CodecError(pub String);

/// Serialize/deserialize pair used to move values through the distributed
/// tier. Decode failures are treated as cache misses by the caller, never
/// surfaced as errors.
pub trait CacheCodec<V>: Send + Sync {
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, data: &[u8]) -> Result<V, CodecError>;
}

/// JSON codec over serde.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<V> CacheCodec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError(e.to_string()))
    }

    fn decode(&self, data: &[u8]) -> Result<V, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec;
        let value = Payload {
            name: "dinner".into(),
            count: 3,
        };
        let bytes = codec.encode(&value).unwrap();
        let decoded: Payload = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_json_codec_decode_failure() {
        let codec = JsonCodec;
        let result: Result<Payload, _> = codec.decode(b"not json");
        assert!(result.is_err());
    }
}
