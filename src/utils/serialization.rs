// Wire serialization uses bincode's legacy configuration: fixed-width
// little-endian integers and u64 length prefixes, which is the exact field
// layout the snapshot protocol specifies.
use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};

/// Serialize data using bincode with the fixed-int little-endian configuration
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::legacy();
    bincode::encode_to_vec(data, config)
        .map_err(|e| NodeError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode with the fixed-int little-endian configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::legacy();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| NodeError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
    struct TestRecord {
        id: u32,
        digest: [u8; 32],
        body: Vec<u8>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = TestRecord {
            id: 42,
            digest: [7u8; 32],
            body: vec![1, 2, 3, 4, 5],
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: TestRecord =
            deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_fixed_int_layout() {
        // A bare u32 must occupy exactly 4 little-endian bytes on the wire.
        let encoded = serialize(&7u32).unwrap();
        assert_eq!(encoded, vec![7, 0, 0, 0]);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF];
        let result: Result<TestRecord> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
