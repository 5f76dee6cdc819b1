//! Snapshot wire format
//!
//! One length-framed message per chain-state change: a 4-byte little-endian
//! body length followed by the chain snapshot, itself a block sequence under
//! bincode's fixed-int little-endian layout. Whole-chain snapshots are a
//! deliberate simplification; they cap out quickly as chains grow, and moving
//! to incremental gossip would change this format.

use crate::core::{Block, Chain, HASH_LEN};
use crate::error::{NodeError, Result};
use crate::utils::{deserialize, format_rfc3339, parse_rfc3339, serialize};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

// Refuse frames beyond this size so a garbage length prefix cannot force a
// huge allocation.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// One block as it travels between peers.
#[derive(Debug, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
struct WireBlock {
    index: u32,
    hash: [u8; HASH_LEN],
    previous_hash: [u8; HASH_LEN],
    timestamp: String,
    payload: Vec<u8>,
    difficulty: u32,
    nonce: Vec<u8>,
}

impl From<&Block> for WireBlock {
    fn from(block: &Block) -> Self {
        WireBlock {
            index: block.get_index(),
            hash: *block.get_hash(),
            previous_hash: *block.get_previous_hash(),
            timestamp: format_rfc3339(block.get_timestamp()),
            payload: block.get_payload().to_vec(),
            difficulty: block.get_difficulty(),
            nonce: block.get_nonce().to_vec(),
        }
    }
}

impl WireBlock {
    fn into_block(self) -> Result<Block> {
        let timestamp = parse_rfc3339(&self.timestamp)?;
        Ok(Block::from_parts(
            self.index,
            self.hash,
            self.previous_hash,
            timestamp,
            self.payload,
            self.difficulty,
            self.nonce,
        ))
    }
}

/// Serialize a chain snapshot into a frame body.
pub fn encode_snapshot(chain: &Chain) -> Result<Vec<u8>> {
    let records: Vec<WireBlock> = chain.blocks().iter().map(WireBlock::from).collect();
    serialize(&records)
}

/// Decode a frame body back into a chain. The result is structurally sound
/// but unvalidated; the merge task decides whether to trust it.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Chain> {
    let records: Vec<WireBlock> = deserialize(bytes)?;
    let blocks = records
        .into_iter()
        .map(WireBlock::into_block)
        .collect::<Result<Vec<Block>>>()?;
    Ok(Chain::from_blocks(blocks))
}

/// Write one framed message.
pub fn write_frame(writer: &mut impl Write, body: &[u8]) -> Result<()> {
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            NodeError::Serialization(format!("snapshot of {} bytes exceeds frame limit", body.len()))
        })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed message body.
pub fn read_frame(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(NodeError::Network(format!(
            "peer announced a frame of {len} bytes, over the limit"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body)?;
    Ok(body)
}

/// Read and decode one chain snapshot from a stream.
pub fn read_snapshot(reader: &mut impl Read) -> Result<Chain> {
    decode_snapshot(&read_frame(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::test_utils::mined_chain;
    use std::io::Cursor;

    #[test]
    fn test_snapshot_round_trip() {
        let chain = mined_chain(3, 1);
        let encoded = encode_snapshot(&chain).unwrap();
        let decoded = decode_snapshot(&encoded).unwrap();
        assert_eq!(decoded, chain);
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_snapshot(&[0xFF, 0xEE, 0xDD]).is_err());
    }

    #[test]
    fn test_frame_round_trip() {
        let chain = mined_chain(1, 1);
        let body = encode_snapshot(&chain).unwrap();

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &body).unwrap();

        let mut cursor = Cursor::new(buffer);
        let decoded = read_snapshot(&mut cursor).unwrap();
        assert_eq!(decoded, chain);
    }

    #[test]
    fn test_oversized_frame_announcement_rejected() {
        let mut cursor = Cursor::new(u32::MAX.to_le_bytes().to_vec());
        assert!(read_frame(&mut cursor).is_err());
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"some body").unwrap();
        buffer.truncate(buffer.len() - 3);

        let mut cursor = Cursor::new(buffer);
        assert!(read_frame(&mut cursor).is_err());
    }
}
