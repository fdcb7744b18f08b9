//! Packed byte codec for adjacency lists.
//!
//! An adjacency blob is the concatenation of 4-byte little-endian page ids
//! with no framing. Duplicates are removed at encode time, keeping the first
//! occurrence; a blob whose length is not a multiple of 4 is corrupt.

use std::collections::HashSet;

use crate::error::{Result, RouteError};
use crate::model::PageId;

pub fn encode(ids: &[PageId]) -> Vec<u8> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut buf = Vec::with_capacity(ids.len() * 4);
    for &id in ids {
        if seen.insert(id) {
            buf.extend_from_slice(&id.to_le_bytes());
        }
    }
    buf
}

pub fn decode(bytes: &[u8]) -> Result<Vec<PageId>> {
    if bytes.len() % 4 != 0 {
        return Err(RouteError::Corruption(format!(
            "adjacency blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| PageId::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
