//! On-storage framing of a single page.
//!
//! Layout:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! [ page_no: u32 ][ uncompressed_len: u64 ][ compressed_len: u64 ]
//! [ payload bytes … ]
//!
//! The payload is the page (or, for page 0, the table header) as JSON, passed
//! through the codec. The store keeps a blake3 checksum of (header || payload)
//! and verifies it on every read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use emjoin_core::id::PageNo;

use super::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x454D_4A50; // "EMJP"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8 + 8;

/// Refuse to inflate anything larger than this from a single page.
const MAX_PAGE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub codec: Codec,
    pub page_no: PageNo,
    pub uncompressed_len: u64,
    pub compressed_len: u64,
}

impl SegmentHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&VERSION.to_le_bytes());
        out[6] = self.codec as u8;
        // out[7] reserved
        out[8..12].copy_from_slice(&self.page_no.get().to_le_bytes());
        out[12..20].copy_from_slice(&self.uncompressed_len.to_le_bytes());
        out[20..28].copy_from_slice(&self.compressed_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Storage("short segment header".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if magic != MAGIC || version != VERSION {
            return Err(Error::Storage("bad magic/version".into()));
        }
        let codec = Codec::from_u8(bytes[6])?;
        let page_no = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[12..20]);
        let uncompressed_len = u64::from_le_bytes(len);
        len.copy_from_slice(&bytes[20..28]);
        let compressed_len = u64::from_le_bytes(len);

        let header = Self {
            codec,
            page_no: PageNo::new(page_no),
            uncompressed_len,
            compressed_len,
        };
        header.validate_sizes()?;
        Ok(header)
    }

    /// Reject sizes that would make a corrupted segment allocate wildly.
    fn validate_sizes(&self) -> Result<()> {
        if self.uncompressed_len > MAX_PAGE_BYTES || self.compressed_len > MAX_PAGE_BYTES {
            return Err(Error::Storage(format!(
                "page {} claims {} / {} bytes, limit {}",
                self.page_no.get(),
                self.uncompressed_len,
                self.compressed_len,
                MAX_PAGE_BYTES
            )));
        }
        Ok(())
    }
}

/// Metadata the store keeps for a written page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub path: String,
    pub page_no: PageNo,
    pub codec: Codec,
    pub len: u64,
    pub checksum: [u8; 32],
}

/// Storage path of one page of a table.
pub fn segment_path(root: &str, table: &str, page_no: PageNo) -> String {
    format!("{}/{}/page_{:06}.seg", root, table, page_no.get())
}

/// Frame `payload` as a segment for `page_no`.
pub fn encode<T: Serialize>(
    codec: Codec,
    page_no: PageNo,
    path: String,
    payload: &T,
) -> Result<(Vec<u8>, SegmentMeta)> {
    let raw = serde_json::to_vec(payload).map_err(|e| Error::Codec(format!("json serialize: {e}")))?;
    let compressed = codec.compress(&raw)?;

    let header = SegmentHeader {
        codec,
        page_no,
        uncompressed_len: raw.len() as u64,
        compressed_len: compressed.len() as u64,
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&compressed);

    let checksum: [u8; 32] = blake3::hash(&bytes).into();
    let meta = SegmentMeta {
        path,
        page_no,
        codec,
        len: bytes.len() as u64,
        checksum,
    };
    Ok((bytes, meta))
}

/// Verify and unframe a segment previously produced by `encode`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], meta: &SegmentMeta) -> Result<T> {
    let checksum: [u8; 32] = blake3::hash(bytes).into();
    if checksum != meta.checksum {
        return Err(Error::ChecksumMismatch(meta.path.clone()));
    }

    let header = SegmentHeader::from_bytes(bytes)?;
    if header.page_no != meta.page_no {
        return Err(Error::Storage(format!(
            "{}: expected page {}, found page {}",
            meta.path,
            meta.page_no.get(),
            header.page_no.get()
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != header.compressed_len {
        return Err(Error::Storage(format!("{}: truncated payload", meta.path)));
    }

    let raw = header.codec.decompress(payload)?;
    serde_json::from_slice(&raw).map_err(|e| Error::Codec(format!("json deserialize: {e}")))
}
