//! Compression for stored pages (feature-gated backends).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Codec {
    None = 0,
    Zstd = 1,
    Lz4 = 2,
}

impl Codec {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Codec::None),
            1 => Ok(Codec::Zstd),
            2 => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(format!("tag {other}"))),
        }
    }

    /// Parse the codec name used in `EngineConfig::page_codec`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Codec::None),
            "zstd" => Ok(Codec::Zstd),
            "lz4" => Ok(Codec::Lz4),
            other => Err(Error::CodecUnsupported(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::None => "none",
            Codec::Zstd => "zstd",
            Codec::Lz4 => "lz4",
        }
    }

    pub fn compress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            #[cfg(feature = "zstd")]
            Codec::Zstd => {
                let mut out = Vec::new();
                zstd::stream::copy_encode(input, &mut out, 3)
                    .map_err(|e| Error::Codec(format!("zstd: {e}")))?;
                Ok(out)
            }
            #[cfg(feature = "lz4")]
            Codec::Lz4 => Ok(lz4_flex::compress_prepend_size(input)),
            #[allow(unreachable_patterns)]
            other => Err(Error::CodecUnsupported(other.name().to_string())),
        }
    }

    pub fn decompress(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::None => Ok(input.to_vec()),
            #[cfg(feature = "zstd")]
            Codec::Zstd => {
                let mut out = Vec::new();
                zstd::stream::copy_decode(input, &mut out)
                    .map_err(|e| Error::Codec(format!("zstd: {e}")))?;
                Ok(out)
            }
            #[cfg(feature = "lz4")]
            Codec::Lz4 => lz4_flex::decompress_size_prepended(input)
                .map_err(|e| Error::Codec(format!("lz4: {e}"))),
            #[allow(unreachable_patterns)]
            other => Err(Error::CodecUnsupported(other.name().to_string())),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
