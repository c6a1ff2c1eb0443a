//! Binary glTF (GLB) container reader.
//!
//! A GLB file is a 12-byte header followed by length-prefixed chunks. The
//! first chunk holds the JSON document, the optional second chunk holds the
//! embedded binary buffer.

use crate::error::AssetError;

/// `"glTF"` read as a little-endian `u32`.
pub const GLB_MAGIC: u32 = 0x4654_6C67;
/// `"JSON"` chunk type.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `"BIN\0"` chunk type.
pub const CHUNK_BIN: u32 = 0x004E_4942;
/// The only container version this reader accepts.
pub const GLB_VERSION: u32 = 2;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The chunks of a GLB container.
///
/// The JSON text borrows from the input buffer; the binary chunk is copied
/// into an owned blob that outlives the input.
#[derive(Debug)]
pub struct Container<'a> {
    pub version: u32,
    pub json: &'a str,
    pub binary: Vec<u8>,
}

struct Chunk<'a> {
    kind: u32,
    data: &'a [u8],
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Read the chunk starting at `offset`. `Ok(None)` when no chunk header fits.
fn read_chunk(bytes: &[u8], offset: usize) -> Result<Option<Chunk<'_>>, AssetError> {
    if bytes.len().saturating_sub(offset) < CHUNK_HEADER_LEN {
        return Ok(None);
    }
    let (Some(length), Some(kind)) = (read_u32(bytes, offset), read_u32(bytes, offset + 4)) else {
        return Ok(None);
    };
    let start = offset + CHUNK_HEADER_LEN;
    let data = start
        .checked_add(length as usize)
        .and_then(|end| bytes.get(start..end))
        .ok_or_else(|| {
            AssetError::MalformedContainer(format!(
                "chunk at byte {offset} declares {length} bytes but only {} remain",
                bytes.len() - start
            ))
        })?;
    Ok(Some(Chunk { kind, data }))
}

/// Split a GLB byte buffer into its JSON text and binary blob.
pub fn read_container(bytes: &[u8]) -> Result<Container<'_>, AssetError> {
    if bytes.len() < HEADER_LEN {
        return Err(AssetError::MalformedContainer(format!(
            "{} bytes is shorter than the {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }

    let magic = read_u32(bytes, 0).unwrap_or_default();
    if magic != GLB_MAGIC {
        return Err(AssetError::MalformedContainer(format!(
            "bad magic 0x{magic:08x}"
        )));
    }

    let version = read_u32(bytes, 4).unwrap_or_default();
    if version != GLB_VERSION {
        return Err(AssetError::UnsupportedVersion(version));
    }

    let declared = read_u32(bytes, 8).unwrap_or_default() as usize;
    if declared > bytes.len() {
        return Err(AssetError::MalformedContainer(format!(
            "header declares {declared} bytes but the buffer holds {}",
            bytes.len()
        )));
    }
    // Trailing bytes past the declared length are not part of the container.
    let bytes = &bytes[..declared.max(HEADER_LEN)];

    let json_chunk = match read_chunk(bytes, HEADER_LEN)? {
        Some(chunk) if chunk.kind == CHUNK_JSON => chunk,
        _ => return Err(AssetError::MissingJsonChunk),
    };
    let json = std::str::from_utf8(json_chunk.data)
        .map_err(|e| AssetError::JsonSyntax(format!("JSON chunk is not UTF-8: {e}")))?;

    let bin_offset = HEADER_LEN + CHUNK_HEADER_LEN + json_chunk.data.len();
    let binary = match read_chunk(bytes, bin_offset)? {
        Some(chunk) if chunk.kind == CHUNK_BIN => chunk.data.to_vec(),
        Some(chunk) => {
            return Err(AssetError::MalformedContainer(format!(
                "second chunk has type 0x{:08x}, expected BIN",
                chunk.kind
            )))
        }
        None => Vec::new(),
    };

    Ok(Container {
        version,
        json,
        binary,
    })
}
