//! In-memory GLB builders shared by the unit tests.

use crate::glb::{CHUNK_BIN, CHUNK_JSON, GLB_MAGIC};

/// A raw chunk: type tag and payload, written as given.
pub fn chunk(kind: u32, data: &[u8]) -> (u32, Vec<u8>) {
    (kind, data.to_vec())
}

/// Assemble a version 2 container from raw chunks.
pub fn glb_with_chunks(chunks: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (kind, data) in chunks {
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(&kind.to_le_bytes());
        body.extend_from_slice(data);
    }
    let mut out = Vec::with_capacity(12 + body.len());
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Assemble a container from JSON text and a binary blob. The JSON is padded
/// with spaces and the blob with zeros to 4-byte alignment; an empty blob
/// produces no binary chunk.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut chunks = vec![(CHUNK_JSON, json)];
    if !bin.is_empty() {
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        chunks.push((CHUNK_BIN, bin));
    }
    glb_with_chunks(&chunks)
}

/// Little-endian bytes of a float slice.
pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes of a u16 slice.
pub fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A single indexed triangle: 3 positions (36 bytes) followed by 3 u16
/// indices (6 bytes, padded to 8).
pub fn triangle_blob() -> Vec<u8> {
    let mut bin = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    bin.extend(u16_bytes(&[0, 1, 2]));
    bin.extend([0, 0]);
    bin
}

/// Buffer, buffer views and accessors describing [`triangle_blob`]:
/// accessor 0 is the positions, accessor 1 the indices.
pub const TRIANGLE_BUFFERS: &str = r#"
    "buffers": [{ "byteLength": 44 }],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
          "min": [0, 0, 0], "max": [1, 1, 0] },
        { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ]
"#;

/// A complete document around [`TRIANGLE_BUFFERS`]: `extra` is spliced in as
/// further root members (meshes, nodes, scenes, materials).
pub fn triangle_document(extra: &str) -> String {
    format!(r#"{{ "asset": {{ "version": "2.0" }}, {TRIANGLE_BUFFERS}, {extra} }}"#)
}
