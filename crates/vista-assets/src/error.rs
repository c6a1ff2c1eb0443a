use std::path::PathBuf;

/// Errors that can occur while loading, decoding or flattening a glTF asset.
///
/// Every variant except the image ones is fatal to the load call: no partial
/// asset graph is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("malformed GLB container: {0}")]
    MalformedContainer(String),

    #[error("unsupported GLB version {0}, only version 2 is supported")]
    UnsupportedVersion(u32),

    #[error("GLB container does not start with a JSON chunk")]
    MissingJsonChunk,

    #[error("invalid JSON chunk: {0}")]
    JsonSyntax(String),

    #[error("{entity} is missing required field '{field}'")]
    RequiredFieldMissing {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field} has unknown value {value}")]
    UnknownEnumValue {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity}.{field} is not a valid {expected}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{referrer} references {target} {index}, but only {len} exist")]
    IndexOutOfRange {
        referrer: String,
        target: &'static str,
        index: usize,
        len: usize,
    },

    #[error("buffer view {view} ends at byte {end}, past the {len}-byte binary chunk")]
    BufferViewOutOfBounds { view: usize, end: u64, len: usize },

    #[error("accessor {accessor} ends at byte {end}, past the {len}-byte buffer view")]
    AccessorOutOfBounds { accessor: usize, end: u64, len: usize },

    #[error("scene {scene}: node {node} is out of range or closes a cycle")]
    GraphCycleOrOutOfRange { scene: usize, node: usize },

    #[error("accessor {accessor} has no data in the embedded binary chunk")]
    UnboundAccessor { accessor: usize },

    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error loading '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to decode image: {0}")]
    ImageDecodeFailed(String),

    #[error("image {image} references an external URI, which is not supported")]
    ExternalImageUnsupported { image: usize },
}
