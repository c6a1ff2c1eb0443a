//! Vista Assets - glTF 2.0 binary loading
//!
//! Reads GLB containers, decodes the JSON document into a typed, defaulted
//! and index-validated asset graph, flattens scenes into draw records and
//! decodes embedded images.

mod config;
mod decode;
mod error;
mod handle;
mod server;
mod texture;
mod validate;

pub mod document;
pub mod glb;
pub mod scene;

#[cfg(test)]
mod testing;

pub use config::LoadConfig;
pub use decode::{decode_document, decode_glb, load_gltf};
pub use document::Gltf;
pub use error::AssetError;
pub use handle::{AssetHandle, AssetId};
pub use scene::{flatten_default_scene, flatten_scene, DrawRecord, FlatScene, MeshBuffers, VertexSlot};
pub use server::AssetServer;
pub use texture::{decode_images, ImageDecoder, RgbaImageDecoder, TextureAsset, TextureFormat};
