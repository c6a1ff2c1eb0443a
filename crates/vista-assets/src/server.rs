use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::LoadConfig;
use crate::decode;
use crate::document::Gltf;
use crate::error::AssetError;
use crate::handle::{AssetHandle, AssetId};
use crate::texture::{self, ImageDecoder, TextureAsset};

/// Central asset registry. Loads, caches, and provides access to glTF
/// documents.
pub struct AssetServer {
    base_path: PathBuf,
    config: LoadConfig,
    documents: Vec<Gltf>,
    path_to_document: HashMap<PathBuf, AssetHandle<Gltf>>,
}

impl AssetServer {
    /// Create a new AssetServer rooted at the given base path.
    pub fn new(base_path: impl Into<PathBuf>, config: LoadConfig) -> Self {
        let base_path = base_path.into();
        info!("AssetServer created with base path: {}", base_path.display());
        Self {
            base_path,
            config,
            documents: Vec::new(),
            path_to_document: HashMap::new(),
        }
    }

    /// Resolve a relative asset path against the base path.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn insert(&mut self, gltf: Gltf) -> AssetHandle<Gltf> {
        let id: AssetId = self.documents.len();
        self.documents.push(gltf);
        AssetHandle::new(id)
    }

    /// Load a GLB file and return a handle to the decoded document.
    /// Subsequent loads of the same path return the cached handle.
    pub fn load_gltf(&mut self, path: &Path) -> Result<AssetHandle<Gltf>, AssetError> {
        let full_path = self.resolve(path);

        // Deduplication: return existing handle if already loaded.
        if let Some(&handle) = self.path_to_document.get(&full_path) {
            return Ok(handle);
        }

        if !full_path.exists() {
            return Err(AssetError::NotFound(full_path));
        }

        let gltf = decode::load_gltf(&full_path, &self.config)?;
        let handle = self.insert(gltf);
        self.path_to_document.insert(full_path, handle);

        Ok(handle)
    }

    /// Decode an in-memory GLB. Byte loads are never deduplicated.
    pub fn load_glb_bytes(&mut self, bytes: &[u8]) -> Result<AssetHandle<Gltf>, AssetError> {
        let gltf = decode::decode_glb(bytes, &self.config)?;
        Ok(self.insert(gltf))
    }

    /// Get a reference to a loaded document by its handle.
    pub fn get(&self, handle: AssetHandle<Gltf>) -> Option<&Gltf> {
        self.documents.get(handle.slot())
    }

    /// Check if a handle refers to a loaded document.
    pub fn is_loaded(&self, handle: AssetHandle<Gltf>) -> bool {
        handle.slot() < self.documents.len()
    }

    /// Decode the embedded images of a loaded document, one result per image.
    pub fn decode_textures(
        &self,
        handle: AssetHandle<Gltf>,
        decoder: &dyn ImageDecoder,
    ) -> Option<Vec<Result<TextureAsset, AssetError>>> {
        let gltf = self.get(handle)?;
        Some(texture::decode_images(gltf, decoder, &self.config))
    }

    /// The base path this server resolves relative paths against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{glb, triangle_blob, triangle_document};
    use crate::texture::RgbaImageDecoder;
    use std::path::PathBuf;

    fn triangle_glb() -> Vec<u8> {
        let json = triangle_document(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0},"indices":1}]}],
               "nodes":[{"mesh":0}],"scenes":[{"nodes":[0]}]"#,
        );
        glb(&json, &triangle_blob())
    }

    #[test]
    fn missing_file_returns_error() {
        let mut server = AssetServer::new("/nonexistent", LoadConfig::default());
        let result = server.load_gltf(Path::new("does_not_exist.glb"));
        match result.unwrap_err() {
            AssetError::NotFound(_) => {}
            other => panic!("expected NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn same_path_is_loaded_once() {
        let dir = std::env::temp_dir().join(format!("vista-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("triangle.glb"), triangle_glb()).unwrap();

        let mut server = AssetServer::new(&dir, LoadConfig::default());
        let first = server.load_gltf(Path::new("triangle.glb")).unwrap();
        let second = server.load_gltf(&dir.join("triangle.glb")).unwrap();
        assert_eq!(first, second);
        assert_eq!(server.get(first).map(|g| g.meshes.len()), Some(1));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn byte_loads_get_fresh_handles() {
        let mut server = AssetServer::new("/assets", LoadConfig::default());
        let a = server.load_glb_bytes(&triangle_glb()).unwrap();
        let b = server.load_glb_bytes(&triangle_glb()).unwrap();
        assert_ne!(a, b);
        assert!(server.is_loaded(a) && server.is_loaded(b));
        assert_eq!(server.get(a), server.get(b));
    }

    #[test]
    fn decode_errors_are_propagated() {
        let mut server = AssetServer::new("/assets", LoadConfig::default());
        assert!(matches!(
            server.load_glb_bytes(b"not a glb file"),
            Err(AssetError::MalformedContainer(_))
        ));
    }

    #[test]
    fn documents_without_images_have_no_textures() {
        let mut server = AssetServer::new("/assets", LoadConfig::default());
        let handle = server.load_glb_bytes(&triangle_glb()).unwrap();
        let textures = server.decode_textures(handle, &RgbaImageDecoder).unwrap();
        assert!(textures.is_empty());
    }

    #[test]
    fn resolve_absolute_path() {
        let server = AssetServer::new("/home/user/assets", LoadConfig::default());
        assert_eq!(
            server.resolve(Path::new("/absolute/path.glb")),
            PathBuf::from("/absolute/path.glb")
        );
    }

    #[test]
    fn resolve_relative_path() {
        let server = AssetServer::new("/home/user/assets", LoadConfig::default());
        assert_eq!(
            server.resolve(Path::new("models/box.glb")),
            PathBuf::from("/home/user/assets/models/box.glb")
        );
    }
}
