use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::config::LoadConfig;
use crate::document::Gltf;
use crate::error::AssetError;

/// Pixel format of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

/// A decoded texture with raw pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureAsset {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: TextureFormat,
}

/// Turns encoded image bytes (PNG, JPEG, ...) into pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8], mime_type: Option<&str>) -> Result<TextureAsset, AssetError>;
}

/// Decodes any format the `image` crate understands into RGBA8.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbaImageDecoder;

impl ImageDecoder for RgbaImageDecoder {
    fn decode(&self, bytes: &[u8], mime_type: Option<&str>) -> Result<TextureAsset, AssetError> {
        let format = mime_type.and_then(|m| image::ImageFormat::from_mime_type(m));
        let img = match format {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .map_err(|e| AssetError::ImageDecodeFailed(e.to_string()))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(TextureAsset {
            width,
            height,
            data: rgba.into_raw(),
            format: TextureFormat::Rgba8,
        })
    }
}

fn decode_image(
    gltf: &Gltf,
    index: usize,
    decoder: &dyn ImageDecoder,
) -> Result<TextureAsset, AssetError> {
    let image = &gltf.images[index];
    let Some(view) = image.buffer_view else {
        return Err(AssetError::ExternalImageUnsupported { image: index });
    };
    let bytes = gltf
        .buffer_view_bytes(view)
        .ok_or(AssetError::ExternalImageUnsupported { image: index })?;
    let texture = decoder.decode(bytes, image.mime_type.as_deref())?;
    debug!(
        "Decoded image {} ({}x{})",
        index, texture.width, texture.height
    );
    Ok(texture)
}

fn report(index: usize, result: &Result<TextureAsset, AssetError>) {
    match result {
        Ok(_) => {}
        Err(e @ AssetError::ExternalImageUnsupported { .. }) => warn!("Skipping image: {}", e),
        Err(e) => error!("Image {} failed to decode: {}", index, e),
    }
}

/// Decode every image of `gltf` that is stored in a buffer view.
///
/// The result has one slot per image, in document order. Images are decoded
/// on the rayon pool, or on a dedicated pool of `image_workers` threads when
/// that is set. A failed image only empties its slot.
pub fn decode_images(
    gltf: &Gltf,
    decoder: &dyn ImageDecoder,
    config: &LoadConfig,
) -> Vec<Result<TextureAsset, AssetError>> {
    let count = gltf.images.len();

    let results: Vec<Result<TextureAsset, AssetError>> = if !config.parallel_images || count <= 1 {
        (0..count).map(|i| decode_image(gltf, i, decoder)).collect()
    } else {
        let decode_all = || -> Vec<Result<TextureAsset, AssetError>> {
            (0..count)
                .into_par_iter()
                .map(|i| decode_image(gltf, i, decoder))
                .collect()
        };
        match config.image_pool() {
            Some(Ok(pool)) => {
                debug!("Decoding {} images on {} workers", count, pool.current_num_threads());
                pool.install(decode_all)
            }
            Some(Err(e)) => {
                warn!("Failed to build image worker pool: {}, using the global pool", e);
                decode_all()
            }
            None => decode_all(),
        }
    };

    for (index, result) in results.iter().enumerate() {
        report(index, result);
    }
    results
}
