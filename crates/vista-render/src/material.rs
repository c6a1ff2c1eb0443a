//! Render-side view of glTF materials.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use vista_assets::document::{AlphaMode, Gltf, Material, TextureReference};

/// How a material participates in rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialDomain {
    #[default]
    Opaque,
    /// Alpha tested against the material's cutoff.
    Masked,
    /// Alpha blended, drawn after opaque geometry.
    Translucent,
}

impl MaterialDomain {
    /// Value of the domain in shader macros (`MAT_BM`).
    pub fn shader_value(self) -> u32 {
        match self {
            MaterialDomain::Opaque => 0,
            MaterialDomain::Masked => 1,
            MaterialDomain::Translucent => 2,
        }
    }
}

impl From<AlphaMode> for MaterialDomain {
    fn from(mode: AlphaMode) -> Self {
        match mode {
            AlphaMode::Opaque => MaterialDomain::Opaque,
            AlphaMode::Mask => MaterialDomain::Masked,
            AlphaMode::Blend => MaterialDomain::Translucent,
        }
    }
}

/// Marks an unused texture slot in [`MaterialConstants`].
pub const NO_TEXTURE: u32 = u32::MAX;

/// Per-material constant block, laid out for a GPU uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub base_color: [f32; 4],
    /// xyz = emissive color, w = alpha cutoff
    pub emissive_cutoff: [f32; 4],
    /// Image index per slot: base color, metallic-roughness, normal, emissive.
    pub texture_indices: [u32; 4],
    /// UV set per slot, same order as `texture_indices`.
    pub uv_sets: [u32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub _pad: [f32; 2],
}

/// A material resolved against its document: domain, sidedness and the
/// constant block the shaders read.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: Option<String>,
    pub domain: MaterialDomain,
    pub two_sided: bool,
    pub constants: MaterialConstants,
}

/// Image bound to a texture reference, or [`NO_TEXTURE`] when the reference
/// is absent or its texture has no source image.
fn image_slot(gltf: &Gltf, reference: Option<TextureReference>) -> (u32, u32) {
    reference
        .and_then(|r| {
            let image = gltf.textures.get(r.index)?.source?;
            Some((u32::try_from(image).ok()?, r.tex_coord))
        })
        .unwrap_or((NO_TEXTURE, 0))
}

impl MaterialRecord {
    pub fn from_material(gltf: &Gltf, material: &Material) -> Self {
        let pbr = &material.pbr_metallic_roughness;
        let slots = [
            image_slot(gltf, pbr.base_color_texture),
            image_slot(gltf, pbr.metallic_roughness_texture),
            image_slot(gltf, material.normal_texture),
            image_slot(gltf, material.emissive_texture),
        ];
        let emissive = material.emissive_factor;

        Self {
            name: material.name.clone(),
            domain: material.alpha_mode.into(),
            two_sided: material.double_sided,
            constants: MaterialConstants {
                base_color: pbr.base_color_factor.to_array(),
                emissive_cutoff: [emissive.x, emissive.y, emissive.z, material.alpha_cutoff],
                texture_indices: slots.map(|(image, _)| image),
                uv_sets: slots.map(|(_, uv)| uv),
                metallic: pbr.metallic_factor,
                roughness: pbr.roughness_factor,
                _pad: [0.0; 2],
            },
        }
    }

    /// Record used for primitives that reference no material.
    pub fn fallback(gltf: &Gltf) -> Self {
        Self::from_material(gltf, &Material::default())
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.constants)
    }
}

/// One record per document material, in document order.
pub fn material_records(gltf: &Gltf) -> Vec<MaterialRecord> {
    gltf.materials
        .iter()
        .map(|m| MaterialRecord::from_material(gltf, m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_assets::document::{Texture, TextureReference};
    use vista_core::Color;

    #[test]
    fn alpha_modes_map_to_domains() {
        assert_eq!(MaterialDomain::from(AlphaMode::Opaque), MaterialDomain::Opaque);
        assert_eq!(MaterialDomain::from(AlphaMode::Mask), MaterialDomain::Masked);
        assert_eq!(MaterialDomain::from(AlphaMode::Blend), MaterialDomain::Translucent);
    }

    #[test]
    fn constants_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<MaterialConstants>(), 80);
        let record = MaterialRecord::fallback(&Gltf::default());
        assert_eq!(record.as_bytes().len(), 80);
    }

    #[test]
    fn fallback_uses_material_defaults() {
        let record = MaterialRecord::fallback(&Gltf::default());
        assert_eq!(record.domain, MaterialDomain::Opaque);
        assert!(!record.two_sided);
        assert_eq!(record.constants.base_color, [1.0; 4]);
        assert_eq!(record.constants.emissive_cutoff, [0.0, 0.0, 0.0, 0.5]);
        assert_eq!(record.constants.metallic, 1.0);
        assert_eq!(record.constants.roughness, 1.0);
        assert_eq!(record.constants.texture_indices, [NO_TEXTURE; 4]);
    }

    #[test]
    fn texture_references_resolve_to_images() {
        let mut gltf = Gltf::default();
        gltf.textures = vec![
            Texture {
                source: Some(3),
                ..Default::default()
            },
            Texture::default(),
        ];
        let mut material = Material {
            alpha_mode: AlphaMode::Blend,
            double_sided: true,
            ..Default::default()
        };
        material.pbr_metallic_roughness.base_color_factor = Color::rgba(0.2, 0.4, 0.6, 0.5);
        material.pbr_metallic_roughness.base_color_texture = Some(TextureReference {
            index: 0,
            tex_coord: 1,
        });
        material.normal_texture = Some(TextureReference {
            index: 1,
            tex_coord: 0,
        });

        let record = MaterialRecord::from_material(&gltf, &material);
        assert_eq!(record.domain, MaterialDomain::Translucent);
        assert!(record.two_sided);
        assert_eq!(record.constants.base_color, [0.2, 0.4, 0.6, 0.5]);
        assert_eq!(record.constants.texture_indices, [3, NO_TEXTURE, NO_TEXTURE, NO_TEXTURE]);
        assert_eq!(record.constants.uv_sets, [1, 0, 0, 0]);
    }
}
