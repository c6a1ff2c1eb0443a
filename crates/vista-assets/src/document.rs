//! The typed glTF asset graph.
//!
//! Entities live in flat vectors on [`Gltf`] and refer to each other by
//! index. Every optional member has already been defaulted and every index
//! validated by the time a `Gltf` is handed out.

use glam::Vec3;
use vista_core::{Color, NodeTransform};

/// Metadata about the glTF asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Asset {
    pub version: String,
    pub copyright: Option<String>,
    pub generator: Option<String>,
    pub min_version: Option<String>,
}

/// A buffer of raw data. Only the buffer embedded in the GLB binary chunk
/// (index 0, no URI) is ever read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    pub byte_length: usize,
    pub uri: Option<String>,
    pub name: Option<String>,
}

/// Intended GPU binding of a buffer view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

impl BufferTarget {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            34962 => Some(Self::ArrayBuffer),
            34963 => Some(Self::ElementArrayBuffer),
            _ => None,
        }
    }
}

/// A contiguous byte range of a buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
    pub name: Option<String>,
}

/// Scalar type of an accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// Shape of an accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }
}

/// A typed view into a buffer view.
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub count: usize,
    pub element_type: ElementType,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub name: Option<String>,
}

impl Accessor {
    /// Size of one element in bytes, without stride padding.
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.element_type.component_count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
    pub name: Option<String>,
}

/// Wrap mode used when a sampler omits `wrapS`/`wrapT` (REPEAT).
pub const WRAP_REPEAT: u32 = 10497;

#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub name: Option<String>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            mag_filter: None,
            min_filter: None,
            wrap_s: WRAP_REPEAT,
            wrap_t: WRAP_REPEAT,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Texture {
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    pub name: Option<String>,
}

/// A material's reference to a texture and the UV set it samples with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureReference {
    pub index: usize,
    pub tex_coord: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PbrMetallicRoughness {
    pub base_color_factor: Color,
    pub base_color_texture: Option<TextureReference>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureReference>,
}

impl Default for PbrMetallicRoughness {
    fn default() -> Self {
        Self {
            base_color_factor: Color::WHITE,
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
        }
    }
}

/// How a material's alpha channel is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl AlphaMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "OPAQUE" => Some(Self::Opaque),
            "MASK" => Some(Self::Mask),
            "BLEND" => Some(Self::Blend),
            _ => None,
        }
    }
}

/// `KHR_materials_specular`
#[derive(Debug, Clone, PartialEq)]
pub struct SpecularExtension {
    pub specular_factor: f32,
    pub specular_texture: Option<TextureReference>,
    pub specular_color_factor: Vec3,
    pub specular_color_texture: Option<TextureReference>,
}

impl Default for SpecularExtension {
    fn default() -> Self {
        Self {
            specular_factor: 1.0,
            specular_texture: None,
            specular_color_factor: Vec3::ONE,
            specular_color_texture: None,
        }
    }
}

/// `KHR_materials_ior`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IorExtension {
    pub ior: f32,
}

impl Default for IorExtension {
    fn default() -> Self {
        Self { ior: 1.5 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub pbr_metallic_roughness: PbrMetallicRoughness,
    pub normal_texture: Option<TextureReference>,
    pub occlusion_texture: Option<TextureReference>,
    pub emissive_texture: Option<TextureReference>,
    pub emissive_factor: Vec3,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub specular: Option<SpecularExtension>,
    pub ior: Option<IorExtension>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            pbr_metallic_roughness: PbrMetallicRoughness::default(),
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: Vec3::ZERO,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            specular: None,
            ior: None,
        }
    }
}

impl Material {
    /// Every texture reference held by the material, with a label for the slot.
    pub fn texture_references(&self) -> impl Iterator<Item = (&'static str, TextureReference)> + '_ {
        let pbr = &self.pbr_metallic_roughness;
        let specular = self.specular.as_ref();
        [
            ("pbrMetallicRoughness.baseColorTexture", pbr.base_color_texture),
            (
                "pbrMetallicRoughness.metallicRoughnessTexture",
                pbr.metallic_roughness_texture,
            ),
            ("normalTexture", self.normal_texture),
            ("occlusionTexture", self.occlusion_texture),
            ("emissiveTexture", self.emissive_texture),
            (
                "KHR_materials_specular.specularTexture",
                specular.and_then(|s| s.specular_texture),
            ),
            (
                "KHR_materials_specular.specularColorTexture",
                specular.and_then(|s| s.specular_color_texture),
            ),
        ]
        .into_iter()
        .filter_map(|(slot, reference)| reference.map(|r| (slot, r)))
    }
}

/// Topology of a mesh primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Points),
            1 => Some(Self::Lines),
            2 => Some(Self::LineLoop),
            3 => Some(Self::LineStrip),
            4 => Some(Self::Triangles),
            5 => Some(Self::TriangleStrip),
            6 => Some(Self::TriangleFan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshPrimitive {
    /// Attribute semantic (`POSITION`, `TEXCOORD_0`, ...) to accessor index,
    /// in document order.
    pub attributes: Vec<(String, usize)>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: PrimitiveMode,
}

impl MeshPrimitive {
    pub fn attribute(&self, semantic: &str) -> Option<usize> {
        self.attributes
            .iter()
            .find(|(name, _)| name == semantic)
            .map(|&(_, accessor)| accessor)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Vec<MeshPrimitive>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub mesh: Option<usize>,
    pub transform: NodeTransform,
    pub children: Vec<usize>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<usize>,
    pub name: Option<String>,
}

/// A decoded glTF document together with its embedded binary blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gltf {
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
    pub scene: Option<usize>,
    pub asset: Asset,
    pub accessors: Vec<Accessor>,
    pub buffers: Vec<Buffer>,
    pub buffer_views: Vec<BufferView>,
    pub images: Vec<Image>,
    pub materials: Vec<Material>,
    pub meshes: Vec<Mesh>,
    pub nodes: Vec<Node>,
    pub samplers: Vec<Sampler>,
    pub scenes: Vec<Scene>,
    pub textures: Vec<Texture>,
    /// Bytes of the GLB binary chunk. Empty when the container had none.
    pub blob: Vec<u8>,
}

impl Gltf {
    /// Whether `buffer` is the one stored in the GLB binary chunk.
    pub fn is_embedded_buffer(&self, buffer: usize) -> bool {
        buffer == 0 && self.buffers.first().is_some_and(|b| b.uri.is_none())
    }

    /// Bytes of a buffer view over the embedded buffer. `None` when the view
    /// does not exist or points at an external buffer.
    pub fn buffer_view_bytes(&self, view: usize) -> Option<&[u8]> {
        let view = self.buffer_views.get(view)?;
        if !self.is_embedded_buffer(view.buffer) {
            return None;
        }
        let end = view.byte_offset.checked_add(view.byte_length)?;
        self.blob.get(view.byte_offset..end)
    }

    /// Scene to show when the caller does not pick one: the document's
    /// `scene`, else the first scene, else none.
    pub fn default_scene(&self) -> Option<usize> {
        self.scene
            .or_else(|| (!self.scenes.is_empty()).then_some(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_sizes() {
        assert_eq!(ComponentType::from_code(5120).map(ComponentType::size), Some(1));
        assert_eq!(ComponentType::from_code(5123).map(ComponentType::size), Some(2));
        assert_eq!(ComponentType::from_code(5126).map(ComponentType::size), Some(4));
        assert_eq!(ComponentType::from_code(5124), None);
    }

    #[test]
    fn element_component_counts() {
        let counts: Vec<usize> = ["SCALAR", "VEC2", "VEC3", "VEC4", "MAT2", "MAT3", "MAT4"]
            .iter()
            .filter_map(|t| ElementType::from_token(t))
            .map(ElementType::component_count)
            .collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 4, 9, 16]);
        assert_eq!(ElementType::from_token("vec3"), None);
    }

    #[test]
    fn material_defaults() {
        let material = Material::default();
        assert_eq!(material.pbr_metallic_roughness.base_color_factor, Color::WHITE);
        assert_eq!(material.pbr_metallic_roughness.metallic_factor, 1.0);
        assert_eq!(material.pbr_metallic_roughness.roughness_factor, 1.0);
        assert_eq!(material.emissive_factor, Vec3::ZERO);
        assert_eq!(material.alpha_mode, AlphaMode::Opaque);
        assert_eq!(material.alpha_cutoff, 0.5);
        assert!(!material.double_sided);
        assert_eq!(material.texture_references().count(), 0);
    }

    #[test]
    fn extension_defaults() {
        let specular = SpecularExtension::default();
        assert_eq!(specular.specular_factor, 1.0);
        assert_eq!(specular.specular_color_factor, Vec3::ONE);
        assert_eq!(IorExtension::default().ior, 1.5);
    }

    #[test]
    fn default_scene_falls_back_to_first() {
        let mut gltf = Gltf::default();
        assert_eq!(gltf.default_scene(), None);
        gltf.scenes.push(Scene::default());
        gltf.scenes.push(Scene::default());
        assert_eq!(gltf.default_scene(), Some(0));
        gltf.scene = Some(1);
        assert_eq!(gltf.default_scene(), Some(1));
    }

    #[test]
    fn buffer_view_bytes_only_reads_embedded_buffer() {
        let mut gltf = Gltf {
            buffers: vec![Buffer {
                byte_length: 4,
                ..Default::default()
            }],
            buffer_views: vec![BufferView {
                buffer: 0,
                byte_offset: 1,
                byte_length: 2,
                ..Default::default()
            }],
            blob: vec![10, 20, 30, 40],
            ..Default::default()
        };
        assert_eq!(gltf.buffer_view_bytes(0), Some(&[20u8, 30][..]));
        assert_eq!(gltf.buffer_view_bytes(1), None);
        gltf.buffers[0].uri = Some("external.bin".into());
        assert_eq!(gltf.buffer_view_bytes(0), None);
    }
}
