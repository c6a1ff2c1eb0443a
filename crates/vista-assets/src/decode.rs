//! glTF JSON schema decoding.
//!
//! The JSON text is parsed into a `serde_json::Value` and walked entity by
//! entity. Optional members are defaulted here so that nothing downstream
//! has to know the schema's defaults.

use std::path::Path;

use glam::{DMat4, DQuat, DVec3, Vec3};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use vista_core::{Color, NodeTransform, Transform};

use crate::config::LoadConfig;
use crate::document::{
    Accessor, AlphaMode, Asset, Buffer, BufferTarget, BufferView, ComponentType, ElementType,
    Gltf, Image, IorExtension, Material, Mesh, MeshPrimitive, Node, PbrMetallicRoughness,
    PrimitiveMode, Sampler, Scene, SpecularExtension, Texture, TextureReference, WRAP_REPEAT,
};
use crate::error::AssetError;
use crate::glb;
use crate::validate;

/// Largest `min`/`max` array an accessor may carry (a MAT4).
const MAX_BOUNDS_LEN: usize = 16;

const COMMON_UNSUPPORTED: &[&str] = &["extensions", "extras"];

/// Read access to the members of one JSON object, tagged with the entity
/// kind so that errors can say where they happened.
struct Fields<'a> {
    entity: &'static str,
    map: &'a Map<String, Value>,
    log_unsupported: bool,
}

fn as_index(value: &Value) -> Option<usize> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).ok();
    }
    // Integral floats such as `3.0` are accepted as indices.
    let f = value.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 {
        Some(f as usize)
    } else {
        None
    }
}

impl<'a> Fields<'a> {
    fn of(
        entity: &'static str,
        value: &'a Value,
        log_unsupported: bool,
    ) -> Option<Self> {
        value.as_object().map(|map| Self {
            entity,
            map,
            log_unsupported,
        })
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> AssetError {
        AssetError::InvalidField {
            entity: self.entity,
            field,
            expected,
        }
    }

    fn missing(&self, field: &'static str) -> AssetError {
        AssetError::RequiredFieldMissing {
            entity: self.entity,
            field,
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn required(&self, field: &'static str) -> Result<&'a Value, AssetError> {
        self.get(field).ok_or_else(|| self.missing(field))
    }

    fn index(&self, field: &'static str) -> Result<Option<usize>, AssetError> {
        self.get(field)
            .map(|v| as_index(v).ok_or_else(|| self.invalid(field, "non-negative integer")))
            .transpose()
    }

    fn required_index(&self, field: &'static str) -> Result<usize, AssetError> {
        as_index(self.required(field)?).ok_or_else(|| self.invalid(field, "non-negative integer"))
    }

    fn u32(&self, field: &'static str) -> Result<Option<u32>, AssetError> {
        self.index(field)?
            .map(|n| u32::try_from(n).map_err(|_| self.invalid(field, "32-bit integer")))
            .transpose()
    }

    fn number(&self, field: &'static str) -> Result<Option<f64>, AssetError> {
        self.get(field)
            .map(|v| v.as_f64().ok_or_else(|| self.invalid(field, "number")))
            .transpose()
    }

    fn bool(&self, field: &'static str) -> Result<Option<bool>, AssetError> {
        self.get(field)
            .map(|v| v.as_bool().ok_or_else(|| self.invalid(field, "boolean")))
            .transpose()
    }

    fn str(&self, field: &'static str) -> Result<Option<&'a str>, AssetError> {
        self.get(field)
            .map(|v| v.as_str().ok_or_else(|| self.invalid(field, "string")))
            .transpose()
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, AssetError> {
        Ok(self.str(field)?.map(str::to_owned))
    }

    fn array(&self, field: &'static str) -> Result<Option<&'a Vec<Value>>, AssetError> {
        self.get(field)
            .map(|v| v.as_array().ok_or_else(|| self.invalid(field, "array")))
            .transpose()
    }

    fn number_list(&self, field: &'static str) -> Result<Option<Vec<f64>>, AssetError> {
        self.array(field)?
            .map(|items| {
                items
                    .iter()
                    .map(|v| v.as_f64().ok_or_else(|| self.invalid(field, "array of numbers")))
                    .collect()
            })
            .transpose()
    }

    fn numbers<const N: usize>(&self, field: &'static str) -> Result<Option<[f64; N]>, AssetError> {
        let Some(list) = self.number_list(field)? else {
            return Ok(None);
        };
        let array: [f64; N] = list
            .try_into()
            .map_err(|_| self.invalid(field, "fixed-length number array"))?;
        Ok(Some(array))
    }

    fn index_list(&self, field: &'static str) -> Result<Vec<usize>, AssetError> {
        let Some(items) = self.array(field)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|v| as_index(v).ok_or_else(|| self.invalid(field, "array of indices")))
            .collect()
    }

    fn string_list(&self, field: &'static str) -> Result<Vec<String>, AssetError> {
        let Some(items) = self.array(field)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| self.invalid(field, "array of strings"))
            })
            .collect()
    }

    /// A nested object member, decoded as entity kind `entity`.
    fn object(
        &self,
        field: &'static str,
        entity: &'static str,
    ) -> Result<Option<Fields<'a>>, AssetError> {
        self.get(field)
            .map(|v| {
                Fields::of(entity, v, self.log_unsupported)
                    .ok_or_else(|| self.invalid(field, "object"))
            })
            .transpose()
    }

    /// Decode every element of an array member, each as entity kind `entity`.
    fn list<T>(
        &self,
        field: &'static str,
        entity: &'static str,
        decode: impl Fn(&Fields<'a>) -> Result<T, AssetError>,
    ) -> Result<Vec<T>, AssetError> {
        let Some(items) = self.array(field)? else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| {
                let fields = Fields::of(entity, item, self.log_unsupported)
                    .ok_or_else(|| self.invalid(field, "array of objects"))?;
                decode(&fields)
            })
            .collect()
    }

    fn note_unsupported(&self, members: &[&str]) {
        if !self.log_unsupported {
            return;
        }
        for member in members {
            if self.map.contains_key(*member) {
                debug!("Ignoring unsupported member {}.{}", self.entity, member);
            }
        }
    }
}

fn vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32)
}

fn decode_asset(f: &Fields<'_>) -> Result<Asset, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    let version = f
        .string("version")?
        .ok_or_else(|| f.missing("version"))?;
    Ok(Asset {
        version,
        copyright: f.string("copyright")?,
        generator: f.string("generator")?,
        min_version: f.string("minVersion")?,
    })
}

fn decode_buffer(f: &Fields<'_>) -> Result<Buffer, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Buffer {
        byte_length: f.required_index("byteLength")?,
        uri: f.string("uri")?,
        name: f.string("name")?,
    })
}

fn decode_buffer_view(f: &Fields<'_>) -> Result<BufferView, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    let target = match f.index("target")? {
        None => None,
        Some(code) => {
            let target = BufferTarget::from_code(code as u64);
            if target.is_none() {
                warn!("bufferView.target {} is not recognised, ignoring it", code);
            }
            target
        }
    };
    Ok(BufferView {
        buffer: f.required_index("buffer")?,
        byte_offset: f.index("byteOffset")?.unwrap_or(0),
        byte_length: f.required_index("byteLength")?,
        byte_stride: f.index("byteStride")?,
        target,
        name: f.string("name")?,
    })
}

fn decode_accessor(f: &Fields<'_>) -> Result<Accessor, AssetError> {
    f.note_unsupported(&["extensions", "extras", "sparse"]);

    let code = f.required_index("componentType")?;
    let component_type =
        ComponentType::from_code(code as u64).ok_or_else(|| AssetError::UnknownEnumValue {
            entity: f.entity,
            field: "componentType",
            value: code.to_string(),
        })?;

    let token = f.str("type")?.ok_or_else(|| f.missing("type"))?;
    let element_type =
        ElementType::from_token(token).ok_or_else(|| AssetError::UnknownEnumValue {
            entity: f.entity,
            field: "type",
            value: format!("\"{token}\""),
        })?;

    let bounds = |field: &'static str| -> Result<Option<Vec<f64>>, AssetError> {
        let list = f.number_list(field)?;
        if list.as_ref().is_some_and(|l| l.len() > MAX_BOUNDS_LEN) {
            return Err(f.invalid(field, "array of at most 16 numbers"));
        }
        Ok(list)
    };

    Ok(Accessor {
        buffer_view: f.index("bufferView")?,
        byte_offset: f.index("byteOffset")?.unwrap_or(0),
        component_type,
        normalized: f.bool("normalized")?.unwrap_or(false),
        count: f.required_index("count")?,
        element_type,
        min: bounds("min")?,
        max: bounds("max")?,
        name: f.string("name")?,
    })
}

fn decode_image(f: &Fields<'_>) -> Result<Image, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Image {
        uri: f.string("uri")?,
        mime_type: f.string("mimeType")?,
        buffer_view: f.index("bufferView")?,
        name: f.string("name")?,
    })
}

fn decode_sampler(f: &Fields<'_>) -> Result<Sampler, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Sampler {
        mag_filter: f.u32("magFilter")?,
        min_filter: f.u32("minFilter")?,
        wrap_s: f.u32("wrapS")?.unwrap_or(WRAP_REPEAT),
        wrap_t: f.u32("wrapT")?.unwrap_or(WRAP_REPEAT),
        name: f.string("name")?,
    })
}

fn decode_texture(f: &Fields<'_>) -> Result<Texture, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Texture {
        sampler: f.index("sampler")?,
        source: f.index("source")?,
        name: f.string("name")?,
    })
}

fn texture_reference(
    f: &Fields<'_>,
    field: &'static str,
) -> Result<Option<TextureReference>, AssetError> {
    let Some(info) = f.object(field, "textureInfo")? else {
        return Ok(None);
    };
    info.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Some(TextureReference {
        index: info.required_index("index")?,
        tex_coord: info.u32("texCoord")?.unwrap_or(0),
    }))
}

fn decode_pbr(f: &Fields<'_>) -> Result<PbrMetallicRoughness, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    let defaults = PbrMetallicRoughness::default();
    let base_color_factor = f
        .numbers::<4>("baseColorFactor")?
        .map(|c| Color::rgba(c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32))
        .unwrap_or(defaults.base_color_factor);
    Ok(PbrMetallicRoughness {
        base_color_factor,
        base_color_texture: texture_reference(f, "baseColorTexture")?,
        metallic_factor: f
            .number("metallicFactor")?
            .map_or(defaults.metallic_factor, |v| v as f32),
        roughness_factor: f
            .number("roughnessFactor")?
            .map_or(defaults.roughness_factor, |v| v as f32),
        metallic_roughness_texture: texture_reference(f, "metallicRoughnessTexture")?,
    })
}

fn decode_specular(f: &Fields<'_>) -> Result<SpecularExtension, AssetError> {
    let defaults = SpecularExtension::default();
    Ok(SpecularExtension {
        specular_factor: f
            .number("specularFactor")?
            .map_or(defaults.specular_factor, |v| v as f32),
        specular_texture: texture_reference(f, "specularTexture")?,
        specular_color_factor: f
            .numbers::<3>("specularColorFactor")?
            .map_or(defaults.specular_color_factor, vec3),
        specular_color_texture: texture_reference(f, "specularColorTexture")?,
    })
}

fn decode_ior(f: &Fields<'_>) -> Result<IorExtension, AssetError> {
    Ok(IorExtension {
        ior: f
            .number("ior")?
            .map_or(IorExtension::default().ior, |v| v as f32),
    })
}

fn decode_material(f: &Fields<'_>) -> Result<Material, AssetError> {
    f.note_unsupported(&["extras"]);
    let defaults = Material::default();

    let pbr_metallic_roughness = match f.object("pbrMetallicRoughness", "pbrMetallicRoughness")? {
        Some(pbr) => decode_pbr(&pbr)?,
        None => defaults.pbr_metallic_roughness,
    };

    let alpha_mode = match f.str("alphaMode")? {
        None => AlphaMode::Opaque,
        Some(token) => AlphaMode::from_token(token).unwrap_or_else(|| {
            warn!("material.alphaMode \"{}\" is not recognised, using OPAQUE", token);
            AlphaMode::Opaque
        }),
    };

    let (mut specular, mut ior) = (None, None);
    if let Some(extensions) = f.object("extensions", "material.extensions")? {
        if let Some(ext) = extensions.object("KHR_materials_specular", "KHR_materials_specular")? {
            specular = Some(decode_specular(&ext)?);
        }
        if let Some(ext) = extensions.object("KHR_materials_ior", "KHR_materials_ior")? {
            ior = Some(decode_ior(&ext)?);
        }
        if extensions.log_unsupported {
            for name in extensions.map.keys() {
                if name != "KHR_materials_specular" && name != "KHR_materials_ior" {
                    debug!("Ignoring unsupported material extension {}", name);
                }
            }
        }
    }

    Ok(Material {
        name: f.string("name")?,
        pbr_metallic_roughness,
        normal_texture: texture_reference(f, "normalTexture")?,
        occlusion_texture: texture_reference(f, "occlusionTexture")?,
        emissive_texture: texture_reference(f, "emissiveTexture")?,
        emissive_factor: f
            .numbers::<3>("emissiveFactor")?
            .map_or(defaults.emissive_factor, vec3),
        alpha_mode,
        alpha_cutoff: f
            .number("alphaCutoff")?
            .map_or(defaults.alpha_cutoff, |v| v as f32),
        double_sided: f.bool("doubleSided")?.unwrap_or(defaults.double_sided),
        specular,
        ior,
    })
}

fn decode_primitive(f: &Fields<'_>) -> Result<MeshPrimitive, AssetError> {
    f.note_unsupported(&["extensions", "extras", "targets"]);

    let attributes = f
        .object("attributes", "primitive.attributes")?
        .ok_or_else(|| f.missing("attributes"))?;
    let attributes = attributes
        .map
        .iter()
        .map(|(semantic, accessor)| {
            as_index(accessor)
                .map(|index| (semantic.clone(), index))
                .ok_or_else(|| f.invalid("attributes", "map of accessor indices"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mode = match f.index("mode")? {
        None => PrimitiveMode::default(),
        Some(code) => PrimitiveMode::from_code(code as u64).unwrap_or_else(|| {
            warn!("primitive.mode {} is not recognised, using TRIANGLES", code);
            PrimitiveMode::Triangles
        }),
    };

    Ok(MeshPrimitive {
        attributes,
        indices: f.index("indices")?,
        material: f.index("material")?,
        mode,
    })
}

fn decode_mesh(f: &Fields<'_>) -> Result<Mesh, AssetError> {
    f.note_unsupported(&["extensions", "extras", "weights"]);
    if f.get("primitives").is_none() {
        return Err(f.missing("primitives"));
    }
    Ok(Mesh {
        primitives: f.list("primitives", "primitive", decode_primitive)?,
        name: f.string("name")?,
    })
}

fn decode_node(f: &Fields<'_>) -> Result<Node, AssetError> {
    f.note_unsupported(&["extensions", "extras", "skin", "camera", "weights"]);

    let transform = match f.numbers::<16>("matrix")? {
        Some(columns) => {
            if f.log_unsupported
                && ["translation", "rotation", "scale"]
                    .iter()
                    .any(|m| f.map.contains_key(*m))
            {
                debug!("node has both matrix and TRS members, keeping the matrix");
            }
            NodeTransform::Matrix(DMat4::from_cols_array(&columns))
        }
        None => {
            let defaults = Transform::default();
            NodeTransform::Trs(Transform {
                translation: f
                    .numbers::<3>("translation")?
                    .map_or(defaults.translation, DVec3::from_array),
                rotation: f
                    .numbers::<4>("rotation")?
                    .map_or(defaults.rotation, |[x, y, z, w]| DQuat::from_xyzw(x, y, z, w)),
                scale: f
                    .numbers::<3>("scale")?
                    .map_or(defaults.scale, DVec3::from_array),
            })
        }
    };

    Ok(Node {
        mesh: f.index("mesh")?,
        transform,
        children: f.index_list("children")?,
        name: f.string("name")?,
    })
}

fn decode_scene(f: &Fields<'_>) -> Result<Scene, AssetError> {
    f.note_unsupported(COMMON_UNSUPPORTED);
    Ok(Scene {
        nodes: f.index_list("nodes")?,
        name: f.string("name")?,
    })
}

/// Decode a glTF JSON document and attach the binary blob it indexes into.
///
/// The returned graph is fully defaulted and index-validated. Any error
/// aborts the whole decode.
pub fn decode_document(json: &str, blob: Vec<u8>, config: &LoadConfig) -> Result<Gltf, AssetError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| AssetError::JsonSyntax(e.to_string()))?;
    let root = Fields::of("root", &value, config.log_unsupported).ok_or(
        AssetError::InvalidField {
            entity: "root",
            field: "document",
            expected: "JSON object",
        },
    )?;
    root.note_unsupported(&["extensions", "extras", "animations", "cameras", "skins"]);

    let asset = root
        .object("asset", "asset")?
        .ok_or_else(|| root.missing("asset"))?;

    let gltf = Gltf {
        extensions_used: root.string_list("extensionsUsed")?,
        extensions_required: root.string_list("extensionsRequired")?,
        scene: root.index("scene")?,
        asset: decode_asset(&asset)?,
        accessors: root.list("accessors", "accessor", decode_accessor)?,
        buffers: root.list("buffers", "buffer", decode_buffer)?,
        buffer_views: root.list("bufferViews", "bufferView", decode_buffer_view)?,
        images: root.list("images", "image", decode_image)?,
        materials: root.list("materials", "material", decode_material)?,
        meshes: root.list("meshes", "mesh", decode_mesh)?,
        nodes: root.list("nodes", "node", decode_node)?,
        samplers: root.list("samplers", "sampler", decode_sampler)?,
        scenes: root.list("scenes", "scene", decode_scene)?,
        textures: root.list("textures", "texture", decode_texture)?,
        blob,
    };

    validate::validate(&gltf)?;

    info!(
        "Decoded glTF {}: {} nodes, {} meshes, {} materials, {} textures, {} images, {} scenes",
        gltf.asset.version,
        gltf.nodes.len(),
        gltf.meshes.len(),
        gltf.materials.len(),
        gltf.textures.len(),
        gltf.images.len(),
        gltf.scenes.len()
    );
    Ok(gltf)
}

/// Read a GLB container and decode the document it carries.
pub fn decode_glb(bytes: &[u8], config: &LoadConfig) -> Result<Gltf, AssetError> {
    let container = glb::read_container(bytes)?;
    decode_document(container.json, container.binary, config)
}

/// Load and decode a GLB file from disk.
pub fn load_gltf(path: &Path, config: &LoadConfig) -> Result<Gltf, AssetError> {
    let bytes = std::fs::read(path).map_err(|e| AssetError::Io(path.to_path_buf(), e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    decode_glb(&bytes, config)
}
