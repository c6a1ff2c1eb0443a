//! Cross-reference and bounds validation of a decoded document.

use crate::document::{ComponentType, ElementType, Gltf};
use crate::error::AssetError;

fn check_index(
    referrer: impl FnOnce() -> String,
    target: &'static str,
    index: usize,
    len: usize,
) -> Result<(), AssetError> {
    if index < len {
        Ok(())
    } else {
        Err(AssetError::IndexOutOfRange {
            referrer: referrer(),
            target,
            index,
            len,
        })
    }
}

fn check_buffer_views(gltf: &Gltf) -> Result<(), AssetError> {
    for (i, view) in gltf.buffer_views.iter().enumerate() {
        check_index(
            || format!("bufferViews[{i}].buffer"),
            "buffer",
            view.buffer,
            gltf.buffers.len(),
        )?;
        if gltf.is_embedded_buffer(view.buffer) {
            let end = view.byte_offset as u64 + view.byte_length as u64;
            if end > gltf.blob.len() as u64 {
                return Err(AssetError::BufferViewOutOfBounds {
                    view: i,
                    end,
                    len: gltf.blob.len(),
                });
            }
        }
    }
    Ok(())
}

fn check_accessors(gltf: &Gltf) -> Result<(), AssetError> {
    for (i, accessor) in gltf.accessors.iter().enumerate() {
        let Some(view_index) = accessor.buffer_view else {
            continue;
        };
        check_index(
            || format!("accessors[{i}].bufferView"),
            "bufferView",
            view_index,
            gltf.buffer_views.len(),
        )?;
        if accessor.count == 0 {
            continue;
        }
        let view = &gltf.buffer_views[view_index];
        let element = accessor.element_size() as u64;
        let stride = view.byte_stride.map_or(element, |s| s as u64);
        let end = (accessor.count as u64 - 1)
            .checked_mul(stride)
            .and_then(|span| span.checked_add(accessor.byte_offset as u64 + element))
            .unwrap_or(u64::MAX);
        if end > view.byte_length as u64 {
            return Err(AssetError::AccessorOutOfBounds {
                accessor: i,
                end,
                len: view.byte_length,
            });
        }
    }
    Ok(())
}

fn check_materials(gltf: &Gltf) -> Result<(), AssetError> {
    for (i, texture) in gltf.textures.iter().enumerate() {
        if let Some(sampler) = texture.sampler {
            check_index(
                || format!("textures[{i}].sampler"),
                "sampler",
                sampler,
                gltf.samplers.len(),
            )?;
        }
        if let Some(source) = texture.source {
            check_index(
                || format!("textures[{i}].source"),
                "image",
                source,
                gltf.images.len(),
            )?;
        }
    }
    for (i, image) in gltf.images.iter().enumerate() {
        if let Some(view) = image.buffer_view {
            check_index(
                || format!("images[{i}].bufferView"),
                "bufferView",
                view,
                gltf.buffer_views.len(),
            )?;
        }
    }
    for (i, material) in gltf.materials.iter().enumerate() {
        for (slot, reference) in material.texture_references() {
            check_index(
                || format!("materials[{i}].{slot}.index"),
                "texture",
                reference.index,
                gltf.textures.len(),
            )?;
        }
    }
    Ok(())
}

fn check_meshes(gltf: &Gltf) -> Result<(), AssetError> {
    for (m, mesh) in gltf.meshes.iter().enumerate() {
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            for (semantic, accessor) in &primitive.attributes {
                check_index(
                    || format!("meshes[{m}].primitives[{p}].attributes.{semantic}"),
                    "accessor",
                    *accessor,
                    gltf.accessors.len(),
                )?;
            }
            if let Some(indices) = primitive.indices {
                check_index(
                    || format!("meshes[{m}].primitives[{p}].indices"),
                    "accessor",
                    indices,
                    gltf.accessors.len(),
                )?;
                let accessor = &gltf.accessors[indices];
                let unsigned = matches!(
                    accessor.component_type,
                    ComponentType::U8 | ComponentType::U16 | ComponentType::U32
                );
                if !unsigned || accessor.element_type != ElementType::Scalar {
                    return Err(AssetError::InvalidField {
                        entity: "primitive",
                        field: "indices",
                        expected: "unsigned integer SCALAR accessor",
                    });
                }
            }
            if let Some(material) = primitive.material {
                check_index(
                    || format!("meshes[{m}].primitives[{p}].material"),
                    "material",
                    material,
                    gltf.materials.len(),
                )?;
            }
        }
    }
    Ok(())
}

fn check_graph(gltf: &Gltf) -> Result<(), AssetError> {
    for (n, node) in gltf.nodes.iter().enumerate() {
        if let Some(mesh) = node.mesh {
            check_index(
                || format!("nodes[{n}].mesh"),
                "mesh",
                mesh,
                gltf.meshes.len(),
            )?;
        }
        for &child in &node.children {
            check_index(
                || format!("nodes[{n}].children"),
                "node",
                child,
                gltf.nodes.len(),
            )?;
        }
    }
    for (s, scene) in gltf.scenes.iter().enumerate() {
        for &node in &scene.nodes {
            check_index(
                || format!("scenes[{s}].nodes"),
                "node",
                node,
                gltf.nodes.len(),
            )?;
        }
    }
    if let Some(scene) = gltf.scene {
        check_index(|| "scene".to_owned(), "scene", scene, gltf.scenes.len())?;
    }
    Ok(())
}

/// Check every cross reference in `gltf` and every byte range into its blob.
pub(crate) fn validate(gltf: &Gltf) -> Result<(), AssetError> {
    check_buffer_views(gltf)?;
    check_accessors(gltf)?;
    check_materials(gltf)?;
    check_meshes(gltf)?;
    check_graph(gltf)
}
