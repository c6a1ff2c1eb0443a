//! Scene flattening: walks a scene's node graph and produces one draw record
//! per triangle primitive, with its world transform and buffer bindings.

use glam::{DMat4, Mat4};
use tracing::debug;

use crate::document::{ComponentType, ElementType, Gltf, PrimitiveMode};
use crate::error::AssetError;

/// Vertex attribute slots the renderer binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSlot {
    Position,
    Normal,
    Tangent,
    TexCoord0,
    TexCoord1,
}

impl VertexSlot {
    pub const COUNT: usize = 5;
    pub const ALL: [VertexSlot; Self::COUNT] = [
        VertexSlot::Position,
        VertexSlot::Normal,
        VertexSlot::Tangent,
        VertexSlot::TexCoord0,
        VertexSlot::TexCoord1,
    ];

    pub fn from_semantic(semantic: &str) -> Option<Self> {
        match semantic {
            "POSITION" => Some(Self::Position),
            "NORMAL" => Some(Self::Normal),
            "TANGENT" => Some(Self::Tangent),
            "TEXCOORD_0" => Some(Self::TexCoord0),
            "TEXCOORD_1" => Some(Self::TexCoord1),
            _ => None,
        }
    }

    pub fn semantic(self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::TexCoord0 => "TEXCOORD_0",
            Self::TexCoord1 => "TEXCOORD_1",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Width of the entries of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    U8,
    U16,
    U32,
}

impl IndexFormat {
    pub fn from_component_type(component_type: ComponentType) -> Option<Self> {
        match component_type {
            ComponentType::U8 => Some(Self::U8),
            ComponentType::U16 => Some(Self::U16),
            ComponentType::U32 => Some(Self::U32),
            _ => None,
        }
    }
}

/// Index data of a primitive, borrowed from the document's blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexBinding<'a> {
    pub accessor: usize,
    pub format: IndexFormat,
    /// Byte offset of the first index inside the blob.
    pub offset: usize,
    pub count: usize,
    pub data: &'a [u8],
}

/// One vertex attribute stream, borrowed from the document's blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBinding<'a> {
    pub accessor: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
    pub count: usize,
    /// Bytes from the first element up to the end of the last one.
    pub data: &'a [u8],
}

/// Buffer bindings of one mesh primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshBuffers<'a> {
    pub index: Option<IndexBinding<'a>>,
    pub vertices: [Option<VertexBinding<'a>>; VertexSlot::COUNT],
}

impl<'a> MeshBuffers<'a> {
    pub fn vertex(&self, slot: VertexSlot) -> Option<&VertexBinding<'a>> {
        self.vertices[slot.index()].as_ref()
    }

    pub fn has(&self, slot: VertexSlot) -> bool {
        self.vertices[slot.index()].is_some()
    }
}

/// A primitive to draw, placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord<'a> {
    pub node: usize,
    pub mesh: usize,
    pub primitive: usize,
    pub world: Mat4,
    pub material: Option<usize>,
    pub buffers: MeshBuffers<'a>,
}

/// All draws of one scene, in depth-first node order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatScene<'a> {
    pub scene: Option<usize>,
    pub draws: Vec<DrawRecord<'a>>,
}

impl FlatScene<'_> {
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

struct AccessorRange<'a> {
    offset: usize,
    stride: usize,
    data: &'a [u8],
}

fn bind_accessor(gltf: &Gltf, index: usize) -> Result<AccessorRange<'_>, AssetError> {
    let unbound = || AssetError::UnboundAccessor { accessor: index };
    let accessor = gltf.accessors.get(index).ok_or_else(unbound)?;
    let view_index = accessor.buffer_view.ok_or_else(unbound)?;
    let view = gltf.buffer_views.get(view_index).ok_or_else(unbound)?;
    if !gltf.is_embedded_buffer(view.buffer) {
        return Err(unbound());
    }

    let element = accessor.element_size();
    let stride = view.byte_stride.unwrap_or(element);
    let out_of_bounds = |end: u64| AssetError::AccessorOutOfBounds {
        accessor: index,
        end,
        len: gltf.blob.len(),
    };
    let offset = view
        .byte_offset
        .checked_add(accessor.byte_offset)
        .ok_or_else(|| out_of_bounds(u64::MAX))?;
    let len = match accessor.count {
        0 => Some(0),
        n => stride
            .checked_mul(n - 1)
            .and_then(|span| span.checked_add(element)),
    }
    .ok_or_else(|| out_of_bounds(u64::MAX))?;
    let end = offset
        .checked_add(len)
        .ok_or_else(|| out_of_bounds(u64::MAX))?;
    let data = gltf
        .blob
        .get(offset..end)
        .ok_or_else(|| out_of_bounds(end as u64))?;
    Ok(AccessorRange {
        offset,
        stride,
        data,
    })
}

fn bind_primitive(gltf: &Gltf, mesh: usize, primitive: usize) -> Result<MeshBuffers<'_>, AssetError> {
    let source = &gltf.meshes[mesh].primitives[primitive];
    let mut buffers = MeshBuffers::default();

    if let Some(index) = source.indices {
        let range = bind_accessor(gltf, index)?;
        let accessor = &gltf.accessors[index];
        let format = IndexFormat::from_component_type(accessor.component_type).ok_or(
            AssetError::InvalidField {
                entity: "primitive",
                field: "indices",
                expected: "unsigned integer SCALAR accessor",
            },
        )?;
        buffers.index = Some(IndexBinding {
            accessor: index,
            format,
            offset: range.offset,
            count: accessor.count,
            data: range.data,
        });
    }

    for &(ref semantic, index) in &source.attributes {
        let Some(slot) = VertexSlot::from_semantic(semantic) else {
            continue;
        };
        let range = bind_accessor(gltf, index)?;
        let accessor = &gltf.accessors[index];
        buffers.vertices[slot.index()] = Some(VertexBinding {
            accessor: index,
            component_type: accessor.component_type,
            element_type: accessor.element_type,
            normalized: accessor.normalized,
            stride: range.stride,
            offset: range.offset,
            count: accessor.count,
            data: range.data,
        });
    }

    Ok(buffers)
}

enum Visit {
    Enter(usize),
    Exit,
}

/// Flatten scene `scene` of `gltf` into draw records.
///
/// Nodes are visited depth first with an explicit stack; each node's world
/// matrix is its parent's world matrix times its local matrix. Every node is
/// entered at most once per scene: reaching a node a second time, through a
/// cycle or a second parent, fails with [`AssetError::GraphCycleOrOutOfRange`].
/// Buffer bindings are resolved once per mesh and shared by every node that
/// instances it.
pub fn flatten_scene(gltf: &Gltf, scene: usize) -> Result<FlatScene<'_>, AssetError> {
    let roots = &gltf
        .scenes
        .get(scene)
        .ok_or(AssetError::IndexOutOfRange {
            referrer: "flatten_scene".to_owned(),
            target: "scene",
            index: scene,
            len: gltf.scenes.len(),
        })?
        .nodes;

    let mut mesh_buffers: Vec<Option<Vec<Option<MeshBuffers<'_>>>>> = vec![None; gltf.meshes.len()];
    let mut visited = vec![false; gltf.nodes.len()];
    let mut world_stack = vec![DMat4::IDENTITY];
    let mut work: Vec<Visit> = roots.iter().rev().map(|&n| Visit::Enter(n)).collect();
    let mut draws = Vec::new();

    while let Some(visit) = work.pop() {
        let node_index = match visit {
            Visit::Enter(node_index) => node_index,
            Visit::Exit => {
                world_stack.pop();
                continue;
            }
        };

        let cycle = AssetError::GraphCycleOrOutOfRange {
            scene,
            node: node_index,
        };
        let Some(node) = gltf.nodes.get(node_index) else {
            return Err(cycle);
        };
        if visited[node_index] {
            return Err(cycle);
        }
        visited[node_index] = true;

        let parent = world_stack.last().copied().unwrap_or(DMat4::IDENTITY);
        let world = parent * node.transform.matrix();
        world_stack.push(world);

        if let Some(mesh_index) = node.mesh {
            let mesh = gltf.meshes.get(mesh_index).ok_or(AssetError::IndexOutOfRange {
                referrer: format!("nodes[{node_index}].mesh"),
                target: "mesh",
                index: mesh_index,
                len: gltf.meshes.len(),
            })?;

            let bound = match &mut mesh_buffers[mesh_index] {
                Some(bound) => bound,
                slot => {
                    let mut bound = Vec::with_capacity(mesh.primitives.len());
                    for (p, primitive) in mesh.primitives.iter().enumerate() {
                        if primitive.mode == PrimitiveMode::Triangles {
                            bound.push(Some(bind_primitive(gltf, mesh_index, p)?));
                        } else {
                            debug!(
                                "Skipping mesh {} primitive {} with mode {:?}",
                                mesh_index, p, primitive.mode
                            );
                            bound.push(None);
                        }
                    }
                    slot.insert(bound)
                }
            };

            let world_f32 = world.as_mat4();
            for (p, buffers) in bound.iter().enumerate() {
                let Some(buffers) = buffers else {
                    continue;
                };
                draws.push(DrawRecord {
                    node: node_index,
                    mesh: mesh_index,
                    primitive: p,
                    world: world_f32,
                    material: mesh.primitives[p].material,
                    buffers: *buffers,
                });
            }
        }

        work.push(Visit::Exit);
        work.extend(node.children.iter().rev().map(|&c| Visit::Enter(c)));
    }

    debug!("Flattened scene {} into {} draws", scene, draws.len());
    Ok(FlatScene {
        scene: Some(scene),
        draws,
    })
}

/// Flatten the document's default scene, or return an empty scene when the
/// document has none.
pub fn flatten_default_scene(gltf: &Gltf) -> Result<FlatScene<'_>, AssetError> {
    match gltf.default_scene() {
        Some(scene) => flatten_scene(gltf, scene),
        None => Ok(FlatScene::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadConfig;
    use crate::decode::decode_document;
    use crate::document::{Accessor, Buffer, BufferView, Mesh, MeshPrimitive, Node, Scene};
    use crate::testing::{triangle_blob, triangle_document};
    use glam::{DVec3, Vec3};
    use vista_core::{NodeTransform, Transform};

    fn load(extra: &str) -> Gltf {
        decode_document(&triangle_document(extra), triangle_blob(), &LoadConfig::default())
            .unwrap()
    }

    fn translated(x: f64) -> NodeTransform {
        NodeTransform::Trs(Transform::from_translation(DVec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn single_triangle_binds_positions_and_indices() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0,"COLOR_0":0},"indices":1}]}],
               "nodes":[{"mesh":0}],"scenes":[{"nodes":[0]}]"#,
        );
        let flat = flatten_default_scene(&gltf).unwrap();
        assert_eq!(flat.draws.len(), 1);
        let draw = &flat.draws[0];
        assert_eq!(draw.world, Mat4::IDENTITY);
        assert_eq!(draw.material, None);

        let index = draw.buffers.index.unwrap();
        assert_eq!(index.format, IndexFormat::U16);
        assert_eq!(index.offset, 36);
        assert_eq!(index.count, 3);
        assert_eq!(index.data, &[0, 0, 1, 0, 2, 0]);

        let position = draw.buffers.vertex(VertexSlot::Position).unwrap();
        assert_eq!(position.stride, 12);
        assert_eq!(position.offset, 0);
        assert_eq!(position.data.len(), 36);
        assert_eq!(position.element_type, ElementType::Vec3);
        assert!(!draw.buffers.has(VertexSlot::Normal));
        assert!(!draw.buffers.has(VertexSlot::TexCoord0));
    }

    #[test]
    fn non_triangle_primitives_are_skipped() {
        let gltf = load(
            r#""meshes":[{"primitives":[
                   {"attributes":{"POSITION":0},"indices":1},
                   {"attributes":{"POSITION":0},"mode":1}]}],
               "nodes":[{"mesh":0}],"scenes":[{"nodes":[0]}]"#,
        );
        let flat = flatten_scene(&gltf, 0).unwrap();
        assert_eq!(flat.draws.len(), 1);
        assert_eq!(flat.draws[0].primitive, 0);
    }

    #[test]
    fn child_world_is_parent_times_local() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
               "nodes":[
                   {"translation":[1,0,0],"scale":[2,2,2],"children":[1]},
                   {"translation":[0,3,0],"mesh":0}],
               "scenes":[{"nodes":[0]}]"#,
        );
        let flat = flatten_scene(&gltf, 0).unwrap();
        assert_eq!(flat.draws.len(), 1);
        let origin = flat.draws[0].world.transform_point3(Vec3::ZERO);
        // Child translation is scaled by the parent, then offset by it.
        assert!((origin - Vec3::new(1.0, 6.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn siblings_do_not_inherit_each_other() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
               "nodes":[
                   {"translation":[5,0,0],"mesh":0},
                   {"translation":[0,0,7],"mesh":0}],
               "scenes":[{"nodes":[0,1]}]"#,
        );
        let flat = flatten_scene(&gltf, 0).unwrap();
        let origins: Vec<Vec3> = flat
            .draws
            .iter()
            .map(|d| d.world.transform_point3(Vec3::ZERO))
            .collect();
        assert_eq!(origins, vec![Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 7.0)]);
    }

    #[test]
    fn draws_follow_depth_first_order() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
               "nodes":[
                   {"mesh":0,"children":[2]},
                   {"mesh":0},
                   {"mesh":0}],
               "scenes":[{"nodes":[0,1]}]"#,
        );
        let flat = flatten_scene(&gltf, 0).unwrap();
        let nodes: Vec<usize> = flat.draws.iter().map(|d| d.node).collect();
        assert_eq!(nodes, vec![0, 2, 1]);
    }

    #[test]
    fn shared_child_is_rejected() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
               "nodes":[
                   {"translation":[1,0,0],"children":[2]},
                   {"translation":[2,0,0],"children":[2]},
                   {"mesh":0}],
               "scenes":[{"nodes":[0,1]}]"#,
        );
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { scene: 0, node: 2 })
        ));
    }

    #[test]
    fn doubly_linked_chain_fails_fast() {
        // Each node lists its successor twice; visiting per path would
        // produce 2^20 draws.
        let nodes: Vec<String> = (0..21)
            .map(|i| {
                if i == 20 {
                    r#"{"mesh":0}"#.to_owned()
                } else {
                    format!(r#"{{"children":[{},{}]}}"#, i + 1, i + 1)
                }
            })
            .collect();
        let gltf = load(&format!(
            r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],
               "nodes":[{}],"scenes":[{{"nodes":[0]}}]"#,
            nodes.join(",")
        ));
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { scene: 0, node: 20 })
        ));
    }

    #[test]
    fn same_root_listed_twice_is_rejected() {
        let gltf = load(
            r#""meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
               "nodes":[{"mesh":0}],"scenes":[{"nodes":[0,0]}]"#,
        );
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { scene: 0, node: 0 })
        ));
    }

    #[test]
    fn cycle_is_detected() {
        let gltf = load(
            r#""nodes":[{"children":[1]},{"children":[0]}],
               "scenes":[{"nodes":[0]}]"#,
        );
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { scene: 0, node: 0 })
        ));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut gltf = Gltf::default();
        gltf.nodes.push(Node {
            children: vec![0],
            ..Default::default()
        });
        gltf.scenes.push(Scene {
            nodes: vec![0],
            ..Default::default()
        });
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { node: 0, .. })
        ));
    }

    #[test]
    fn out_of_range_child_in_hand_built_graph() {
        let mut gltf = Gltf::default();
        gltf.nodes.push(Node {
            transform: translated(1.0),
            children: vec![4],
            ..Default::default()
        });
        gltf.scenes.push(Scene {
            nodes: vec![0],
            ..Default::default()
        });
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::GraphCycleOrOutOfRange { scene: 0, node: 4 })
        ));
    }

    #[test]
    fn accessor_without_view_cannot_be_bound() {
        let json = r#"{"asset":{"version":"2.0"},
            "accessors":[{"componentType":5126,"count":3,"type":"VEC3"}],
            "meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],
            "nodes":[{"mesh":0}],"scenes":[{"nodes":[0]}]}"#;
        let gltf = decode_document(json, Vec::new(), &LoadConfig::default()).unwrap();
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::UnboundAccessor { accessor: 0 })
        ));
    }

    fn hand_built_with_view(byte_offset: usize, byte_stride: Option<usize>, count: usize) -> Gltf {
        Gltf {
            buffers: vec![Buffer {
                byte_length: 16,
                ..Default::default()
            }],
            buffer_views: vec![BufferView {
                buffer: 0,
                byte_offset,
                byte_length: 16,
                byte_stride,
                ..Default::default()
            }],
            accessors: vec![Accessor {
                buffer_view: Some(0),
                byte_offset: 8,
                component_type: ComponentType::F32,
                normalized: false,
                count,
                element_type: ElementType::Vec3,
                min: None,
                max: None,
                name: None,
            }],
            meshes: vec![Mesh {
                primitives: vec![MeshPrimitive {
                    attributes: vec![("POSITION".to_owned(), 0)],
                    ..Default::default()
                }],
                name: None,
            }],
            nodes: vec![Node {
                mesh: Some(0),
                ..Default::default()
            }],
            scenes: vec![Scene {
                nodes: vec![0],
                ..Default::default()
            }],
            blob: vec![0; 16],
            ..Default::default()
        }
    }

    #[test]
    fn overflowing_offset_is_out_of_bounds() {
        let gltf = hand_built_with_view(usize::MAX - 4, None, 1);
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::AccessorOutOfBounds { accessor: 0, .. })
        ));
    }

    #[test]
    fn overflowing_stride_span_is_out_of_bounds() {
        let gltf = hand_built_with_view(0, Some(usize::MAX / 2), 4);
        assert!(matches!(
            flatten_scene(&gltf, 0),
            Err(AssetError::AccessorOutOfBounds { accessor: 0, .. })
        ));
    }

    #[test]
    fn no_scenes_yields_empty_flat_scene() {
        let gltf = load(r#""nodes":[{}]"#);
        let flat = flatten_default_scene(&gltf).unwrap();
        assert!(flat.is_empty());
        assert_eq!(flat.scene, None);
    }

    #[test]
    fn scene_index_out_of_range() {
        let gltf = load(r#""scenes":[{"nodes":[]}]"#);
        assert!(matches!(
            flatten_scene(&gltf, 1),
            Err(AssetError::IndexOutOfRange { target: "scene", .. })
        ));
    }
}
