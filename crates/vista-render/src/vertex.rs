//! Vertex input layouts for glTF primitives

use vista_assets::scene::{MeshBuffers, VertexSlot};

/// Format of one vertex attribute as the pipeline reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One element of a pipeline's vertex input layout. Every attribute lives in
/// its own buffer slot, at offset zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputElement {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub slot: u32,
}

impl InputElement {
    fn for_slot(slot: VertexSlot) -> Self {
        let (semantic, semantic_index, format) = match slot {
            VertexSlot::Position => ("POSITION", 0, VertexFormat::Float32x3),
            VertexSlot::Normal => ("NORMAL", 0, VertexFormat::Float32x3),
            VertexSlot::Tangent => ("TANGENT", 0, VertexFormat::Float32x4),
            VertexSlot::TexCoord0 => ("TEXCOORD", 0, VertexFormat::Float32x2),
            VertexSlot::TexCoord1 => ("TEXCOORD", 1, VertexFormat::Float32x2),
        };
        Self {
            semantic,
            semantic_index,
            format,
            slot: slot as u32,
        }
    }
}

/// Which optional vertex streams a primitive provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct VertexStreams {
    pub normal: bool,
    pub tangent: bool,
    pub texcoord0: bool,
    pub texcoord1: bool,
}

impl VertexStreams {
    pub fn of(buffers: &MeshBuffers<'_>) -> Self {
        Self {
            normal: buffers.has(VertexSlot::Normal),
            tangent: buffers.has(VertexSlot::Tangent),
            texcoord0: buffers.has(VertexSlot::TexCoord0),
            texcoord1: buffers.has(VertexSlot::TexCoord1),
        }
    }
}

/// Input layout for a set of vertex streams. Position is always present.
pub fn input_layout(streams: VertexStreams) -> Vec<InputElement> {
    let enabled = [
        (VertexSlot::Position, true),
        (VertexSlot::Normal, streams.normal),
        (VertexSlot::Tangent, streams.tangent),
        (VertexSlot::TexCoord0, streams.texcoord0),
        (VertexSlot::TexCoord1, streams.texcoord1),
    ];
    enabled
        .into_iter()
        .filter(|&(_, on)| on)
        .map(|(slot, _)| InputElement::for_slot(slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_only_layout() {
        let layout = input_layout(VertexStreams::default());
        assert_eq!(layout.len(), 1);
        assert_eq!(layout[0].semantic, "POSITION");
        assert_eq!(layout[0].format, VertexFormat::Float32x3);
        assert_eq!(layout[0].slot, 0);
    }

    #[test]
    fn full_layout_uses_fixed_slots() {
        let layout = input_layout(VertexStreams {
            normal: true,
            tangent: true,
            texcoord0: true,
            texcoord1: true,
        });
        let summary: Vec<(&str, u32, u32, u32)> = layout
            .iter()
            .map(|e| (e.semantic, e.semantic_index, e.slot, e.format.size()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("POSITION", 0, 0, 12),
                ("NORMAL", 0, 1, 12),
                ("TANGENT", 0, 2, 16),
                ("TEXCOORD", 0, 3, 8),
                ("TEXCOORD", 1, 4, 8),
            ]
        );
    }

    #[test]
    fn skipped_streams_keep_their_slot_numbers() {
        let layout = input_layout(VertexStreams {
            texcoord1: true,
            ..Default::default()
        });
        assert_eq!(layout.iter().map(|e| e.slot).collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn streams_follow_mesh_buffers() {
        let streams = VertexStreams::of(&MeshBuffers::default());
        assert_eq!(streams, VertexStreams::default());
    }
}
