//! Render target descriptions

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Rgba16Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFormat {
    Depth32Float,
    Depth24PlusStencil8,
    Depth16Unorm,
}

/// Blend state of one color target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source replaces destination.
    #[default]
    Replace,
    /// Standard `src * a + dst * (1 - a)` blending.
    Alpha,
}

/// Formats and blend modes a pipeline renders into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub color_formats: Vec<ColorFormat>,
    /// One entry per color target.
    pub blend_modes: Vec<BlendMode>,
    pub depth_format: Option<DepthFormat>,
}

impl TargetDesc {
    /// A single color target plus an optional depth buffer.
    pub fn color(format: ColorFormat, blend: BlendMode, depth: Option<DepthFormat>) -> Self {
        Self {
            color_formats: vec![format],
            blend_modes: vec![blend],
            depth_format: depth,
        }
    }

    /// A depth buffer with no color targets, as used by shadow maps.
    pub fn depth_only(depth: DepthFormat) -> Self {
        Self {
            color_formats: Vec::new(),
            blend_modes: Vec::new(),
            depth_format: Some(depth),
        }
    }

    pub fn color_target_count(&self) -> usize {
        self.color_formats.len()
    }

    /// Stable 64-bit digest of the description, used in pipeline keys.
    pub fn hash_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Targets of the three scene passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargets {
    pub opaque: TargetDesc,
    pub translucent: TargetDesc,
    pub shadow: TargetDesc,
}

impl RenderTargets {
    pub fn new(color: ColorFormat, depth: DepthFormat, shadow_depth: DepthFormat) -> Self {
        Self {
            opaque: TargetDesc::color(color, BlendMode::Replace, Some(depth)),
            translucent: TargetDesc::color(color, BlendMode::Alpha, Some(depth)),
            shadow: TargetDesc::depth_only(shadow_depth),
        }
    }
}

impl Default for RenderTargets {
    fn default() -> Self {
        Self::new(
            ColorFormat::Rgba8Unorm,
            DepthFormat::Depth32Float,
            DepthFormat::Depth32Float,
        )
    }
}
