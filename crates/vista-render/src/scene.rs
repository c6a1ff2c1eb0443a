//! Scene rendering coordination

use glam::Vec3;
use tracing::debug;
use vista_assets::scene::FlatScene;

use crate::backend::{PipelineBackend, PipelineHandle};
use crate::error::PipelineError;
use crate::material::{MaterialDomain, MaterialRecord};
use crate::pipeline::{PipelineCache, ShaderFeatures};
use crate::target::RenderTargets;

/// Passes a frame is rendered in, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    Shadow,
    Opaque,
    Translucent,
}

/// Order in which a pass's batches are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSorting {
    None,
    FrontToBack,
    BackToFront,
}

impl RenderPass {
    pub const ALL: [RenderPass; 3] = [RenderPass::Shadow, RenderPass::Opaque, RenderPass::Translucent];

    pub fn sorting(self) -> PassSorting {
        match self {
            RenderPass::Shadow => PassSorting::None,
            RenderPass::Opaque => PassSorting::FrontToBack,
            RenderPass::Translucent => PassSorting::BackToFront,
        }
    }
}

/// One draw of one pass, with the pipeline it binds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBatch {
    /// Index into [`FlatScene::draws`].
    pub draw: usize,
    pub pipeline: PipelineHandle,
    /// Index into the material records, `None` for the fallback material.
    pub material: Option<usize>,
    /// Squared distance from the camera to the draw's origin.
    pub depth: f32,
}

/// Batches of a frame, grouped by pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassBatches {
    pub shadow: Vec<RenderBatch>,
    pub opaque: Vec<RenderBatch>,
    pub translucent: Vec<RenderBatch>,
}

impl PassBatches {
    pub fn pass(&self, pass: RenderPass) -> &[RenderBatch] {
        match pass {
            RenderPass::Shadow => &self.shadow,
            RenderPass::Opaque => &self.opaque,
            RenderPass::Translucent => &self.translucent,
        }
    }

    fn pass_mut(&mut self, pass: RenderPass) -> &mut Vec<RenderBatch> {
        match pass {
            RenderPass::Shadow => &mut self.shadow,
            RenderPass::Opaque => &mut self.opaque,
            RenderPass::Translucent => &mut self.translucent,
        }
    }

    pub fn len(&self) -> usize {
        self.shadow.len() + self.opaque.len() + self.translucent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort(&mut self) {
        for pass in RenderPass::ALL {
            let batches = self.pass_mut(pass);
            match pass.sorting() {
                PassSorting::None => {}
                PassSorting::FrontToBack => batches.sort_by(|a, b| a.depth.total_cmp(&b.depth)),
                PassSorting::BackToFront => batches.sort_by(|a, b| b.depth.total_cmp(&a.depth)),
            }
        }
    }
}

/// Resolve a pipeline for every draw of `scene` in every pass it takes part in.
///
/// Opaque and masked draws render in the opaque pass and cast shadows;
/// translucent draws render only in the translucent pass. Requests the
/// target cannot host are skipped; backend failures abort.
pub fn build_batches<B: PipelineBackend>(
    scene: &FlatScene<'_>,
    materials: &[MaterialRecord],
    fallback: &MaterialRecord,
    cache: &PipelineCache<B>,
    targets: &RenderTargets,
    camera: Vec3,
) -> Result<PassBatches, PipelineError> {
    let mut batches = PassBatches::default();

    for (index, draw) in scene.draws.iter().enumerate() {
        let material = draw
            .material
            .and_then(|m| materials.get(m))
            .unwrap_or(fallback);
        let depth = draw.world.w_axis.truncate().distance_squared(camera);

        let passes: &[(RenderPass, bool)] = match material.domain {
            MaterialDomain::Opaque | MaterialDomain::Masked => {
                &[(RenderPass::Opaque, false), (RenderPass::Shadow, true)]
            }
            MaterialDomain::Translucent => &[(RenderPass::Translucent, false)],
        };

        for &(pass, depth_only) in passes {
            let target = match pass {
                RenderPass::Shadow => &targets.shadow,
                RenderPass::Opaque => &targets.opaque,
                RenderPass::Translucent => &targets.translucent,
            };
            let features = ShaderFeatures::for_draw(&draw.buffers, material, depth_only);
            match cache.get_pipeline(&features, target) {
                Ok(pipeline) => batches.pass_mut(pass).push(RenderBatch {
                    draw: index,
                    pipeline,
                    material: draw.material,
                    depth,
                }),
                Err(PipelineError::Unsupported { .. }) => {
                    debug!("Draw {} skipped in {:?} pass", index, pass);
                }
                Err(e) => return Err(e),
            }
        }
    }

    batches.sort();
    Ok(batches)
}
