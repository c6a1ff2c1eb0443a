//! Memoized shader and pipeline creation.
//!
//! Pipelines are keyed by the material features a draw needs and the
//! target it renders into. Lookups that hit take only a shared lock; a miss
//! takes the exclusive lock, re-checks, and compiles at most once per key.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use tracing::{debug, warn};
use vista_assets::scene::MeshBuffers;

use crate::backend::{
    CompareFunction, CullMode, DepthState, PipelineBackend, PipelineDesc, PipelineHandle,
    RasterizerState, ShaderMacro, ShaderProgramHandle, ShaderSource,
};
use crate::error::PipelineError;
use crate::material::{MaterialDomain, MaterialRecord};
use crate::target::TargetDesc;
use crate::vertex::{input_layout, VertexStreams};

/// Everything about a draw that changes the compiled shaders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ShaderFeatures {
    pub has_normal: bool,
    pub has_tangent: bool,
    pub has_texcoord0: bool,
    pub has_texcoord1: bool,
    pub two_sided: bool,
    pub domain: MaterialDomain,
    /// Shadow / depth pre-pass variant.
    pub depth_only: bool,
}

/// Hashed [`ShaderFeatures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey(pub u64);

/// Hashed shader key plus target description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey(pub u64);

impl ShaderFeatures {
    pub fn for_draw(buffers: &MeshBuffers<'_>, material: &MaterialRecord, depth_only: bool) -> Self {
        let streams = VertexStreams::of(buffers);
        Self {
            has_normal: streams.normal,
            has_tangent: streams.tangent,
            has_texcoord0: streams.texcoord0,
            has_texcoord1: streams.texcoord1,
            two_sided: material.two_sided,
            domain: material.domain,
            depth_only,
        }
    }

    pub fn streams(&self) -> VertexStreams {
        VertexStreams {
            normal: self.has_normal,
            tangent: self.has_tangent,
            texcoord0: self.has_texcoord0,
            texcoord1: self.has_texcoord1,
        }
    }

    pub fn key(&self) -> ShaderKey {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        ShaderKey(hasher.finish())
    }
}

impl PipelineKey {
    pub fn new(shader: ShaderKey, target: &TargetDesc) -> Self {
        let mut hasher = DefaultHasher::new();
        shader.0.hash(&mut hasher);
        target.hash_key().hash(&mut hasher);
        PipelineKey(hasher.finish())
    }
}

/// Whether `target` can host a draw with `features`.
///
/// Depth-only passes need no color target unless the material is alpha
/// tested; everything else needs one. A translucent depth-only request also
/// needs a depth slot to write into.
pub fn supports_pass(features: &ShaderFeatures, target: &TargetDesc) -> bool {
    let required_colors = if features.depth_only && features.domain != MaterialDomain::Masked {
        0
    } else {
        1
    };
    if target.color_target_count() < required_colors {
        return false;
    }
    if features.depth_only
        && features.domain == MaterialDomain::Translucent
        && target.depth_format.is_none()
    {
        return false;
    }
    true
}

/// Preprocessor defines for a shader variant.
pub fn shader_macros(features: &ShaderFeatures) -> Vec<ShaderMacro> {
    let mut macros = vec![
        ShaderMacro::new("MAT_BM_OPAQUE", MaterialDomain::Opaque.shader_value()),
        ShaderMacro::new("MAT_BM_MASKED", MaterialDomain::Masked.shader_value()),
        ShaderMacro::new("MAT_BM_TRANSLUCENT", MaterialDomain::Translucent.shader_value()),
        ShaderMacro::new("MAT_BM", features.domain.shader_value()),
        ShaderMacro::new("MAT_TWOSIDED", features.two_sided as u32),
    ];
    if features.depth_only {
        macros.push(ShaderMacro::new("MAT_SHADOW_PASS", 1));
    }
    macros
}

/// Full pipeline description for a shader variant rendering into `target`.
pub fn pipeline_desc(
    features: &ShaderFeatures,
    program: ShaderProgramHandle,
    target: &TargetDesc,
) -> PipelineDesc {
    let cull_mode = match (features.two_sided, features.depth_only) {
        (true, _) => CullMode::None,
        (false, true) => CullMode::Front,
        (false, false) => CullMode::Back,
    };
    PipelineDesc {
        program,
        input_layout: input_layout(features.streams()),
        rasterizer: RasterizerState { cull_mode },
        depth: DepthState {
            test_enabled: true,
            write_enabled: features.domain != MaterialDomain::Translucent,
            compare: CompareFunction::LessEqual,
        },
        target: target.clone(),
    }
}

#[derive(Default)]
struct CacheState {
    shaders: HashMap<ShaderKey, ShaderProgramHandle>,
    pipelines: HashMap<PipelineKey, PipelineHandle>,
}

/// Entry counts of a [`PipelineCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub shader_programs: usize,
    pub pipelines: usize,
}

/// Creates each distinct shader program and pipeline once and hands out the
/// same handle to every later request.
///
/// The cache owns its backend and is shared by reference between render
/// threads.
pub struct PipelineCache<B> {
    backend: B,
    source: ShaderSource,
    state: RwLock<CacheState>,
}

impl<B: PipelineBackend> PipelineCache<B> {
    pub fn new(backend: B, source: ShaderSource) -> Self {
        Self {
            backend,
            source,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Return the pipeline for `features` rendering into `target`, creating
    /// it on first use.
    pub fn get_pipeline(
        &self,
        features: &ShaderFeatures,
        target: &TargetDesc,
    ) -> Result<PipelineHandle, PipelineError> {
        if !supports_pass(features, target) {
            warn!(
                "{:?} material (depth only: {}) cannot render into {:?}",
                features.domain, features.depth_only, target
            );
            return Err(PipelineError::Unsupported {
                domain: features.domain,
                depth_only: features.depth_only,
            });
        }

        let shader_key = features.key();
        let key = PipelineKey::new(shader_key, target);

        if let Some(&pipeline) = self.state.read().pipelines.get(&key) {
            return Ok(pipeline);
        }

        let mut state = self.state.write();
        // Another thread may have built it while we waited for the lock.
        if let Some(&pipeline) = state.pipelines.get(&key) {
            return Ok(pipeline);
        }

        let program = match state.shaders.get(&shader_key) {
            Some(&program) => program,
            None => {
                let program = self
                    .backend
                    .compile_program(&self.source, &shader_macros(features))?;
                debug!("Compiled shader variant {:?}: {:?}", shader_key, features);
                state.shaders.insert(shader_key, program);
                program
            }
        };

        let desc = pipeline_desc(features, program, target);
        let pipeline = self.backend.create_pipeline(&desc)?;
        debug!("Created pipeline {:?} for {:?}", key, features);
        state.pipelines.insert(key, pipeline);

        Ok(pipeline)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read();
        CacheStats {
            shader_programs: state.shaders.len(),
            pipelines: state.pipelines.len(),
        }
    }
}
