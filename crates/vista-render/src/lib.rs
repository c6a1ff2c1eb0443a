//! Vista Render - material records and pipeline memoization
//!
//! Turns decoded glTF materials and flattened draws into shader variants
//! and pipelines, compiling each distinct combination once. The graphics
//! API itself sits behind the [`PipelineBackend`] trait.

pub mod backend;
pub mod material;
pub mod pipeline;
pub mod scene;
pub mod target;
pub mod vertex;

mod error;

pub use backend::{
    PipelineBackend, PipelineDesc, PipelineHandle, RecordingBackend, ShaderCompiler, ShaderMacro,
    ShaderProgramHandle, ShaderSource,
};
pub use error::{BackendError, PipelineError};
pub use material::{material_records, MaterialConstants, MaterialDomain, MaterialRecord};
pub use pipeline::{supports_pass, CacheStats, PipelineCache, ShaderFeatures};
pub use scene::{build_batches, PassBatches, RenderBatch, RenderPass};
pub use target::{BlendMode, ColorFormat, DepthFormat, RenderTargets, TargetDesc};
