//! The graphics API seam: shader compilation and pipeline creation.
//!
//! The pipeline cache only ever talks to a backend through these traits and
//! treats the handles it gets back as opaque.

use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::BackendError;
use crate::target::TargetDesc;
use crate::vertex::InputElement;

/// Opaque handle to a compiled vertex + pixel shader pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderProgramHandle(pub u64);

/// Opaque handle to a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u64);

/// Shader file both stages are compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub path: PathBuf,
}

impl ShaderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ShaderSource {
    fn default() -> Self {
        Self::new("shaders/gltf_material.hlsl")
    }
}

/// A preprocessor define passed to the shader compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderMacro {
    pub name: &'static str,
    pub value: u32,
}

impl ShaderMacro {
    pub const fn new(name: &'static str, value: u32) -> Self {
        Self { name, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Less,
    LessEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub write_enabled: bool,
    pub compare: CompareFunction,
}

/// Everything a backend needs to build a triangle-list pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    pub program: ShaderProgramHandle,
    pub input_layout: Vec<InputElement>,
    pub rasterizer: RasterizerState,
    pub depth: DepthState,
    pub target: TargetDesc,
}

pub trait ShaderCompiler: Send + Sync {
    /// Compiles the vertex and pixel stages of `source` with `macros` defined.
    fn compile_program(
        &self,
        source: &ShaderSource,
        macros: &[ShaderMacro],
    ) -> Result<ShaderProgramHandle, BackendError>;
}

pub trait PipelineBackend: ShaderCompiler {
    /// Creates a graphics pipeline from a fully specified description.
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle, BackendError>;
}

#[derive(Debug, Default)]
struct Recorded {
    programs: Vec<Vec<ShaderMacro>>,
    pipelines: Vec<PipelineDesc>,
}

/// A backend that creates nothing on a GPU: it hands out sequential handles
/// and records every request. Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    recorded: Mutex<Recorded>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every compile and pipeline build take at least `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn program_count(&self) -> usize {
        self.recorded.lock().programs.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.recorded.lock().pipelines.len()
    }

    /// Macro sets of every compiled program, in compile order.
    pub fn programs(&self) -> Vec<Vec<ShaderMacro>> {
        self.recorded.lock().programs.clone()
    }

    /// Descriptions of every created pipeline, in creation order.
    pub fn pipelines(&self) -> Vec<PipelineDesc> {
        self.recorded.lock().pipelines.clone()
    }

    fn wait(&self) {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }
}

impl ShaderCompiler for RecordingBackend {
    fn compile_program(
        &self,
        _source: &ShaderSource,
        macros: &[ShaderMacro],
    ) -> Result<ShaderProgramHandle, BackendError> {
        self.wait();
        let mut recorded = self.recorded.lock();
        recorded.programs.push(macros.to_vec());
        Ok(ShaderProgramHandle(recorded.programs.len() as u64))
    }
}

impl PipelineBackend for RecordingBackend {
    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle, BackendError> {
        self.wait();
        let mut recorded = self.recorded.lock();
        recorded.pipelines.push(desc.clone());
        Ok(PipelineHandle(recorded.pipelines.len() as u64))
    }
}
