use crate::material::MaterialDomain;

/// Failure reported by a [`PipelineBackend`](crate::PipelineBackend) while
/// compiling shaders or creating a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Errors returned by the pipeline cache.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The target cannot host this material in this pass. Callers skip the
    /// draw; nothing is compiled or cached.
    #[error("{domain:?} material (depth only: {depth_only}) is not supported by the render target")]
    Unsupported {
        domain: MaterialDomain,
        depth_only: bool,
    },

    #[error("render backend error: {0}")]
    Backend(#[from] BackendError),
}
