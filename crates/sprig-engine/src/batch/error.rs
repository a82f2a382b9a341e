use std::fmt;

use crate::gpu::DrawError;

/// Lifecycle state of a [`SpriteBatch`](super::SpriteBatch).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BatchState {
    /// Constructed; no vertex storage or default shader yet.
    Unloaded,
    /// Resources allocated, outside `begin()`/`end()`.
    Idle,
    /// Between `begin()` and `end()`.
    Drawing,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchState::Unloaded => "unloaded",
            BatchState::Idle => "idle",
            BatchState::Drawing => "drawing",
        })
    }
}

/// All errors the batch can return.
#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    /// Lifecycle misuse: `begin`/`end` out of order, or drawing outside `begin()`/`end()`.
    #[error("`{op}` is not valid while the batch is {state}")]
    InvalidState { op: &'static str, state: BatchState },
    /// Requested capacity cannot be addressed by the 16-bit index buffer.
    #[error("batch capacity must be between 1 and {max} quads, got {requested}")]
    Capacity { requested: usize, max: usize },
    /// The default or a custom shader did not compile.
    #[error("shader failed to compile: {log}")]
    ShaderCompile { log: String },
    /// The GPU rejected a draw call. The in-flight geometry is lost.
    #[error("draw call failed: {0}")]
    Draw(#[from] DrawError),
}
