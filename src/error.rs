use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("assignment solver failed on a {rows}x{cols} cost matrix")]
    Assignment { rows: usize, cols: usize },

    #[error("filter update failed: innovation covariance is singular")]
    FilterDiverged,

    #[error("track log serialization failed: {0}")]
    Log(#[from] serde_json::Error),

    #[error("track log write failed: {0}")]
    Io(#[from] std::io::Error),
}
