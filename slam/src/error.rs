//! Error types for the occupancy grid

/// Result type alias
pub type Result<T> = std::result::Result<T, MapError>;

/// Occupancy grid error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// Grid width or height is zero
    #[error("Incorrect size for the occupancy grid ({width}x{height})! Size should not be zero")]
    InvalidGeometry {
        /// Configured width in cells
        width: usize,
        /// Configured height in cells
        height: usize,
    },

    /// Grid resolution is not strictly positive
    #[error("Resolution provided is incorrect ({0})! Should be more than zero")]
    InvalidResolution(f32),

    /// There is no raster to persist yet
    #[error("The occupancy grid has not been initialized, ingest a scan or load a map first")]
    NotInitialized,

    /// Encoding, decoding or file access of the raster image failed
    #[error("Raster image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MapError {
    /// Process exit status a driver should terminate with for this error. The two configuration
    /// errors map to distinct statuses.
    pub fn exit_code(&self) -> i32 {
        match self {
            MapError::InvalidGeometry { .. } => 2,
            MapError::InvalidResolution(_) => 3,
            MapError::NotInitialized | MapError::Image(_) => 1,
        }
    }
}
