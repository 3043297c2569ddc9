use thiserror::Error;

/// Broad classification of a [`MatchError`].
///
/// Neither kind is transient: both indicate caller misconfiguration and
/// retrying the same call yields the same error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad palette or index configuration, detected at construction/build time.
    Configuration,
    /// Malformed per-call input.
    InvalidArgument,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("palette must contain at least one entry")]
    EmptyPalette,

    #[error("palette entry id {0} appears more than once")]
    DuplicateId(u32),

    #[error("palette has {len} entries, at most {max} are supported")]
    PaletteTooLarge { len: usize, max: usize },

    #[error("octree capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("color channel {channel} is not a number")]
    InvalidColor { channel: char },

    #[error("frame width cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} is not a multiple of frame width {width}")]
    DimensionMismatch { len: usize, width: usize },
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPalette
            | Self::DuplicateId(_)
            | Self::PaletteTooLarge { .. }
            | Self::InvalidCapacity(_) => ErrorKind::Configuration,
            Self::InvalidColor { .. } | Self::ZeroDimension | Self::DimensionMismatch { .. } => {
                ErrorKind::InvalidArgument
            }
        }
    }
}
