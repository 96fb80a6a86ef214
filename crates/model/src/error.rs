use std::result;

/// Error types for variation model construction and interpolation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two masters share a location.
    #[error("duplicate master location: master {index} repeats master {duplicate_of}")]
    DuplicateLocation { index: usize, duplicate_of: usize },

    /// Value count differs from the model's master count.
    #[error("cannot interpolate: expected {expected} master values, got {actual}")]
    Interpolation { expected: usize, actual: usize },
}

pub type Result<T> = result::Result<T, Error>;
