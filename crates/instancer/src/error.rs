use std::result;

use font_types::Tag;

/// Error types for axis limiting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A limit value lies outside the axis range.
    #[error("invalid limit for axis {tag}: {value} is outside [{min}, {max}]")]
    InvalidAxisLimit { tag: Tag, value: f64, min: f64, max: f64 },

    /// The limit's minimum is above its maximum.
    #[error("invalid limit for axis {tag}: minimum {min} is above maximum {max}")]
    InvertedAxisLimit { tag: Tag, min: f64, max: f64 },
}

pub type Result<T> = result::Result<T, Error>;
