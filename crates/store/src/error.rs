use std::result;

use font_types::Tag;
use read_fonts::ReadError;

/// Error types for building and loading variation stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither a model nor raw supports are bound to the builder.
    #[error("no variation model or supports bound to the builder")]
    NoModel,

    /// The bound model has no master at the origin.
    #[error("variation model has no master at the default location")]
    NoDefaultMaster,

    /// Master value count differs from the model's master count.
    #[error("expected {expected} master values, got {actual}")]
    MasterCountMismatch { expected: usize, actual: usize },

    /// Delta count differs from the bound support count.
    #[error("expected {expected} deltas (one per region), got {actual}")]
    RegionCountMismatch { expected: usize, actual: usize },

    /// A support names an axis the store does not have.
    #[error("support references axis {0} which is not in the store")]
    UnknownAxis(Tag),

    /// A parsed region's axis count differs from the store's.
    #[error("region has {actual} axes, store has {expected}")]
    AxisCountMismatch { expected: usize, actual: usize },

    /// A rounded delta is not finite or does not fit in 32 bits.
    #[error("delta {value} cannot be stored as a 32-bit integer")]
    DeltaOutOfRange { value: f64 },

    /// The region list would need a 16-bit index past its limit.
    #[error("variation store cannot hold more than 65535 regions")]
    TooManyRegions,

    /// The subtable list would need a 16-bit outer index past its limit.
    #[error("variation store cannot hold more than 65535 subtables")]
    TooManySubtables,

    /// A subtable holds more rows than a 16-bit inner index can address.
    #[error("subtable {outer} has {rows} rows, at most 65535 are addressable")]
    TooManyRows { outer: usize, rows: usize },

    /// Variation model error.
    #[error("variation model error: {0}")]
    Model(#[from] fontvar_model::Error),

    /// Read error.
    #[error("failed to parse variation store: {0}")]
    Parse(#[from] ReadError),

    /// Write error.
    #[error("failed to compile variation store: {0}")]
    Write(#[from] write_fonts::error::Error),
}

pub type Result<T> = result::Result<T, Error>;
