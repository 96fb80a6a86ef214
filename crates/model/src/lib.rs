//! # Variation Model
//!
//! Interpolation between font masters placed in normalized design space.
//!
//! A [`VariationModel`] orders the masters from most general to most
//! specific, gives each one a [`Support`] region, and converts per-master
//! values into deltas that reproduce every master exactly and interpolate
//! in between.
//!
//! ## Example
//!
//! ```
//! use font_types::Tag;
//! use fontvar_model::{Location, VariationModel};
//!
//! let wght = Tag::new(b"wght");
//! let model = VariationModel::new(
//!     vec![Location::new(), Location::from([(wght, 1.0)])],
//!     vec![wght],
//! )?;
//!
//! let values = [400.0, 700.0];
//! assert_eq!(model.deltas(&values)?, vec![400.0, 300.0]);
//!
//! let semibold = Location::from([(wght, 0.5)]);
//! assert_eq!(model.interpolate_from_masters(&semibold, &values)?, 550.0);
//! # Ok::<(), fontvar_model::Error>(())
//! ```

mod cache;
mod error;
mod location;
mod model;
mod support;
mod weights;

pub use cache::ModelCache;
pub use error::{Error, Result};
pub use location::{Axis, Location, normalize_location};
pub use model::{ModelOptions, VariationModel};
pub use support::{AxisRanges, Support, Tent, support_scalar};
pub use weights::{DeltaWeights, Interpolatable};
