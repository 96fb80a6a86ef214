//! # Axis Limiting
//!
//! Re-express variation tents when an axis is pinned or narrowed.
//!
//! [`rebase_tent`] solves a single tent against a new axis range,
//! [`Rebaser`] memoizes that and applies it to multi-axis supports, and
//! [`AxisLimit`] describes the new range and maps coordinates into it.
//!
//! ## Example
//!
//! ```
//! use fontvar_instancer::{AxisLimit, Contribution, rebase_tent};
//! use fontvar_model::Tent;
//!
//! // Cut the axis' positive half at 0.5.
//! let limit = AxisLimit::new(-1.0, 0.0, 0.5);
//! let terms = rebase_tent(Tent::new(0.0, 1.0, 1.0), &limit);
//! assert_eq!(terms, vec![Contribution::Tent(0.5, Tent::new(0.0, 1.0, 1.0))]);
//! ```

mod error;
mod limit;
mod rebaser;
mod solver;

pub use error::{Error, Result};
pub use limit::AxisLimit;
pub use rebaser::Rebaser;
pub use solver::{Contribution, EPSILON, MAX_F2DOT14, rebase_tent};
