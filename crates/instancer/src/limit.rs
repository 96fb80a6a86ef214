//! The new range of a limited axis.

use fontvar_model::{Axis, Tent};

use crate::error::{Error, Result};

/// New `(minimum, default, maximum)` of one axis, in the axis' current
/// normalized coordinates.
///
/// The two distances are the user-space lengths of the axis below and
/// above its current default. They only matter when the new range spans
/// zero with the new default off zero, where the two halves of the axis
/// are stretched differently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimit {
    pub minimum: f64,
    pub default: f64,
    pub maximum: f64,
    pub distance_negative: f64,
    pub distance_positive: f64,
}

impl AxisLimit {
    pub fn new(minimum: f64, default: f64, maximum: f64) -> Self {
        Self { minimum, default, maximum, distance_negative: 1.0, distance_positive: 1.0 }
    }

    /// Limit the axis to a single value.
    pub fn pinned(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn with_distances(mut self, negative: f64, positive: f64) -> Self {
        self.distance_negative = negative;
        self.distance_positive = positive;
        self
    }

    pub fn is_pinned(&self) -> bool {
        self.minimum == self.maximum
    }

    /// Normalize a user-space range against `axis`.
    ///
    /// A missing `default` is the axis default clamped into the range.
    pub fn from_user(axis: &Axis, minimum: f64, default: Option<f64>, maximum: f64) -> Result<Self> {
        if minimum > maximum {
            return Err(Error::InvertedAxisLimit { tag: axis.tag, min: minimum, max: maximum });
        }
        for value in [minimum, maximum] {
            if value < axis.minimum || value > axis.maximum {
                return Err(Error::InvalidAxisLimit {
                    tag: axis.tag,
                    value,
                    min: axis.minimum,
                    max: axis.maximum,
                });
            }
        }
        let default = match default {
            Some(value) if value < minimum || value > maximum => {
                return Err(Error::InvalidAxisLimit { tag: axis.tag, value, min: minimum, max: maximum });
            }
            Some(value) => value,
            None => axis.default.clamp(minimum, maximum),
        };

        Ok(Self::new(axis.normalize(minimum), axis.normalize(default), axis.normalize(maximum))
            .with_distances(axis.default - axis.minimum, axis.maximum - axis.default))
    }

    /// The limit mirrored around zero.
    pub fn reverse_negate(&self) -> Self {
        Self {
            minimum: -self.maximum,
            default: -self.default,
            maximum: -self.minimum,
            distance_negative: self.distance_positive,
            distance_positive: self.distance_negative,
        }
    }

    /// Map `v` from the current normalized coordinates to the limited
    /// axis' own, where the new default is 0 and the new minimum and
    /// maximum are -1 and 1. Values outside the range extrapolate.
    pub fn renormalize_value(&self, v: f64) -> f64 {
        let Self { minimum, default, maximum, distance_negative, distance_positive } = *self;
        if v == default {
            return 0.0;
        }
        if default < 0.0 {
            return -self.reverse_negate().renormalize_value(-v);
        }
        if v > default {
            return (v - default) / (maximum - default);
        }
        if minimum >= 0.0 {
            return (v - default) / (default - minimum);
        }

        // the range crosses zero below the default
        let total = distance_negative * -minimum + distance_positive * default;
        let distance = if v >= 0.0 {
            (default - v) * distance_positive
        } else {
            -v * distance_negative + distance_positive * default
        };
        -distance / total
    }

    pub fn renormalize_tent(&self, tent: Tent) -> Tent {
        Tent::new(
            self.renormalize_value(tent.lower),
            self.renormalize_value(tent.peak),
            self.renormalize_value(tent.upper),
        )
    }

    pub(crate) fn key(&self) -> [u64; 5] {
        [self.minimum, self.default, self.maximum, self.distance_negative, self.distance_positive]
            .map(f64::to_bits)
    }
}
