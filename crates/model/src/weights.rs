//! The triangular system relating master values to deltas.

use std::ops::{Add, Mul, Sub};

use crate::{location::Location, support::Support};

/// A value that can be interpolated between masters: plain numbers, or
/// vectors such as `kurbo::Vec2` for point deltas.
pub trait Interpolatable:
    Copy + Default + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
}

impl<T> Interpolatable for T where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>
{
}

/// Sparse lower-triangular weights: row `i` lists `(j, w)` for every earlier
/// master `j` whose support is non-zero at master `i`'s location.
///
/// The diagonal is implicitly 1, so
/// `value[i] = delta[i] + Σ w * delta[j]` over the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaWeights {
    rows: Vec<Vec<(usize, f64)>>,
}

impl DeltaWeights {
    /// Evaluate every support at every later location.
    ///
    /// Both slices are in model order.
    pub fn new(locations: &[Location], supports: &[Support]) -> Self {
        let rows = locations
            .iter()
            .enumerate()
            .map(|(i, location)| {
                supports[..i]
                    .iter()
                    .enumerate()
                    .filter_map(|(j, support)| {
                        let scalar = support.scalar_at(location);
                        (scalar != 0.0).then_some((j, scalar))
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Number of masters.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The non-zero weights of row `i`, by ascending column.
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Forward substitution. `value(i)` yields the master value at model
    /// position `i`; each delta is passed through `round` before later rows
    /// use it, so rounding error does not accumulate.
    pub fn solve<T: Interpolatable>(
        &self,
        value: impl Fn(usize) -> T,
        round: impl Fn(T) -> T,
    ) -> Vec<T> {
        let mut deltas: Vec<T> = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let mut delta = value(i);
            for &(j, weight) in row {
                delta = if weight == 1.0 {
                    delta - deltas[j]
                } else {
                    delta - deltas[j] * weight
                };
            }
            deltas.push(round(delta));
        }
        deltas
    }

    /// Fold support scalars back onto the masters they came from, turning
    /// per-delta weights into per-master weights.
    pub fn back_substitute(&self, scalars: &mut [f64]) {
        for (i, row) in self.rows.iter().enumerate().rev() {
            let scalar = scalars[i];
            for &(j, weight) in row {
                scalars[j] -= scalar * weight;
            }
        }
    }
}
