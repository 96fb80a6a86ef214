//! Re-expressing one tent under a limited axis range.
//!
//! A tent that is cut by the new range, or whose value at the new default
//! is not zero, cannot stay a single tent: it becomes a constant gain plus
//! up to four tents whose sum matches the original falloff everywhere in
//! the new range. The pieces are solved in the old coordinates and mapped
//! into the limited axis' coordinates last.

use fontvar_model::Tent;

use crate::limit::AxisLimit;

/// One F2Dot14 step.
pub const EPSILON: f64 = 1.0 / (1 << 14) as f64;

/// Largest value representable as F2Dot14.
pub const MAX_F2DOT14: f64 = 0x7FFF as f64 / (1 << 14) as f64;

/// A term of a rebased tent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// Applies unchanged everywhere on the limited axis.
    Constant(f64),
    /// Scaled by the tent's falloff.
    Tent(f64, Tent),
}

impl Contribution {
    pub fn scalar(&self) -> f64 {
        match *self {
            Contribution::Constant(scalar) | Contribution::Tent(scalar, _) => scalar,
        }
    }

    pub fn tent(&self) -> Option<Tent> {
        match *self {
            Contribution::Constant(_) => None,
            Contribution::Tent(_, tent) => Some(tent),
        }
    }

    /// Value of this term at `v` on the limited axis.
    pub fn evaluate(&self, v: f64) -> f64 {
        match *self {
            Contribution::Constant(scalar) => scalar,
            Contribution::Tent(scalar, tent) => scalar * tent.scalar_at(v),
        }
    }

    fn scaled(self, by: f64) -> Self {
        match self {
            Contribution::Constant(scalar) => Contribution::Constant(scalar * by),
            Contribution::Tent(scalar, tent) => Contribution::Tent(scalar * by, tent),
        }
    }

    fn map_tent(self, f: impl FnOnce(Tent) -> Tent) -> Self {
        match self {
            Contribution::Constant(_) => self,
            Contribution::Tent(scalar, tent) => Contribution::Tent(scalar, f(tent)),
        }
    }
}

/// Rebase `tent` onto the range `limit`.
///
/// The result is in the limited axis' coordinates: evaluating every term
/// at `limit.renormalize_value(x)` and summing gives `tent.scalar_at(x)`
/// for every `x` in `[limit.minimum, limit.maximum]`. Terms with a zero
/// scalar are left out, so a tent that vanishes on the new range yields
/// nothing.
///
/// # Panics
///
/// If `limit` is not ordered within `[-1, 1]`, if `tent` is not ordered
/// within `[-2, 2]`, or if the tent peaks at zero.
pub fn rebase_tent(tent: Tent, limit: &AxisLimit) -> Vec<Contribution> {
    let AxisLimit { minimum, default, maximum, .. } = *limit;
    assert!(
        -1.0 <= minimum && minimum <= default && default <= maximum && maximum <= 1.0,
        "axis limit out of order: {limit:?}"
    );
    let Tent { lower, peak, upper } = tent;
    assert!(
        -2.0 <= lower && lower <= peak && peak <= upper && upper <= 2.0,
        "tent out of order: {tent:?}"
    );
    assert!(peak != 0.0, "tent peaks at the default: {tent:?}");

    solve(tent, limit, false)
        .into_iter()
        .filter(|term| term.scalar() != 0.0)
        .map(|term| term.map_tent(|tent| limit.renormalize_tent(tent)))
        .collect()
}

fn solve(tent: Tent, limit: &AxisLimit, negative: bool) -> Vec<Contribution> {
    let AxisLimit { minimum: axis_min, default: axis_def, maximum: axis_max, .. } = *limit;
    let Tent { lower, peak, mut upper } = tent;

    // Mirror so that the default is at or below the peak.
    if axis_def > peak {
        return solve(tent.reverse_negate(), &limit.reverse_negate(), !negative)
            .into_iter()
            .map(|term| term.map_tent(|tent| tent.reverse_negate()))
            .collect();
    }

    // The tent lies wholly beyond the new maximum.
    if axis_max <= lower && axis_max < peak {
        return Vec::new();
    }

    // The peak is cut off: pull it in to the new maximum and scale by what
    // is left of the tent there.
    if axis_max < peak {
        let mult = tent.scalar_at(axis_max);
        return solve(Tent::new(lower, axis_max, axis_max), limit, negative)
            .into_iter()
            .map(|term| term.scaled(mult))
            .collect();
    }

    // lower <= axis_def <= peak <= axis_max

    let gain = tent.scalar_at(axis_def);
    let mut out = vec![Contribution::Constant(gain)];

    // Positive side.
    let out_gain = tent.scalar_at(axis_max);
    if gain >= out_gain {
        // The falling slope crosses `gain` before the new maximum.
        let crossing = peak + (1.0 - gain) * (upper - peak);
        out.push(Contribution::Tent(1.0 - gain, Tent::new(lower.max(axis_def), peak, crossing)));

        if upper >= axis_max {
            out.push(Contribution::Tent(out_gain - gain, Tent::new(crossing, axis_max, axis_max)));
        } else {
            // Past `upper` the gain has to be cancelled out up to the new
            // maximum and beyond.
            if upper == axis_def {
                upper += EPSILON;
            }
            out.push(Contribution::Tent(-gain, Tent::new(crossing, upper, axis_max)));
            out.push(Contribution::Tent(-gain, Tent::new(upper, axis_max, axis_max)));
        }
    } else {
        if axis_max == peak {
            upper = peak;
        }

        let new_upper = peak + (1.0 - gain) * (upper - peak);
        if new_upper <= axis_def + (axis_max - axis_def) * 2.0 {
            // Fits in the doubled range: one tent with a stretched upper.
            let mut upper = new_upper;
            let ceiling = axis_def + (axis_max - axis_def) * MAX_F2DOT14;
            if !negative && ceiling < upper {
                upper = ceiling;
            }
            out.push(Contribution::Tent(1.0 - gain, Tent::new(lower.max(axis_def), peak, upper)));
        } else {
            // Two tents: up to the peak, then falling to `out_gain` at the
            // new maximum.
            out.push(Contribution::Tent(1.0 - gain, Tent::new(lower.max(axis_def), peak, axis_max)));
            if peak < axis_max {
                out.push(Contribution::Tent(out_gain - gain, Tent::new(peak, axis_max, axis_max)));
            }
        }
    }

    // Negative side.
    if lower <= axis_min {
        let scalar = tent.scalar_at(axis_min) - gain;
        out.push(Contribution::Tent(scalar, Tent::new(axis_min, axis_min, axis_def)));
    } else {
        let lower = if lower == axis_def { lower - EPSILON } else { lower };
        out.push(Contribution::Tent(-gain, Tent::new(axis_min, lower, axis_def)));
        out.push(Contribution::Tent(-gain, Tent::new(axis_min, axis_min, lower)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants() {
        assert_eq!(EPSILON, 0.00006103515625);
        assert_eq!(MAX_F2DOT14, 1.99993896484375);
    }

    #[test]
    fn terms() {
        let tent = Contribution::Tent(0.5, Tent::new(0.0, 1.0, 1.0));
        assert_eq!(tent.scalar(), 0.5);
        assert_eq!(tent.evaluate(0.5), 0.25);
        assert_eq!(tent.scaled(2.0).evaluate(1.0), 1.0);

        let constant = Contribution::Constant(0.3);
        assert_eq!(constant.tent(), None);
        assert_eq!(constant.evaluate(-1.0), 0.3);
    }

    #[test]
    fn unlimited_axis_keeps_the_tent() {
        let limit = AxisLimit::new(-1.0, 0.0, 1.0);
        let terms = rebase_tent(Tent::new(0.0, 1.0, 1.0), &limit);
        assert_eq!(terms, vec![Contribution::Tent(1.0, Tent::new(0.0, 1.0, 1.0))]);
    }

    #[test]
    #[should_panic(expected = "peaks at the default")]
    fn zero_peak_is_rejected() {
        rebase_tent(Tent::new(0.0, 0.0, 1.0), &AxisLimit::new(-1.0, 0.0, 1.0));
    }

    #[test]
    #[should_panic(expected = "axis limit out of order")]
    fn unordered_limit_is_rejected() {
        rebase_tent(Tent::new(0.0, 1.0, 1.0), &AxisLimit::new(0.5, 0.0, 1.0));
    }
}
