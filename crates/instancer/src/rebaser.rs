//! Memoized rebasing, and limiting whole supports.

use std::collections::HashMap;

use font_types::Tag;
use fontvar_model::{Support, Tent};
use log::trace;

use crate::{
    limit::AxisLimit,
    solver::{Contribution, rebase_tent},
};

type CacheKey = ([u64; 3], [u64; 5]);

/// Rebases tents, remembering results per `(tent, limit)` pair.
///
/// Instancing applies the same few limits to many tents, so most calls
/// are cache hits.
#[derive(Debug, Default)]
pub struct Rebaser {
    cache: HashMap<CacheKey, Vec<Contribution>>,
}

impl Rebaser {
    pub fn new() -> Self {
        Self::default()
    }

    /// [`rebase_tent`], memoized.
    pub fn rebase(&mut self, tent: Tent, limit: &AxisLimit) -> &[Contribution] {
        let key = ([tent.lower, tent.peak, tent.upper].map(f64::to_bits), limit.key());
        self.cache.entry(key).or_insert_with(|| {
            let terms = rebase_tent(tent, limit);
            trace!("Rebased {tent:?} onto {limit:?}: {terms:?}");
            terms
        })
    }

    /// Number of distinct `(tent, limit)` pairs seen.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Apply `limit` on axis `tag` to a multi-axis support.
    ///
    /// Returns the scaled supports that replace `support`. A support that
    /// does not vary along `tag` passes through unchanged, minus any
    /// zero-peak tent on that axis. A support whose tent on `tag` is
    /// ill-formed is dropped. Constant terms lose the axis altogether.
    pub fn limit_support(&mut self, support: &Support, tag: Tag, limit: &AxisLimit) -> Vec<(f64, Support)> {
        let Some(tent) = support.get(tag) else {
            return vec![(1.0, support.clone())];
        };
        if tent.peak == 0.0 {
            let mut support = support.clone();
            support.remove(tag);
            return vec![(1.0, support)];
        }
        if !(tent.lower <= tent.peak && tent.peak <= tent.upper) || (tent.lower < 0.0 && tent.upper > 0.0) {
            trace!("Dropping ill-formed tent {tent:?} on {tag}");
            return Vec::new();
        }

        self.rebase(tent, limit)
            .iter()
            .map(|term| {
                let mut support = support.clone();
                match term.tent() {
                    Some(tent) if tent.peak != 0.0 => support.insert(tag, tent),
                    _ => {
                        support.remove(tag);
                    }
                }
                (term.scalar(), support)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGHT: Tag = Tag::new(b"wght");
    const WDTH: Tag = Tag::new(b"wdth");

    #[test]
    fn results_are_cached() {
        let mut rebaser = Rebaser::new();
        let limit = AxisLimit::new(-1.0, 0.0, 0.5);
        let first = rebaser.rebase(Tent::new(0.0, 1.0, 1.0), &limit).to_vec();
        let second = rebaser.rebase(Tent::new(0.0, 1.0, 1.0), &limit).to_vec();
        assert_eq!(first, second);
        assert_eq!(rebaser.len(), 1);

        rebaser.rebase(Tent::new(0.0, 1.0, 1.0), &limit.with_distances(2.0, 1.0));
        assert_eq!(rebaser.len(), 2);
    }

    #[test]
    fn other_axes_pass_through() {
        let mut rebaser = Rebaser::new();
        let support = Support::from([(WDTH, Tent::new(0.0, 1.0, 1.0))]);
        let limited = rebaser.limit_support(&support, WGHT, &AxisLimit::new(-1.0, 0.0, 0.5));
        assert_eq!(limited, vec![(1.0, support)]);
        assert!(rebaser.is_empty());
    }

    #[test]
    fn zero_peak_axis_is_removed() {
        let mut rebaser = Rebaser::new();
        let support = Support::from([(WGHT, Tent::new(-1.0, 0.0, 1.0)), (WDTH, Tent::new(0.0, 1.0, 1.0))]);
        let limited = rebaser.limit_support(&support, WGHT, &AxisLimit::new(-1.0, 0.0, 0.5));
        assert_eq!(limited, vec![(1.0, Support::from([(WDTH, Tent::new(0.0, 1.0, 1.0))]))]);
    }

    #[test]
    fn ill_formed_tent_is_dropped() {
        let mut rebaser = Rebaser::new();
        let support = Support::from([(WGHT, Tent::new(-0.5, 0.5, 1.0))]);
        assert!(rebaser.limit_support(&support, WGHT, &AxisLimit::new(-1.0, 0.0, 0.5)).is_empty());
    }

    #[test]
    fn limited_axis_is_rewritten() {
        let mut rebaser = Rebaser::new();
        let support = Support::from([(WGHT, Tent::new(0.0, 1.0, 1.0)), (WDTH, Tent::new(0.0, 1.0, 1.0))]);
        let limited = rebaser.limit_support(&support, WGHT, &AxisLimit::new(-1.0, 0.0, 0.5));
        assert_eq!(
            limited,
            vec![(0.5, Support::from([(WGHT, Tent::new(0.0, 1.0, 1.0)), (WDTH, Tent::new(0.0, 1.0, 1.0))]))]
        );
    }

    #[test]
    fn pinned_axis_leaves_a_constant() {
        let mut rebaser = Rebaser::new();
        let support = Support::from([(WGHT, Tent::new(0.0, 1.0, 1.0)), (WDTH, Tent::new(0.0, 1.0, 1.0))]);
        let limited = rebaser.limit_support(&support, WGHT, &AxisLimit::pinned(0.5));
        assert_eq!(limited, vec![(0.5, Support::from([(WDTH, Tent::new(0.0, 1.0, 1.0))]))]);
    }
}
