//! Tents, supports and the scalar support function.

use std::collections::BTreeMap;

use font_types::Tag;

use crate::location::Location;

/// A piecewise-linear falloff on one axis: 1 at `peak`, 0 at and beyond
/// `lower` and `upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tent {
    pub lower: f64,
    pub peak: f64,
    pub upper: f64,
}

impl Tent {
    pub const fn new(lower: f64, peak: f64, upper: f64) -> Self {
        Self { lower, peak, upper }
    }

    /// A tent that does not vary along its axis: peak at the default,
    /// out of order, or straddling the default.
    fn is_inert(&self) -> bool {
        self.peak == 0.0
            || self.lower > self.peak
            || self.peak > self.upper
            || (self.lower < 0.0 && self.upper > 0.0)
    }

    /// Evaluate the falloff at coordinate `v`.
    pub fn scalar_at(&self, v: f64) -> f64 {
        if self.is_inert() || v == self.peak {
            return 1.0;
        }
        if v <= self.lower || self.upper <= v {
            return 0.0;
        }
        if v < self.peak {
            (v - self.lower) / (self.peak - self.lower)
        } else {
            (v - self.upper) / (self.peak - self.upper)
        }
    }

    /// Evaluate the falloff at `v`, continuing the outermost slope past the
    /// `(min, max)` range covered by the masters.
    pub fn extrapolated_scalar_at(&self, v: f64, (axis_min, axis_max): (f64, f64)) -> f64 {
        if self.is_inert() || v == self.peak {
            return 1.0;
        }
        let Tent { lower, peak, upper } = *self;
        if v < axis_min && lower <= axis_min {
            if peak <= axis_min && peak < upper {
                return (v - upper) / (peak - upper);
            } else if axis_min < peak {
                return (v - lower) / (peak - lower);
            }
        } else if axis_max < v && upper >= axis_max {
            if peak >= axis_max && peak > lower {
                return (v - lower) / (peak - lower);
            } else if peak < axis_max {
                return (v - upper) / (peak - upper);
            }
        }
        self.scalar_at(v)
    }

    /// The same tent mirrored around the default.
    pub fn reverse_negate(&self) -> Self {
        Self::new(-self.upper, -self.peak, -self.lower)
    }
}

/// The region of design space a master influences: one tent per axis.
///
/// Axes without a tent do not attenuate the master.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Support(BTreeMap<Tag, Tent>);

impl Support {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: Tag) -> Option<Tent> {
        self.0.get(&tag).copied()
    }

    pub fn insert(&mut self, tag: Tag, tent: Tent) {
        self.0.insert(tag, tent);
    }

    pub fn remove(&mut self, tag: Tag) -> Option<Tent> {
        self.0.remove(&tag)
    }

    pub fn with(mut self, tag: Tag, tent: Tent) -> Self {
        self.insert(tag, tent);
        self
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tag, Tent)> + '_ {
        self.0.iter().map(|(tag, tent)| (*tag, *tent))
    }

    pub fn axes(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn same_axes(&self, other: &Support) -> bool {
        self.0.len() == other.0.len() && self.0.keys().eq(other.0.keys())
    }

    /// Product of the per-axis falloffs at `location`.
    pub fn scalar_at(&self, location: &Location) -> f64 {
        let mut scalar = 1.0;
        for (tag, tent) in self.iter() {
            scalar *= tent.scalar_at(location.get(tag));
            if scalar == 0.0 {
                break;
            }
        }
        scalar
    }

    /// Like [`Support::scalar_at`], extrapolating on axes listed in `ranges`.
    pub fn extrapolated_scalar_at(&self, location: &Location, ranges: &AxisRanges) -> f64 {
        let mut scalar = 1.0;
        for (tag, tent) in self.iter() {
            let v = location.get(tag);
            scalar *= match ranges.get(tag) {
                Some(range) => tent.extrapolated_scalar_at(v, range),
                None => tent.scalar_at(v),
            };
            if scalar == 0.0 {
                break;
            }
        }
        scalar
    }
}

impl FromIterator<(Tag, Tent)> for Support {
    fn from_iter<I: IntoIterator<Item = (Tag, Tent)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(Tag, Tent); N]> for Support {
    fn from(tents: [(Tag, Tent); N]) -> Self {
        tents.into_iter().collect()
    }
}

/// Evaluate how much `support` contributes at `location`.
pub fn support_scalar(location: &Location, support: &Support) -> f64 {
    support.scalar_at(location)
}

/// Per-axis `(min, max)` coordinates spanned by a set of master locations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisRanges(BTreeMap<Tag, (f64, f64)>);

impl AxisRanges {
    /// Ranges over every axis used by any location; locations that do not
    /// set an axis count as 0 on it.
    pub fn from_locations<'a>(locations: impl IntoIterator<Item = &'a Location> + Clone) -> Self {
        let mut ranges: BTreeMap<Tag, (f64, f64)> = BTreeMap::new();
        for location in locations.clone() {
            for tag in location.axes() {
                ranges.entry(tag).or_insert((0.0, 0.0));
            }
        }
        for location in locations {
            for (tag, (min, max)) in ranges.iter_mut() {
                let value = location.get(*tag);
                *min = min.min(value);
                *max = max.max(value);
            }
        }
        Self(ranges)
    }

    pub fn get(&self, tag: Tag) -> Option<(f64, f64)> {
        self.0.get(&tag).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGHT: Tag = Tag::new(b"wght");
    const WDTH: Tag = Tag::new(b"wdth");

    fn wght(v: f64) -> Location {
        Location::from([(WGHT, v)])
    }

    #[test]
    fn scalar_of_empty_support_is_one() {
        assert_eq!(support_scalar(&Location::new(), &Support::new()), 1.0);
        assert_eq!(support_scalar(&wght(0.3), &Support::new()), 1.0);
    }

    #[test]
    fn scalar_on_slopes() {
        let support = Support::from([(WGHT, Tent::new(0.0, 2.0, 4.0))]);
        assert_eq!(support_scalar(&wght(2.0), &support), 1.0);
        assert_eq!(support_scalar(&wght(1.0), &support), 0.5);
        assert_eq!(support_scalar(&wght(2.5), &support), 0.75);
        assert_eq!(support_scalar(&wght(4.0), &support), 0.0);
    }

    #[test]
    fn scalar_at_default_is_zero() {
        let support = Support::from([(WGHT, Tent::new(0.0, 1.0, 1.0))]);
        assert_eq!(support_scalar(&Location::new(), &support), 0.0);
    }

    #[test]
    fn opposite_sign_contributes_nothing() {
        let support = Support::from([(WGHT, Tent::new(0.0, 1.0, 1.0))]);
        assert_eq!(support_scalar(&wght(-0.5), &support), 0.0);
    }

    #[test]
    fn peak_at_default_is_inert() {
        let support = Support::from([(WGHT, Tent::new(-1.0, 0.0, 1.0))]);
        assert_eq!(support_scalar(&wght(0.7), &support), 1.0);
    }

    #[test]
    fn straddling_tent_is_inert() {
        let support = Support::from([(WGHT, Tent::new(-0.5, 0.5, 1.0))]);
        assert_eq!(support_scalar(&wght(-0.2), &support), 1.0);
    }

    #[test]
    fn scalar_is_product_across_axes() {
        let support = Support::from([
            (WGHT, Tent::new(0.0, 1.0, 1.0)),
            (WDTH, Tent::new(0.0, 1.0, 1.0)),
        ]);
        let location = Location::from([(WGHT, 0.5), (WDTH, 0.5)]);
        assert_eq!(support_scalar(&location, &support), 0.25);
    }

    #[test]
    fn extrapolate_past_max() {
        let tent = Tent::new(0.0, 1.0, 1.0);
        assert_eq!(tent.scalar_at(1.5), 0.0);
        assert_eq!(tent.extrapolated_scalar_at(1.5, (0.0, 1.0)), 1.5);
    }

    #[test]
    fn extrapolate_past_min() {
        let tent = Tent::new(-1.0, -1.0, 0.0);
        assert_eq!(tent.extrapolated_scalar_at(-2.0, (-1.0, 0.0)), 2.0);

        let inner = Tent::new(-1.0, -0.5, 0.0);
        assert_eq!(inner.scalar_at(-2.0), 0.0);
        assert_eq!(inner.extrapolated_scalar_at(-2.0, (-1.0, 0.0)), -2.0);
    }

    #[test]
    fn axis_ranges_include_default() {
        let locations = [wght(0.5), wght(1.0), Location::from([(WDTH, -1.0)])];
        let ranges = AxisRanges::from_locations(&locations);
        assert_eq!(ranges.get(WGHT), Some((0.0, 1.0)));
        assert_eq!(ranges.get(WDTH), Some((-1.0, 0.0)));
        assert_eq!(ranges.get(Tag::new(b"slnt")), None);
    }
}
