//! Variation model for computing deltas between masters.
//!
//! Masters are ordered from most general to most specific. Each one gets a
//! support region that only overlaps the masters before it, which makes the
//! conversion from master values to deltas a triangular solve.

use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use font_types::Tag;
use log::debug;

use crate::{
    error::{Error, Result},
    location::Location,
    support::{AxisRanges, Support, Tent},
    weights::{DeltaWeights, Interpolatable},
};

/// Options for building a [`VariationModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelOptions {
    /// Continue the outermost slopes past the masters instead of dropping
    /// to zero.
    pub extrapolate: bool,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extrapolate(mut self, extrapolate: bool) -> Self {
        self.extrapolate = extrapolate;
        self
    }
}

/// Variation model over a fixed set of master locations.
///
/// Immutable once built. Master values passed in and out use the order the
/// locations were given in; the internal model order is exposed through
/// [`VariationModel::mapping`] and [`VariationModel::reverse_mapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariationModel {
    orig_locations: Vec<Location>,
    locations: Vec<Location>,
    axis_order: Vec<Tag>,
    mapping: Vec<usize>,
    reverse_mapping: Vec<usize>,
    supports: Vec<Support>,
    weights: DeltaWeights,
    axis_ranges: Option<AxisRanges>,
    options: ModelOptions,
}

impl VariationModel {
    /// Build a model from normalized master locations.
    ///
    /// `axis_order` breaks ordering ties between equally general masters;
    /// axes not listed sort after the listed ones, by tag.
    pub fn new(locations: Vec<Location>, axis_order: Vec<Tag>) -> Result<Self> {
        Self::with_options(locations, axis_order, ModelOptions::default())
    }

    pub fn with_options(
        locations: Vec<Location>,
        axis_order: Vec<Tag>,
        options: ModelOptions,
    ) -> Result<Self> {
        for (index, location) in locations.iter().enumerate() {
            if let Some(duplicate_of) = locations[..index].iter().position(|l| l == location) {
                return Err(Error::DuplicateLocation { index, duplicate_of });
            }
        }

        let reverse_mapping = sort_locations(&locations, &axis_order);
        let mut mapping = vec![0; locations.len()];
        for (model_index, &orig_index) in reverse_mapping.iter().enumerate() {
            mapping[orig_index] = model_index;
        }

        let sorted: Vec<Location> = reverse_mapping.iter().map(|&i| locations[i].clone()).collect();
        let supports = compute_supports(&sorted);
        let weights = DeltaWeights::new(&sorted, &supports);
        let axis_ranges = options.extrapolate.then(|| AxisRanges::from_locations(&locations));

        debug!(
            "Built variation model: {} masters, {} axes{}",
            locations.len(),
            axis_order.len(),
            if options.extrapolate { ", extrapolating" } else { "" }
        );

        Ok(Self {
            orig_locations: locations,
            locations: sorted,
            axis_order,
            mapping,
            reverse_mapping,
            supports,
            weights,
            axis_ranges,
            options,
        })
    }

    /// Number of masters.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Master locations in model order.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Master locations in the order they were given.
    pub fn orig_locations(&self) -> &[Location] {
        &self.orig_locations
    }

    pub fn axis_order(&self) -> &[Tag] {
        &self.axis_order
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    /// Supports in model order. The default master, when present, is first
    /// and has an empty support.
    pub fn supports(&self) -> &[Support] {
        &self.supports
    }

    pub fn delta_weights(&self) -> &DeltaWeights {
        &self.weights
    }

    /// `mapping()[i]` is the model position of the `i`th given master.
    pub fn mapping(&self) -> &[usize] {
        &self.mapping
    }

    /// `reverse_mapping()[i]` is the given index of the master at model
    /// position `i`.
    pub fn reverse_mapping(&self) -> &[usize] {
        &self.reverse_mapping
    }

    /// Whether one of the masters sits at the default location.
    pub fn has_default_master(&self) -> bool {
        self.locations.first().is_some_and(Location::is_default)
    }

    fn check_count(&self, actual: usize) -> Result<()> {
        if actual == self.len() {
            Ok(())
        } else {
            Err(Error::Interpolation { expected: self.len(), actual })
        }
    }

    /// Convert master values (in given order) into deltas (in model order).
    pub fn deltas<T: Interpolatable>(&self, values: &[T]) -> Result<Vec<T>> {
        self.deltas_with(values, |v| v)
    }

    /// Like [`VariationModel::deltas`], rounding each delta before later
    /// deltas are derived from it.
    pub fn deltas_with<T: Interpolatable>(
        &self,
        values: &[T],
        round: impl Fn(T) -> T,
    ) -> Result<Vec<T>> {
        self.check_count(values.len())?;
        Ok(self.weights.solve(|i| values[self.reverse_mapping[i]], round))
    }

    /// Deltas together with the supports they apply to.
    pub fn deltas_and_supports<T: Interpolatable>(
        &self,
        values: &[T],
    ) -> Result<(Vec<T>, &[Support])> {
        Ok((self.deltas(values)?, &self.supports))
    }

    /// Deltas and supports for values where some masters have nothing.
    ///
    /// Missing masters are left out by building a model over the masters
    /// that are present.
    pub fn deltas_and_supports_sparse<T: Interpolatable>(
        &self,
        values: &[Option<T>],
    ) -> Result<(Vec<T>, Vec<Support>)> {
        self.check_count(values.len())?;
        if values.iter().all(Option::is_some) {
            let dense: Vec<T> = values.iter().flatten().copied().collect();
            return Ok((self.deltas(&dense)?, self.supports.clone()));
        }
        let present: Vec<bool> = values.iter().map(Option::is_some).collect();
        let model = self.sub_model(&present)?;
        let dense: Vec<T> = values.iter().flatten().copied().collect();
        Ok((model.deltas(&dense)?, model.supports))
    }

    /// A model over the masters flagged in `present` (given order).
    pub fn sub_model(&self, present: &[bool]) -> Result<Self> {
        self.check_count(present.len())?;
        let locations = self
            .orig_locations
            .iter()
            .zip(present)
            .filter(|(_, keep)| **keep)
            .map(|(location, _)| location.clone())
            .collect();
        Self::with_options(locations, self.axis_order.clone(), self.options)
    }

    /// The scalar of every support at `location`, in model order.
    pub fn scalars(&self, location: &Location) -> Vec<f64> {
        self.supports
            .iter()
            .map(|support| match &self.axis_ranges {
                Some(ranges) => support.extrapolated_scalar_at(location, ranges),
                None => support.scalar_at(location),
            })
            .collect()
    }

    /// Per-master weights at `location`, in given order: the interpolated
    /// value is `Σ weight[i] * value[i]`.
    pub fn master_scalars(&self, location: &Location) -> Vec<f64> {
        let mut scalars = self.scalars(location);
        self.weights.back_substitute(&mut scalars);
        self.mapping.iter().map(|&i| scalars[i]).collect()
    }

    /// Interpolate at `location` from deltas in model order.
    pub fn interpolate_from_deltas<T: Interpolatable>(
        &self,
        location: &Location,
        deltas: &[T],
    ) -> Result<T> {
        self.check_count(deltas.len())?;
        Ok(self
            .scalars(location)
            .into_iter()
            .zip(deltas)
            .filter(|(scalar, _)| *scalar != 0.0)
            .fold(T::default(), |acc, (scalar, delta)| acc + *delta * scalar))
    }

    /// Interpolate at `location` from master values in given order.
    pub fn interpolate_from_masters<T: Interpolatable>(
        &self,
        location: &Location,
        values: &[T],
    ) -> Result<T> {
        let deltas = self.deltas(values)?;
        self.interpolate_from_deltas(location, &deltas)
    }
}

/// Sort key ranking masters from general to specific.
struct OrderKey {
    rank: usize,
    on_point: Reverse<usize>,
    axis_ranks: Vec<usize>,
    axes: Vec<Tag>,
    signs: Vec<u8>,
    magnitudes: Vec<f64>,
}

impl OrderKey {
    fn new(
        location: &Location,
        axis_order: &[Tag],
        axis_points: &BTreeMap<Tag, Vec<f64>>,
    ) -> Self {
        let on_point = location
            .iter()
            .filter(|(tag, value)| axis_points.get(tag).is_some_and(|points| points.contains(value)))
            .count();
        // Declared axes first in declaration order, the rest by tag.
        let mut axes: Vec<Tag> =
            axis_order.iter().copied().filter(|tag| location.contains(*tag)).collect();
        axes.extend(location.axes().filter(|tag| !axis_order.contains(tag)));
        let axis_ranks = axes
            .iter()
            .map(|tag| axis_order.iter().position(|t| t == tag).unwrap_or(0x10000))
            .collect();
        let signs = axes.iter().map(|tag| if location.get(*tag) > 0.0 { 0 } else { 1 }).collect();
        let magnitudes = axes.iter().map(|tag| location.get(*tag).abs()).collect();
        Self {
            rank: location.len(),
            on_point: Reverse(on_point),
            axis_ranks,
            axes,
            signs,
            magnitudes,
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.on_point.cmp(&other.on_point))
            .then_with(|| self.axis_ranks.cmp(&other.axis_ranks))
            .then_with(|| self.axes.cmp(&other.axes))
            .then_with(|| self.signs.cmp(&other.signs))
            .then_with(|| {
                let by_value = self
                    .magnitudes
                    .iter()
                    .zip(&other.magnitudes)
                    .map(|(a, b)| a.total_cmp(b))
                    .find(|ordering| ordering.is_ne());
                by_value.unwrap_or_else(|| self.magnitudes.len().cmp(&other.magnitudes.len()))
            })
    }
}

/// Model order as a list of indices into `locations`.
fn sort_locations(locations: &[Location], axis_order: &[Tag]) -> Vec<usize> {
    // Coordinates that some single-axis master sits on, plus the default.
    let mut axis_points: BTreeMap<Tag, Vec<f64>> = BTreeMap::new();
    for location in locations.iter().filter(|l| l.len() == 1) {
        for (tag, value) in location.iter() {
            axis_points.entry(tag).or_insert_with(|| vec![0.0]).push(value);
        }
    }

    let keys: Vec<OrderKey> = locations
        .iter()
        .map(|location| OrderKey::new(location, axis_order, &axis_points))
        .collect();
    let mut order: Vec<usize> = (0..locations.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    order
}

/// Initial regions: from the default to each coordinate, and on to the
/// farthest master on that side.
fn locations_to_regions(locations: &[Location]) -> Vec<Support> {
    let mut extremes: BTreeMap<Tag, (f64, f64)> = BTreeMap::new();
    for location in locations {
        for (tag, value) in location.iter() {
            let (min, max) = extremes.entry(tag).or_insert((value, value));
            *min = min.min(value);
            *max = max.max(value);
        }
    }

    locations
        .iter()
        .map(|location| {
            location
                .iter()
                .map(|(tag, value)| {
                    let (min, max) = extremes[&tag];
                    let tent =
                        if value > 0.0 { Tent::new(0.0, value, max) } else { Tent::new(min, value, 0.0) };
                    (tag, tent)
                })
                .collect()
        })
        .collect()
}

/// Shrink each region so that it does not reach past the peak of any
/// earlier master on the same set of axes.
fn compute_supports(locations: &[Location]) -> Vec<Support> {
    let mut regions = locations_to_regions(locations);
    for i in 0..regions.len() {
        let (previous, rest) = regions.split_at_mut(i);
        let region = &mut rest[0];
        for prev_region in previous.iter() {
            if !prev_region.same_axes(region) {
                continue;
            }
            // The earlier peak must lie on or inside this region on every axis.
            let relevant = region.iter().all(|(tag, tent)| {
                prev_region.get(tag).is_some_and(|prev| {
                    prev.peak == tent.peak || (tent.lower < prev.peak && prev.peak < tent.upper)
                })
            });
            if !relevant {
                continue;
            }

            // Cut along the axes where the cut keeps the largest share.
            let mut best_ratio = -1.0;
            let mut best_axes: Vec<(Tag, Tent)> = Vec::new();
            for (tag, prev) in prev_region.iter() {
                let Some(tent) = region.get(tag) else { continue };
                let val = prev.peak;
                let (ratio, cut) = if val < tent.peak {
                    ((val - tent.peak) / (tent.lower - tent.peak), Tent { lower: val, ..tent })
                } else if tent.peak < val {
                    ((val - tent.peak) / (tent.upper - tent.peak), Tent { upper: val, ..tent })
                } else {
                    continue;
                };
                if ratio > best_ratio {
                    best_ratio = ratio;
                    best_axes.clear();
                }
                if ratio == best_ratio {
                    best_axes.push((tag, cut));
                }
            }
            for (tag, tent) in best_axes {
                region.insert(tag, tent);
            }
        }
    }
    regions
}
