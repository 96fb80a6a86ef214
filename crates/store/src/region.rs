//! Variation regions at binary (F2Dot14) precision.

use std::hash::{Hash, Hasher};

use font_types::{F2Dot14, Tag};
use fontvar_model::{Location, Support, Tent};

use crate::error::{Error, Result};

/// One axis of a region: `(start, peak, end)` in F2Dot14.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionAxis {
    pub start: F2Dot14,
    pub peak: F2Dot14,
    pub end: F2Dot14,
}

impl RegionAxis {
    pub fn new(start: f64, peak: f64, end: f64) -> Self {
        Self {
            start: F2Dot14::from_f32(start as f32),
            peak: F2Dot14::from_f32(peak as f32),
            end: F2Dot14::from_f32(end as f32),
        }
    }

    pub fn tent(&self) -> Tent {
        Tent::new(
            f64::from(self.start.to_f32()),
            f64::from(self.peak.to_f32()),
            f64::from(self.end.to_f32()),
        )
    }
}

impl Hash for RegionAxis {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for coord in [self.start, self.peak, self.end] {
            coord.to_f32().to_bits().hash(state);
        }
    }
}

/// A region in the variation space: one [`RegionAxis`] per store axis, in
/// the store's axis order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Region {
    axes: Vec<RegionAxis>,
}

impl Region {
    pub fn new(axes: Vec<RegionAxis>) -> Self {
        Self { axes }
    }

    /// Quantize a support onto `axis_tags`. Axes the support does not
    /// mention get an all-zero triple.
    pub fn from_support(support: &Support, axis_tags: &[Tag]) -> Result<Self> {
        if let Some(tag) = support.axes().find(|tag| !axis_tags.contains(tag)) {
            return Err(Error::UnknownAxis(tag));
        }
        let axes = axis_tags
            .iter()
            .map(|tag| match support.get(*tag) {
                Some(tent) => RegionAxis::new(tent.lower, tent.peak, tent.upper),
                None => RegionAxis::default(),
            })
            .collect();
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[RegionAxis] {
        &self.axes
    }

    /// The support this region describes, leaving out axes that peak at
    /// the default.
    pub fn to_support(&self, axis_tags: &[Tag]) -> Support {
        axis_tags
            .iter()
            .zip(&self.axes)
            .filter(|(_, axis)| axis.peak != F2Dot14::default())
            .map(|(tag, axis)| (*tag, axis.tent()))
            .collect()
    }

    /// Product of the per-axis falloffs at `location`.
    pub fn scalar_at(&self, location: &Location, axis_tags: &[Tag]) -> f64 {
        let mut scalar = 1.0;
        for (tag, axis) in axis_tags.iter().zip(&self.axes) {
            scalar *= axis.tent().scalar_at(location.get(*tag));
            if scalar == 0.0 {
                break;
            }
        }
        scalar
    }
}
