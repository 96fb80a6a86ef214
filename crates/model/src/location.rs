//! Axes and locations in normalized design space.

use std::collections::BTreeMap;

use font_types::Tag;

/// A variation axis in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    /// Four-character axis tag (e.g. `wght`, `wdth`)
    pub tag: Tag,
    /// Minimum value on this axis
    pub minimum: f64,
    /// Default value on this axis
    pub default: f64,
    /// Maximum value on this axis
    pub maximum: f64,
}

impl Axis {
    pub fn new(tag: Tag, minimum: f64, default: f64, maximum: f64) -> Self {
        Self { tag, minimum, default, maximum }
    }

    /// Normalize a user-space value to the range [-1, 1].
    ///
    /// The value is clamped to the axis range first. Values below the
    /// default normalize to [-1, 0], values above it to [0, 1].
    pub fn normalize(&self, value: f64) -> f64 {
        let value = value.max(self.minimum).min(self.maximum);
        if value < self.default {
            if self.default == self.minimum {
                0.0
            } else {
                -((self.default - value) / (self.default - self.minimum))
            }
        } else if value > self.default {
            if self.default == self.maximum {
                0.0
            } else {
                (value - self.default) / (self.maximum - self.default)
            }
        } else {
            0.0
        }
    }
}

/// A point in normalized design space.
///
/// Axes that are absent sit at their default (0). Zero coordinates are never
/// stored, so two locations compare equal exactly when they name the same
/// point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location(BTreeMap<Tag, f64>);

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// The coordinate on `tag`, 0 when the axis is not set.
    pub fn get(&self, tag: Tag) -> f64 {
        self.0.get(&tag).copied().unwrap_or(0.0)
    }

    /// Set the coordinate on `tag`. Setting 0 removes the axis.
    pub fn set(&mut self, tag: Tag, value: f64) {
        if value == 0.0 {
            self.0.remove(&tag);
        } else {
            self.0.insert(tag, value);
        }
    }

    pub fn with(mut self, tag: Tag, value: f64) -> Self {
        self.set(tag, value);
        self
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Non-zero coordinates in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, f64)> + '_ {
        self.0.iter().map(|(tag, value)| (*tag, *value))
    }

    pub fn axes(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.keys().copied()
    }

    /// Number of axes with a non-zero coordinate.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the default location (all coordinates zero).
    pub fn is_default(&self) -> bool {
        self.is_empty()
    }

    /// A hashable key that identifies this location by value.
    pub(crate) fn key(&self) -> Vec<(Tag, u64)> {
        self.iter().map(|(tag, value)| (tag, value.to_bits())).collect()
    }
}

impl FromIterator<(Tag, f64)> for Location {
    fn from_iter<I: IntoIterator<Item = (Tag, f64)>>(iter: I) -> Self {
        let mut location = Location::new();
        for (tag, value) in iter {
            location.set(tag, value);
        }
        location
    }
}

impl<const N: usize> From<[(Tag, f64); N]> for Location {
    fn from(coords: [(Tag, f64); N]) -> Self {
        coords.into_iter().collect()
    }
}

/// Normalize a user-space location against the given axes.
///
/// Axes missing from `user` take their default; tags that name no axis are
/// ignored.
pub fn normalize_location(user: &[(Tag, f64)], axes: &[Axis]) -> Location {
    axes.iter()
        .map(|axis| {
            let value = user
                .iter()
                .find(|(tag, _)| *tag == axis.tag)
                .map_or(axis.default, |(_, value)| *value);
            (axis.tag, axis.normalize(value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGHT: Tag = Tag::new(b"wght");
    const WDTH: Tag = Tag::new(b"wdth");

    #[test]
    fn normalize_axis_value() {
        let axis = Axis::new(WGHT, 100.0, 400.0, 900.0);
        assert_eq!(axis.normalize(400.0), 0.0);
        assert_eq!(axis.normalize(100.0), -1.0);
        assert_eq!(axis.normalize(900.0), 1.0);
        assert_eq!(axis.normalize(250.0), -0.5);
        assert_eq!(axis.normalize(650.0), 0.5);
    }

    #[test]
    fn normalize_clamps_to_range() {
        let axis = Axis::new(WGHT, 100.0, 400.0, 900.0);
        assert_eq!(axis.normalize(1000.0), 1.0);
        assert_eq!(axis.normalize(0.0), -1.0);
    }

    #[test]
    fn normalize_default_at_extreme() {
        let axis = Axis::new(WDTH, 100.0, 100.0, 200.0);
        assert_eq!(axis.normalize(50.0), 0.0);
        assert_eq!(axis.normalize(150.0), 0.5);
    }

    #[test]
    fn zero_coordinates_are_dropped() {
        let a = Location::from([(WGHT, 0.5), (WDTH, 0.0)]);
        let b = Location::new().with(WGHT, 0.5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!(!a.contains(WDTH));
        assert_eq!(a.get(WDTH), 0.0);
    }

    #[test]
    fn negative_zero_is_default() {
        let location = Location::from([(WGHT, -0.0)]);
        assert!(location.is_default());
    }

    #[test]
    fn normalize_user_location() {
        let axes = [Axis::new(WGHT, 100.0, 400.0, 900.0), Axis::new(WDTH, 75.0, 100.0, 100.0)];
        let location = normalize_location(&[(WGHT, 900.0), (WDTH, 87.5)], &axes);
        assert_eq!(location, Location::from([(WGHT, 1.0), (WDTH, -0.5)]));

        let default = normalize_location(&[], &axes);
        assert!(default.is_default());
    }
}
