//! Delta-set indices and their remapping.

use std::collections::BTreeMap;
use std::fmt;

/// Address of one stored delta row: subtable (`outer`) and row (`inner`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeltaSetIndex {
    pub outer: u16,
    pub inner: u16,
}

/// Sentinel for items that do not vary.
pub const NO_VARIATION_INDEX: DeltaSetIndex = DeltaSetIndex { outer: 0xFFFF, inner: 0xFFFF };

impl DeltaSetIndex {
    pub const fn new(outer: u16, inner: u16) -> Self {
        Self { outer, inner }
    }

    /// Whether this is [`NO_VARIATION_INDEX`].
    pub fn is_no_variation(&self) -> bool {
        *self == NO_VARIATION_INDEX
    }

    /// The packed 32-bit form (`outer << 16 | inner`).
    pub fn to_u32(self) -> u32 {
        u32::from(self.outer) << 16 | u32::from(self.inner)
    }

    pub fn from_u32(packed: u32) -> Self {
        Self { outer: (packed >> 16) as u16, inner: packed as u16 }
    }
}

/// `index` as a position in a 16-bit counted array. `None` once the count
/// itself would no longer fit, so 0xFFFF is never issued.
pub(crate) fn array_index(index: usize) -> Option<u16> {
    u16::try_from(index).ok().filter(|&index| index < u16::MAX)
}

impl fmt::Display for DeltaSetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.outer, self.inner)
    }
}

/// Map from delta-set indices issued before a store rewrite to their new
/// positions. [`NO_VARIATION_INDEX`] always maps to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarIndexRemapping {
    map: BTreeMap<DeltaSetIndex, DeltaSetIndex>,
}

impl Default for VarIndexRemapping {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(NO_VARIATION_INDEX, NO_VARIATION_INDEX);
        Self { map }
    }
}

impl VarIndexRemapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: DeltaSetIndex, to: DeltaSetIndex) {
        self.map.insert(from, to);
    }

    pub fn get(&self, from: DeltaSetIndex) -> Option<DeltaSetIndex> {
        self.map.get(&from).copied()
    }

    /// All `(old, new)` pairs in ascending old order.
    pub fn iter(&self) -> impl Iterator<Item = (DeltaSetIndex, DeltaSetIndex)> + '_ {
        self.map.iter().map(|(from, to)| (*from, *to))
    }

    /// Number of entries, including the sentinel.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Apply `self`, then `next`.
    pub fn then(&self, next: &VarIndexRemapping) -> VarIndexRemapping {
        let map = self
            .map
            .iter()
            .filter_map(|(from, to)| next.get(*to).map(|to| (*from, to)))
            .collect();
        VarIndexRemapping { map }
    }
}
