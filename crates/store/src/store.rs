//! The item variation store and its subtables.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use font_types::Tag;
use fontvar_model::Location;
use log::debug;
use read_fonts::tables::variations as read;
use write_fonts::tables::variations as write;

use crate::{
    error::{Error, Result},
    index::{DeltaSetIndex, NO_VARIATION_INDEX, VarIndexRemapping},
    region::{Region, RegionAxis},
};

/// Flag in the packed word-delta count marking 32/16-bit columns.
const LONG_WORDS: u16 = 0x8000;

/// Bytes needed to store `value`: 0 when zero, else 1, 2 or 4.
pub(crate) fn value_width(value: i32) -> u8 {
    if value == 0 {
        0
    } else if i8::try_from(value).is_ok() {
        1
    } else if i16::try_from(value).is_ok() {
        2
    } else {
        4
    }
}

/// One subtable: rows of deltas over a subset of the store's regions.
///
/// The first `word_count` columns are encoded wide (16-bit, or 32-bit with
/// long words), the rest narrow (8-bit, or 16-bit with long words).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarData {
    pub(crate) region_indices: Vec<u16>,
    pub(crate) rows: Vec<Vec<i32>>,
    pub(crate) word_count: u16,
    pub(crate) long_words: bool,
}

impl VarData {
    /// A subtable with no rows. Call [`VarData::calculate_num_shorts`]
    /// after adding rows.
    pub fn new(region_indices: Vec<u16>) -> Self {
        Self { region_indices, ..Default::default() }
    }

    pub fn with_rows(region_indices: Vec<u16>, rows: Vec<Vec<i32>>) -> Self {
        let mut data = Self { region_indices, rows, ..Default::default() };
        data.calculate_num_shorts(false);
        data
    }

    pub fn region_indices(&self) -> &[u16] {
        &self.region_indices
    }

    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    pub fn row(&self, inner: u16) -> Option<&[i32]> {
        self.rows.get(usize::from(inner)).map(Vec::as_slice)
    }

    pub fn item_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of leading wide columns.
    pub fn word_count(&self) -> u16 {
        self.word_count
    }

    pub fn long_words(&self) -> bool {
        self.long_words
    }

    /// The packed `wordDeltaCount` field.
    pub fn word_delta_count(&self) -> u16 {
        if self.long_words { self.word_count | LONG_WORDS } else { self.word_count }
    }

    /// Recompute the wide/narrow split from the current rows.
    ///
    /// With `optimize`, columns are also reordered widest first and
    /// all-zero columns are dropped.
    pub fn calculate_num_shorts(&mut self, optimize: bool) {
        let mut widths = vec![0u8; self.region_indices.len()];
        for row in &self.rows {
            for (width, &value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value_width(value));
            }
        }
        self.long_words = widths.iter().any(|&w| w > 2);

        if optimize {
            let mut order: Vec<usize> = (0..widths.len()).filter(|&i| widths[i] != 0).collect();
            order.sort_by_key(|&i| Reverse(widths[i]));
            widths = order.iter().map(|&i| widths[i]).collect();
            self.region_indices = order.iter().map(|&i| self.region_indices[i]).collect();
            for row in &mut self.rows {
                *row = order.iter().map(|&i| row[i]).collect();
            }
        }

        let wide = if self.long_words { 2 } else { 1 };
        self.word_count = widths.iter().rposition(|&w| w > wide).map_or(0, |i| i as u16 + 1);
    }

    /// Bytes per row.
    pub fn row_size(&self) -> usize {
        let words = usize::from(self.word_count);
        let narrow = self.region_indices.len() - words;
        if self.long_words { words * 4 + narrow * 2 } else { words * 2 + narrow }
    }

    /// Encoded size of this subtable in bytes.
    pub fn encoded_size(&self) -> usize {
        6 + 2 * self.region_indices.len() + self.rows.len() * self.row_size()
    }

    /// Big-endian packed rows.
    pub fn encode_rows(&self) -> Vec<u8> {
        let words = usize::from(self.word_count);
        let mut bytes = Vec::with_capacity(self.rows.len() * self.row_size());
        for row in &self.rows {
            for (i, &value) in row.iter().enumerate() {
                match (i < words, self.long_words) {
                    (true, true) => bytes.extend_from_slice(&value.to_be_bytes()),
                    (true, false) | (false, true) => {
                        bytes.extend_from_slice(&(value as i16).to_be_bytes())
                    }
                    (false, false) => bytes.extend_from_slice(&(value as i8).to_be_bytes()),
                }
            }
        }
        bytes
    }
}

/// An item variation store: shared regions plus subtables of delta rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationStore {
    pub(crate) axis_tags: Vec<Tag>,
    pub(crate) regions: Vec<Region>,
    pub(crate) subtables: Vec<VarData>,
}

impl VariationStore {
    pub fn new(axis_tags: Vec<Tag>, regions: Vec<Region>, subtables: Vec<VarData>) -> Self {
        Self { axis_tags, regions, subtables }
    }

    pub fn axis_tags(&self) -> &[Tag] {
        &self.axis_tags
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn subtables(&self) -> &[VarData] {
        &self.subtables
    }

    /// The stored row at `index`, one delta per region of its subtable.
    pub fn delta_row(&self, index: DeltaSetIndex) -> Option<&[i32]> {
        self.subtables.get(usize::from(index.outer))?.row(index.inner)
    }

    /// The non-zero deltas at `index`, paired with their regions.
    ///
    /// [`NO_VARIATION_INDEX`] yields no deltas.
    pub fn region_deltas(&self, index: DeltaSetIndex) -> Option<Vec<(&Region, i32)>> {
        if index.is_no_variation() {
            return Some(Vec::new());
        }
        let data = self.subtables.get(usize::from(index.outer))?;
        let row = data.row(index.inner)?;
        data.region_indices
            .iter()
            .zip(row)
            .filter(|(_, delta)| **delta != 0)
            .map(|(region, delta)| Some((self.regions.get(usize::from(*region))?, *delta)))
            .collect()
    }

    /// The variation at `location` of the item at `index`.
    pub fn interpolate(&self, index: DeltaSetIndex, location: &Location) -> Option<f64> {
        let deltas = self.region_deltas(index)?;
        Some(
            deltas
                .into_iter()
                .map(|(region, delta)| f64::from(delta) * region.scalar_at(location, &self.axis_tags))
                .sum(),
        )
    }

    /// Encoded size in bytes, without sharing identical subtables.
    pub fn encoded_size(&self) -> usize {
        let header = 8 + 4 * self.subtables.len();
        let region_list = 4 + self.regions.len() * self.axis_tags.len() * 6;
        header + region_list + self.subtables.iter().map(VarData::encoded_size).sum::<usize>()
    }

    /// Drop regions no subtable references and renumber the rest.
    pub fn prune_regions(&mut self) {
        let used: BTreeSet<u16> = self
            .subtables
            .iter()
            .flat_map(|data| data.region_indices.iter().copied())
            .filter(|&region| usize::from(region) < self.regions.len())
            .collect();
        if used.len() == self.regions.len() {
            return;
        }
        let renumber: BTreeMap<u16, u16> =
            used.iter().enumerate().map(|(new, old)| (*old, new as u16)).collect();
        debug!("Pruning regions: {} -> {}", self.regions.len(), used.len());
        self.regions = used.iter().map(|&old| self.regions[usize::from(old)].clone()).collect();
        for data in &mut self.subtables {
            for region in &mut data.region_indices {
                if let Some(&new) = renumber.get(&*region) {
                    *region = new;
                }
            }
        }
    }

    /// Keep only the rows named in `used`, in index order, dropping
    /// subtables that end up empty.
    pub fn subset(&mut self, used: impl IntoIterator<Item = DeltaSetIndex>) -> VarIndexRemapping {
        let mut by_outer: BTreeMap<u16, BTreeSet<u16>> = BTreeMap::new();
        for index in used.into_iter().filter(|index| !index.is_no_variation()) {
            by_outer.entry(index.outer).or_default().insert(index.inner);
        }

        let mut remapping = VarIndexRemapping::new();
        let mut subtables = Vec::new();
        for (outer, inners) in by_outer {
            let Some(data) = self.subtables.get(usize::from(outer)) else { continue };
            let new_outer = subtables.len() as u16;
            let mut subset = VarData::new(data.region_indices.clone());
            for inner in inners {
                let Some(row) = data.row(inner) else { continue };
                let new_index = DeltaSetIndex::new(new_outer, subset.rows.len() as u16);
                remapping.insert(DeltaSetIndex::new(outer, inner), new_index);
                subset.rows.push(row.to_vec());
            }
            subset.calculate_num_shorts(true);
            subtables.push(subset);
        }

        debug!("Subset variation store: {} -> {} subtables", self.subtables.len(), subtables.len());
        self.subtables = subtables;
        self.prune_regions();
        remapping
    }

    /// Convert into the `write-fonts` table.
    pub fn to_write_fonts(&self) -> write::ItemVariationStore {
        let regions = self
            .regions
            .iter()
            .map(|region| {
                write::VariationRegion::new(
                    region
                        .axes()
                        .iter()
                        .map(|axis| write::RegionAxisCoordinates {
                            start_coord: axis.start,
                            peak_coord: axis.peak,
                            end_coord: axis.end,
                        })
                        .collect(),
                )
            })
            .collect();
        let region_list = write::VariationRegionList::new(self.axis_tags.len() as u16, regions);
        let subtables = self
            .subtables
            .iter()
            .map(|data| {
                Some(write::ItemVariationData::new(
                    data.rows.len() as u16,
                    data.word_delta_count(),
                    data.region_indices.clone(),
                    data.encode_rows(),
                ))
            })
            .collect();
        write::ItemVariationStore::new(region_list, subtables)
    }

    /// Serialize to binary.
    pub fn compile(&self) -> Result<Vec<u8>> {
        let bytes = write_fonts::dump_table(&self.to_write_fonts())?;
        Ok(bytes)
    }

    /// Load a store parsed by `read-fonts`. `axis_tags` are the font's axes
    /// in `fvar` order. Null subtables load as empty ones so that outer
    /// indices stay put.
    pub fn from_read_fonts(store: &read::ItemVariationStore, axis_tags: Vec<Tag>) -> Result<Self> {
        let region_list = store.variation_region_list()?;
        if usize::from(region_list.axis_count()) != axis_tags.len() {
            return Err(Error::AxisCountMismatch {
                expected: axis_tags.len(),
                actual: usize::from(region_list.axis_count()),
            });
        }
        let regions = region_list
            .variation_regions()
            .iter()
            .map(|region| -> Result<Region> {
                let axes = region?
                    .region_axes()
                    .iter()
                    .map(|coords| RegionAxis {
                        start: coords.start_coord(),
                        peak: coords.peak_coord(),
                        end: coords.end_coord(),
                    })
                    .collect();
                Ok(Region::new(axes))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut subtables = Vec::new();
        for data in store.item_variation_data().iter() {
            let Some(data) = data.transpose()? else {
                subtables.push(VarData::default());
                continue;
            };
            let word_delta_count = data.word_delta_count();
            subtables.push(VarData {
                region_indices: data.region_indexes().iter().map(|index| index.get()).collect(),
                rows: (0..data.item_count()).map(|inner| data.delta_set(inner).collect()).collect(),
                word_count: word_delta_count & !LONG_WORDS,
                long_words: word_delta_count & LONG_WORDS != 0,
            });
        }
        Ok(Self { axis_tags, regions, subtables })
    }
}

impl VarIndexRemapping {
    /// Every index stored in `store` mapped to itself.
    pub fn identity(store: &VariationStore) -> Self {
        let mut remapping = Self::new();
        for (outer, data) in store.subtables.iter().enumerate() {
            for inner in 0..data.rows.len() {
                let index = DeltaSetIndex::new(outer as u16, inner as u16);
                remapping.insert(index, index);
            }
        }
        remapping.insert(NO_VARIATION_INDEX, NO_VARIATION_INDEX);
        remapping
    }
}

#[cfg(test)]
mod tests {
    use read_fonts::{FontData, FontRead};

    use super::*;

    const WGHT: Tag = Tag::new(b"wght");
    const WDTH: Tag = Tag::new(b"wdth");

    fn two_axis_store() -> VariationStore {
        let regions = vec![
            Region::new(vec![RegionAxis::new(0.0, 1.0, 1.0), RegionAxis::default()]),
            Region::new(vec![RegionAxis::default(), RegionAxis::new(0.0, 1.0, 1.0)]),
            Region::new(vec![RegionAxis::new(0.0, 1.0, 1.0), RegionAxis::new(0.0, 1.0, 1.0)]),
        ];
        let subtables = vec![
            VarData::with_rows(vec![0, 1], vec![vec![10, -20], vec![5, 0]]),
            VarData::with_rows(vec![0, 2], vec![vec![300, 1], vec![0, 0]]),
        ];
        VariationStore::new(vec![WGHT, WDTH], regions, subtables)
    }

    #[test]
    fn value_widths() {
        assert_eq!(value_width(0), 0);
        assert_eq!(value_width(127), 1);
        assert_eq!(value_width(-128), 1);
        assert_eq!(value_width(128), 2);
        assert_eq!(value_width(-32768), 2);
        assert_eq!(value_width(32768), 4);
    }

    #[test]
    fn conservative_split_keeps_column_order() {
        let mut data = VarData::new(vec![0, 1, 2]);
        data.rows = vec![vec![1, 0, 300], vec![-2, 0, 4]];
        data.calculate_num_shorts(false);
        assert_eq!(data.word_count(), 3);
        assert!(!data.long_words());
        assert_eq!(data.region_indices(), &[0, 1, 2]);
        assert_eq!(data.row_size(), 6);
    }

    #[test]
    fn optimized_split_reorders_columns() {
        let mut data = VarData::new(vec![0, 1, 2, 3]);
        data.rows = vec![vec![1, 0, 300, 70000], vec![-2, 0, 4, 0]];
        data.calculate_num_shorts(true);
        assert_eq!(data.region_indices(), &[3, 2, 0]);
        assert_eq!(data.rows(), &[vec![70000, 300, 1], vec![0, 4, -2]]);
        assert!(data.long_words());
        assert_eq!(data.word_count(), 1);
        assert_eq!(data.word_delta_count(), 0x8001);
        assert_eq!(data.row_size(), 8);
    }

    #[test]
    fn encode_mixed_widths() {
        let data = VarData::with_rows(vec![0, 1], vec![vec![300, -1]]);
        assert_eq!(data.word_count(), 1);
        assert_eq!(data.encode_rows(), vec![0x01, 0x2C, 0xFF]);

        let long = VarData::with_rows(vec![0, 1], vec![vec![65536, -2]]);
        assert_eq!(long.encode_rows(), vec![0x00, 0x01, 0x00, 0x00, 0xFF, 0xFE]);
    }

    #[test]
    fn encoded_size_matches_compiled_size() {
        let store = two_axis_store();
        let bytes = store.compile().unwrap();
        assert_eq!(bytes.len(), store.encoded_size());
    }

    #[test]
    fn binary_round_trip() {
        let store = two_axis_store();
        let bytes = store.compile().unwrap();
        let parsed = read::ItemVariationStore::read(FontData::new(&bytes)).unwrap();
        let loaded = VariationStore::from_read_fonts(&parsed, vec![WGHT, WDTH]).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn axis_count_checked_on_load() {
        let bytes = two_axis_store().compile().unwrap();
        let parsed = read::ItemVariationStore::read(FontData::new(&bytes)).unwrap();
        let err = VariationStore::from_read_fonts(&parsed, vec![WGHT]).unwrap_err();
        assert!(matches!(err, Error::AxisCountMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn interpolate_row() {
        let store = two_axis_store();
        let index = DeltaSetIndex::new(0, 0);
        assert_eq!(store.interpolate(index, &Location::new()), Some(0.0));
        let location = Location::from([(WGHT, 0.5), (WDTH, 1.0)]);
        assert_eq!(store.interpolate(index, &location), Some(5.0 - 20.0));
        assert_eq!(store.interpolate(NO_VARIATION_INDEX, &location), Some(0.0));
        assert_eq!(store.interpolate(DeltaSetIndex::new(5, 0), &location), None);
    }

    #[test]
    fn region_deltas_skip_zeros() {
        let store = two_axis_store();
        let deltas = store.region_deltas(DeltaSetIndex::new(0, 1)).unwrap();
        assert_eq!(deltas, vec![(&store.regions()[0], 5)]);
    }

    #[test]
    fn subset_keeps_used_rows() {
        let mut store = two_axis_store();
        let remapping =
            store.subset([DeltaSetIndex::new(1, 0), NO_VARIATION_INDEX, DeltaSetIndex::new(9, 9)]);
        assert_eq!(store.subtables().len(), 1);
        assert_eq!(remapping.get(DeltaSetIndex::new(1, 0)), Some(DeltaSetIndex::new(0, 0)));
        assert_eq!(remapping.get(DeltaSetIndex::new(0, 0)), None);
        assert_eq!(remapping.get(NO_VARIATION_INDEX), Some(NO_VARIATION_INDEX));
        // region 1 is only used by the dropped subtable
        assert_eq!(store.regions().len(), 2);
        assert_eq!(store.subtables()[0].region_indices(), &[0, 1]);
        assert_eq!(store.delta_row(DeltaSetIndex::new(0, 0)), Some(&[300, 1][..]));
    }

    #[test]
    fn identity_remapping() {
        let store = two_axis_store();
        let identity = VarIndexRemapping::identity(&store);
        assert_eq!(identity.len(), 5);
        assert!(identity.iter().all(|(from, to)| from == to));
    }
}
