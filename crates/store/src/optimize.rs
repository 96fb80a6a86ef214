//! Size optimization for a finished store.
//!
//! Every row is expanded to the full region list and classified by the
//! byte width each column needs (its "shape"). Rows with the same shape
//! start out in one group; groups are then merged greedily, best byte
//! gain first, for as long as merging shrinks the encoded size. Each
//! surviving group becomes one or more subtables.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::time::Instant;

use log::{debug, info};

use crate::{
    builder::as_delta,
    error::{Error, Result},
    index::{DeltaSetIndex, NO_VARIATION_INDEX, VarIndexRemapping, array_index},
    store::{VarData, VariationStore},
};

const MAX_ROWS: usize = 0xFFFF;

/// Options for [`VariationStore::optimize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Deltas are rounded to a multiple of this before encoding.
    pub quantization: u32,
    /// Map rows that are all zero to [`NO_VARIATION_INDEX`] instead of
    /// storing them.
    pub use_no_variation_index: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self { quantization: 1, use_no_variation_index: true }
    }
}

impl OptimizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantization(mut self, quantization: u32) -> Self {
        self.quantization = quantization.max(1);
        self
    }

    pub fn use_no_variation_index(mut self, enabled: bool) -> Self {
        self.use_no_variation_index = enabled;
        self
    }
}

/// Per-column width class of a row, one nibble per column.
///
/// In the narrow scheme a nonzero column sets `0b0001` and a column outside
/// `i8` adds `0b0010`. If any value is outside `i16` the whole row switches
/// to the long scheme: nonzero sets `0b0011`, outside `i16` adds `0b1100`.
/// The popcount of a nibble is the column's byte width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowShape(Vec<u8>);

impl RowShape {
    fn of(row: &[i32]) -> Self {
        let long = row.iter().any(|&v| i16::try_from(v).is_err());
        let nibbles = row
            .iter()
            .map(|&v| match (long, v) {
                (_, 0) => 0,
                (false, v) if i8::try_from(v).is_ok() => 0b0001,
                (false, _) => 0b0011,
                (true, v) if i16::try_from(v).is_ok() => 0b0011,
                (true, _) => 0b1111,
            })
            .collect();
        Self(nibbles)
    }

    /// Bytes per row.
    fn width(&self) -> i64 {
        self.0.iter().map(|nibble| i64::from(nibble.count_ones())).sum()
    }

    fn columns(&self) -> i64 {
        self.0.iter().filter(|&&nibble| nibble != 0).count() as i64
    }

    fn merge(&self, other: &RowShape) -> RowShape {
        RowShape(self.0.iter().zip(&other.0).map(|(a, b)| a | b).collect())
    }
}

// Highest column is most significant.
impl Ord for RowShape {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for RowShape {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cost in bytes of a subtable over `columns` regions, excluding rows:
/// the offset to it, its header, and its region index list.
fn overhead(columns: i64) -> i64 {
    4 + 6 + 2 * columns
}

/// A group of rows destined for the same subtable.
#[derive(Debug)]
struct Encoding {
    shape: RowShape,
    width: i64,
    overhead: i64,
    rows: BTreeSet<Vec<i32>>,
}

impl Encoding {
    fn new(shape: RowShape) -> Self {
        Self { width: shape.width(), overhead: overhead(shape.columns()), shape, rows: BTreeSet::new() }
    }

    /// Most that merging this group away could save.
    fn gain(&self) -> i64 {
        (self.overhead - self.rows.len() as i64).max(0)
    }

    /// Bytes saved by storing both groups in one subtable.
    fn gain_from_merging(&self, other: &Encoding) -> i64 {
        let combined = self.shape.merge(&other.shape);
        let width = combined.width();
        self.overhead + other.overhead
            - overhead(combined.columns())
            - (width - self.width) * self.rows.len() as i64
            - (width - other.width) * other.rows.len() as i64
    }

    fn absorb(&mut self, other: Encoding) {
        self.rows.extend(other.rows);
    }
}

/// Greedily merge encodings while any merge saves bytes.
fn merge_encodings(encodings: Vec<Encoding>) -> Vec<Encoding> {
    let mut todo: Vec<Option<Encoding>> = encodings.into_iter().map(Some).collect();

    let mut heap = BinaryHeap::new();
    for (i, a) in todo.iter().enumerate() {
        let Some(a) = a else { continue };
        for (j, b) in todo.iter().enumerate().skip(i + 1) {
            let Some(b) = b else { continue };
            let gain = a.gain_from_merging(b);
            if gain > 0 {
                heap.push(Reverse((-gain, i, j)));
            }
        }
    }

    while let Some(Reverse((_, i, j))) = heap.pop() {
        if todo[i].is_none() || todo[j].is_none() {
            continue;
        }
        let (Some(a), Some(b)) = (todo[i].take(), todo[j].take()) else { continue };

        let mut combined = Encoding::new(a.shape.merge(&b.shape));
        combined.absorb(a);
        combined.absorb(b);

        let next = todo.len();
        for k in 0..todo.len() {
            if let Some(same) = todo[k].take_if(|other| other.shape == combined.shape) {
                combined.absorb(same);
                continue;
            }
            let Some(other) = &todo[k] else { continue };
            let gain = combined.gain_from_merging(other);
            if gain > 0 {
                heap.push(Reverse((-gain, k, next)));
            }
        }
        todo.push(Some(combined));
    }

    todo.into_iter().flatten().collect()
}

impl VariationStore {
    /// Repack the store for size, returning where every previously issued
    /// index now lives.
    ///
    /// Rows that become all zero map to [`NO_VARIATION_INDEX`] when
    /// [`OptimizeOptions::use_no_variation_index`] is set. Optimizing an
    /// already optimized store with the same options leaves it unchanged.
    /// On error the store is left as it was.
    pub fn optimize(&mut self, options: OptimizeOptions) -> Result<VarIndexRemapping> {
        let start = Instant::now();
        let before = self.encoded_size();
        let region_count = self.regions.len();
        let all_regions: Vec<u16> = (0..region_count)
            .map(|region| array_index(region).ok_or(Error::TooManyRegions))
            .collect::<Result<_>>()?;
        let quantization = f64::from(options.quantization.max(1));

        let mut front: BTreeMap<DeltaSetIndex, Option<Vec<i32>>> = BTreeMap::new();
        let mut groups: HashMap<RowShape, Encoding> = HashMap::new();
        for (outer_index, data) in self.subtables.iter().enumerate() {
            let outer = array_index(outer_index).ok_or(Error::TooManySubtables)?;
            for (inner, item) in data.rows.iter().enumerate() {
                let inner = array_index(inner)
                    .ok_or(Error::TooManyRows { outer: outer_index, rows: data.rows.len() })?;
                let mut row = vec![0i32; region_count];
                for (&region, &value) in data.region_indices.iter().zip(item) {
                    let value = if quantization == 1.0 {
                        value
                    } else {
                        as_delta((f64::from(value) / quantization).round() * quantization)?
                    };
                    if let Some(slot) = row.get_mut(usize::from(region)) {
                        *slot = as_delta(f64::from(*slot) + f64::from(value))?;
                    }
                }
                let index = DeltaSetIndex::new(outer, inner);
                if options.use_no_variation_index && row.iter().all(|&v| v == 0) {
                    front.insert(index, None);
                    continue;
                }
                let shape = RowShape::of(&row);
                groups.entry(shape.clone()).or_insert_with(|| Encoding::new(shape)).rows.insert(row.clone());
                front.insert(index, Some(row));
            }
        }

        let mut todo: Vec<Encoding> = groups.into_values().collect();
        todo.sort_by(|a, b| (a.gain(), &a.shape).cmp(&(b.gain(), &b.shape)));
        debug!("Optimizing {} rows in {} initial encodings", front.len(), todo.len());

        let mut encodings = merge_encodings(todo);
        encodings.sort_by(|a, b| (a.width, &a.shape).cmp(&(b.width, &b.shape)));

        let mut back: HashMap<Vec<i32>, DeltaSetIndex> = HashMap::new();
        let mut subtables = Vec::new();
        for encoding in encodings {
            let rows: Vec<Vec<i32>> = encoding.rows.into_iter().collect();
            for chunk in rows.chunks(MAX_ROWS) {
                let outer = array_index(subtables.len()).ok_or(Error::TooManySubtables)?;
                for (inner, row) in (0..).zip(chunk) {
                    back.insert(row.clone(), DeltaSetIndex::new(outer, inner));
                }
                let mut data = VarData::new(all_regions.clone());
                data.rows = chunk.to_vec();
                subtables.push(data);
            }
        }

        let mut remapping = VarIndexRemapping::new();
        for (old, row) in front {
            let new = match row {
                Some(row) => back.get(&row).copied().unwrap_or(NO_VARIATION_INDEX),
                None => NO_VARIATION_INDEX,
            };
            remapping.insert(old, new);
        }

        for data in &mut subtables {
            data.calculate_num_shorts(true);
        }
        self.subtables = subtables;
        self.prune_regions();

        info!(
            "Optimized variation store: {before} -> {} bytes, {} subtables in {:.3}s",
            self.encoded_size(),
            self.subtables.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(remapping)
    }
}

#[cfg(test)]
mod tests {
    use font_types::Tag;

    use super::*;
    use crate::region::{Region, RegionAxis};

    const WGHT: Tag = Tag::new(b"wght");

    fn weight_region() -> Region {
        Region::new(vec![RegionAxis::new(0.0, 1.0, 1.0)])
    }

    #[test]
    fn shapes() {
        assert_eq!(RowShape::of(&[0, 1, -128, 128]).0, vec![0, 0b0001, 0b0001, 0b0011]);
        assert_eq!(RowShape::of(&[0, 1, 300, 40000]).0, vec![0, 0b0011, 0b0011, 0b1111]);
        assert_eq!(RowShape::of(&[0, 1, 300, 40000]).width(), 8);
        assert_eq!(RowShape::of(&[0, 1, 300, 40000]).columns(), 3);
    }

    #[test]
    fn shape_order_is_high_column_first() {
        let low = RowShape(vec![0b0011, 0]);
        let high = RowShape(vec![0, 0b0001]);
        assert!(low < high);
    }

    #[test]
    fn merging_pays_for_small_groups() {
        let mut a = Encoding::new(RowShape(vec![1, 1, 0]));
        a.rows.insert(vec![1, 1, 0]);
        let mut b = Encoding::new(RowShape(vec![1, 0, 1]));
        b.rows.insert(vec![1, 0, 1]);
        // 14 + 14 - 16 - 1 - 1
        assert_eq!(a.gain_from_merging(&b), 10);
        assert_eq!(merge_encodings(vec![a, b]).len(), 1);
    }

    #[test]
    fn large_groups_stay_apart() {
        let mut narrow = Encoding::new(RowShape(vec![1, 0]));
        let mut wide = Encoding::new(RowShape(vec![0, 0b11]));
        for i in 1..100 {
            narrow.rows.insert(vec![i, 0]);
            wide.rows.insert(vec![0, 1000 + i]);
        }
        assert!(narrow.gain_from_merging(&wide) < 0);
        assert_eq!(merge_encodings(vec![narrow, wide]).len(), 2);
    }

    #[test]
    fn quantization_is_at_least_one() {
        assert_eq!(OptimizeOptions::new().quantization(0).quantization, 1);
        let options = OptimizeOptions::new().quantization(4).use_no_variation_index(false);
        assert_eq!(options, OptimizeOptions { quantization: 4, use_no_variation_index: false });
    }

    #[test]
    fn region_overflow_leaves_store_untouched() {
        let regions = vec![weight_region(); 65536];
        let data = VarData::with_rows(vec![0], vec![vec![5]]);
        let mut store = VariationStore::new(vec![WGHT], regions, vec![data]);
        let before = store.clone();
        assert!(matches!(store.optimize(OptimizeOptions::default()), Err(Error::TooManyRegions)));
        assert_eq!(store, before);
    }

    #[test]
    fn quantized_delta_past_i32_is_an_error() {
        let data = VarData::with_rows(vec![0], vec![vec![1], vec![i32::MAX]]);
        let mut store = VariationStore::new(vec![WGHT], vec![weight_region()], vec![data]);
        let before = store.clone();
        let err = store.optimize(OptimizeOptions::new().quantization(10)).unwrap_err();
        assert!(matches!(err, Error::DeltaOutOfRange { value } if value == 2_147_483_650.0));
        assert_eq!(store, before);

        // two columns on one region add up past i32
        let data = VarData::with_rows(vec![0, 0], vec![vec![i32::MAX, 1]]);
        let mut store = VariationStore::new(vec![WGHT], vec![weight_region()], vec![data]);
        let err = store.optimize(OptimizeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DeltaOutOfRange { .. }));
    }
}
