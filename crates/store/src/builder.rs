//! Incremental builder for item variation stores.
//!
//! Values are stored against a bound [`VariationModel`]; each distinct set
//! of regions gets its own subtable, created the first time a row uses it.

use std::collections::HashMap;
use std::sync::Arc;

use font_types::Tag;
use fontvar_model::{Support, VariationModel};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, trace};

use crate::{
    error::{Error, Result},
    index::{DeltaSetIndex, VarIndexRemapping, array_index},
    optimize::OptimizeOptions,
    region::Region,
    store::{VarData, VariationStore},
};

/// Rows per subtable; inner indices are 16-bit.
const MAX_ROWS: usize = 0xFFFF;

/// Subtable currently receiving rows for one region set, and the rows
/// already stored for that set.
#[derive(Debug)]
struct RegionSet {
    subtable: usize,
    rows: HashMap<Vec<i32>, DeltaSetIndex>,
}

/// Builds a [`VariationStore`] one item at a time.
#[derive(Debug)]
pub struct VariationStoreBuilder {
    axis_tags: Vec<Tag>,
    regions: IndexSet<Region>,
    subtables: Vec<VarData>,
    region_sets: IndexMap<Vec<u16>, RegionSet>,
    model: Option<Arc<VariationModel>>,
    supports: Option<Vec<Support>>,
    current: Option<usize>,
}

impl VariationStoreBuilder {
    /// A builder for a font with the given axes, in `fvar` order.
    pub fn new(axis_tags: Vec<Tag>) -> Self {
        Self {
            axis_tags,
            regions: IndexSet::new(),
            subtables: Vec::new(),
            region_sets: IndexMap::new(),
            model: None,
            supports: None,
            current: None,
        }
    }

    pub fn axis_tags(&self) -> &[Tag] {
        &self.axis_tags
    }

    /// The bound model, if any.
    pub fn model(&self) -> Option<&Arc<VariationModel>> {
        self.model.as_ref()
    }

    /// Regions pooled so far.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Bind `model`; rows stored from now on use its supports.
    pub fn set_model(&mut self, model: Arc<VariationModel>) {
        self.set_supports(model.supports().to_vec());
        self.model = Some(model);
    }

    /// Bind raw supports without a model. Only [`store_deltas`] can be used
    /// until a model is bound.
    ///
    /// [`store_deltas`]: VariationStoreBuilder::store_deltas
    pub fn set_supports(&mut self, mut supports: Vec<Support>) {
        if supports.first().is_some_and(Support::is_empty) {
            supports.remove(0);
        }
        trace!("Binding {} supports", supports.len());
        self.model = None;
        self.supports = Some(supports);
        self.current = None;
    }

    /// Store one item given its value at every master, in the model's
    /// given order. Returns the default master's value and the index of
    /// the stored deltas.
    pub fn store_masters(&mut self, values: &[f64]) -> Result<(i32, DeltaSetIndex)> {
        self.store_masters_with(values, f64::round)
    }

    /// Like [`VariationStoreBuilder::store_masters`] with a custom
    /// rounding function.
    pub fn store_masters_with(
        &mut self,
        values: &[f64],
        round: impl Fn(f64) -> f64,
    ) -> Result<(i32, DeltaSetIndex)> {
        let model = Arc::clone(self.model.as_ref().ok_or(Error::NoModel)?);
        if !model.has_default_master() {
            return Err(Error::NoDefaultMaster);
        }
        if values.len() != model.len() {
            return Err(Error::MasterCountMismatch { expected: model.len(), actual: values.len() });
        }
        let deltas = model.deltas_with(values, round)?;
        let base = as_delta(deltas[0])?;
        let row = deltas[1..].iter().copied().map(as_delta).collect::<Result<_>>()?;
        Ok((base, self.store_row(row)?))
    }

    /// Store one item given its deltas, one per bound support.
    pub fn store_deltas(&mut self, deltas: &[f64]) -> Result<DeltaSetIndex> {
        self.store_deltas_with(deltas, f64::round)
    }

    pub fn store_deltas_with(
        &mut self,
        deltas: &[f64],
        round: impl Fn(f64) -> f64,
    ) -> Result<DeltaSetIndex> {
        let row = deltas.iter().map(|&delta| as_delta(round(delta))).collect::<Result<_>>()?;
        self.store_row(row)
    }

    fn store_row(&mut self, row: Vec<i32>) -> Result<DeltaSetIndex> {
        let expected = self.supports.as_ref().ok_or(Error::NoModel)?.len();
        if row.len() != expected {
            return Err(Error::RegionCountMismatch { expected, actual: row.len() });
        }

        let current = match self.current {
            Some(current) => current,
            None => {
                let current = self.open_region_set()?;
                self.current = Some(current);
                current
            }
        };
        let Some((region_indices, set)) = self.region_sets.get_index_mut(current) else {
            return Err(Error::NoModel);
        };
        if let Some(&index) = set.rows.get(&row) {
            return Ok(index);
        }

        if self.subtables[set.subtable].rows.len() == MAX_ROWS {
            array_index(self.subtables.len()).ok_or(Error::TooManySubtables)?;
            set.subtable = self.subtables.len();
            self.subtables.push(VarData::new(region_indices.clone()));
            debug!("Subtable full, continuing in subtable {}", set.subtable);
        }
        let data = &mut self.subtables[set.subtable];
        let outer = array_index(set.subtable).ok_or(Error::TooManySubtables)?;
        let inner = array_index(data.rows.len())
            .ok_or(Error::TooManyRows { outer: set.subtable, rows: data.rows.len() + 1 })?;
        let index = DeltaSetIndex::new(outer, inner);
        data.rows.push(row.clone());
        set.rows.insert(row, index);
        Ok(index)
    }

    /// Pool the bound supports as regions and find or create the subtable
    /// for that region set.
    fn open_region_set(&mut self) -> Result<usize> {
        let supports = self.supports.as_ref().ok_or(Error::NoModel)?;
        let mut region_indices = Vec::with_capacity(supports.len());
        for support in supports {
            let (index, inserted) =
                self.regions.insert_full(Region::from_support(support, &self.axis_tags)?);
            let Some(index) = array_index(index) else {
                if inserted {
                    self.regions.pop();
                }
                return Err(Error::TooManyRegions);
            };
            region_indices.push(index);
        }

        if let Some(index) = self.region_sets.get_index_of(&region_indices) {
            return Ok(index);
        }
        let subtable = self.subtables.len();
        array_index(subtable).ok_or(Error::TooManySubtables)?;
        debug!("New subtable {subtable} over regions {region_indices:?}");
        self.subtables.push(VarData::new(region_indices.clone()));
        let (index, _) =
            self.region_sets.insert_full(region_indices, RegionSet { subtable, rows: HashMap::new() });
        Ok(index)
    }

    /// Emit the store with every subtable's wide/narrow split set to fit
    /// its rows. Row positions are unchanged.
    pub fn finish(self) -> VariationStore {
        let mut subtables = self.subtables;
        for data in &mut subtables {
            data.calculate_num_shorts(false);
        }
        info!(
            "Finished variation store: {} regions, {} subtables, {} rows",
            self.regions.len(),
            subtables.len(),
            subtables.iter().map(VarData::item_count).sum::<usize>()
        );
        VariationStore::new(self.axis_tags, self.regions.into_iter().collect(), subtables)
    }

    /// [`finish`](VariationStoreBuilder::finish), then optimize.
    pub fn finish_optimized(
        self,
        options: OptimizeOptions,
    ) -> Result<(VariationStore, VarIndexRemapping)> {
        let mut store = self.finish();
        let remapping = store.optimize(options)?;
        Ok((store, remapping))
    }
}

/// Rounded delta to integer. NaN, infinities and values past the `i32`
/// range are errors.
pub(crate) fn as_delta(value: f64) -> Result<i32> {
    if value.is_finite() && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value) {
        Ok(value as i32)
    } else {
        Err(Error::DeltaOutOfRange { value })
    }
}
