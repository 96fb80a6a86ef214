//! Reuse of variation models across fields with the same masters.

use std::{collections::HashMap, sync::Arc};

use font_types::Tag;
use log::trace;

use crate::{
    error::Result,
    location::Location,
    model::{ModelOptions, VariationModel},
};

type ModelKey = Vec<Vec<(Tag, u64)>>;

/// Caller-owned cache of variation models, keyed by master locations.
///
/// The key keeps the master order, since values are passed to a model in
/// that order. Nothing is ever evicted; drop the cache when the build ends.
#[derive(Debug, Default)]
pub struct ModelCache {
    axis_order: Vec<Tag>,
    options: ModelOptions,
    models: HashMap<ModelKey, Arc<VariationModel>>,
}

impl ModelCache {
    pub fn new(axis_order: Vec<Tag>) -> Self {
        Self { axis_order, ..Default::default() }
    }

    pub fn with_options(axis_order: Vec<Tag>, options: ModelOptions) -> Self {
        Self { axis_order, options, models: HashMap::new() }
    }

    /// The model for `locations`, building it on first use.
    pub fn get_or_build(&mut self, locations: &[Location]) -> Result<Arc<VariationModel>> {
        let key: ModelKey = locations.iter().map(Location::key).collect();
        if let Some(model) = self.models.get(&key) {
            return Ok(Arc::clone(model));
        }
        trace!("Variation model cache miss for {} masters", locations.len());
        let model = Arc::new(VariationModel::with_options(
            locations.to_vec(),
            self.axis_order.clone(),
            self.options,
        )?);
        self.models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Number of distinct models built so far.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const WGHT: Tag = Tag::new(b"wght");

    #[test]
    fn same_locations_share_a_model() {
        let mut cache = ModelCache::new(vec![WGHT]);
        let masters = [Location::new(), Location::from([(WGHT, 1.0)])];
        let a = cache.get_or_build(&masters).unwrap();
        let b = cache.get_or_build(&masters.clone()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn master_order_is_part_of_the_key() {
        let mut cache = ModelCache::new(vec![WGHT]);
        let a = cache.get_or_build(&[Location::new(), Location::from([(WGHT, 1.0)])]).unwrap();
        let b = cache.get_or_build(&[Location::from([(WGHT, 1.0)]), Location::new()]).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.mapping(), &[1, 0]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = ModelCache::new(vec![WGHT]);
        let err = cache.get_or_build(&[Location::new(), Location::new()]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLocation { .. }));
        assert!(cache.is_empty());
    }
}
