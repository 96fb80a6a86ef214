//! # Variation Store
//!
//! Builds OpenType item variation stores from per-master values.
//!
//! [`VariationStoreBuilder`] turns master values into delta rows against a
//! [`fontvar_model::VariationModel`], pooling regions and grouping rows by
//! region set. [`VariationStore::optimize`] then repacks the result for
//! size and reports where every index moved.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use font_types::Tag;
//! use fontvar_model::{Location, VariationModel};
//! use fontvar_store::{OptimizeOptions, VariationStoreBuilder};
//!
//! let wght = Tag::new(b"wght");
//! let model = VariationModel::new(
//!     vec![Location::new(), Location::from([(wght, 1.0)])],
//!     vec![wght],
//! )?;
//!
//! let mut builder = VariationStoreBuilder::new(vec![wght]);
//! builder.set_model(Arc::new(model));
//! let (default, index) = builder.store_masters(&[100.0, 150.0])?;
//! assert_eq!(default, 100);
//!
//! let (store, remapping) = builder.finish_optimized(OptimizeOptions::default())?;
//! let index = remapping.get(index).unwrap();
//! assert_eq!(store.delta_row(index), Some(&[50][..]));
//! # Ok::<(), fontvar_store::Error>(())
//! ```

mod builder;
mod error;
mod index;
mod optimize;
mod region;
mod store;

pub use builder::VariationStoreBuilder;
pub use error::{Error, Result};
pub use index::{DeltaSetIndex, NO_VARIATION_INDEX, VarIndexRemapping};
pub use optimize::OptimizeOptions;
pub use region::{Region, RegionAxis};
pub use store::{VarData, VariationStore};
