//! Read-only catalog snapshots consumed by the tag resolver.
//!
//! A [`CatalogSnapshot`] pairs the tag association catalog with the name
//! universes that tag filters are evaluated against. Snapshots are plain
//! values: the resolver never reaches for ambient state, and every
//! [`CatalogSource`] is expected to hand out a consistent view.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tickref_warehouse::{CatalogRows, Warehouse};

use crate::SnapshotError;

/// A product is identified by its name together with its product type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductKey {
    pub product: String,
    pub product_type: String,
}

impl ProductKey {
    pub fn new(product: impl Into<String>, product_type: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            product_type: product_type.into(),
        }
    }
}

/// Explicit tag associations: product links, instrument links and filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagCatalog {
    tags: BTreeSet<String>,
    products: BTreeMap<String, BTreeSet<ProductKey>>,
    instruments: BTreeMap<String, BTreeSet<String>>,
    strategy_filters: BTreeMap<String, BTreeSet<String>>,
    custom_filters: BTreeMap<String, BTreeSet<String>>,
}

impl TagCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag that may have no associations yet.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn link_product(
        &mut self,
        tag: impl Into<String>,
        product: impl Into<String>,
        product_type: impl Into<String>,
    ) -> &mut Self {
        let tag = self.register(tag);
        self.products
            .entry(tag)
            .or_default()
            .insert(ProductKey::new(product, product_type));
        self
    }

    pub fn link_instrument(
        &mut self,
        tag: impl Into<String>,
        instrument: impl Into<String>,
    ) -> &mut Self {
        let tag = self.register(tag);
        self.instruments
            .entry(tag)
            .or_default()
            .insert(instrument.into());
        self
    }

    pub fn add_strategy_filter(
        &mut self,
        tag: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        let tag = self.register(tag);
        self.strategy_filters
            .entry(tag)
            .or_default()
            .insert(pattern.into());
        self
    }

    pub fn add_custom_filter(
        &mut self,
        tag: impl Into<String>,
        pattern: impl Into<String>,
    ) -> &mut Self {
        let tag = self.register(tag);
        self.custom_filters
            .entry(tag)
            .or_default()
            .insert(pattern.into());
        self
    }

    /// Every known tag, in name order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn products_of(&self, tag: &str) -> impl Iterator<Item = &ProductKey> {
        self.products.get(tag).into_iter().flatten()
    }

    pub fn instruments_of(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.instruments
            .get(tag)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn strategy_filters_of(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.strategy_filters
            .get(tag)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn custom_filters_of(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.custom_filters
            .get(tag)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    fn register(&mut self, tag: impl Into<String>) -> String {
        let tag = tag.into();
        self.tags.insert(tag.clone());
        tag
    }
}

/// Name universes that tag filters and product links expand against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Universes {
    strategies: BTreeSet<String>,
    custom_indices: BTreeSet<String>,
    product_instruments: BTreeMap<ProductKey, BTreeSet<String>>,
}

impl Universes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the names of one strategy or spread series catalog.
    ///
    /// Called once per series (end-of-day strategies, intraday spreads,
    /// end-of-day spreads); the universe is their distinct union.
    pub fn with_strategy_series<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strategies.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_custom_indices<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_indices
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn add_product_instrument(
        &mut self,
        product: impl Into<String>,
        product_type: impl Into<String>,
        instrument: impl Into<String>,
    ) -> &mut Self {
        self.product_instruments
            .entry(ProductKey::new(product, product_type))
            .or_default()
            .insert(instrument.into());
        self
    }

    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(String::as_str)
    }

    pub fn custom_indices(&self) -> impl Iterator<Item = &str> {
        self.custom_indices.iter().map(String::as_str)
    }

    pub fn instruments_of(&self, product: &ProductKey) -> impl Iterator<Item = &str> {
        self.product_instruments
            .get(product)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// One consistent view of all catalogs the resolver reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub catalog: TagCatalog,
    pub universes: Universes,
}

impl CatalogSnapshot {
    pub fn new(catalog: TagCatalog, universes: Universes) -> Self {
        Self { catalog, universes }
    }

    /// Content hash of the snapshot, stable for equal snapshots within a process.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Build a snapshot from warehouse rows, rejecting rows with blank keys.
    pub fn from_rows(rows: CatalogRows) -> Result<Self, SnapshotError> {
        let mut catalog = TagCatalog::new();
        for tag in rows.tags {
            catalog.add_tag(non_blank("tag", tag)?);
        }
        for link in rows.tag_products {
            catalog.link_product(
                non_blank("tag", link.tag)?,
                non_blank("product", link.product)?,
                non_blank("product_type", link.product_type)?,
            );
        }
        for link in rows.tag_instruments {
            catalog.link_instrument(
                non_blank("tag", link.tag)?,
                non_blank("instrument", link.instrument)?,
            );
        }
        for link in rows.tag_strategy_filters {
            catalog.add_strategy_filter(non_blank("tag", link.tag)?, link.filter);
        }
        for link in rows.tag_custom_filters {
            catalog.add_custom_filter(non_blank("tag", link.tag)?, link.filter);
        }

        let mut universes = Universes::new();
        universes
            .with_strategy_series(rows.strategy_names)
            .with_custom_indices(rows.custom_indices);
        for member in rows.product_instruments {
            universes.add_product_instrument(member.product, member.product_type, member.instrument);
        }

        Ok(Self { catalog, universes })
    }
}

fn non_blank(field: &str, value: String) -> Result<String, SnapshotError> {
    if value.trim().is_empty() {
        return Err(SnapshotError::InvalidRow(format!("{field} must not be blank")));
    }
    Ok(value)
}

/// Provider of read-only catalog snapshots.
///
/// Implementations must return every catalog from one consistent read; the
/// resolver performs no isolation of its own.
pub trait CatalogSource {
    type Error;

    fn snapshot(&self) -> Result<CatalogSnapshot, Self::Error>;
}

impl CatalogSource for CatalogSnapshot {
    type Error = std::convert::Infallible;

    fn snapshot(&self) -> Result<CatalogSnapshot, Self::Error> {
        Ok(self.clone())
    }
}

impl CatalogSource for Warehouse {
    type Error = SnapshotError;

    fn snapshot(&self) -> Result<CatalogSnapshot, Self::Error> {
        let rows = self.load_rows()?;
        let snapshot = CatalogSnapshot::from_rows(rows)?;
        debug!(
            tags = snapshot.catalog.len(),
            fingerprint = snapshot.fingerprint(),
            "loaded catalog snapshot from warehouse"
        );
        Ok(snapshot)
    }
}
