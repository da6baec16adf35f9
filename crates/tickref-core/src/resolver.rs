//! Tag resolution: explicit links plus filter matches, per tag.
//!
//! Every tag is resolved independently from one snapshot. A filter that
//! fails to compile contributes nothing and is reported in
//! [`Resolution::failures`]; it never stops other filters or other tags.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{PatternCache, ResolutionCache};
use crate::canonical::Canonicalizer;
use crate::catalog::{CatalogSnapshot, CatalogSource, ProductKey, TagCatalog, Universes};
use crate::index::{IndexScope, InstrumentTagIndex};
use crate::CoreError;

/// Everything a single tag covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResolution {
    pub tag: String,
    pub products: Vec<ProductKey>,
    pub instruments: Vec<String>,
    pub strategy_filters: Vec<String>,
    /// Strategy names matched by any strategy filter, in sort-key order.
    pub strategies: Vec<String>,
    pub custom_instrument_filters: Vec<String>,
    /// Custom index names matched by any custom filter, in sort-key order.
    pub custom_instruments: Vec<String>,
    /// Direct instruments plus the members of every linked product.
    pub inherited_instruments: Vec<String>,
}

/// Universe a filter is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Strategy,
    CustomIndex,
}

/// A tag filter that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterFailure {
    pub tag: String,
    pub kind: FilterKind,
    pub pattern: String,
    pub reason: String,
}

impl FilterFailure {
    fn new(tag: &str, kind: FilterKind, pattern: &str, error: CoreError) -> Self {
        let reason = match error {
            CoreError::InvalidFilterPattern { reason, .. } => reason,
            other => other.to_string(),
        };
        Self {
            tag: tag.to_owned(),
            kind,
            pattern: pattern.to_owned(),
            reason,
        }
    }

    pub fn to_error(&self) -> CoreError {
        CoreError::InvalidFilterPattern {
            pattern: self.pattern.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Resolutions for every tag of a snapshot plus the filters that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub tags: BTreeMap<String, TagResolution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FilterFailure>,
}

impl Resolution {
    pub fn get(&self, tag: &str) -> Option<&TagResolution> {
        self.tags.get(tag)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_for<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a FilterFailure> {
        self.failures.iter().filter(move |failure| failure.tag == tag)
    }
}

/// Resolver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Instrument space used when building the reverse index.
    pub index_scope: IndexScope,
    /// Number of snapshot resolutions to memoize; zero disables memoization.
    pub cache_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            index_scope: IndexScope::Inherited,
            cache_capacity: 8,
        }
    }
}

/// Computes tag resolutions from catalog snapshots.
#[derive(Debug)]
pub struct TagResolver {
    config: ResolverConfig,
    canonicalizer: Canonicalizer,
    patterns: PatternCache,
    resolutions: ResolutionCache,
}

impl Default for TagResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl TagResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_canonicalizer(config, Canonicalizer::default())
    }

    pub fn with_canonicalizer(config: ResolverConfig, canonicalizer: Canonicalizer) -> Self {
        Self {
            config,
            canonicalizer,
            patterns: PatternCache::new(),
            resolutions: ResolutionCache::new(config.cache_capacity),
        }
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Resolve every tag in `catalog` against `universes`.
    pub fn resolve(&self, catalog: &TagCatalog, universes: &Universes) -> Resolution {
        let strategies: Vec<&str> = universes.strategies().collect();
        let custom_indices: Vec<&str> = universes.custom_indices().collect();
        let tags: Vec<&str> = catalog.tags().collect();

        let outcomes: Vec<(TagResolution, Vec<FilterFailure>)> = tags
            .par_iter()
            .map(|tag| self.resolve_one(tag, catalog, universes, &strategies, &custom_indices))
            .collect();

        let mut resolution = Resolution::default();
        for (tag_resolution, failures) in outcomes {
            resolution.failures.extend(failures);
            resolution
                .tags
                .insert(tag_resolution.tag.clone(), tag_resolution);
        }

        debug!(
            tags = resolution.tags.len(),
            failures = resolution.failures.len(),
            "resolved tag catalog"
        );
        resolution
    }

    /// Resolve a single tag; unknown tags resolve to empty sets.
    pub fn resolve_tag(
        &self,
        tag: &str,
        catalog: &TagCatalog,
        universes: &Universes,
    ) -> (TagResolution, Vec<FilterFailure>) {
        let strategies: Vec<&str> = universes.strategies().collect();
        let custom_indices: Vec<&str> = universes.custom_indices().collect();
        self.resolve_one(tag, catalog, universes, &strategies, &custom_indices)
    }

    /// Resolve a snapshot, reusing a memoized result for identical content.
    pub fn resolve_snapshot(&self, snapshot: &CatalogSnapshot) -> Arc<Resolution> {
        if let Some(cached) = self.resolutions.get(snapshot) {
            debug!(fingerprint = snapshot.fingerprint(), "resolution cache hit");
            return cached;
        }

        let resolution = Arc::new(self.resolve(&snapshot.catalog, &snapshot.universes));
        self.resolutions.put(snapshot, Arc::clone(&resolution));
        resolution
    }

    /// Take a snapshot from `source` and resolve it.
    pub fn resolve_from<S: CatalogSource>(&self, source: &S) -> Result<Arc<Resolution>, S::Error> {
        let snapshot = source.snapshot()?;
        Ok(self.resolve_snapshot(&snapshot))
    }

    /// Whether a resolution for this snapshot content is memoized.
    pub fn is_cached(&self, snapshot: &CatalogSnapshot) -> bool {
        self.resolutions.get(snapshot).is_some()
    }

    /// Forget memoized resolutions; compiled filters are kept.
    pub fn invalidate(&self) {
        self.resolutions.clear();
    }

    /// Reverse index over `resolution` using the configured scope.
    pub fn instrument_index(&self, resolution: &Resolution) -> InstrumentTagIndex {
        InstrumentTagIndex::build(resolution, self.config.index_scope)
    }

    fn resolve_one(
        &self,
        tag: &str,
        catalog: &TagCatalog,
        universes: &Universes,
        strategies: &[&str],
        custom_indices: &[&str],
    ) -> (TagResolution, Vec<FilterFailure>) {
        let mut failures = Vec::new();

        let products: Vec<ProductKey> = catalog.products_of(tag).cloned().collect();
        let instruments: Vec<String> = catalog.instruments_of(tag).map(str::to_owned).collect();
        let strategy_filters: Vec<String> =
            catalog.strategy_filters_of(tag).map(str::to_owned).collect();
        let custom_instrument_filters: Vec<String> =
            catalog.custom_filters_of(tag).map(str::to_owned).collect();

        let strategies = self.match_filters(
            tag,
            FilterKind::Strategy,
            &strategy_filters,
            strategies,
            &mut failures,
        );
        let custom_instruments = self.match_filters(
            tag,
            FilterKind::CustomIndex,
            &custom_instrument_filters,
            custom_indices,
            &mut failures,
        );

        let mut inherited: BTreeSet<String> = instruments.iter().cloned().collect();
        for product in &products {
            inherited.extend(universes.instruments_of(product).map(str::to_owned));
        }

        let resolution = TagResolution {
            tag: tag.to_owned(),
            products,
            instruments,
            strategy_filters,
            strategies,
            custom_instrument_filters,
            custom_instruments,
            inherited_instruments: inherited.into_iter().collect(),
        };
        (resolution, failures)
    }

    fn match_filters(
        &self,
        tag: &str,
        kind: FilterKind,
        filters: &[String],
        universe: &[&str],
        failures: &mut Vec<FilterFailure>,
    ) -> Vec<String> {
        let mut matched = BTreeSet::new();
        for pattern in filters {
            match self.patterns.compile(pattern) {
                Ok(regex) => matched.extend(
                    universe
                        .iter()
                        .filter(|name| regex.is_match(name))
                        .map(|name| (*name).to_owned()),
                ),
                Err(error) => {
                    warn!(tag, ?kind, pattern = pattern.as_str(), %error, "skipping invalid tag filter");
                    failures.push(FilterFailure::new(tag, kind, pattern, error));
                }
            }
        }

        let mut ordered: Vec<String> = matched.into_iter().collect();
        ordered.sort_by_cached_key(|name| self.canonicalizer.canonicalize(name));
        ordered
    }
}
