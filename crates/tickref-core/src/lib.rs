//! # Tickref Core
//!
//! Ticker canonicalization and tag resolution for a market reference-data
//! catalog.
//!
//! ## Overview
//!
//! - **Canonicalizer** turns instrument and strategy names (tenor indices,
//!   generic rolls, index codes, futures expirations) into [`SortKey`]s whose
//!   plain string order is the chronological or tenor order of the names.
//! - **TagResolver** combines explicit tag links with case-insensitive
//!   regular-expression filters evaluated against name universes, producing a
//!   [`TagResolution`] per tag.
//! - **InstrumentTagIndex** inverts resolutions into instrument → tags.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Compiled-filter and resolution caches |
//! | [`canonical`] | Naming conventions and sort keys |
//! | [`catalog`] | Read-only catalog snapshots and the [`CatalogSource`] seam |
//! | [`domain`] | Tenors, expiration codes, sort keys, timestamps |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`index`] | Reverse instrument index and spread naming bridge |
//! | [`resolver`] | Tag resolution |
//!
//! ## Quick Start
//!
//! ```rust
//! use tickref_core::{canonicalize, InstrumentTagIndex, IndexScope, TagCatalog, TagResolver, Universes};
//!
//! assert!(canonicalize("EDH23") < canonicalize("EDZ23"));
//!
//! let mut catalog = TagCatalog::new();
//! catalog
//!     .link_product("rates", "ED", "Outright")
//!     .add_strategy_filter("rates", "^ed");
//!
//! let mut universes = Universes::new();
//! universes
//!     .with_strategy_series(["EDH23_Cal", "TYH23_Fly"])
//!     .add_product_instrument("ED", "Outright", "EDM23");
//!
//! let resolution = TagResolver::default().resolve(&catalog, &universes);
//! let index = InstrumentTagIndex::build(&resolution, IndexScope::Inherited);
//! assert!(index.instrument_tags("EDM23").contains("rates"));
//! ```
//!
//! ## Error Handling
//!
//! [`canonicalize`] never fails. Resolution never fails as a whole: a filter
//! that does not compile is reported as a [`FilterFailure`] next to the
//! partial result.

pub mod cache;
pub mod canonical;
pub mod catalog;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod index;
pub mod resolver;

// Canonicalization
pub use canonical::{canonicalize, classify, default_patterns, Canonicalizer, NameKind, NamePattern};

// Caching
pub use cache::{PatternCache, ResolutionCache};

// Catalog snapshots
pub use catalog::{CatalogSnapshot, CatalogSource, ProductKey, TagCatalog, Universes};

// Domain types
pub use domain::{
    month_for_letter, tenor_to_days, CalendarDayConverter, ExpirationCode, SortKey, Tenor,
    TenorChain, TenorConverter, TenorUnit, UtcDateTime, TENOR_SEPARATOR,
};

// Envelope types
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

// Error types
pub use error::{CoreError, SnapshotError};

// Reverse index
pub use index::{spread_tag_instrument, IndexScope, InstrumentTagIndex, SPREAD_MARKER, SPREAD_SUFFIX};

// Resolution
pub use resolver::{
    FilterFailure, FilterKind, Resolution, ResolverConfig, TagResolution, TagResolver,
};

// Warehouse (re-exported from tickref-warehouse)
pub use tickref_warehouse::{CatalogDocument, ImportReport, Warehouse, WarehouseConfig, WarehouseError};
