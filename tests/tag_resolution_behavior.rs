//! Behavior-driven tests for tag resolution
//!
//! These tests verify HOW tags expand into products, instruments, strategies
//! and custom indices, and how the reverse instrument index reflects them.

use std::sync::Arc;
use std::thread;

use tickref_core::{
    spread_tag_instrument, CatalogSnapshot, CoreError, FilterKind, IndexScope,
    InstrumentTagIndex, ProductKey, ResolverConfig, TagCatalog, TagResolver, Universes,
};

fn catalog() -> TagCatalog {
    let mut catalog = TagCatalog::new();
    catalog
        .link_product("rates", "ED", "Outright")
        .link_instrument("rates", "SFRH24")
        .add_strategy_filter("rates", "^ed")
        .add_strategy_filter("rates", "(unclosed")
        .link_instrument("curve", "EDH23")
        .add_strategy_filter("curve", "_fly$")
        .add_custom_filter("indices", "idx$")
        .add_tag("untouched");
    catalog
}

fn universes() -> Universes {
    let mut universes = Universes::new();
    universes
        .with_strategy_series(["EDZ23_Cal", "EDH23_Cal"])
        .with_strategy_series(["EDH23_Cal", "TYH23_Fly"])
        .with_strategy_series(["EDM23_Fly"])
        .with_custom_indices(["SPXIDX", "MYBASKET"])
        .add_product_instrument("ED", "Outright", "EDM23")
        .add_product_instrument("ED", "Outright", "EDH23")
        .add_product_instrument("ED", "Outright", "EDG1_2NR")
        .add_product_instrument("TY", "Outright", "TYH23");
    universes
}

// =============================================================================
// Resolution: Filters
// =============================================================================

#[test]
fn when_filter_is_lowercase_it_still_matches_uppercase_names() {
    // Given: A tag with the filter "^ed"
    // When: The catalog is resolved
    let resolution = TagResolver::default().resolve(&catalog(), &universes());

    // Then: Upper-case strategy names match
    let rates = resolution.get("rates").expect("rates");
    assert!(rates.strategies.contains(&String::from("EDH23_Cal")));
    assert_eq!(
        rates.strategies,
        vec!["EDH23_Cal", "EDM23_Fly", "EDZ23_Cal"],
        "matches are deduplicated across series and sorted by sort key"
    );
}

#[test]
fn when_one_filter_is_malformed_the_others_still_resolve() {
    // Given: "rates" carries one valid and one malformed strategy filter
    // When: The catalog is resolved
    let resolution = TagResolver::default().resolve(&catalog(), &universes());

    // Then: The valid filter's matches survive and the bad one is reported
    let rates = resolution.get("rates").expect("rates");
    assert!(!rates.strategies.is_empty());
    assert_eq!(resolution.failures.len(), 1);
    let failure = &resolution.failures[0];
    assert_eq!(failure.tag, "rates");
    assert_eq!(failure.kind, FilterKind::Strategy);
    assert_eq!(failure.pattern, "(unclosed");
    assert!(matches!(failure.to_error(), CoreError::InvalidFilterPattern { .. }));

    // And: Other tags are unaffected
    let curve = resolution.get("curve").expect("curve");
    assert_eq!(curve.strategies, vec!["EDM23_Fly", "TYH23_Fly"]);
    let indices = resolution.get("indices").expect("indices");
    assert_eq!(indices.custom_instruments, vec!["SPXIDX"]);
}

#[test]
fn when_strategy_filter_is_malformed_the_same_tags_custom_filter_still_resolves() {
    // Given: One tag with a malformed strategy filter and a valid custom-index filter
    let mut catalog = TagCatalog::new();
    catalog
        .add_strategy_filter("mixed", "(unclosed")
        .add_custom_filter("mixed", "^spx");

    // When: The catalog is resolved
    let resolution = TagResolver::default().resolve(&catalog, &universes());

    // Then: The custom filter's matches are present
    let mixed = resolution.get("mixed").expect("mixed");
    assert_eq!(mixed.custom_instruments, vec!["SPXIDX"]);
    assert!(mixed.strategies.is_empty());

    // And: Only the strategy filter is reported
    assert_eq!(resolution.failures.len(), 1);
    assert_eq!(resolution.failures[0].tag, "mixed");
    assert_eq!(resolution.failures[0].kind, FilterKind::Strategy);
    assert_eq!(resolution.failures[0].pattern, "(unclosed");
}

#[test]
fn when_tag_has_no_links_every_set_is_empty() {
    // Given: A registered tag with nothing attached
    // When: The catalog is resolved
    let resolution = TagResolver::default().resolve(&catalog(), &universes());

    // Then: It is present with empty sets
    let untouched = resolution.get("untouched").expect("untouched");
    assert!(untouched.products.is_empty());
    assert!(untouched.instruments.is_empty());
    assert!(untouched.strategies.is_empty());
    assert!(untouched.custom_instruments.is_empty());
    assert!(untouched.inherited_instruments.is_empty());
}

// =============================================================================
// Resolution: Inheritance and Reverse Index
// =============================================================================

#[test]
fn when_tag_links_a_product_its_instruments_are_inherited() {
    // Given: "rates" links product ED but not instrument EDM23 directly
    // When: The catalog is resolved and inverted
    let resolution = TagResolver::default().resolve(&catalog(), &universes());
    let index = InstrumentTagIndex::build(&resolution, IndexScope::Inherited);

    // Then: EDM23 is inherited and the reverse index points back to "rates"
    let rates = resolution.get("rates").expect("rates");
    assert_eq!(rates.products, vec![ProductKey::new("ED", "Outright")]);
    assert_eq!(
        rates.inherited_instruments,
        vec!["EDG1_2NR", "EDH23", "EDM23", "SFRH24"]
    );
    assert!(index.instrument_tags("EDM23").contains("rates"));

    // And: An instrument shared by two tags lists both
    let tags: Vec<String> = index.instrument_tags("EDH23").into_iter().collect();
    assert_eq!(tags, vec!["curve", "rates"]);
    assert!(index.instrument_tags("TYH23").is_empty());
}

#[test]
fn when_spread_is_looked_up_it_uses_its_market_data_name() {
    // Given: The generic-roll instrument for spread ED1_2 belongs to product ED
    let resolution = TagResolver::default().resolve(&catalog(), &universes());
    let index = InstrumentTagIndex::build(&resolution, IndexScope::Inherited);

    // When: User looks up the spread
    let tags = index.spread_tags("ED1_2");

    // Then: Tags of the bridged instrument are returned
    assert_eq!(spread_tag_instrument("ED1_2"), "EDG1_2NR");
    assert!(tags.contains("rates"));
}

#[test]
fn when_synthetic_scope_is_configured_strategies_are_indexed() {
    // Given: A resolver configured for the synthetic scope
    let resolver = TagResolver::new(ResolverConfig {
        index_scope: IndexScope::WithSynthetic,
        ..ResolverConfig::default()
    });

    // When: The index is built
    let resolution = resolver.resolve(&catalog(), &universes());
    let index = resolver.instrument_index(&resolution);

    // Then: Strategies and custom instruments appear as instruments
    assert!(index.instrument_tags("EDH23_Cal").contains("rates"));
    assert!(index.instrument_tags("SPXIDX").contains("indices"));
}

// =============================================================================
// Resolution: Determinism and Caching
// =============================================================================

#[test]
fn when_resolution_runs_twice_results_are_identical() {
    // Given: An unchanged snapshot
    let catalog = catalog();
    let universes = universes();

    // When: Two independent resolvers run it
    let first = TagResolver::default().resolve(&catalog, &universes);
    let second = TagResolver::default().resolve(&catalog, &universes);

    // Then: Outputs are byte-identical
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).expect("json"),
        serde_json::to_string(&second).expect("json")
    );
}

#[test]
fn when_resolution_runs_concurrently_every_thread_sees_the_same_result() {
    // Given: One resolver shared across threads
    let resolver = Arc::new(TagResolver::default());
    let snapshot = Arc::new(CatalogSnapshot::new(catalog(), universes()));
    let expected = resolver.resolve(&snapshot.catalog, &snapshot.universes);

    // When: Several threads resolve the same snapshot
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let snapshot = Arc::clone(&snapshot);
            thread::spawn(move || resolver.resolve_snapshot(&snapshot))
        })
        .collect();

    // Then: All agree
    for handle in handles {
        let resolution = handle.join().expect("thread");
        assert_eq!(*resolution, expected);
    }
}

#[test]
fn when_catalog_changes_the_cached_resolution_is_not_reused() {
    // Given: A resolution memoized for one snapshot
    let resolver = TagResolver::default();
    let before = CatalogSnapshot::new(catalog(), universes());
    let first = resolver.resolve_snapshot(&before);

    // When: A tag gains a filter
    let mut after = before.clone();
    after.catalog.add_custom_filter("rates", "^spx");
    let second = resolver.resolve_snapshot(&after);

    // Then: The new snapshot is resolved afresh
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(
        second.get("rates").expect("rates").custom_instruments,
        vec!["SPXIDX"]
    );
    assert!(first.get("rates").expect("rates").custom_instruments.is_empty());
}

#[test]
fn when_caching_is_disabled_nothing_is_memoized() {
    // Given: A resolver with a zero-capacity cache
    let resolver = TagResolver::new(ResolverConfig {
        cache_capacity: 0,
        ..ResolverConfig::default()
    });
    let snapshot = CatalogSnapshot::new(catalog(), universes());

    // When: The snapshot is resolved
    let _ = resolver.resolve_snapshot(&snapshot);

    // Then: It is not cached
    assert!(!resolver.is_cached(&snapshot));
}
