//! Behavior-driven tests for name canonicalization
//!
//! These tests verify HOW instrument and strategy names are turned into sort
//! keys, focusing on the ordering a consumer observes.

use tickref_core::{
    canonicalize, classify, Canonicalizer, CoreError, NameKind, TenorConverter,
};

// =============================================================================
// Canonicalization: Expiration Codes
// =============================================================================

#[test]
fn when_user_sorts_futures_they_come_out_in_expiration_order() {
    // Given: Contracts listed out of order across a year boundary
    let names = ["EDH24", "EDZ23", "EDH23", "EDM23"];

    // When: User orders them by sort key
    let sorted = Canonicalizer::default().sort_names(names);

    // Then: March < June < December 2023 < March 2024
    assert_eq!(sorted, vec!["EDH23", "EDM23", "EDZ23", "EDH24"]);
    assert!(canonicalize("EDH23") < canonicalize("EDM23"));
    assert!(canonicalize("EDM23") < canonicalize("EDZ23"));
    assert!(canonicalize("EDZ23") < canonicalize("EDH24"));
}

#[test]
fn when_expiration_letter_is_not_a_month_code_name_is_kept() {
    // Given: A suffix that looks like an expiration code but uses a non-month letter
    // When: User canonicalizes it
    // Then: The name is its own key
    assert_eq!(canonicalize("EDA23"), "EDA23");
    assert_eq!(canonicalize("EDh23"), "EDh23");
}

// =============================================================================
// Canonicalization: Tenor Indices
// =============================================================================

#[test]
fn when_user_canonicalizes_tenor_index_days_are_zero_padded() {
    // Given: A three-month tenor index on USD
    // When: User canonicalizes it
    let key = canonicalize("USDT3MDX");

    // Then: Product, kind, then five-digit day count
    assert_eq!(key.as_str(), "USD".to_owned() + "TDX" + "00090");
    assert_eq!(classify("USDT3MDX"), Some(NameKind::Tdx));
}

#[test]
fn when_user_sorts_tenor_indices_shorter_tenors_come_first() {
    // Given: Tenors in mixed units
    let names = ["USDT1YDX", "USDT2WDX", "USDT3MDX", "USDT1DDX"];

    // When: User orders them
    let sorted = Canonicalizer::default().sort_names(names);

    // Then: Ordering follows day counts, not the raw text
    assert_eq!(sorted, vec!["USDT1DDX", "USDT2WDX", "USDT3MDX", "USDT1YDX"]);
}

#[test]
fn when_tenor_conversion_fails_name_is_its_own_key() {
    // Given: A converter that rejects every tenor
    struct Rejecting;

    impl TenorConverter for Rejecting {
        fn to_days(&self, tenor: &str) -> Result<u32, CoreError> {
            Err(CoreError::InvalidTenor {
                value: tenor.to_owned(),
                reason: String::from("rejected"),
            })
        }
    }

    // When: User canonicalizes a tenor index with it
    let canonicalizer = Canonicalizer::with_converter(Rejecting);

    // Then: Canonicalization still succeeds with the identity key
    assert_eq!(canonicalizer.canonicalize("USDT3MDX"), "USDT3MDX");
}

// =============================================================================
// Canonicalization: Other Conventions
// =============================================================================

#[test]
fn when_names_share_a_non_tenor_convention_they_share_one_key() {
    // Given: Two different index names
    // When: User canonicalizes them
    // Then: Both collapse onto the convention name
    assert_eq!(canonicalize("SPXIDX"), "IDX");
    assert_eq!(canonicalize("NDXIDX"), "IDX");
    assert_eq!(canonicalize("SPXIDX"), canonicalize("NDXIDX"));
}

#[test]
fn when_several_conventions_match_the_first_declared_wins() {
    // Given: A name that is both a period index and a tenor index shape
    // When: User classifies it
    // Then: The earlier declared convention is used
    assert_eq!(classify("ECUST3MPT3MDX"), Some(NameKind::Pdx));
    assert_eq!(canonicalize("ECUST3MPT3MDX"), "PDX");
}

#[test]
fn when_a_convention_is_followed_by_a_strategy_suffix_it_still_applies() {
    // Given: Names that start with a known convention and carry trailing text
    // When: User canonicalizes them
    // Then: The convention decides the key, not the expiration fallback
    assert_eq!(classify("USDT3MDX_Cal"), Some(NameKind::Tdx));
    assert_eq!(canonicalize("USDT3MDX_Cal"), "USDTDX00090");
    assert_eq!(classify("SPXIDXH24"), Some(NameKind::Idx));
    assert_eq!(canonicalize("SPXIDXH24"), "IDX");
}

#[test]
fn when_name_is_unrecognized_it_is_its_own_key() {
    // Given: Names matching no convention
    // When: User canonicalizes them repeatedly
    // Then: The key is the name and never changes
    for name in ["RANDOM", "", "Z9", "EDH23_Cal"] {
        assert_eq!(canonicalize(name), name);
        assert_eq!(canonicalize(name), canonicalize(name));
    }
}

#[test]
fn when_user_sorts_equal_keys_ties_break_by_name() {
    // Given: Names that all collapse onto the same key
    let names = ["NDXIDX", "SPXIDX", "AEXIDX"];

    // When: User orders them
    let sorted = Canonicalizer::default().sort_names(names);

    // Then: Ordering is still deterministic
    assert_eq!(sorted, vec!["AEXIDX", "NDXIDX", "SPXIDX"]);
}
