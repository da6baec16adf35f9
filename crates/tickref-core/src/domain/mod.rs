//! # Domain Types
//!
//! Value types shared by the canonicalizer and the tag resolver.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tenor`] / [`TenorChain`] | `3M`, `3M_6M` style durations |
//! | [`TenorConverter`] | Tenor string to day count |
//! | [`ExpirationCode`] | Futures month letter + two-digit year |
//! | [`SortKey`] | Ordering key produced by canonicalization |
//! | [`UtcDateTime`] | UTC timestamp used in envelopes |

mod expiration;
mod sort_key;
mod tenor;
mod timestamp;

pub use expiration::{month_for_letter, ExpirationCode};
pub use sort_key::SortKey;
pub use tenor::{
    tenor_to_days, CalendarDayConverter, Tenor, TenorChain, TenorConverter, TenorUnit,
    TENOR_SEPARATOR,
};
pub use timestamp::UtcDateTime;
