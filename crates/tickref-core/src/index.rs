//! Reverse instrument → tags index and the spread naming bridge.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::resolver::Resolution;

/// Marker inserted before the last three characters of a spread name.
pub const SPREAD_MARKER: char = 'G';
/// Suffix appended to a spread name to form its market-data instrument.
pub const SPREAD_SUFFIX: &str = "NR";

/// Which resolved names count as instruments in the reverse index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexScope {
    /// Only `inherited_instruments`.
    #[default]
    Inherited,
    /// Inherited instruments plus resolved strategies and custom instruments.
    WithSynthetic,
}

/// Instrument name → tags that cover it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentTagIndex {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl InstrumentTagIndex {
    pub fn build(resolution: &Resolution, scope: IndexScope) -> Self {
        let mut entries: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (tag, resolved) in &resolution.tags {
            let synthetic = match scope {
                IndexScope::Inherited => None,
                IndexScope::WithSynthetic => Some(
                    resolved
                        .strategies
                        .iter()
                        .chain(&resolved.custom_instruments),
                ),
            };

            for instrument in resolved
                .inherited_instruments
                .iter()
                .chain(synthetic.into_iter().flatten())
            {
                entries
                    .entry(instrument.clone())
                    .or_default()
                    .insert(tag.clone());
            }
        }
        Self { entries }
    }

    /// Tags covering `instrument`; empty when the instrument is unknown.
    pub fn instrument_tags(&self, instrument: &str) -> BTreeSet<String> {
        self.entries.get(instrument).cloned().unwrap_or_default()
    }

    /// Tags covering the market-data instrument derived from `spread`.
    pub fn spread_tags(&self, spread: &str) -> BTreeSet<String> {
        self.instrument_tags(&spread_tag_instrument(spread))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries
            .iter()
            .map(|(instrument, tags)| (instrument.as_str(), tags))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Market-data instrument name for a spread: `ED1_2` becomes `EDG1_2NR`.
///
/// Names shorter than three characters get the marker at the front.
pub fn spread_tag_instrument(spread: &str) -> String {
    let split = spread
        .char_indices()
        .rev()
        .nth(2)
        .map_or(0, |(index, _)| index);
    let (base, tail) = spread.split_at(split);

    let mut instrument = String::with_capacity(spread.len() + 1 + SPREAD_SUFFIX.len());
    instrument.push_str(base);
    instrument.push(SPREAD_MARKER);
    instrument.push_str(tail);
    instrument.push_str(SPREAD_SUFFIX);
    instrument
}
