//! Sort-key canonicalization of instrument and strategy names.
//!
//! Names are classified against an ordered list of naming conventions; the
//! first convention whose pattern matches a prefix of the name decides the
//! key, so `USDT3MDX_Cal` is a tenor index.
//! Names matching no convention fall back to futures expiration decoding and
//! finally to the name itself.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CalendarDayConverter, ExpirationCode, SortKey, TenorConverter};

/// Width of the zero-padded day count in tenor keys.
const TENOR_DAYS_WIDTH: usize = 5;

/// Naming convention recognised by the canonicalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    /// Forward swap, `<product>F<n><u><n><u>SW`.
    #[serde(rename = "FSW")]
    Fsw,
    /// Generic roll, `<product>G<generic>NR`.
    #[serde(rename = "GNR")]
    Gnr,
    /// Index, `<product>IDX`.
    #[serde(rename = "IDX")]
    Idx,
    /// Equity, `<product>EQY`.
    #[serde(rename = "EQY")]
    Eqy,
    /// Period index, `<product>P<period>DX`.
    #[serde(rename = "PDX")]
    Pdx,
    /// Tenor index, `<product>T<tenor>DX`.
    #[serde(rename = "TDX")]
    Tdx,
    /// Tenor generic, `<product>T<tenor><generic>GN`.
    #[serde(rename = "TGN")]
    Tgn,
    /// Listed option, `<underlying><C|P><yyyymmdd><style><strike>`.
    #[serde(rename = "Option")]
    Option,
}

impl NameKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fsw => "FSW",
            Self::Gnr => "GNR",
            Self::Idx => "IDX",
            Self::Eqy => "EQY",
            Self::Pdx => "PDX",
            Self::Tdx => "TDX",
            Self::Tgn => "TGN",
            Self::Option => "Option",
        }
    }

    /// Whether keys for this kind embed a tenor day count.
    pub const fn uses_tenor(self) -> bool {
        matches!(self, Self::Tdx)
    }
}

/// Declaration order is match order. Patterns anchor at the start only.
const PATTERN_SOURCES: [(NameKind, &str); 8] = [
    (
        NameKind::Fsw,
        r"^(?P<product>\w+)F(?P<tenor1>\d+)(?P<tenorUnit1>[DWMY])(?P<tenor2>\d+)(?P<tenorUnit2>[DWMY])SW",
    ),
    (
        NameKind::Gnr,
        r"^(?P<product>\w+)G(?P<generic>(?:\d+|\w)(?:_\d+|\w){0,2})NR",
    ),
    (NameKind::Idx, r"^(?P<product>\w+)IDX"),
    (NameKind::Eqy, r"^(?P<product>\w+)EQY"),
    // PRIT and RCPP only ever take the free-form code branch; `.*` makes the
    // branch choice irrelevant to whether the name matches.
    (
        NameKind::Pdx,
        r"^(?P<product>EC\w+|PRIT|RCPP|(?:US|CA|EZ)0[AB]NM)P(?:(?P<quarter>Q[1-4])?(?P<month>[FGHJKMNQUVXZ])?(?P<period>\d{4})|(?P<code>.*))DX",
    ),
    (
        NameKind::Tdx,
        r"^(?P<product>\w+)T(?P<tenor>\d+[DWMY](?:_\d+[DWMY])?)DX",
    ),
    (
        NameKind::Tgn,
        r"^(?P<product>\w+)T(?P<tenor>\d+[DWMY](?:_\d+[DWMY])?)(?P<generic>(?:\d+|\w)+)GN",
    ),
    (
        NameKind::Option,
        r"^(?P<underlying>\w+)(?P<callput>C|P)(?P<maturity>\d{8})(?P<optionType>[DWMEY])(?P<strike>\d+(?:_\d+)?)",
    ),
];

/// A naming convention and its compiled pattern.
#[derive(Debug, Clone)]
pub struct NamePattern {
    kind: NameKind,
    regex: Regex,
}

impl NamePattern {
    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

}

/// The built-in naming conventions, in match order.
pub fn default_patterns() -> Vec<NamePattern> {
    PATTERN_SOURCES
        .iter()
        .map(|(kind, source)| NamePattern {
            kind: *kind,
            regex: Regex::new(source).expect("built-in name pattern must compile"),
        })
        .collect()
}

/// Derives [`SortKey`]s from names.
pub struct Canonicalizer {
    patterns: Vec<NamePattern>,
    converter: Box<dyn TenorConverter>,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::with_converter(CalendarDayConverter)
    }
}

impl std::fmt::Debug for Canonicalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canonicalizer")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl Canonicalizer {
    pub fn with_converter(converter: impl TenorConverter + 'static) -> Self {
        Self {
            patterns: default_patterns(),
            converter: Box::new(converter),
        }
    }

    /// First naming convention matching `name`, if any.
    pub fn classify(&self, name: &str) -> Option<NameKind> {
        self.first_match(name).map(NamePattern::kind)
    }

    /// Derive the sort key for `name`. Never fails; unknown shapes map to themselves.
    pub fn canonicalize(&self, name: &str) -> SortKey {
        if let Some(pattern) = self.first_match(name) {
            return self.key_for_pattern(pattern, name);
        }

        if let Some((base, code)) = ExpirationCode::split_suffix(name) {
            return SortKey::new(format!("{base}{}", code.sort_fragment()));
        }

        SortKey::new(name)
    }

    /// Order names by sort key, breaking ties by the name itself.
    pub fn sort_names<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keyed: Vec<(SortKey, String)> = names
            .into_iter()
            .map(|name| {
                let name: String = name.into();
                (self.canonicalize(&name), name)
            })
            .collect();
        keyed.sort();
        keyed.into_iter().map(|(_, name)| name).collect()
    }

    fn first_match(&self, name: &str) -> Option<&NamePattern> {
        self.patterns.iter().find(|pattern| pattern.is_match(name))
    }

    fn key_for_pattern(&self, pattern: &NamePattern, name: &str) -> SortKey {
        let kind = pattern.kind;
        if !kind.uses_tenor() {
            // Every name of this kind shares one key.
            return SortKey::new(kind.as_str());
        }

        let Some(captures) = pattern.regex.captures(name) else {
            return SortKey::new(name);
        };
        let (Some(product), Some(tenor)) = (captures.name("product"), captures.name("tenor"))
        else {
            return SortKey::new(name);
        };

        match self.converter.to_days(tenor.as_str()) {
            Ok(days) => SortKey::new(format!(
                "{}{}{:0width$}",
                product.as_str(),
                kind.as_str(),
                days,
                width = TENOR_DAYS_WIDTH
            )),
            Err(error) => {
                debug!(name, %error, "tenor conversion failed; using name as sort key");
                SortKey::new(name)
            }
        }
    }
}

fn shared() -> &'static Canonicalizer {
    static SHARED: OnceLock<Canonicalizer> = OnceLock::new();
    SHARED.get_or_init(Canonicalizer::default)
}

/// Derive the sort key for `name` with the default conventions and calendar converter.
pub fn canonicalize(name: &str) -> SortKey {
    shared().canonicalize(name)
}

/// Naming convention of `name` under the default conventions.
pub fn classify(name: &str) -> Option<NameKind> {
    shared().classify(name)
}
