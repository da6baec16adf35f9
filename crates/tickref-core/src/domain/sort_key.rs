use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Ordering key derived from an instrument or strategy name.
///
/// Plain lexicographic comparison of two keys follows the chronological or
/// tenor order of the names they were derived from. Keys are not unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortKey(String);

impl SortKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SortKey> for String {
    fn from(value: SortKey) -> Self {
        value.0
    }
}

impl PartialEq<str> for SortKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SortKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
