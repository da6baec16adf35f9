use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::CoreError;

const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];
const CENTURY: u16 = 2000;

/// Futures expiration suffix: a month letter followed by a two-digit year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExpirationCode {
    year: u16,
    month: u8,
}

impl ExpirationCode {
    pub fn new(letter: char, year_offset: u8) -> Result<Self, CoreError> {
        let month = month_for_letter(letter)?;
        Ok(Self {
            year: CENTURY + u16::from(year_offset % 100),
            month,
        })
    }

    /// Split `name` into its base and a trailing expiration code.
    ///
    /// Returns `None` when the last three characters are not an uppercase
    /// month letter followed by two ASCII digits.
    pub fn split_suffix(name: &str) -> Option<(&str, Self)> {
        let (start, _) = name.char_indices().rev().nth(2)?;
        let (base, suffix) = name.split_at(start);

        let mut chars = suffix.chars();
        let letter = chars.next()?;
        let tens = chars.next()?.to_digit(10)?;
        let units = chars.next()?.to_digit(10)?;
        if !letter.is_ascii_uppercase() {
            return None;
        }

        let offset = u8::try_from(tens * 10 + units).ok()?;
        Self::new(letter, offset).ok().map(|code| (base, code))
    }

    pub const fn year(self) -> u16 {
        self.year
    }

    pub const fn month(self) -> u8 {
        self.month
    }

    pub fn letter(self) -> char {
        MONTH_CODES[usize::from(self.month - 1)]
    }

    /// Fixed-width `YYYYMM` rendering used in sort keys.
    pub fn sort_fragment(self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl Display for ExpirationCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}", self.letter(), self.year - CENTURY)
    }
}

/// Map a futures month letter to its calendar month (1..=12).
pub fn month_for_letter(letter: char) -> Result<u8, CoreError> {
    MONTH_CODES
        .iter()
        .position(|code| *code == letter)
        .and_then(|index| u8::try_from(index + 1).ok())
        .ok_or(CoreError::UnknownExpirationLetter { letter })
}
