use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Separator used to chain tenors, e.g. `3M_6M`.
pub const TENOR_SEPARATOR: char = '_';

/// Calendar unit of a tenor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TenorUnit {
    #[serde(rename = "D")]
    Day,
    #[serde(rename = "W")]
    Week,
    #[serde(rename = "M")]
    Month,
    #[serde(rename = "Y")]
    Year,
}

impl TenorUnit {
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'D' => Some(Self::Day),
            'W' => Some(Self::Week),
            'M' => Some(Self::Month),
            'Y' => Some(Self::Year),
            _ => None,
        }
    }

    pub const fn code(self) -> char {
        match self {
            Self::Day => 'D',
            Self::Week => 'W',
            Self::Month => 'M',
            Self::Year => 'Y',
        }
    }
}

/// A single `count + unit` duration such as `3M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tenor {
    count: u32,
    unit: TenorUnit,
}

impl Tenor {
    pub fn new(count: u32, unit: TenorUnit) -> Result<Self, CoreError> {
        if count == 0 {
            return Err(invalid(format!("{count}{}", unit.code()), "count must be positive"));
        }
        Ok(Self { count, unit })
    }

    pub const fn count(self) -> u32 {
        self.count
    }

    pub const fn unit(self) -> TenorUnit {
        self.unit
    }
}

impl FromStr for Tenor {
    type Err = CoreError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut chars = input.chars();
        let Some(unit_code) = chars.next_back() else {
            return Err(invalid(input, "tenor cannot be empty"));
        };
        let Some(unit) = TenorUnit::from_code(unit_code) else {
            return Err(invalid(input, "unit must be one of D, W, M, Y"));
        };

        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(invalid(input, "count must be a decimal number"));
        }
        let count = digits
            .parse::<u32>()
            .map_err(|_| invalid(input, "count is out of range"))?;

        Self::new(count, unit).map_err(|_| invalid(input, "count must be positive"))
    }
}

impl Display for Tenor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.count, self.unit.code())
    }
}

/// One or more tenors chained with `_`, e.g. `3M_6M`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenorChain(Vec<Tenor>);

impl TenorChain {
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let tenors = input
            .split(TENOR_SEPARATOR)
            .map(|part| {
                part.parse::<Tenor>()
                    .map_err(|error| match error {
                        CoreError::InvalidTenor { reason, .. } => invalid(input, reason),
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(tenors))
    }

    pub fn tenors(&self) -> &[Tenor] {
        &self.0
    }
}

impl Display for TenorChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, tenor) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{TENOR_SEPARATOR}")?;
            }
            write!(f, "{tenor}")?;
        }
        Ok(())
    }
}

/// Converts a tenor string into a total day count.
pub trait TenorConverter: Send + Sync {
    fn to_days(&self, tenor: &str) -> Result<u32, CoreError>;
}

/// Calendar approximation: a month is 30 days and a year is 365 days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarDayConverter;

impl CalendarDayConverter {
    const fn days_per_unit(unit: TenorUnit) -> u32 {
        match unit {
            TenorUnit::Day => 1,
            TenorUnit::Week => 7,
            TenorUnit::Month => 30,
            TenorUnit::Year => 365,
        }
    }
}

impl TenorConverter for CalendarDayConverter {
    fn to_days(&self, tenor: &str) -> Result<u32, CoreError> {
        let chain = TenorChain::parse(tenor)?;
        chain.tenors().iter().try_fold(0u32, |total, item| {
            item.count()
                .checked_mul(Self::days_per_unit(item.unit()))
                .and_then(|days| total.checked_add(days))
                .ok_or_else(|| invalid(tenor, "day count overflows"))
        })
    }
}

/// Convert a tenor with the default calendar converter.
pub fn tenor_to_days(tenor: &str) -> Result<u32, CoreError> {
    CalendarDayConverter.to_days(tenor)
}

fn invalid(value: impl Into<String>, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidTenor {
        value: value.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_single_tenors() {
        assert_eq!(tenor_to_days("1D").expect("days"), 1);
        assert_eq!(tenor_to_days("2W").expect("days"), 14);
        assert_eq!(tenor_to_days("3M").expect("days"), 90);
        assert_eq!(tenor_to_days("1Y").expect("days"), 365);
    }

    #[test]
    fn sums_chained_tenors() {
        assert_eq!(tenor_to_days("3M_6M").expect("days"), 270);
        assert_eq!(tenor_to_days("1Y_2W_1D").expect("days"), 380);
    }

    #[test]
    fn rejects_malformed_tenors() {
        for input in ["", "M", "3", "3X", "3M_", "_3M", "-3M", "3m", "0M", "1M_0D"] {
            let err = tenor_to_days(input).expect_err("must fail");
            assert!(
                matches!(err, CoreError::InvalidTenor { ref value, .. } if value == input),
                "unexpected error for {input:?}: {err:?}"
            );
        }
    }

    #[test]
    fn rejects_overflowing_counts() {
        let err = tenor_to_days("99999999999Y").expect_err("must fail");
        assert!(matches!(err, CoreError::InvalidTenor { .. }));

        let err = tenor_to_days("4000000000D_4000000000D").expect_err("must fail");
        assert!(matches!(err, CoreError::InvalidTenor { .. }));
    }

    #[test]
    fn chain_round_trips_through_display() {
        let chain = TenorChain::parse("3M_6M").expect("chain");
        assert_eq!(chain.tenors().len(), 2);
        assert_eq!(chain.to_string(), "3M_6M");
    }
}
