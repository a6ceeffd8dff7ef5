//! Integer minor-unit money.
//!
//! Every amount in the engine is a signed count of minor currency units (kobo,
//! cents). Signed so that negative configuration can be detected and rejected
//! rather than silently wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// `max(0, self - other)`.
    pub fn shortfall_from(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Checked sum; `None` on overflow.
    pub fn checked_sum<I>(iter: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        iter.into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '_' && *c != ',').collect();
        cleaned.parse::<i64>().map(Money)
    }
}

impl From<i64> for Money {
    fn from(minor: i64) -> Self {
        Money(minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall_never_negative() {
        let required = Money::from_minor(500);
        assert_eq!(required.shortfall_from(Money::from_minor(400)), Money::from_minor(100));
        assert_eq!(required.shortfall_from(Money::from_minor(900)), Money::ZERO);
    }

    #[test]
    fn test_checked_sum_overflow() {
        let amounts = vec![Money::from_minor(i64::MAX), Money::from_minor(1)];
        assert_eq!(Money::checked_sum(amounts), None);
        assert_eq!(
            Money::checked_sum(vec![Money::from_minor(2), Money::from_minor(3)]),
            Some(Money::from_minor(5))
        );
    }

    #[test]
    fn test_parse_with_separators() {
        assert_eq!("1,000,000".parse::<Money>().unwrap(), Money::from_minor(1_000_000));
        assert_eq!("1_000".parse::<Money>().unwrap(), Money::from_minor(1_000));
        assert!("abc".parse::<Money>().is_err());
    }
}
