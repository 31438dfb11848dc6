use serde::{Deserialize, Serialize};

use stockroom_core::ValueObject;

/// Price in the smallest currency unit (e.g. cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    pub fn minor(&self) -> u64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Line total for `quantity` units, `None` on overflow.
    pub fn times(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(u64::from(quantity)).map(Money)
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_two_decimal_places() {
        assert_eq!(Money::from_minor(2990).to_string(), "29.90");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
    }

    #[test]
    fn times_detects_overflow() {
        assert_eq!(Money::from_minor(250).times(4), Some(Money::from_minor(1000)));
        assert_eq!(Money::from_minor(u64::MAX).times(2), None);
    }
}
