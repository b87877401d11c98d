use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// Money type with 8 decimal places of internal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    /// smallest presentable unit (one cent)
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(8))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(8)))
    }

    /// create from integer amount (reais, dollars, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents)
    pub fn from_minor(amount: i64, scale: u32) -> Self {
        let d = Decimal::from(amount) / Decimal::from(10_u64.pow(scale));
        Money(d.round_dp(8))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    /// round to cents for presentation and persistence of installments
    pub fn to_cents(&self) -> Self {
        self.round_dp(2)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// apply a rate (e.g., 20% of 272.88)
    pub fn share(&self, rate: Rate) -> Self {
        Money((self.0 * rate.as_decimal()).round_dp(8))
    }

    /// `share` returning `None` on overflow
    pub fn checked_share(&self, rate: Rate) -> Option<Self> {
        self.checked_mul(rate.as_decimal())
    }

    pub fn checked_mul(&self, other: Decimal) -> Option<Self> {
        self.0.checked_mul(other).map(|d| Money(d.round_dp(8)))
    }

    pub fn checked_sub(&self, other: Money) -> Option<Self> {
        self.0.checked_sub(other.0).map(|d| Money(d.round_dp(8)))
    }

    /// true when both values agree to the given number of decimal places
    pub fn approx_eq(&self, other: Money, dp: u32) -> bool {
        self.0.round_dp(dp) == other.0.round_dp(dp)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(8))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(8);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(8))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(8);
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(8))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(8))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate type for per-period interest rates and shares.
///
/// stored as a fraction: 5% per month is `0.05`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal fraction (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from fractional percentage (e.g., 4.5 for 4.5%)
    pub fn from_percent_decimal(p: Decimal) -> Self {
        Rate(p / Decimal::from(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// complement of a share (e.g., 20% -> 80%)
    pub fn complement(&self) -> Rate {
        Rate(Decimal::ONE - self.0)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
        assert_eq!(m.to_cents().to_string(), "100.12");
    }

    #[test]
    fn test_cent_precision() {
        let amount = Money::from_minor(1_050, 2);
        assert_eq!(amount, Money::from_str_exact("10.50").unwrap());
        assert_eq!(Money::from_minor(1, 2), Money::CENT);
    }

    #[test]
    fn test_share_of_interest() {
        let interest = Money::from_str_exact("272.88").unwrap();
        let bank = interest.share(Rate::from_percentage(20));
        assert_eq!(bank.to_cents().to_string(), "54.58");
        assert_eq!(Rate::from_percentage(20).complement(), Rate::from_percentage(80));
    }

    #[test]
    fn test_sum_and_sign() {
        let parts = vec![Money::from_major(1), Money::from_major(2), Money::from_major(3)];
        let total: Money = parts.iter().sum();
        assert_eq!(total, Money::from_major(6));

        assert!(!Money::ZERO.is_positive());
        assert!(Money::from_major(-1).is_negative());
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Money::from_major(3).checked_mul(dec!(1.5)), Some(Money::from_str_exact("4.5").unwrap()));
        assert_eq!(Money::from_decimal(Decimal::MAX).checked_mul(dec!(2)), None);
        assert_eq!(Money::from_decimal(Decimal::MIN).checked_sub(Money::ONE), None);
        assert_eq!(
            Money::from_major(100).checked_share(Rate::from_percentage(20)),
            Some(Money::from_major(20))
        );
    }

    #[test]
    fn test_rate_from_percent() {
        let rate = Rate::from_percent_decimal(dec!(4.5));
        assert_eq!(rate.as_decimal(), dec!(0.045));
        assert_eq!(rate.to_string(), "4.5%");
    }
}
