use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------     MinorUnits       --------------------------------------------------------
/// An amount of money in an asset's smallest unit (e.g. cents for USD at scale 2).
///
/// Open Payments never puts floats on the wire; every amount travels as a base-10 integer string plus an asset
/// scale. `MinorUnits` is the arithmetic-friendly form of that integer.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MinorUnits(i64);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor units: {0}")]
pub struct AmountConversionError(String);

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MinorUnits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MinorUnits {}

impl TryFrom<u64> for MinorUnits {
    type Error = AmountConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(AmountConversionError(format!("Value {value} is too large to convert to MinorUnits")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for MinorUnits {
    type Err = AmountConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| AmountConversionError(format!("'{s}' is not a base-10 integer amount. {e}")))?;
        if value < 0 {
            return Err(AmountConversionError(format!("Amount values must be non-negative. Got {value}")));
        }
        Ok(Self(value))
    }
}

impl Add for MinorUnits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for MinorUnits {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for MinorUnits {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

//--------------------------------------     Amount       ------------------------------------------------------------
/// The Open Payments wire representation of an amount.
///
/// `value` is always a base-10 non-negative integer string in the asset's smallest unit. Converting between scales
/// is the caller's responsibility; this type never does arithmetic on the string itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub value: String,
    pub asset_code: String,
    pub asset_scale: u8,
}

impl Amount {
    pub fn new(value: MinorUnits, asset_code: &str, asset_scale: u8) -> Self {
        Self { value: value.value().to_string(), asset_code: asset_code.to_string(), asset_scale }
    }

    /// Parse the integer-string value back into [MinorUnits].
    pub fn minor_units(&self) -> Result<MinorUnits, AmountConversionError> {
        self.value.parse()
    }

    /// True if `other` is denominated in the same asset at the same scale.
    pub fn same_asset(&self, other: &Amount) -> bool {
        self.asset_code == other.asset_code && self.asset_scale == other.asset_scale
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (scale {})", self.value, self.asset_code, self.asset_scale)
    }
}

/// Convert a human-readable decimal amount (e.g. `12.50`) into minor units at the given scale.
///
/// Rounds half away from zero, like the storefront price fields expect. Fails on negative or non-finite input,
/// or when the scaled value overflows.
pub fn minor_units_from_decimal(amount: f64, asset_scale: u8) -> Result<MinorUnits, AmountConversionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AmountConversionError(format!("'{amount}' is not a valid decimal amount")));
    }
    let scaled = amount * 10f64.powi(i32::from(asset_scale));
    let rounded = scaled.round();
    if rounded > i64::MAX as f64 {
        return Err(AmountConversionError(format!("'{amount}' overflows at scale {asset_scale}")));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(MinorUnits::from(rounded as i64))
}

/// Split `total` into a seller share and a referral share.
///
/// The seller receives `floor(total * seller_percent / 100)` and the referral receives the remainder, so the two
/// parts always sum to `total` exactly. Callers must check that both parts are positive before using the split.
pub fn split_minor_amount(total: MinorUnits, seller_percent: u8) -> (MinorUnits, MinorUnits) {
    let seller = MinorUnits::from(total.value() * i64::from(seller_percent) / 100);
    let referral = total - seller;
    (seller, referral)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minor_units_parse() {
        let v = "1250".parse::<MinorUnits>().expect("Failed to parse integer amount");
        assert_eq!(v.value(), 1250);
        assert!("12.50".parse::<MinorUnits>().is_err());
        assert!("-5".parse::<MinorUnits>().is_err());
        assert!("plenty".parse::<MinorUnits>().is_err());
    }

    #[test]
    fn amount_round_trip() {
        let amount = Amount::new(MinorUnits::from(995), "USD", 2);
        assert_eq!(amount.value, "995");
        assert_eq!(amount.minor_units().unwrap(), MinorUnits::from(995));
        let json = serde_json::to_value(&amount).unwrap();
        assert_eq!(json["assetCode"], "USD");
        assert_eq!(json["assetScale"], 2);
        assert_eq!(json["value"], "995");
    }

    #[test]
    fn decimal_conversion_rounds() {
        assert_eq!(minor_units_from_decimal(12.50, 2).unwrap().value(), 1250);
        assert_eq!(minor_units_from_decimal(0.125, 2).unwrap().value(), 13);
        assert_eq!(minor_units_from_decimal(3.0, 0).unwrap().value(), 3);
        assert!(minor_units_from_decimal(-1.0, 2).is_err());
        assert!(minor_units_from_decimal(f64::NAN, 2).is_err());
    }

    #[test]
    fn split_is_exact() {
        let (seller, referral) = split_minor_amount(MinorUnits::from(1000), 95);
        assert_eq!(seller.value(), 950);
        assert_eq!(referral.value(), 50);
        // Remainders always go to the referral side.
        let (seller, referral) = split_minor_amount(MinorUnits::from(999), 95);
        assert_eq!(seller.value(), 949);
        assert_eq!(referral.value(), 50);
        assert_eq!((seller + referral).value(), 999);
        // Tiny totals can leave one side empty; the caller must reject those.
        let (seller, referral) = split_minor_amount(MinorUnits::from(1), 95);
        assert_eq!(seller.value(), 0);
        assert_eq!(referral.value(), 1);
    }

    #[test]
    fn same_asset_check() {
        let a = Amount::new(MinorUnits::from(100), "USD", 2);
        let b = Amount::new(MinorUnits::from(500), "USD", 2);
        let c = Amount::new(MinorUnits::from(500), "EUR", 2);
        let d = Amount::new(MinorUnits::from(500), "USD", 4);
        assert!(a.same_asset(&b));
        assert!(!a.same_asset(&c));
        assert!(!a.same_asset(&d));
    }
}
