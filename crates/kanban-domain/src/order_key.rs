//! Fixed-point order keys.
//!
//! Siblings in a container are sorted by ascending [`OrderKey`]. Keys are
//! stored as signed 64-bit integers with [`KEY_SCALE`] sub-units per whole
//! unit, so midpoints are exact integer arithmetic and never drift the way
//! repeated floating point halving does. On the wire a key is a plain decimal
//! number (`1000`, `1500.5`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Sub-units per whole unit.
pub const KEY_SCALE: i64 = 1_000_000;

/// Whole units between neighbours after a renumbering, and the offset used
/// when inserting before the first or after the last sibling.
pub const KEY_STEP: i64 = 1_000;

/// Largest raw magnitude a key may take. Keys travel as JSON numbers, and
/// raw values up to this bound survive the decimal round trip exactly.
pub const MAX_RAW: i64 = 1 << 50;

/// No representable key exists between the requested neighbours.
///
/// Always recovered by renumbering the container; never leaves the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no order key left between {lower} and {upper}")]
pub struct PrecisionExhausted {
    pub lower: OrderKey,
    pub upper: OrderKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey(i64);

impl OrderKey {
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Key for a whole number of units, saturating at the representable range.
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(KEY_SCALE))
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / KEY_SCALE as f64
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        let raw = (value * KEY_SCALE as f64).round();
        if raw.is_finite() && raw >= i64::MIN as f64 && raw <= i64::MAX as f64 {
            Some(Self(raw as i64))
        } else {
            None
        }
    }

    /// Evenly spaced key for the item at `index` after a renumbering.
    pub fn spaced(index: usize) -> Self {
        let units = (index as i64).saturating_add(1).saturating_mul(KEY_STEP);
        Self::from_units(units)
    }

    /// Key strictly between `lower` and `upper`.
    pub fn between(lower: Self, upper: Self) -> Result<Self, PrecisionExhausted> {
        let exhausted = PrecisionExhausted { lower, upper };
        let gap = upper.0.checked_sub(lower.0).ok_or(exhausted)?;
        if gap < 2 {
            return Err(exhausted);
        }
        Ok(Self(lower.0 + gap / 2))
    }

    /// Key strictly before `first`, no lower than `-MAX_RAW`.
    pub fn before(first: Self) -> Result<Self, PrecisionExhausted> {
        first
            .0
            .checked_sub(KEY_STEP * KEY_SCALE)
            .filter(|raw| *raw >= -MAX_RAW)
            .map(Self)
            .ok_or(PrecisionExhausted {
                lower: Self(-MAX_RAW),
                upper: first,
            })
    }

    /// Key strictly after `last`, no higher than `MAX_RAW`.
    pub fn after(last: Self) -> Result<Self, PrecisionExhausted> {
        last.0
            .checked_add(KEY_STEP * KEY_SCALE)
            .filter(|raw| *raw <= MAX_RAW)
            .map(Self)
            .ok_or(PrecisionExhausted {
                lower: last,
                upper: Self(MAX_RAW),
            })
    }

    /// Key for a newly created item appended after `max`. Near the upper
    /// bound this halves the remaining room instead of stepping.
    pub fn append_after(max: Option<Self>) -> Result<Self, PrecisionExhausted> {
        match max {
            Some(last) => Self::after(last).or_else(|_| Self::between(last, Self(MAX_RAW))),
            None => Ok(Self::spaced(0)),
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = KEY_SCALE as u64;
        let (whole, frac) = (abs / scale, abs % scale);
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:06}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Serialize for OrderKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for OrderKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        OrderKey::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("order key out of range: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_is_strict() {
        let lo = OrderKey::from_units(10);
        let hi = OrderKey::from_units(20);
        let mid = OrderKey::between(lo, hi).unwrap();
        assert!(lo < mid && mid < hi);
        assert_eq!(mid, OrderKey::from_units(15));
    }

    #[test]
    fn test_between_exhausts_on_adjacent_raw_values() {
        let lo = OrderKey::from_raw(7);
        assert!(OrderKey::between(lo, OrderKey::from_raw(8)).is_err());
        assert!(OrderKey::between(lo, lo).is_err());
        assert_eq!(
            OrderKey::between(lo, OrderKey::from_raw(9)).unwrap(),
            OrderKey::from_raw(8)
        );
    }

    #[test]
    fn test_before_and_after() {
        let key = OrderKey::from_units(10);
        assert!(OrderKey::before(key).unwrap() < key);
        assert!(OrderKey::after(key).unwrap() > key);
        assert!(OrderKey::after(OrderKey::from_raw(i64::MAX)).is_err());
        assert!(OrderKey::before(OrderKey::from_raw(i64::MIN)).is_err());
    }

    #[test]
    fn test_keys_stay_inside_wire_range() {
        let low = OrderKey::from_raw(-MAX_RAW + 1);
        assert!(OrderKey::before(low).is_err());
        let high = OrderKey::from_raw(MAX_RAW - 1);
        assert!(OrderKey::after(high).is_err());

        let appended = OrderKey::append_after(Some(OrderKey::from_raw(MAX_RAW - 10))).unwrap();
        assert!(appended > OrderKey::from_raw(MAX_RAW - 10));
        assert!(appended.raw() <= MAX_RAW);
    }

    #[test]
    fn test_extreme_keys_survive_json_round_trip() {
        for raw in [MAX_RAW, -MAX_RAW, MAX_RAW - 1, -MAX_RAW + 3, 123_456_789_012_345] {
            let key = OrderKey::from_raw(raw);
            let json = serde_json::to_string(&key).unwrap();
            let back: OrderKey = serde_json::from_str(&json).unwrap();
            assert_eq!(back, key, "raw {} came back as {}", raw, back.raw());
        }
    }

    #[test]
    fn test_spaced_keys_are_multiples_of_step() {
        assert_eq!(OrderKey::spaced(0), OrderKey::from_units(1000));
        assert_eq!(OrderKey::spaced(2), OrderKey::from_units(3000));
        assert_eq!(OrderKey::append_after(None).unwrap(), OrderKey::spaced(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderKey::from_units(10).to_string(), "10");
        assert_eq!(OrderKey::from_raw(15_500_000).to_string(), "15.5");
        assert_eq!(OrderKey::from_units(-990).to_string(), "-990");
        assert_eq!(OrderKey::from_raw(-1_500_000).to_string(), "-1.5");
    }

    #[test]
    fn test_serializes_as_decimal_number() {
        let json = serde_json::to_string(&OrderKey::from_raw(15_500_000)).unwrap();
        assert_eq!(json, "15.5");
        let key: OrderKey = serde_json::from_str("150").unwrap();
        assert_eq!(key, OrderKey::from_units(150));
    }
}
