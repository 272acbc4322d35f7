//! Value objects: equality by value, not identity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A non-negative decimal amount of stock.
///
/// Every stored quantity and every ledger amount is a `Quantity`; the type
/// cannot hold a negative value, so arithmetic that would go below zero
/// returns `None` instead of producing one.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Build a quantity, rejecting negative values.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation(format!(
                "quantity cannot be negative (got {value})"
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Build a strictly positive quantity (requested amounts, line quantities).
    pub fn positive(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity must be positive (got {value})"
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Reject quantities with more fractional digits than `max_scale`.
    pub fn ensure_scale(self, max_scale: u32) -> DomainResult<Self> {
        if self.0.normalize().scale() > max_scale {
            return Err(DomainError::validation(format!(
                "quantity {} has more than {max_scale} decimal places",
                self.0
            )));
        }
        Ok(self)
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(|v| Quantity(v.normalize()))
    }

    /// Subtract, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        if other.0 > self.0 {
            return None;
        }
        self.0.checked_sub(other.0).map(|v| Quantity(v.normalize()))
    }

    /// Apply a signed delta, returning `None` if the result would be negative.
    pub fn apply_delta(self, delta: Decimal) -> Option<Quantity> {
        let next = self.0.checked_add(delta)?;
        if next < Decimal::ZERO {
            return None;
        }
        Some(Quantity(next.normalize()))
    }

    pub fn checked_mul(self, factor: Quantity) -> Option<Quantity> {
        self.0.checked_mul(factor.0).map(|v| Quantity(v.normalize()))
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
