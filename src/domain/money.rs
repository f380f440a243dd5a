use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Boundary default; internal code always carries the currency explicitly.
pub const DEFAULT_CURRENCY: &str = "TWD";

/// Fixed-point amount plus an opaque ISO-4217 code. No floats, no implicit
/// conversion between currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> AppResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AppError::BadRequest(
                "money amount must not be negative".into(),
            ));
        }
        Ok(Self {
            amount: amount.round_dp(2),
            currency: currency.into(),
        })
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: currency.into(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn add(&self, other: &Money) -> AppResult<Money> {
        if self.currency != other.currency {
            return Err(AppError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(Money {
            amount: self.amount + other.amount,
            currency: self.currency.clone(),
        })
    }

    pub fn times(&self, factor: u32) -> Money {
        Money {
            amount: self.amount * Decimal::from(factor),
            currency: self.currency.clone(),
        }
    }
}
