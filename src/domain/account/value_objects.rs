use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Account Value Objects
// ============================================================================

/// Supported currencies, serialized as their ISO 4217 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
    Jpy,
    Chf,
    Cny,
    Inr,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Jpy => "JPY",
            Currency::Chf => "CHF",
            Currency::Cny => "CNY",
            Currency::Inr => "INR",
        }
    }

    /// Digits after the decimal point in the usual notation.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::Jpy => 0,
            _ => 2,
        }
    }

    /// Minor units per major unit (100 for USD, 1 for JPY).
    pub fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported currency code: {0}")]
pub struct UnknownCurrency(pub String);

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "CAD" => Ok(Currency::Cad),
            "AUD" => Ok(Currency::Aud),
            "JPY" => Ok(Currency::Jpy),
            "CHF" => Ok(Currency::Chf),
            "CNY" => Ok(Currency::Cny),
            "INR" => Ok(Currency::Inr),
            _ => Err(UnknownCurrency(s.to_string())),
        }
    }
}

/// A signed amount in the currency's minor unit (cents for USD).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: Currency,
}

impl Money {
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Self {
        Self { amount_minor, currency }
    }

    /// Whole major units, e.g. `Money::from_major(100, Currency::Usd)` is 100.00 USD.
    pub fn from_major(amount: i64, currency: Currency) -> Self {
        Self::from_minor(amount.saturating_mul(currency.minor_per_major()), currency)
    }

    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Sum of two amounts, `None` if the currencies differ or the result
    /// does not fit in an `i64`.
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        if !self.same_currency(other) {
            return None;
        }
        let amount = self.amount_minor.checked_add(other.amount_minor)?;
        Some(Money::from_minor(amount, self.currency))
    }

    /// `self - other`, with the same failure cases as `checked_add`.
    pub fn checked_sub(&self, other: &Money) -> Option<Money> {
        if !self.same_currency(other) {
            return None;
        }
        let amount = self.amount_minor.checked_sub(other.amount_minor)?;
        Some(Money::from_minor(amount, self.currency))
    }

    pub fn negate(&self) -> Money {
        Money::from_minor(self.amount_minor.saturating_neg(), self.currency)
    }
}

/// Formats as `70.00 USD` / `-30.00 USD` / `700 JPY`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        let places = self.currency.decimal_places();

        if places == 0 {
            return write!(f, "{sign}{abs} {}", self.currency);
        }

        let scale = 10_u64.pow(places);
        write!(
            f,
            "{sign}{}.{:0width$} {}",
            abs / scale,
            abs % scale,
            self.currency,
            width = places as usize
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    CreditCard,
    Investment,
    Loan,
    MoneyMarket,
    CertificateOfDeposit,
    RetirementAccount,
    Mortgage,
    LineOfCredit,
}
