use crate::error::AmountError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest units per whole unit (ALGO, credit and ANJ all carry six decimals here).
pub const UNIT: u64 = 1_000_000;

/// ANJ shown per unit of donation-equivalent credit.
pub const ANJ_PER_CREDIT: u64 = 5;

lazy_static! {
    static ref DECIMAL_RE: Regex = Regex::new(r"^([0-9]+)(?:\.([0-9]*))?$").unwrap();
}

// Parses a plain decimal ("12", "0.5", "3.") into six-decimal fixed point,
// rounding half up on the seventh fractional digit.
fn parse_fixed6(input: &str) -> Result<u64, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let caps = DECIMAL_RE
        .captures(trimmed)
        .ok_or_else(|| AmountError::Malformed(trimmed.to_string()))?;

    let whole: u64 = caps[1]
        .parse()
        .map_err(|_| AmountError::Overflow(trimmed.to_string()))?;
    let frac_digits = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    let mut frac: u64 = 0;
    for (i, digit) in frac_digits.bytes().take(6).enumerate() {
        frac += u64::from(digit - b'0') * 10u64.pow(5 - i as u32);
    }
    let round_up = frac_digits.as_bytes().get(6).is_some_and(|d| *d >= b'5');

    whole
        .checked_mul(UNIT)
        .and_then(|v| v.checked_add(frac))
        .and_then(|v| v.checked_add(u64::from(round_up)))
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))
}

// Renders six-decimal fixed point without trailing zeros ("9", "9.6", "0.000001").
fn format_fixed6(value: u64, group_thousands: bool) -> String {
    let whole = value / UNIT;
    let frac = value % UNIT;

    let mut out = if group_thousands {
        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        grouped
    } else {
        whole.to_string()
    };

    if frac > 0 {
        let frac_str = format!("{:06}", frac);
        out.push('.');
        out.push_str(frac_str.trim_end_matches('0'));
    }
    out
}

/// An ALGO amount in micro-units, the chain's smallest denomination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MicroAlgos(pub u64);

impl MicroAlgos {
    pub const ZERO: MicroAlgos = MicroAlgos(0);

    pub fn from_algos(algos: u64) -> Self {
        MicroAlgos(algos.saturating_mul(UNIT))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: MicroAlgos) -> Option<MicroAlgos> {
        self.0.checked_add(other.0).map(MicroAlgos)
    }

    pub fn checked_sub(self, other: MicroAlgos) -> Option<MicroAlgos> {
        self.0.checked_sub(other.0).map(MicroAlgos)
    }
}

impl FromStr for MicroAlgos {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed6(s).map(MicroAlgos)
    }
}

impl fmt::Display for MicroAlgos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ALGO", format_fixed6(self.0, false))
    }
}

/// Simulated token credit kept per address, in donation-equivalent units.
///
/// The string form is what lands in session storage, so it round-trips through
/// `Display`/`FromStr` without the thousands grouping used for display amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Credit(u64);

impl Credit {
    pub const ZERO: Credit = Credit(0);
    /// Largest credit whose token value still fits the fixed-point range.
    pub const MAX: Credit = Credit(u64::MAX / ANJ_PER_CREDIT);

    pub fn from_micros(micros: u64) -> Result<Self, AmountError> {
        if micros > Self::MAX.0 {
            return Err(AmountError::Overflow(format_fixed6(micros, false)));
        }
        Ok(Credit(micros))
    }

    #[cfg(test)]
    pub fn whole(units: u64) -> Self {
        Credit(units * UNIT)
    }

    pub fn checked_add(self, other: Credit) -> Option<Credit> {
        self.0
            .checked_add(other.0)
            .filter(|sum| *sum <= Self::MAX.0)
            .map(Credit)
    }

    /// Display balance: credit times the fixed exchange rate.
    pub fn to_tokens(self) -> TokenAmount {
        // Bounded by MAX, so this cannot overflow.
        TokenAmount(self.0 * ANJ_PER_CREDIT)
    }
}

impl FromStr for Credit {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed6(s).and_then(Credit::from_micros)
    }
}

impl fmt::Display for Credit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed6(self.0, false))
    }
}

/// A displayed ANJ quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    /// Whole tokens for static amounts such as poll costs.
    pub fn whole(tokens: u64) -> Self {
        TokenAmount(tokens.saturating_mul(UNIT))
    }

    /// Whole tokens coming off the ledger; None when they exceed the range.
    pub fn checked_whole(tokens: u64) -> Option<Self> {
        tokens.checked_mul(UNIT).map(TokenAmount)
    }

    pub fn checked_sub(self, other: TokenAmount) -> Option<TokenAmount> {
        self.0.checked_sub(other.0).map(TokenAmount)
    }

    /// Converts back through the exchange rate. Exact for every amount reachable
    /// from a credit, since those are always multiples of the rate.
    pub fn to_credit(self) -> Credit {
        Credit(self.0 / ANJ_PER_CREDIT)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ANJ", format_fixed6(self.0, true))
    }
}
