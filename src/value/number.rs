//! Arbitrary-precision decimal numbers
//!
//! Numbers are kept as a sign, a digit string and a base-10 exponent, so a
//! literal read from the API or the host tool survives a round trip without
//! passing through `f64`.

use super::ValueError;
use std::fmt;
use std::str::FromStr;

/// Largest digit count before the decimal point printed without an exponent
const MAX_PLAIN_DIGITS: i64 = 21;

/// Smallest (negative) leading-zero run printed without an exponent
const MIN_PLAIN_EXPONENT: i64 = -6;

/// Bound on the decimal point position, so digit and exponent arithmetic
/// cannot overflow
const MAX_DECIMAL_EXPONENT: i64 = i32::MAX as i64;

/// Normalized decimal: `(-1)^negative * digits * 10^exponent`.
///
/// `digits` has no leading or trailing zeros; zero is the empty string with
/// exponent 0, so derived equality is numeric equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigNumber {
    negative: bool,
    digits: String,
    exponent: i64,
}

impl BigNumber {
    pub fn zero() -> Self {
        Self {
            negative: false,
            digits: String::new(),
            exponent: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// True when the value has no fractional part
    pub fn is_integer(&self) -> bool {
        self.exponent >= 0
    }

    fn from_parts(negative: bool, raw_digits: &str, exponent: i64) -> Option<Self> {
        let digits = raw_digits.trim_start_matches('0');
        let significant = digits.trim_end_matches('0');
        if significant.is_empty() {
            return Some(Self::zero());
        }
        let shift = (digits.len() - significant.len()) as i64;
        let exponent = exponent.checked_add(shift)?;
        let point = (significant.len() as i64).checked_add(exponent)?;
        if point.unsigned_abs() > MAX_DECIMAL_EXPONENT as u64
            || exponent.unsigned_abs() > MAX_DECIMAL_EXPONENT as u64
        {
            return None;
        }
        Some(Self {
            negative,
            digits: significant.to_string(),
            exponent,
        })
    }

    /// Exact conversion; `None` for fractions and out-of-range values
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_zero() {
            return Some(0);
        }
        if self.exponent < 0 || self.digits.len() as i64 + self.exponent > 19 {
            return None;
        }
        let mut text = String::with_capacity(20);
        if self.negative {
            text.push('-');
        }
        text.push_str(&self.digits);
        text.extend(std::iter::repeat('0').take(self.exponent as usize));
        text.parse().ok()
    }

    /// Nearest `f64`; may lose precision
    pub fn to_f64(&self) -> Option<f64> {
        self.to_string().parse().ok()
    }
}

impl Default for BigNumber {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for BigNumber {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValueError::Decoding {
            format: "number",
            message: format!("invalid number literal {s:?}"),
        };

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
            Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
            None => (unsigned, None),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(invalid());
        }

        let exponent = match exponent {
            Some(text) => text.parse::<i64>().map_err(|_| invalid())?,
            None => 0,
        };
        let exponent = exponent
            .checked_sub(frac_part.len() as i64)
            .ok_or_else(invalid)?;

        let digits = format!("{int_part}{frac_part}");
        Self::from_parts(negative, &digits, exponent).ok_or_else(invalid)
    }
}

impl fmt::Display for BigNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }

        let len = self.digits.len() as i64;
        // digits before the decimal point
        let point = len + self.exponent;

        if self.exponent >= 0 && point <= MAX_PLAIN_DIGITS {
            f.write_str(&self.digits)?;
            for _ in 0..self.exponent {
                f.write_str("0")?;
            }
            Ok(())
        } else if point > 0 && point <= MAX_PLAIN_DIGITS {
            let (int_part, frac_part) = self.digits.split_at(point as usize);
            write!(f, "{int_part}.{frac_part}")
        } else if point <= 0 && point > MIN_PLAIN_EXPONENT {
            f.write_str("0.")?;
            for _ in 0..-point {
                f.write_str("0")?;
            }
            f.write_str(&self.digits)
        } else {
            let (first, rest) = self.digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{rest}")?;
            }
            let exp = point - 1;
            if exp >= 0 {
                write!(f, "e+{exp}")
            } else {
                write!(f, "e{exp}")
            }
        }
    }
}

impl From<i64> for BigNumber {
    fn from(value: i64) -> Self {
        let digits = value.unsigned_abs().to_string();
        Self::from_parts(value < 0, &digits, 0).unwrap_or_default()
    }
}

impl TryFrom<f64> for BigNumber {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ValueError::Decoding {
                format: "number",
                message: format!("{value} is not a finite number"),
            });
        }
        // Display for f64 prints the shortest round-tripping decimal
        value.to_string().parse()
    }
}
