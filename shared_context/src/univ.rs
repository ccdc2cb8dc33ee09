// Unbounded arithmetic for universal integer and universal real.
//
// Ada evaluates every numeric literal, and every static expression
// over literals, at unbounded precision; the value only narrows to
// the target type at the point of use. This module wraps the bignum
// machinery behind the two value types the analyzer works with and
// owns the literal syntax (underscores, based forms, exponents).

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Pow, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// A universal integer value: unbounded precision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UInt(BigInt);

/// A universal real value: an exact rational.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UReal(BigRational);

impl UInt {
    pub fn from_i64(value: i64) -> Self {
        UInt(BigInt::from(value))
    }

    /// Narrow to i64; `None` when the value is out of range, which at
    /// a use site is an analysis-time constraint violation.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    pub fn add(&self, other: &UInt) -> UInt {
        UInt(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &UInt) -> UInt {
        UInt(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &UInt) -> UInt {
        UInt(&self.0 * &other.0)
    }

    /// Integer division truncating toward zero, as Ada requires.
    /// `None` on division by zero.
    pub fn div(&self, other: &UInt) -> Option<UInt> {
        if other.0.is_zero() {
            return None;
        }
        Some(UInt(&self.0 / &other.0))
    }

    /// Remainder with the sign of the dividend (Ada `rem`).
    pub fn rem(&self, other: &UInt) -> Option<UInt> {
        if other.0.is_zero() {
            return None;
        }
        Some(UInt(&self.0 % &other.0))
    }

    /// Modulus with the sign of the divisor (Ada `mod`).
    pub fn modulo(&self, other: &UInt) -> Option<UInt> {
        if other.0.is_zero() {
            return None;
        }
        let mut r = &self.0 % &other.0;
        if !r.is_zero() && (r.is_negative() != other.0.is_negative()) {
            r += &other.0;
        }
        Some(UInt(r))
    }

    pub fn neg(&self) -> UInt {
        UInt(-&self.0)
    }

    pub fn abs(&self) -> UInt {
        UInt(self.0.abs())
    }

    /// Exponentiation; the exponent must be non-negative for integer
    /// bases.
    pub fn pow(&self, exponent: u32) -> UInt {
        UInt(Pow::pow(&self.0, exponent))
    }

    pub fn compare(&self, other: &UInt) -> Ordering {
        self.0.cmp(&other.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Exact conversion to universal real, for mixed literal
    /// expressions.
    pub fn to_real(&self) -> UReal {
        UReal(BigRational::from_integer(self.0.clone()))
    }
}

impl UReal {
    pub fn from_f64(value: f64) -> Option<Self> {
        BigRational::from_float(value).map(UReal)
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    pub fn add(&self, other: &UReal) -> UReal {
        UReal(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &UReal) -> UReal {
        UReal(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &UReal) -> UReal {
        UReal(&self.0 * &other.0)
    }

    pub fn div(&self, other: &UReal) -> Option<UReal> {
        if other.0.is_zero() {
            return None;
        }
        Some(UReal(&self.0 / &other.0))
    }

    pub fn neg(&self) -> UReal {
        UReal(-&self.0)
    }

    pub fn abs(&self) -> UReal {
        UReal(self.0.abs())
    }

    /// Integer exponentiation, negative exponents allowed for reals.
    pub fn pow(&self, exponent: i32) -> Option<UReal> {
        if exponent >= 0 {
            Some(UReal(Pow::pow(self.0.clone(), exponent as u32)))
        } else {
            if self.0.is_zero() {
                return None;
            }
            Some(UReal(Pow::pow(self.0.clone(), exponent)))
        }
    }

    pub fn compare(&self, other: &UReal) -> Ordering {
        self.0.cmp(&other.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The number of `small` units in this value, rounded to nearest;
    /// used to represent fixed point values as i64 multiples.
    pub fn scaled_by(&self, small: f64) -> Option<i64> {
        let small = BigRational::from_float(small)?;
        if small.is_zero() {
            return None;
        }
        let scaled = &self.0 / small;
        scaled.round().to_integer().to_i64()
    }
}

/// Parse an Ada integer literal: decimal with optional exponent, or
/// based (`base#digits#` with optional exponent). Underscores are
/// separators. Returns `None` for malformed text, which the lexer's
/// token patterns normally rule out.
pub fn parse_integer_literal(text: &str) -> Option<UInt> {
    let text: String = text.chars().filter(|c| *c != '_').collect();

    if let Some((base_text, rest)) = text.split_once('#') {
        let base: u32 = base_text.parse().ok()?;
        if !(2..=16).contains(&base) {
            return None;
        }
        let (digits, exponent_text) = rest.split_once('#')?;
        let mantissa = BigInt::parse_bytes(digits.as_bytes(), base)?;
        let exponent = parse_exponent(exponent_text)?;
        if exponent < 0 {
            return None; // integer literals require non-negative exponents
        }
        return Some(UInt(mantissa * Pow::pow(BigInt::from(base), exponent as u32)));
    }

    let (digits, exponent) = match text.find(['e', 'E']) {
        Some(pos) => {
            let exponent = parse_exponent(&text[pos..])?;
            (&text[..pos], exponent)
        }
        None => (text.as_str(), 0),
    };
    if exponent < 0 {
        return None;
    }
    let mantissa = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    Some(UInt(mantissa * Pow::pow(BigInt::from(10u32), exponent as u32)))
}

/// Parse an Ada real literal (a literal containing a point), decimal
/// or based, with an optional signed exponent.
pub fn parse_real_literal(text: &str) -> Option<UReal> {
    let text: String = text.chars().filter(|c| *c != '_').collect();

    if let Some((base_text, rest)) = text.split_once('#') {
        let base: u32 = base_text.parse().ok()?;
        if !(2..=16).contains(&base) {
            return None;
        }
        let (digits, exponent_text) = rest.split_once('#')?;
        let (int_part, frac_part) = digits.split_once('.')?;
        let exponent = parse_exponent(exponent_text)?;

        let int_value = BigInt::parse_bytes(int_part.as_bytes(), base)?;
        let frac_value = if frac_part.is_empty() {
            BigInt::zero()
        } else {
            BigInt::parse_bytes(frac_part.as_bytes(), base)?
        };
        let scale = Pow::pow(BigInt::from(base), frac_part.len() as u32);
        let mantissa = BigRational::new(int_value * &scale + frac_value, scale);
        return Some(UReal(mantissa * base_power(base, exponent)));
    }

    let (digits, exponent) = match text.find(['e', 'E']) {
        Some(pos) => {
            let exponent = parse_exponent(&text[pos..])?;
            (&text[..pos], exponent)
        }
        None => (text.as_str(), 0),
    };
    let (int_part, frac_part) = digits.split_once('.')?;
    let int_value = BigInt::parse_bytes(int_part.as_bytes(), 10)?;
    let frac_value = if frac_part.is_empty() {
        BigInt::zero()
    } else {
        BigInt::parse_bytes(frac_part.as_bytes(), 10)?
    };
    let scale = Pow::pow(BigInt::from(10u32), frac_part.len() as u32);
    let mantissa = BigRational::new(int_value * &scale + frac_value, scale);
    Some(UReal(mantissa * base_power(10, exponent)))
}

/// Parse the `E+nn` / `e-nn` tail of a literal. An empty tail is
/// exponent zero.
fn parse_exponent(text: &str) -> Option<i64> {
    if text.is_empty() {
        return Some(0);
    }
    let text = text.strip_prefix(['e', 'E'])?;
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude: i64 = digits.parse().ok()?;
    Some(sign * magnitude)
}

fn base_power(base: u32, exponent: i64) -> BigRational {
    let base = BigRational::from_integer(BigInt::from(base));
    if exponent >= 0 {
        Pow::pow(base, exponent as u32)
    } else {
        Pow::pow(base, -(exponent as i32) as u32).recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_based_integers_agree() {
        let decimal = parse_integer_literal("255").unwrap();
        let hex = parse_integer_literal("16#FF#").unwrap();
        let binary = parse_integer_literal("2#1111_1111#").unwrap();

        assert_eq!(decimal, hex);
        assert_eq!(decimal, binary);
        assert_eq!(decimal.to_i64(), Some(255));
    }

    #[test]
    fn integer_exponents_scale_the_mantissa() {
        let value = parse_integer_literal("1E6").unwrap();
        assert_eq!(value.to_i64(), Some(1_000_000));

        let based = parse_integer_literal("2#1#E8").unwrap();
        assert_eq!(based.to_i64(), Some(256));

        // negative exponents are only legal on real literals
        assert!(parse_integer_literal("1E-2").is_none());
    }

    #[test]
    fn real_literals_are_exact_rationals() {
        let a = parse_real_literal("0.1").unwrap();
        let b = parse_real_literal("1.0E-1").unwrap();
        assert_eq!(a, b);

        let c = parse_real_literal("16#F.8#").unwrap();
        assert_eq!(c.to_f64(), 15.5);
    }

    #[test]
    fn mod_follows_the_divisor_sign_and_rem_the_dividend() {
        let a = UInt::from_i64(-7);
        let b = UInt::from_i64(3);

        assert_eq!(a.rem(&b).unwrap().to_i64(), Some(-1));
        assert_eq!(a.modulo(&b).unwrap().to_i64(), Some(2));

        let c = UInt::from_i64(7);
        let d = UInt::from_i64(-3);
        assert_eq!(c.rem(&d).unwrap().to_i64(), Some(1));
        assert_eq!(c.modulo(&d).unwrap().to_i64(), Some(-2));
    }

    #[test]
    fn division_truncates_toward_zero() {
        let a = UInt::from_i64(-7);
        let b = UInt::from_i64(2);
        assert_eq!(a.div(&b).unwrap().to_i64(), Some(-3));
        assert!(a.div(&UInt::from_i64(0)).is_none());
    }

    #[test]
    fn narrowing_detects_out_of_range() {
        let big = parse_integer_literal("1E25").unwrap();
        assert!(big.to_i64().is_none());
    }

    #[test]
    fn fixed_point_scaling_rounds_to_nearest() {
        let value = parse_real_literal("0.30").unwrap();
        // small = 1/4: 0.30 / 0.25 = 1.2 -> 1
        assert_eq!(value.scaled_by(0.25), Some(1));
        // small = 1/128
        assert_eq!(value.scaled_by(0.0078125), Some(38));
    }
}
