// Copyright the gda developers. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseDecimalError;

/// Returns the number of digits in the decimal expansion of `n`.
///
/// Zero has one digit.
pub(crate) fn ndigits(n: &BigUint) -> u64 {
    if n.is_zero() {
        return 1;
    }
    // n >= 2^(bits-1), so n has at least (bits-1)*log10(2) + 1 digits. The
    // estimate undershoots by at most one, which the loop corrects.
    let bits = n.bits();
    let mut digits = ((bits - 1) as u128 * 30_103 / 100_000) as u64 + 1;
    while *n >= pow10(digits) {
        digits += 1;
    }
    digits
}

/// Returns 10<sup>`k`</sup>.
pub(crate) fn pow10(k: u64) -> BigUint {
    let k = u32::try_from(k).expect("power of ten exponent does not fit in u32");
    BigUint::from(10u8).pow(k)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Form {
    Finite,
    Infinite,
    QuietNan,
    SignalingNan,
}

/// An arbitrary-precision decimal number.
///
/// A decimal is either finite — a sign, an arbitrary-precision integer
/// coefficient, and a signed exponent, representing the value
/// sign × coefficient × 10<sup>exponent</sup> — or one of the special
/// values infinity, quiet NaN, and signaling NaN. NaNs carry an optional
/// integer diagnostic payload.
///
/// Values are immutable: every operation produces a new decimal. The
/// representation is not normalized, so `1.2` and `1.200` are numerically
/// equal decimals with different exponents (different *quanta*); equality
/// and ordering compare numeric value, not representation. Zero is
/// representable at any exponent and with either sign.
///
/// Decimals are independent of any context. Operations that round, bound, or
/// signal live on [`Context`](crate::Context); the methods here are exact
/// queries and sign-manipulation operations that can never raise a
/// condition.
#[derive(Clone)]
pub struct Decimal {
    pub(crate) negative: bool,
    pub(crate) coefficient: BigUint,
    pub(crate) exponent: i64,
    pub(crate) form: Form,
}

impl Decimal {
    /// Constructs a decimal representing the number 0.
    pub fn zero() -> Decimal {
        Decimal::default()
    }

    /// Constructs a decimal representing positive infinity.
    pub fn infinity() -> Decimal {
        Decimal {
            negative: false,
            coefficient: BigUint::zero(),
            exponent: 0,
            form: Form::Infinite,
        }
    }

    /// Constructs a decimal representing a quiet NaN with no payload.
    pub fn nan() -> Decimal {
        Decimal {
            negative: false,
            coefficient: BigUint::zero(),
            exponent: 0,
            form: Form::QuietNan,
        }
    }

    /// Constructs a finite decimal from a sign, a coefficient, and an
    /// exponent.
    ///
    /// The sign is negative if `sign` is negative, positive otherwise.
    pub fn from_parts(sign: i8, coefficient: BigUint, exponent: i64) -> Decimal {
        Decimal {
            negative: sign < 0,
            coefficient,
            exponent,
            form: Form::Finite,
        }
    }

    pub(crate) fn finite(negative: bool, coefficient: BigUint, exponent: i64) -> Decimal {
        Decimal {
            negative,
            coefficient,
            exponent,
            form: Form::Finite,
        }
    }

    pub(crate) fn zeroed(negative: bool, exponent: i64) -> Decimal {
        Decimal::finite(negative, BigUint::zero(), exponent)
    }

    pub(crate) fn inf(negative: bool) -> Decimal {
        let mut d = Decimal::infinity();
        d.negative = negative;
        d
    }

    pub(crate) fn quiet_nan(negative: bool, payload: BigUint) -> Decimal {
        Decimal {
            negative,
            coefficient: payload,
            exponent: 0,
            form: Form::QuietNan,
        }
    }

    pub(crate) fn signaling_nan(negative: bool, payload: BigUint) -> Decimal {
        Decimal {
            negative,
            coefficient: payload,
            exponent: 0,
            form: Form::SignalingNan,
        }
    }

    /// Computes the number of significant digits in the number.
    ///
    /// If the number is zero or infinite, returns 1. If the number is a NaN,
    /// returns the number of digits in the payload.
    pub fn digits(&self) -> u64 {
        ndigits(&self.coefficient)
    }

    /// Returns the number's coefficient.
    ///
    /// For NaNs this is the diagnostic payload; for infinities it is zero.
    pub fn coefficient(&self) -> &BigUint {
        &self.coefficient
    }

    /// Returns the exponent of the number.
    ///
    /// Special values have an exponent of zero.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Returns the adjusted exponent of the number: the exponent the number
    /// would have written in scientific notation, with a single digit before
    /// the decimal point.
    ///
    /// Equals `exponent() + digits() - 1`. Special values yield zero.
    pub fn adjusted_exponent(&self) -> i64 {
        if self.is_finite() {
            self.exponent + self.digits() as i64 - 1
        } else {
            0
        }
    }

    /// Returns the sign of the number: `+1` or `-1`.
    ///
    /// Zero and infinity are signed like any other value. NaNs have no sign,
    /// so this returns `None` for them; use
    /// [`is_negative`](Decimal::is_negative) to inspect a NaN's sign bit.
    pub fn sign(&self) -> Option<i8> {
        if self.is_nan() {
            None
        } else if self.negative {
            Some(-1)
        } else {
            Some(1)
        }
    }

    /// Reports whether the number is finite.
    ///
    /// A finite number is one that is neither infinite nor a NaN.
    pub fn is_finite(&self) -> bool {
        self.form == Form::Finite
    }

    /// Reports whether the number is positive or negative infinity.
    pub fn is_infinite(&self) -> bool {
        self.form == Form::Infinite
    }

    /// Reports whether the number is a NaN, quiet or signaling.
    pub fn is_nan(&self) -> bool {
        matches!(self.form, Form::QuietNan | Form::SignalingNan)
    }

    /// Reports whether the number is a quiet NaN.
    pub fn is_quiet_nan(&self) -> bool {
        self.form == Form::QuietNan
    }

    /// Reports whether the number is a signaling NaN.
    pub fn is_signaling_nan(&self) -> bool {
        self.form == Form::SignalingNan
    }

    /// Reports whether the number has a special value.
    ///
    /// A special value is either infinity or NaN. This is the inverse of
    /// [`Decimal::is_finite`].
    pub fn is_special(&self) -> bool {
        self.form != Form::Finite
    }

    /// Reports whether the number is positive or negative zero.
    pub fn is_zero(&self) -> bool {
        self.is_finite() && self.coefficient.is_zero()
    }

    /// Reports whether the number's sign bit is set.
    ///
    /// A negative number is either negative zero, less than zero, or a NaN
    /// with a sign of one.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Returns the number with its sign bit cleared.
    ///
    /// This operation is quiet: it applies to special values, including
    /// NaNs, and can never raise a condition.
    pub fn copy_abs(&self) -> Decimal {
        let mut d = self.clone();
        d.negative = false;
        d
    }

    /// Returns the number with its sign bit inverted.
    ///
    /// This operation is quiet: it applies to special values, including
    /// NaNs, and can never raise a condition.
    pub fn copy_negate(&self) -> Decimal {
        let mut d = self.clone();
        d.negative = !d.negative;
        d
    }

    /// Returns the number with its sign bit copied from `rhs`.
    ///
    /// This operation is quiet: it applies to special values, including
    /// NaNs, and can never raise a condition.
    pub fn copy_sign(&self, rhs: &Decimal) -> Decimal {
        let mut d = self.clone();
        d.negative = rhs.negative;
        d
    }

    /// Reports whether the quantum of the number matches the quantum of
    /// `rhs`.
    ///
    /// Quantums are considered to match if the numbers have the same
    /// exponent, are both NaNs, or are both infinite.
    pub fn quantum_matches(&self, rhs: &Decimal) -> bool {
        match (self.form, rhs.form) {
            (Form::Finite, Form::Finite) => self.exponent == rhs.exponent,
            (Form::Infinite, Form::Infinite) => true,
            (Form::Finite, _) | (_, Form::Finite) => false,
            (Form::Infinite, _) | (_, Form::Infinite) => false,
            _ => true,
        }
    }

    fn signum(&self) -> i8 {
        if self.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    /// Compares the magnitudes of two finite decimals exactly, by aligning
    /// their coefficients with powers of ten.
    fn cmp_abs(&self, other: &Decimal) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        let adj = self.adjusted_exponent().cmp(&other.adjusted_exponent());
        if adj != Ordering::Equal {
            return adj;
        }
        // Same adjusted exponent, so the alignment shift is bounded by the
        // operand digit counts.
        if self.exponent >= other.exponent {
            let shift = (self.exponent - other.exponent) as u64;
            (&self.coefficient * pow10(shift)).cmp(&other.coefficient)
        } else {
            let shift = (other.exponent - self.exponent) as u64;
            self.coefficient.cmp(&(&other.coefficient * pow10(shift)))
        }
    }

    /// Numeric comparison. Returns `None` if either operand is a NaN.
    pub(crate) fn numeric_cmp(&self, other: &Decimal) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        let (ls, rs) = (self.signum(), other.signum());
        if ls != rs {
            return Some(ls.cmp(&rs));
        }
        if ls == 0 {
            return Some(Ordering::Equal);
        }
        let mag = match (self.is_infinite(), other.is_infinite()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.cmp_abs(other),
        };
        Some(if ls < 0 { mag.reverse() } else { mag })
    }

    /// The IEEE 754 total order: a NaN outranks infinity, a signaling NaN
    /// ranks below a quiet one, payloads break NaN ties, and numerically
    /// equal values order by exponent. The negative side mirrors the
    /// positive one.
    pub(crate) fn cmp_total(&self, other: &Decimal) -> Ordering {
        fn rank(d: &Decimal) -> u8 {
            match d.form {
                Form::Finite => 0,
                Form::Infinite => 1,
                Form::SignalingNan => 2,
                Form::QuietNan => 3,
            }
        }
        match (self.negative, other.negative) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let ord = match rank(self).cmp(&rank(other)) {
            Ordering::Equal => match self.form {
                Form::Finite => self
                    .cmp_abs(other)
                    .then_with(|| self.exponent.cmp(&other.exponent)),
                Form::Infinite => Ordering::Equal,
                Form::QuietNan | Form::SignalingNan => {
                    self.coefficient.cmp(&other.coefficient)
                }
            },
            unequal => unequal,
        };
        if self.negative {
            ord.reverse()
        } else {
            ord
        }
    }

    /// Formats the number per the General Decimal Arithmetic
    /// to-scientific-string (or, with `eng`, to-engineering-string)
    /// conversion.
    pub(crate) fn format(&self, eng: bool, capitals: bool) -> String {
        let sign = if self.negative { "-" } else { "" };
        let e = if capitals { 'E' } else { 'e' };
        match self.form {
            Form::Infinite => return format!("{}Infinity", sign),
            Form::QuietNan | Form::SignalingNan => {
                let tag = if self.form == Form::QuietNan {
                    "NaN"
                } else {
                    "sNaN"
                };
                return if self.coefficient.is_zero() {
                    format!("{}{}", sign, tag)
                } else {
                    format!("{}{}{}", sign, tag, self.coefficient)
                };
            }
            Form::Finite => {}
        }

        let digits = self.coefficient.to_str_radix(10);
        let leftdigits = self.exponent + digits.len() as i64;

        // Where the decimal point goes, counted from the left end of the
        // digit string; the exponent printed is leftdigits - dotplace.
        let dotplace = if self.exponent <= 0 && leftdigits > -6 {
            leftdigits
        } else if !eng {
            1
        } else if self.coefficient.is_zero() {
            (leftdigits + 1).rem_euclid(3) - 1
        } else {
            (leftdigits - 1).rem_euclid(3) + 1
        };

        let mut out = String::with_capacity(digits.len() + 8);
        out.push_str(sign);
        if dotplace <= 0 {
            out.push_str("0.");
            for _ in 0..-dotplace {
                out.push('0');
            }
            out.push_str(&digits);
        } else if dotplace as usize >= digits.len() {
            out.push_str(&digits);
            for _ in 0..(dotplace as usize - digits.len()) {
                out.push('0');
            }
        } else {
            out.push_str(&digits[..dotplace as usize]);
            out.push('.');
            out.push_str(&digits[dotplace as usize..]);
        }
        if leftdigits != dotplace {
            out.push(e);
            let exp = leftdigits - dotplace;
            if exp >= 0 {
                out.push('+');
            }
            out.push_str(&exp.to_string());
        }
        out
    }
}

impl Default for Decimal {
    fn default() -> Decimal {
        Decimal {
            negative: false,
            coefficient: BigUint::zero(),
            exponent: 0,
            form: Form::Finite,
        }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.format(f.alternate(), true))
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Decimal) -> bool {
        self.numeric_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        self.numeric_cmp(other)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Decimal, ParseDecimalError> {
        parse_literal(s)
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Parses a decimal literal exactly, with no rounding and no context.
///
/// The accepted grammar is the General Decimal Arithmetic numeric string:
/// an optional sign, then either a digit string with an optional fractional
/// part and an optional exponent, or one of the case-insensitive specials
/// `Inf`, `Infinity`, `NaN`, and `sNaN`, the NaNs with optional payload
/// digits.
pub(crate) fn parse_literal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'+') => (false, &s[1..]),
        Some(b'-') => (true, &s[1..]),
        _ => (false, s),
    };
    if rest.is_empty() {
        return Err(ParseDecimalError);
    }

    if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
        return Ok(Decimal::inf(negative));
    }
    if rest.len() >= 4 && rest[..4].eq_ignore_ascii_case("snan") {
        let payload = parse_payload(&rest[4..])?;
        return Ok(Decimal::signaling_nan(negative, payload));
    }
    if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("nan") {
        let payload = parse_payload(&rest[3..])?;
        return Ok(Decimal::quiet_nan(negative, payload));
    }

    let (mantissa, exp_part) = match rest.find(|c| c == 'e' || c == 'E') {
        Some(i) => (&rest[..i], Some(&rest[i + 1..])),
        None => (rest, None),
    };

    let mut digits = String::with_capacity(mantissa.len());
    let mut frac_len: i64 = 0;
    let mut seen_dot = false;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => {
                digits.push(c);
                if seen_dot {
                    frac_len += 1;
                }
            }
            '.' if !seen_dot => seen_dot = true,
            _ => return Err(ParseDecimalError),
        }
    }
    if digits.is_empty() {
        return Err(ParseDecimalError);
    }

    let explicit_exp: i64 = match exp_part {
        Some(e) => {
            if e.is_empty() || e == "+" || e == "-" {
                return Err(ParseDecimalError);
            }
            let (neg_exp, e) = match e.as_bytes()[0] {
                b'+' => (false, &e[1..]),
                b'-' => (true, &e[1..]),
                _ => (false, e),
            };
            if e.is_empty() || !e.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseDecimalError);
            }
            let magnitude: i64 = e.parse().map_err(|_| ParseDecimalError)?;
            if neg_exp {
                -magnitude
            } else {
                magnitude
            }
        }
        None => 0,
    };
    let exponent = explicit_exp
        .checked_sub(frac_len)
        .ok_or(ParseDecimalError)?;

    let coefficient = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or(ParseDecimalError)?;
    Ok(Decimal::finite(negative, coefficient, exponent))
}

fn parse_payload(s: &str) -> Result<BigUint, ParseDecimalError> {
    if s.is_empty() {
        return Ok(BigUint::zero());
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseDecimalError);
    }
    BigUint::parse_bytes(s.as_bytes(), 10).ok_or(ParseDecimalError)
}
