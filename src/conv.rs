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

//! Conversions between decimals and the other interoperable numeric kinds.
//!
//! The set of conversions is closed and each has one defined rule:
//!
//! * primitive and arbitrary-precision integers convert exactly, always;
//! * exact rationals convert exactly when the reduced denominator has no
//!   prime factors other than two and five, and otherwise only under a
//!   context ([`Context::from_rational`]), which rounds and signals;
//! * binary floats convert *in* exactly, by re-expressing the float's
//!   mantissa and power-of-two exponent in powers of ten, and convert *out*
//!   to the nearest representable float with no signal.

use std::convert::TryFrom;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::context::Context;
use crate::decimal::{ndigits, pow10, Decimal};
use crate::error::{OperationError, TryFromDecimalError, TryIntoDecimalError};

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Decimal {
            fn from(n: $t) -> Decimal {
                Decimal::finite(false, BigUint::from(n), 0)
            }
        }
    )*};
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Decimal {
            fn from(n: $t) -> Decimal {
                Decimal::finite(n < 0, BigUint::from(n.unsigned_abs()), 0)
            }
        }
    )*};
}

from_unsigned!(u8, u16, u32, u64, u128, usize);
from_signed!(i8, i16, i32, i64, i128, isize);

impl From<BigUint> for Decimal {
    fn from(n: BigUint) -> Decimal {
        Decimal::finite(false, n, 0)
    }
}

impl From<BigInt> for Decimal {
    fn from(n: BigInt) -> Decimal {
        let negative = n.sign() == Sign::Minus;
        Decimal::finite(negative, n.into_parts().1, 0)
    }
}

/// Extracts the integral part of a finite decimal as a signed
/// arbitrary-precision integer. With `truncate`, the fractional part is
/// discarded; without, a nonzero fractional part fails the conversion.
fn integral_bigint(d: &Decimal, truncate: bool) -> Option<BigInt> {
    if !d.is_finite() {
        return None;
    }
    let magnitude = if d.exponent() >= 0 {
        &d.coefficient * pow10(d.exponent() as u64)
    } else {
        let frac = (-d.exponent()) as u64;
        let (q, r) = if frac >= ndigits(&d.coefficient) {
            (BigUint::zero(), d.coefficient.clone())
        } else {
            d.coefficient.div_rem(&pow10(frac))
        };
        if !truncate && !r.is_zero() {
            return None;
        }
        q
    };
    let sign = if magnitude.is_zero() {
        Sign::NoSign
    } else if d.is_negative() {
        Sign::Minus
    } else {
        Sign::Plus
    };
    Some(BigInt::from_biguint(sign, magnitude))
}

impl TryFrom<&Decimal> for BigInt {
    type Error = TryFromDecimalError;

    /// Converts a decimal to an integer, failing unless the conversion is
    /// exact.
    fn try_from(d: &Decimal) -> Result<BigInt, TryFromDecimalError> {
        integral_bigint(d, false).ok_or(TryFromDecimalError)
    }
}

impl TryFrom<Decimal> for BigInt {
    type Error = TryFromDecimalError;

    fn try_from(d: Decimal) -> Result<BigInt, TryFromDecimalError> {
        BigInt::try_from(&d)
    }
}

impl TryFrom<&Decimal> for BigRational {
    type Error = TryFromDecimalError;

    /// Converts a finite decimal to an exact rational. Every finite decimal
    /// has one; infinities and NaNs do not.
    fn try_from(d: &Decimal) -> Result<BigRational, TryFromDecimalError> {
        if !d.is_finite() {
            return Err(TryFromDecimalError);
        }
        let sign = if d.is_negative() && !d.coefficient.is_zero() {
            Sign::Minus
        } else if d.coefficient.is_zero() {
            Sign::NoSign
        } else {
            Sign::Plus
        };
        let numer = BigInt::from_biguint(sign, d.coefficient.clone());
        if d.exponent() >= 0 {
            let scale = BigInt::from_biguint(Sign::Plus, pow10(d.exponent() as u64));
            Ok(BigRational::from_integer(numer * scale))
        } else {
            let scale = BigInt::from_biguint(Sign::Plus, pow10((-d.exponent()) as u64));
            Ok(BigRational::new(numer, scale))
        }
    }
}

impl TryFrom<Decimal> for BigRational {
    type Error = TryFromDecimalError;

    fn try_from(d: Decimal) -> Result<BigRational, TryFromDecimalError> {
        BigRational::try_from(&d)
    }
}

impl TryFrom<&BigRational> for Decimal {
    type Error = TryIntoDecimalError;

    /// Converts a rational to a decimal, failing unless the expansion
    /// terminates — that is, unless the reduced denominator is of the form
    /// 2<sup>a</sup>·5<sup>b</sup>. A non-terminating rational must go
    /// through [`Context::from_rational`] to be rounded.
    fn try_from(r: &BigRational) -> Result<Decimal, TryIntoDecimalError> {
        let negative = r.numer().is_negative();
        let numer = r.numer().magnitude().clone();
        let mut denom = r.denom().magnitude().clone();

        let two = BigUint::from(2u8);
        let five = BigUint::from(5u8);
        let mut twos: u64 = 0;
        let mut fives: u64 = 0;
        while (&denom % &two).is_zero() {
            denom /= &two;
            twos += 1;
        }
        while (&denom % &five).is_zero() {
            denom /= &five;
            fives += 1;
        }
        if !denom.is_one() {
            return Err(TryIntoDecimalError);
        }

        // numer / (2^a 5^b) = numer * 2^(s-a) * 5^(s-b) / 10^s
        let scale = twos.max(fives);
        let coeff = numer
            * BigUint::from(2u8).pow(u32::try_from(scale - twos).expect("factor count fits in u32"))
            * BigUint::from(5u8).pow(u32::try_from(scale - fives).expect("factor count fits in u32"));
        Ok(Decimal::finite(negative, coeff, -(scale as i64)))
    }
}

impl Context {
    /// Converts a rational to a decimal under this context, rounding a
    /// non-terminating expansion to the context precision with the usual
    /// division signals. In exact mode a non-terminating rational raises
    /// [`Inexact`](crate::Signal::Inexact).
    pub fn from_rational(&mut self, r: &BigRational) -> Result<Decimal, OperationError> {
        let numer = Decimal::from(r.numer().clone());
        let denom = Decimal::from(r.denom().clone());
        self.div(&numer, &denom)
    }
}

impl From<f64> for Decimal {
    /// Converts a binary float to the decimal with exactly the same value.
    ///
    /// The conversion is exact by construction: the float's mantissa and
    /// power-of-two exponent are re-expressed in powers of ten, so e.g.
    /// `0.1f64` converts to the 55-digit decimal the float actually
    /// represents, not to `0.1`.
    fn from(f: f64) -> Decimal {
        let negative = f.is_sign_negative();
        if f.is_nan() {
            return Decimal::quiet_nan(negative, BigUint::zero());
        }
        if f.is_infinite() {
            return Decimal::inf(negative);
        }
        let bits = f.to_bits();
        let exp_bits = ((bits >> 52) & 0x7ff) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let (mut mantissa, mut e2) = if exp_bits == 0 {
            (frac, -1074)
        } else {
            (frac | (1u64 << 52), exp_bits - 1075)
        };
        if mantissa == 0 {
            return Decimal::zeroed(negative, 0);
        }
        // Drop common factors of two so the coefficient is as short as the
        // float's value allows.
        while mantissa % 2 == 0 && e2 < 0 {
            mantissa /= 2;
            e2 += 1;
        }
        if e2 >= 0 {
            let coeff = BigUint::from(mantissa) << e2 as u64;
            Decimal::finite(negative, coeff, 0)
        } else {
            // m * 2^e2 = m * 5^-e2 * 10^e2
            let coeff = BigUint::from(mantissa)
                * BigUint::from(5u8).pow(u32::try_from(-e2).expect("f64 exponent fits in u32"));
            Decimal::finite(negative, coeff, e2)
        }
    }
}

impl From<f32> for Decimal {
    /// Converts a binary float to the decimal with exactly the same value.
    ///
    /// Every `f32` is exactly representable as an `f64`, so this defers to
    /// the `f64` conversion.
    fn from(f: f32) -> Decimal {
        Decimal::from(f as f64)
    }
}

impl ToPrimitive for Decimal {
    /// Converts the integral part of the decimal, truncating toward zero.
    /// Returns `None` for special values and out-of-range results.
    fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|n| i64::try_from(n).ok())
    }

    /// Converts the integral part of the decimal, truncating toward zero.
    /// Returns `None` for special values, negative values, and out-of-range
    /// results.
    fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|n| u64::try_from(n).ok())
    }

    fn to_i128(&self) -> Option<i128> {
        if !self.is_finite() || self.adjusted_exponent() > 40 {
            return None;
        }
        integral_bigint(self, true)?.to_i128()
    }

    fn to_u128(&self) -> Option<u128> {
        if !self.is_finite() || self.adjusted_exponent() > 40 {
            return None;
        }
        integral_bigint(self, true)?.to_u128()
    }

    /// Converts to the nearest representable binary float.
    ///
    /// The conversion is lossy and never signals; values beyond `f64`'s
    /// range become infinities.
    fn to_f64(&self) -> Option<f64> {
        if self.is_nan() {
            return Some(f64::NAN);
        }
        if self.is_infinite() {
            return Some(if self.is_negative() {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            });
        }
        // The standard library's float parser rounds decimal literals of
        // any length to the nearest representable value.
        self.to_string().parse().ok()
    }

    /// Converts to the nearest representable binary float.
    fn to_f32(&self) -> Option<f32> {
        if self.is_nan() {
            return Some(f32::NAN);
        }
        if self.is_infinite() {
            return Some(if self.is_negative() {
                f32::NEG_INFINITY
            } else {
                f32::INFINITY
            });
        }
        self.to_string().parse().ok()
    }
}
