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

//! The operation engine.
//!
//! Every arithmetic operation follows the same pipeline: validate special
//! operands, compute the exact mathematical result with guard digits on the
//! arbitrary-precision integer primitive, round to the context precision,
//! constrain the exponent to the context bounds, and finally resolve the
//! raised conditions against the context's ignored, trap, and flag sets.

use std::cmp::Ordering;
use std::convert::TryFrom;

use num_bigint::BigUint;
use num_integer::{Integer, Roots};
use num_traits::{One, ToPrimitive, Zero};

use crate::context::{Class, Context, Rounding, Signal, Status};
use crate::decimal::{ndigits, parse_literal, pow10, Decimal};
use crate::error::{OperationError, ParseDecimalError};

/// Exponent arithmetic runs in i128 and saturates well outside the widest
/// permissible context bounds, so the fix step still classifies the result
/// as overflowed or underflowed.
const EXP_LIMIT: i128 = (i64::MAX / 4) as i128;

fn sat_exp(e: i128) -> i64 {
    e.clamp(-EXP_LIMIT, EXP_LIMIT) as i64
}

fn shift_u64(hi: i64, lo: i64) -> u64 {
    debug_assert!(hi >= lo);
    (hi as i128 - lo as i128) as u64
}

fn last_digit(n: &BigUint) -> u8 {
    n.mod_floor(&BigUint::from(10u8))
        .to_u8()
        .expect("remainder of division by ten fits in u8")
}

/// Decides whether discarding `rem` (out of one unit of `divisor`) from a
/// magnitude whose retained final digit is `retained` rounds the magnitude
/// up, under `mode` for a value of the given sign.
fn round_increment(
    mode: Rounding,
    negative: bool,
    retained: u8,
    rem: &BigUint,
    divisor: &BigUint,
) -> bool {
    if rem.is_zero() {
        return false;
    }
    match mode {
        Rounding::Down => false,
        Rounding::Up => true,
        Rounding::Ceiling => !negative,
        Rounding::Floor => negative,
        Rounding::ZeroFiveUp => retained == 0 || retained == 5,
        Rounding::HalfUp | Rounding::HalfDown | Rounding::HalfEven => {
            match (rem * 2u8).cmp(divisor) {
                Ordering::Less => false,
                Ordering::Greater => true,
                Ordering::Equal => match mode {
                    Rounding::HalfUp => true,
                    Rounding::HalfDown => false,
                    Rounding::HalfEven => retained % 2 == 1,
                    _ => unreachable!(),
                },
            }
        }
    }
}

/// Re-expresses finite `d` at exponent `exp`. Lowering the exponent pads the
/// coefficient exactly; raising it discards digits, rounding per `mode`.
///
/// Returns the result plus whether any digits were discarded and whether any
/// discarded digit was nonzero.
fn rescale(d: &Decimal, exp: i64, mode: Rounding) -> (Decimal, bool, bool) {
    debug_assert!(d.is_finite());
    if d.coefficient.is_zero() {
        return (Decimal::zeroed(d.negative, exp), false, false);
    }
    if d.exponent >= exp {
        let coeff = &d.coefficient * pow10(shift_u64(d.exponent, exp));
        (Decimal::finite(d.negative, coeff, exp), false, false)
    } else {
        let shift = shift_u64(exp, d.exponent);
        // When the shift discards every digit, a one-unit marker one place
        // below the target quantum makes the same rounding decision as the
        // full coefficient would, without materializing 10^shift.
        let (coeff, shift) = if shift > ndigits(&d.coefficient) {
            (BigUint::one(), 1)
        } else {
            (d.coefficient.clone(), shift)
        };
        let divisor = pow10(shift);
        let (q, r) = coeff.div_rem(&divisor);
        let inexact = !r.is_zero();
        let q = if round_increment(mode, d.negative, last_digit(&q), &r, &divisor) {
            q + 1u8
        } else {
            q
        };
        (Decimal::finite(d.negative, q, exp), true, inexact)
    }
}

/// Validates NaN operands. A signaling NaN raises InvalidOperation and
/// yields its quieted copy; a quiet NaN propagates silently.
fn propagate_nan(raised: &mut Status, operands: &[&Decimal]) -> Option<Decimal> {
    for d in operands {
        if d.is_signaling_nan() {
            raised.set(Signal::InvalidOperation);
            return Some(Decimal::quiet_nan(d.negative, d.coefficient.clone()));
        }
    }
    for d in operands {
        if d.is_nan() {
            return Some((*d).clone());
        }
    }
    None
}

fn invalid(raised: &mut Status) -> Decimal {
    raised.set(Signal::InvalidOperation);
    Decimal::nan()
}

/// An operand unpacked for exact integer arithmetic.
struct Work {
    negative: bool,
    coeff: BigUint,
    exp: i64,
}

impl Work {
    fn unpack(d: &Decimal) -> Work {
        Work {
            negative: d.negative,
            coeff: d.coefficient.clone(),
            exp: d.exponent,
        }
    }
}

/// Brings two nonzero finite operands to a common exponent for addition.
///
/// At finite precision the smaller operand cannot influence more than a
/// couple of digits past the precision, so a huge magnitude gap is collapsed
/// to a one-unit marker just beyond it; this bounds the alignment shift. In
/// exact mode the alignment is materialized in full.
fn normalize(lhs: &Decimal, rhs: &Decimal, precision: usize) -> (Work, Work) {
    let mut w1 = Work::unpack(lhs);
    let mut w2 = Work::unpack(rhs);
    {
        let (big, small) = if w1.exp >= w2.exp {
            (&mut w1, &mut w2)
        } else {
            (&mut w2, &mut w1)
        };
        if precision > 0 {
            let big_len = ndigits(&big.coeff) as i64;
            let small_len = ndigits(&small.coeff) as i64;
            let exp = big.exp + (big_len - precision as i64 - 2).min(-1);
            if small_len as i128 + small.exp as i128 - 1 < exp as i128 {
                small.coeff = BigUint::one();
                small.exp = exp;
            }
        }
        if big.exp > small.exp {
            big.coeff = &big.coeff * pow10(shift_u64(big.exp, small.exp));
            big.exp = small.exp;
        }
    }
    (w1, w2)
}

impl Context {
    /// Parses a number from its string representation.
    ///
    /// Parsing is exact: the result carries every digit of the literal and
    /// is not rounded to the context precision. A malformed literal is a
    /// structural failure reported through the error, never through the
    /// status.
    pub fn parse<S>(&self, s: S) -> Result<Decimal, ParseDecimalError>
    where
        S: AsRef<str>,
    {
        parse_literal(s.as_ref())
    }

    /// Classifies the number.
    pub fn class(&self, n: &Decimal) -> Class {
        if n.is_signaling_nan() {
            Class::SignalingNan
        } else if n.is_nan() {
            Class::QuietNan
        } else if n.is_infinite() {
            if n.is_negative() {
                Class::NegInfinity
            } else {
                Class::PosInfinity
            }
        } else if n.is_zero() {
            if n.is_negative() {
                Class::NegZero
            } else {
                Class::PosZero
            }
        } else if n.adjusted_exponent() < self.min_exponent() {
            if n.is_negative() {
                Class::NegSubnormal
            } else {
                Class::PosSubnormal
            }
        } else if n.is_negative() {
            Class::NegNormal
        } else {
            Class::PosNormal
        }
    }

    /// Formats `n` in scientific notation, honoring the context's
    /// [`capitals`](Context::capitals) setting.
    pub fn to_string(&self, n: &Decimal) -> String {
        n.format(false, self.capitals())
    }

    /// Formats `n` in engineering notation, honoring the context's
    /// [`capitals`](Context::capitals) setting.
    pub fn to_eng_string(&self, n: &Decimal) -> String {
        n.format(true, self.capitals())
    }

    /// Adds `lhs` and `rhs`.
    pub fn add(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.add_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Subtracts `rhs` from `lhs`.
    pub fn sub(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[lhs, rhs]) {
            Some(nan) => nan,
            None => self.add_impl(lhs, &rhs.copy_negate(), &mut raised),
        };
        self.finish(result, raised)
    }

    /// Multiplies `lhs` by `rhs`.
    pub fn mul(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.mul_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Divides `lhs` by `rhs`.
    ///
    /// In exact mode the division succeeds only if the quotient terminates;
    /// a non-terminating quotient raises [`Signal::Inexact`], which exact
    /// mode always traps.
    pub fn div(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.div_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Divides `lhs` by `rhs`, yielding the integer part of the quotient.
    pub fn div_integer(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.div_integer_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Computes the remainder of `lhs` divided by `rhs`.
    ///
    /// The remainder has the sign of `lhs` and is computed from the
    /// truncated integer quotient.
    pub fn rem(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.rem_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Like [`rem`](Context::rem), but computes the remainder from the
    /// quotient rounded to the nearest integer (ties to even), per the
    /// IEEE 754 rules for remainder operations.
    pub fn rem_near(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.rem_near_impl(lhs, rhs, &mut raised);
        self.finish(result, raised)
    }

    /// Computes the square root of `n`.
    ///
    /// The result is rounded half even regardless of the context's rounding
    /// algorithm. In exact mode the operation verifies that the result
    /// squares back to the operand exactly and raises [`Signal::Inexact`]
    /// otherwise.
    pub fn sqrt(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.sqrt_impl(n, &mut raised);
        self.finish(result, raised)
    }

    /// Calculates the fused multiply-add `(x * y) + z`.
    ///
    /// The multiplication is carried out first and is exact, so this
    /// operation only has the one, final rounding.
    pub fn fma(
        &mut self,
        x: &Decimal,
        y: &Decimal,
        z: &Decimal,
    ) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.fma_impl(x, y, z, &mut raised);
        self.finish(result, raised)
    }

    /// Raises `x` to the power of `y`.
    ///
    /// `y` must be a finite integer; any other exponent raises
    /// [`Signal::InvalidOperation`].
    pub fn pow(&mut self, x: &Decimal, y: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.pow_impl(x, y, &mut raised);
        self.finish(result, raised)
    }

    /// Rounds `n` to the context precision.
    ///
    /// This is the identity operation up to rounding and exponent bounding:
    /// the way to apply a context to a value.
    pub fn plus(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.clone(),
            None => {
                let n = if n.is_zero() && self.rounding() != Rounding::Floor {
                    n.copy_abs()
                } else {
                    n.clone()
                };
                self.fix(n, &mut raised)
            }
        };
        self.finish(result, raised)
    }

    /// Negates `n` and rounds to the context precision.
    pub fn minus(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.copy_negate(),
            None => {
                let n = if n.is_zero() && self.rounding() != Rounding::Floor {
                    n.copy_abs()
                } else {
                    n.copy_negate()
                };
                self.fix(n, &mut raised)
            }
        };
        self.finish(result, raised)
    }

    /// Computes the absolute value of `n` and rounds to the context
    /// precision.
    pub fn abs(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.copy_abs(),
            None => self.fix(n.copy_abs(), &mut raised),
        };
        self.finish(result, raised)
    }

    /// Compares `lhs` and `rhs` numerically, yielding a decimal.
    ///
    /// The result is `-1`, `0`, or `1` if both operands order, and NaN
    /// otherwise. A signaling NaN operand raises
    /// [`Signal::InvalidOperation`]; a quiet NaN propagates silently.
    pub fn compare(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[lhs, rhs]) {
            Some(nan) => nan,
            None => match lhs.numeric_cmp(rhs).expect("non-NaN operands order") {
                Ordering::Less => Decimal::from_parts(-1, BigUint::one(), 0),
                Ordering::Equal => Decimal::zero(),
                Ordering::Greater => Decimal::from_parts(1, BigUint::one(), 0),
            },
        };
        self.finish(result, raised)
    }

    /// Determines the ordering of `lhs` relative to `rhs`, using a partial
    /// order.
    ///
    /// If either `lhs` or `rhs` is a NaN, returns `None`. To force an
    /// ordering upon NaNs, use [`total_cmp`](Context::total_cmp).
    pub fn partial_cmp(&self, lhs: &Decimal, rhs: &Decimal) -> Option<Ordering> {
        lhs.numeric_cmp(rhs)
    }

    /// Determines the ordering of `lhs` relative to `rhs`, using the
    /// total order predicate defined in IEEE 754-2008.
    ///
    /// Unlike [`partial_cmp`](Context::partial_cmp), the total order takes
    /// exponents into account and therefore does not consider e.g. `1.2`
    /// and `1.20` to be equal.
    pub fn total_cmp(&self, lhs: &Decimal, rhs: &Decimal) -> Ordering {
        lhs.cmp_total(rhs)
    }

    /// Returns the larger of `lhs` and `rhs`.
    ///
    /// Per the General Decimal Arithmetic rules, a quiet NaN loses to any
    /// number; numerically equal operands are broken up by the total order.
    pub fn max(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        self.extremum(lhs, rhs, Ordering::Greater)
    }

    /// Returns the smaller of `lhs` and `rhs`.
    ///
    /// Per the General Decimal Arithmetic rules, a quiet NaN loses to any
    /// number; numerically equal operands are broken up by the total order.
    pub fn min(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        self.extremum(lhs, rhs, Ordering::Less)
    }

    /// Rounds or pads `lhs` so that it has the same exponent as `rhs`.
    pub fn quantize(&mut self, lhs: &Decimal, rhs: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[lhs, rhs]) {
            Some(nan) => nan,
            None => match (lhs.is_infinite(), rhs.is_infinite()) {
                (true, true) => lhs.clone(),
                (false, false) => self.quantize_impl(lhs, rhs.exponent(), &mut raised),
                _ => invalid(&mut raised),
            },
        };
        self.finish(result, raised)
    }

    /// Rounds or pads `n` so that it has exponent `exp`.
    pub fn rescale(&mut self, n: &Decimal, exp: i64) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => invalid(&mut raised),
            None => self.quantize_impl(n, exp, &mut raised),
        };
        self.finish(result, raised)
    }

    /// Reduces `n`'s coefficient to its shortest possible form without
    /// changing the value of the result.
    pub fn reduce(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.clone(),
            None => {
                let fixed = self.fix(n.clone(), &mut raised);
                if fixed.is_zero() {
                    Decimal::zeroed(fixed.negative, 0)
                } else {
                    let exp_max = if self.is_exact() {
                        self.max_exponent()
                    } else if self.clamp() {
                        self.etop()
                    } else {
                        self.max_exponent()
                    };
                    let mut coeff = fixed.coefficient;
                    let mut exp = fixed.exponent;
                    let ten = BigUint::from(10u8);
                    while exp < exp_max && (&coeff % &ten).is_zero() {
                        coeff /= &ten;
                        exp += 1;
                    }
                    Decimal::finite(fixed.negative, coeff, exp)
                }
            }
        };
        self.finish(result, raised)
    }

    /// Rounds `n` to an integral value using the context rounding.
    ///
    /// This operation raises neither [`Signal::Inexact`] nor
    /// [`Signal::Rounded`], and does not round the result to the context
    /// precision.
    pub fn to_integral_value(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.clone(),
            None if n.exponent() >= 0 => n.clone(),
            None => rescale(n, 0, self.rounding()).0,
        };
        self.finish(result, raised)
    }

    /// Rounds `n` to an integral value using the context rounding, raising
    /// [`Signal::Rounded`] if the exponent changed and [`Signal::Inexact`]
    /// if any discarded digit was nonzero.
    pub fn to_integral_exact(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => n.clone(),
            None if n.exponent() >= 0 => n.clone(),
            None => {
                let (ans, rounded, inexact) = rescale(n, 0, self.rounding());
                if rounded {
                    raised.set(Signal::Rounded);
                }
                if inexact {
                    raised.set(Signal::Inexact);
                }
                ans
            }
        };
        self.finish(result, raised)
    }

    /// Computes the adjusted exponent of `n`, as a decimal.
    ///
    /// `logb` of zero raises [`Signal::DivisionByZero`] and yields negative
    /// infinity; `logb` of infinity yields positive infinity.
    pub fn logb(&mut self, n: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = match propagate_nan(&mut raised, &[n]) {
            Some(nan) => nan,
            None if n.is_infinite() => Decimal::infinity(),
            None if n.is_zero() => {
                raised.set(Signal::DivisionByZero);
                Decimal::inf(true)
            }
            None => {
                let adjusted = Decimal::from(n.adjusted_exponent());
                self.fix(adjusted, &mut raised)
            }
        };
        self.finish(result, raised)
    }

    /// Multiplies `x` by 10<sup>`y`</sup>.
    ///
    /// `y` must be a finite integer of bounded magnitude; any other operand
    /// raises [`Signal::InvalidOperation`].
    pub fn scaleb(&mut self, x: &Decimal, y: &Decimal) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = self.scaleb_impl(x, y, &mut raised);
        self.finish(result, raised)
    }

    fn extremum(
        &mut self,
        lhs: &Decimal,
        rhs: &Decimal,
        keep_lhs_when: Ordering,
    ) -> Result<Decimal, OperationError> {
        let mut raised = Status::empty();
        let result = if lhs.is_nan() || rhs.is_nan() {
            if lhs.is_quiet_nan() && !rhs.is_nan() {
                self.fix(rhs.clone(), &mut raised)
            } else if rhs.is_quiet_nan() && !lhs.is_nan() {
                self.fix(lhs.clone(), &mut raised)
            } else {
                propagate_nan(&mut raised, &[lhs, rhs]).expect("at least one operand is NaN")
            }
        } else {
            let ord = match lhs.numeric_cmp(rhs).expect("non-NaN operands order") {
                Ordering::Equal => lhs.cmp_total(rhs),
                unequal => unequal,
            };
            let keep = if ord == keep_lhs_when || ord == Ordering::Equal {
                lhs
            } else {
                rhs
            };
            if keep.is_infinite() {
                keep.clone()
            } else {
                self.fix(keep.clone(), &mut raised)
            }
        };
        self.finish(result, raised)
    }

    fn add_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        if lhs.is_infinite() || rhs.is_infinite() {
            if lhs.is_infinite() && rhs.is_infinite() && lhs.negative != rhs.negative {
                return invalid(raised);
            }
            return if lhs.is_infinite() {
                lhs.clone()
            } else {
                rhs.clone()
            };
        }

        let exp = lhs.exponent.min(rhs.exponent);
        // A sum of opposite signs that cancels to zero is positive, except
        // when rounding towards negative infinity.
        let negativezero = self.rounding() == Rounding::Floor && lhs.negative != rhs.negative;

        if lhs.is_zero() && rhs.is_zero() {
            let negative = (lhs.negative && rhs.negative) || negativezero;
            return self.fix(Decimal::zeroed(negative, exp), raised);
        }
        if lhs.is_zero() {
            return self.fix_rescaled_zero_sum(rhs, exp, raised);
        }
        if rhs.is_zero() {
            return self.fix_rescaled_zero_sum(lhs, exp, raised);
        }

        let (mut w1, mut w2) = normalize(lhs, rhs, self.precision());
        let result = if w1.negative != w2.negative {
            match w1.coeff.cmp(&w2.coeff) {
                Ordering::Equal => {
                    return self.fix(Decimal::zeroed(negativezero, exp), raised);
                }
                Ordering::Less => std::mem::swap(&mut w1, &mut w2),
                Ordering::Greater => {}
            }
            // The operand with the larger magnitude decides the sign.
            Decimal::finite(w1.negative, &w1.coeff - &w2.coeff, w1.exp)
        } else {
            Decimal::finite(w1.negative, &w1.coeff + &w2.coeff, w1.exp)
        };
        self.fix(result, raised)
    }

    /// `nonzero + (some zero)`: the result is `nonzero` carried down to the
    /// common exponent, which is bounded so the padding stays proportional
    /// to the precision.
    fn fix_rescaled_zero_sum(&self, nonzero: &Decimal, exp: i64, raised: &mut Status) -> Decimal {
        let exp = if self.is_exact() {
            exp
        } else {
            exp.max(sat_exp(
                nonzero.exponent as i128 - self.precision() as i128 - 1,
            ))
        };
        let (ans, _, _) = rescale(nonzero, exp, self.rounding());
        self.fix(ans, raised)
    }

    fn mul_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        let negative = lhs.negative != rhs.negative;
        if lhs.is_infinite() || rhs.is_infinite() {
            if lhs.is_zero() || rhs.is_zero() {
                return invalid(raised);
            }
            return Decimal::inf(negative);
        }
        let exp = sat_exp(lhs.exponent as i128 + rhs.exponent as i128);
        let coeff = &lhs.coefficient * &rhs.coefficient;
        self.fix(Decimal::finite(negative, coeff, exp), raised)
    }

    fn div_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        let negative = lhs.negative != rhs.negative;
        if lhs.is_infinite() || rhs.is_infinite() {
            if lhs.is_infinite() && rhs.is_infinite() {
                return invalid(raised);
            }
            if lhs.is_infinite() {
                return Decimal::inf(negative);
            }
            raised.set(Signal::Clamped);
            return Decimal::zeroed(negative, self.etiny());
        }
        if rhs.is_zero() {
            if lhs.is_zero() {
                raised.set(Signal::DivisionUndefined);
                raised.set(Signal::InvalidOperation);
                return Decimal::nan();
            }
            raised.set(Signal::DivisionByZero);
            return Decimal::inf(negative);
        }

        let ideal_exp = sat_exp(lhs.exponent as i128 - rhs.exponent as i128);
        if lhs.is_zero() {
            return self.fix(Decimal::zeroed(negative, ideal_exp), raised);
        }

        let d1 = lhs.digits();
        let d2 = rhs.digits();
        // In exact mode a working precision of digits(lhs) + 4*digits(rhs)
        // quotient digits is enough to reach a zero remainder for every
        // terminating quotient, since the scale shift never needs to exceed
        // log2 of the divisor.
        let prec = if self.is_exact() {
            (d1 + 4 * d2) as usize
        } else {
            self.precision()
        };
        let shift = d2 as i128 - d1 as i128 + prec as i128 + 1;
        let exp = sat_exp(lhs.exponent as i128 - rhs.exponent as i128 - shift);
        let (mut coeff, remainder) = if shift >= 0 {
            (&lhs.coefficient * pow10(shift as u64)).div_rem(&rhs.coefficient)
        } else {
            lhs.coefficient
                .div_rem(&(&rhs.coefficient * pow10(-shift as u64)))
        };
        if !remainder.is_zero() {
            if self.is_exact() {
                raised.set(Signal::Inexact);
                return Decimal::finite(negative, coeff, exp);
            }
            // Make the last digit odd-ish so every rounding mode sees the
            // discarded remainder.
            if (&coeff % 5u8).is_zero() {
                coeff += 1u8;
            }
            return self.fix(Decimal::finite(negative, coeff, exp), raised);
        }
        let mut exp = exp;
        let ten = BigUint::from(10u8);
        while exp < ideal_exp && (&coeff % &ten).is_zero() {
            coeff /= &ten;
            exp += 1;
        }
        self.fix(Decimal::finite(negative, coeff, exp), raised)
    }

    /// The common integer-division kernel: returns the integer quotient and
    /// the correspondingly-signed remainder at the ideal exponent, or `None`
    /// if the quotient would not fit the context precision.
    fn integer_divide(
        &self,
        lhs: &Decimal,
        rhs: &Decimal,
        raised: &mut Status,
    ) -> Option<(Decimal, Decimal)> {
        let negative = lhs.negative != rhs.negative;
        let ideal_exp = lhs.exponent.min(rhs.exponent);
        let expdiff = lhs.adjusted_exponent() as i128 - rhs.adjusted_exponent() as i128;
        if lhs.is_zero() || expdiff <= -2 {
            let (r, _, _) = rescale(lhs, ideal_exp, self.rounding());
            return Some((Decimal::zeroed(negative, 0), r));
        }
        if self.is_exact() || expdiff <= self.precision() as i128 {
            let (c1, c2) = align(lhs, rhs);
            let (q, r) = c1.div_rem(&c2);
            if self.is_exact() || ndigits(&q) <= self.precision() as u64 {
                return Some((
                    Decimal::finite(negative, q, 0),
                    Decimal::finite(lhs.negative, r, ideal_exp),
                ));
            }
        }
        raised.set(Signal::DivisionImpossible);
        raised.set(Signal::InvalidOperation);
        None
    }

    fn div_integer_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        let negative = lhs.negative != rhs.negative;
        if lhs.is_infinite() {
            if rhs.is_infinite() {
                return invalid(raised);
            }
            return Decimal::inf(negative);
        }
        if rhs.is_infinite() {
            return self.fix(Decimal::zeroed(negative, 0), raised);
        }
        if rhs.is_zero() {
            if lhs.is_zero() {
                raised.set(Signal::DivisionUndefined);
                raised.set(Signal::InvalidOperation);
                return Decimal::nan();
            }
            raised.set(Signal::DivisionByZero);
            return Decimal::inf(negative);
        }
        match self.integer_divide(lhs, rhs, raised) {
            Some((q, _)) => self.fix(q, raised),
            None => Decimal::nan(),
        }
    }

    fn rem_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        if lhs.is_infinite() {
            return invalid(raised);
        }
        if rhs.is_zero() {
            if lhs.is_zero() {
                raised.set(Signal::DivisionUndefined);
                raised.set(Signal::InvalidOperation);
            } else {
                raised.set(Signal::InvalidOperation);
            }
            return Decimal::nan();
        }
        if rhs.is_infinite() {
            return self.fix(lhs.clone(), raised);
        }
        match self.integer_divide(lhs, rhs, raised) {
            Some((_, r)) => self.fix(r, raised),
            None => Decimal::nan(),
        }
    }

    fn rem_near_impl(&self, lhs: &Decimal, rhs: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[lhs, rhs]) {
            return nan;
        }
        if lhs.is_infinite() {
            return invalid(raised);
        }
        if rhs.is_zero() {
            if lhs.is_zero() {
                raised.set(Signal::DivisionUndefined);
                raised.set(Signal::InvalidOperation);
            } else {
                raised.set(Signal::InvalidOperation);
            }
            return Decimal::nan();
        }
        if rhs.is_infinite() {
            return self.fix(lhs.clone(), raised);
        }
        let ideal_exp = lhs.exponent.min(rhs.exponent);
        if lhs.is_zero() {
            return self.fix(Decimal::zeroed(lhs.negative, ideal_exp), raised);
        }
        let expdiff = lhs.adjusted_exponent() as i128 - rhs.adjusted_exponent() as i128;
        if !self.is_exact() && expdiff >= self.precision() as i128 + 1 {
            raised.set(Signal::DivisionImpossible);
            raised.set(Signal::InvalidOperation);
            return Decimal::nan();
        }
        if expdiff <= -2 {
            let (ans, _, _) = rescale(lhs, ideal_exp, self.rounding());
            return self.fix(ans, raised);
        }
        let (c1, c2) = align(lhs, rhs);
        let (mut q, mut r) = c1.div_rem(&c2);
        // Round the quotient to the nearest integer, ties to even, and keep
        // the remainder's magnitude at most half the divisor.
        let mut negative = lhs.negative;
        let parity = if q.is_odd() { 1u8 } else { 0u8 };
        if &r * 2u8 + parity > c2 {
            negative = !negative;
            r = &c2 - &r;
            q += 1u8;
        }
        if !self.is_exact() && ndigits(&q) > self.precision() as u64 {
            raised.set(Signal::DivisionImpossible);
            raised.set(Signal::InvalidOperation);
            return Decimal::nan();
        }
        self.fix(Decimal::finite(negative, r, ideal_exp), raised)
    }

    fn sqrt_impl(&self, n: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[n]) {
            return nan;
        }
        if n.is_infinite() {
            if n.negative {
                return invalid(raised);
            }
            return Decimal::infinity();
        }
        if n.is_zero() {
            // sqrt(+-0) is +-0 with half the exponent.
            return self.fix(Decimal::zeroed(n.negative, n.exponent.div_euclid(2)), raised);
        }
        if n.negative {
            return invalid(raised);
        }

        let digits = n.digits();
        let prec = if self.is_exact() {
            2 * digits + 1
        } else {
            self.precision() as u64 + 1
        };
        // Express the operand as c * 10^(2e) so the root's exponent is e.
        let mut e = n.exponent.div_euclid(2);
        let (mut c, l) = if n.exponent.rem_euclid(2) == 1 {
            (&n.coefficient * 10u8, (digits >> 1) + 1)
        } else {
            (n.coefficient.clone(), (digits + 1) >> 1)
        };
        let shift = prec as i128 - l as i128;
        let mut exact = true;
        if shift >= 0 {
            c *= pow10(2 * shift as u64);
        } else {
            let (q, r) = c.div_rem(&pow10(2 * (-shift) as u64));
            c = q;
            exact = r.is_zero();
        }
        e -= shift as i64;

        let root = c.sqrt();
        let exact = exact && (&root * &root) == c;
        if exact {
            // Scale back towards the ideal exponent.
            let (coeff, exp) = if shift >= 0 {
                (&root / pow10(shift as u64), e + shift as i64)
            } else {
                (&root * pow10(-shift as u64), e + shift as i64)
            };
            let mut hev = self.clone();
            hev.set_rounding(Rounding::HalfEven);
            return hev.fix(Decimal::finite(false, coeff, exp), raised);
        }
        if self.is_exact() {
            raised.set(Signal::Inexact);
            return Decimal::finite(false, root, e);
        }
        let root = if (&root % 5u8).is_zero() {
            root + 1u8
        } else {
            root
        };
        let mut hev = self.clone();
        hev.set_rounding(Rounding::HalfEven);
        hev.fix(Decimal::finite(false, root, e), raised)
    }

    fn fma_impl(&self, x: &Decimal, y: &Decimal, z: &Decimal, raised: &mut Status) -> Decimal {
        // The product is never rounded; only the final addition is.
        let product = if x.is_special() || y.is_special() {
            if x.is_signaling_nan() || y.is_signaling_nan() {
                return propagate_nan(raised, &[x, y]).expect("a multiplicand is a signaling NaN");
            }
            if let Some(nan) = propagate_nan(raised, &[x, y]) {
                nan
            } else if x.is_infinite() && y.is_zero() || y.is_infinite() && x.is_zero() {
                return invalid(raised);
            } else {
                Decimal::inf(x.negative != y.negative)
            }
        } else {
            Decimal::finite(
                x.negative != y.negative,
                &x.coefficient * &y.coefficient,
                sat_exp(x.exponent as i128 + y.exponent as i128),
            )
        };
        self.add_impl(&product, z, raised)
    }

    fn pow_impl(&self, x: &Decimal, y: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[x, y]) {
            return nan;
        }
        let n = match integral_value_i64(y) {
            Some(n) => n,
            None => return invalid(raised),
        };
        let odd = n % 2 != 0;
        let negative = x.negative && odd;
        if x.is_zero() {
            return match n.cmp(&0) {
                Ordering::Equal => invalid(raised),
                Ordering::Greater => self.fix(
                    Decimal::zeroed(negative, sat_exp(x.exponent as i128 * n as i128)),
                    raised,
                ),
                Ordering::Less => {
                    raised.set(Signal::DivisionByZero);
                    Decimal::inf(negative)
                }
            };
        }
        if x.is_infinite() {
            return match n.cmp(&0) {
                Ordering::Equal => Decimal::from(1),
                Ordering::Greater => Decimal::inf(negative),
                Ordering::Less => Decimal::zeroed(negative, 0),
            };
        }
        if n == 0 {
            return self.fix(Decimal::from(1), raised);
        }

        // Short-circuit when the magnitude estimate is hopelessly outside
        // the exponent bounds, to avoid materializing an enormous exact
        // coefficient.
        let adj = x.adjusted_exponent() as i128;
        let est = adj * n as i128;
        let slack = self.precision_or_one() as i128 + x.digits() as i128 + 2;
        if est - slack > self.max_exponent() as i128 {
            raised.set(Signal::Overflow);
            raised.set(Signal::Inexact);
            raised.set(Signal::Rounded);
            return self.overflow_result(negative);
        }
        if est + slack < self.etiny() as i128 {
            raised.set(Signal::Underflow);
            raised.set(Signal::Subnormal);
            raised.set(Signal::Inexact);
            raised.set(Signal::Rounded);
            raised.set(Signal::Clamped);
            return Decimal::zeroed(negative, self.etiny());
        }

        let mut magnitude = self.pow_magnitude(x, n.unsigned_abs(), raised);
        if n > 0 {
            magnitude.negative = negative;
            return self.fix(magnitude, raised);
        }
        // Negative exponents go through the reciprocal, with division's
        // exactness rules. The dividend carries the result sign so that
        // directional rounding modes see it.
        let one = Decimal::finite(negative, BigUint::one(), 0);
        self.div_impl(&one, &magnitude, raised)
    }

    /// Computes |x|^n for positive n by binary exponentiation. Outside exact
    /// mode intermediates are rounded half even to a working precision a few
    /// digits past the context's, and any discarded nonzero digit is
    /// reported through `raised`.
    fn pow_magnitude(&self, x: &Decimal, n: u64, raised: &mut Status) -> Decimal {
        let working = if self.is_exact() {
            0
        } else {
            self.precision() as u64 + ndigits(&BigUint::from(n)) + 3
        };
        let mut acc = Work {
            negative: false,
            coeff: BigUint::one(),
            exp: 0,
        };
        let base_coeff = x.coefficient.clone();
        let base_exp = x.exponent;
        let mut inexact = false;
        let mut rounded = false;
        for bit in (0..64 - n.leading_zeros()).rev() {
            acc.coeff = &acc.coeff * &acc.coeff;
            acc.exp = sat_exp(2 * acc.exp as i128);
            if n & (1 << bit) != 0 {
                acc.coeff *= &base_coeff;
                acc.exp = sat_exp(acc.exp as i128 + base_exp as i128);
            }
            if working > 0 {
                let nd = ndigits(&acc.coeff);
                if nd > working {
                    let trimmed = Decimal::finite(false, acc.coeff, acc.exp);
                    let (out, r, i) =
                        rescale(&trimmed, acc.exp + (nd - working) as i64, Rounding::HalfEven);
                    acc.coeff = out.coefficient;
                    acc.exp = out.exponent;
                    rounded |= r;
                    inexact |= i;
                }
            }
        }
        if rounded {
            raised.set(Signal::Rounded);
        }
        if inexact {
            raised.set(Signal::Inexact);
        }
        Decimal::finite(false, acc.coeff, acc.exp)
    }

    fn scaleb_impl(&self, x: &Decimal, y: &Decimal, raised: &mut Status) -> Decimal {
        if let Some(nan) = propagate_nan(raised, &[x, y]) {
            return nan;
        }
        let n = match integral_value_i64(y) {
            Some(n) => n,
            None => return invalid(raised),
        };
        let limit = 2 * (self.max_exponent() as i128 + self.precision_or_one() as i128);
        if (n as i128).abs() > limit {
            return invalid(raised);
        }
        if x.is_infinite() {
            return x.clone();
        }
        let shifted = Decimal::finite(
            x.negative,
            x.coefficient.clone(),
            sat_exp(x.exponent as i128 + n as i128),
        );
        self.fix(shifted, raised)
    }

    fn quantize_impl(&self, d: &Decimal, exp: i64, raised: &mut Status) -> Decimal {
        if !(self.etiny() <= exp && exp <= self.max_exponent()) {
            return invalid(raised);
        }
        if d.is_zero() {
            return self.fix(Decimal::zeroed(d.negative, exp), raised);
        }
        let adjusted = d.adjusted_exponent() as i128;
        if adjusted > self.max_exponent() as i128 {
            return invalid(raised);
        }
        if !self.is_exact() && adjusted - exp as i128 + 1 > self.precision() as i128 {
            return invalid(raised);
        }
        let (ans, rounded, inexact) = rescale(d, exp, self.rounding());
        if ans.adjusted_exponent() > self.max_exponent() {
            return invalid(raised);
        }
        if !self.is_exact() && !ans.is_zero() && ans.digits() > self.precision() as u64 {
            return invalid(raised);
        }
        if rounded {
            raised.set(Signal::Rounded);
        }
        if inexact {
            raised.set(Signal::Inexact);
        }
        // The fix step cannot round further, but it reports a subnormal
        // result and folds the exponent down under clamping.
        self.fix(ans, raised)
    }

    /// The universal fix step: round the coefficient to the context
    /// precision, then constrain the exponent to the context bounds,
    /// accumulating every condition in `raised`. Special values pass
    /// through untouched.
    pub(crate) fn fix(&self, d: Decimal, raised: &mut Status) -> Decimal {
        if d.is_special() {
            return d;
        }
        if self.is_exact() {
            return self.fix_exact(d, raised);
        }

        let p = self.precision() as i128;
        let etiny = self.etiny();
        let etop = self.etop();

        if d.is_zero() {
            let exp_max = if self.clamp() {
                etop
            } else {
                self.max_exponent()
            };
            let new_exp = d.exponent.min(exp_max).max(etiny);
            if new_exp != d.exponent {
                raised.set(Signal::Clamped);
                return Decimal::zeroed(d.negative, new_exp);
            }
            return d;
        }

        // The smallest exponent the result can be written at with at most
        // `precision` digits.
        let exp_min = d.digits() as i128 + d.exponent as i128 - p;
        if exp_min > etop as i128 {
            raised.set(Signal::Overflow);
            raised.set(Signal::Inexact);
            raised.set(Signal::Rounded);
            return self.overflow_result(d.negative);
        }
        let is_subnormal = exp_min < etiny as i128;
        let exp_min = if is_subnormal { etiny } else { exp_min as i64 };

        if d.exponent < exp_min {
            let (mut ans, _, inexact) = rescale(&d, exp_min, self.rounding());
            if ndigits(&ans.coefficient) as i128 > p {
                // Rounding carried into a new digit (999... became 1000...).
                ans.coefficient /= BigUint::from(10u8);
                ans.exponent += 1;
                if ans.exponent > etop {
                    raised.set(Signal::Overflow);
                    raised.set(Signal::Inexact);
                    raised.set(Signal::Rounded);
                    return self.overflow_result(d.negative);
                }
            }
            raised.set(Signal::Rounded);
            if inexact {
                raised.set(Signal::Inexact);
                if is_subnormal {
                    raised.set(Signal::Underflow);
                    if ans.is_zero() {
                        raised.set(Signal::Clamped);
                    }
                }
            }
            if is_subnormal {
                raised.set(Signal::Subnormal);
            }
            return ans;
        }

        if self.clamp() && d.exponent > etop {
            raised.set(Signal::Clamped);
            let pad = shift_u64(d.exponent, etop);
            return Decimal::finite(d.negative, &d.coefficient * pow10(pad), etop);
        }
        if is_subnormal {
            raised.set(Signal::Subnormal);
        }
        d
    }

    /// Exact mode never rounds, so the fix step only enforces the exponent
    /// bounds.
    fn fix_exact(&self, d: Decimal, raised: &mut Status) -> Decimal {
        if d.is_zero() {
            return d;
        }
        let adjusted = d.adjusted_exponent();
        if adjusted > self.max_exponent() {
            raised.set(Signal::Overflow);
            raised.set(Signal::Inexact);
            raised.set(Signal::Rounded);
            return self.overflow_result(d.negative);
        }
        if adjusted < self.min_exponent() {
            raised.set(Signal::Underflow);
            raised.set(Signal::Subnormal);
            raised.set(Signal::Inexact);
            raised.set(Signal::Rounded);
            return Decimal::zeroed(d.negative, self.etiny());
        }
        d
    }

    /// The result of an untrapped overflow: sign-preserving infinity, or the
    /// largest representable finite value when clamping is enabled.
    fn overflow_result(&self, negative: bool) -> Decimal {
        if self.clamp() && !self.is_exact() {
            let nines = pow10(self.precision() as u64) - 1u8;
            Decimal::finite(negative, nines, self.etop())
        } else {
            Decimal::inf(negative)
        }
    }
}

/// Aligns two finite operands' coefficients to their common (minimum)
/// exponent.
fn align(lhs: &Decimal, rhs: &Decimal) -> (BigUint, BigUint) {
    if lhs.exponent >= rhs.exponent {
        (
            &lhs.coefficient * pow10(shift_u64(lhs.exponent, rhs.exponent)),
            rhs.coefficient.clone(),
        )
    } else {
        (
            lhs.coefficient.clone(),
            &rhs.coefficient * pow10(shift_u64(rhs.exponent, lhs.exponent)),
        )
    }
}

/// Extracts a finite decimal's value as an `i64`, requiring it to be
/// integral.
fn integral_value_i64(d: &Decimal) -> Option<i64> {
    if !d.is_finite() {
        return None;
    }
    if d.is_zero() {
        return Some(0);
    }
    let magnitude = if d.exponent >= 0 {
        if d.exponent > 18 {
            return None;
        }
        &d.coefficient * pow10(d.exponent as u64)
    } else {
        let frac = (-d.exponent) as u64;
        if frac >= ndigits(&d.coefficient) {
            return None;
        }
        let (q, r) = d.coefficient.div_rem(&pow10(frac));
        if !r.is_zero() {
            return None;
        }
        q
    };
    let magnitude = magnitude.to_i128()?;
    let value = if d.negative { -magnitude } else { magnitude };
    i64::try_from(value).ok()
}
