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

use std::fmt;

use crate::decimal::Decimal;
use crate::error::{InvalidExponentError, InvalidPrecisionError, OperationError};

/// The maximum precision, in decimal digits, a context will accept.
pub const MAX_PRECISION: usize = 999_999_999;

/// The largest maximum exponent a context will accept.
pub const MAX_EXPONENT: i64 = 999_999_999;

/// The smallest minimum exponent a context will accept.
pub const MIN_EXPONENT: i64 = -999_999_999;

/// An exceptional condition arising from a decimal operation.
///
/// The conditions are precisely defined in the [Exceptional Conditions]
/// chapter of the General Decimal Arithmetic specification.
///
/// [Exceptional Conditions]: http://speleotrove.com/decimal/daexcep.html
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Signal {
    /// The exponent of a result was altered or constrained to fit the
    /// context's bounds.
    Clamped,
    /// A string could not be converted to a decimal.
    ///
    /// A special case of [`Signal::InvalidOperation`].
    ConversionSyntax,
    /// A nonzero dividend was divided by zero.
    DivisionByZero,
    /// The integer result of a division had too many digits.
    ///
    /// A special case of [`Signal::InvalidOperation`].
    DivisionImpossible,
    /// A zero dividend was divided by zero.
    ///
    /// A special case of [`Signal::InvalidOperation`].
    DivisionUndefined,
    /// One or more nonzero coefficient digits were discarded during rounding.
    Inexact,
    /// An operation was performed on invalid arguments.
    InvalidOperation,
    /// The exponent of a result is too large to be represented.
    Overflow,
    /// One or more coefficient digits, zero or nonzero, were discarded from a
    /// result.
    Rounded,
    /// A result's adjusted exponent is less than E<sub>min</sub> before any
    /// rounding.
    Subnormal,
    /// A result is both subnormal and inexact.
    Underflow,
}

impl Signal {
    /// Every signal, in decreasing order of severity.
    ///
    /// The order determines which signal an [`OperationError`] reports when
    /// one operation raises several trapped signals at once.
    pub const ALL: [Signal; 11] = [
        Signal::ConversionSyntax,
        Signal::DivisionImpossible,
        Signal::DivisionUndefined,
        Signal::InvalidOperation,
        Signal::DivisionByZero,
        Signal::Overflow,
        Signal::Underflow,
        Signal::Subnormal,
        Signal::Inexact,
        Signal::Rounded,
        Signal::Clamped,
    ];

    fn bit(self) -> u32 {
        match self {
            Signal::Clamped => 1 << 0,
            Signal::ConversionSyntax => 1 << 1,
            Signal::DivisionByZero => 1 << 2,
            Signal::DivisionImpossible => 1 << 3,
            Signal::DivisionUndefined => 1 << 4,
            Signal::Inexact => 1 << 5,
            Signal::InvalidOperation => 1 << 6,
            Signal::Overflow => 1 << 7,
            Signal::Rounded => 1 << 8,
            Signal::Subnormal => 1 << 9,
            Signal::Underflow => 1 << 10,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Signal::Clamped => "clamped",
            Signal::ConversionSyntax => "conversion syntax",
            Signal::DivisionByZero => "division by zero",
            Signal::DivisionImpossible => "division impossible",
            Signal::DivisionUndefined => "division undefined",
            Signal::Inexact => "inexact",
            Signal::InvalidOperation => "invalid operation",
            Signal::Overflow => "overflow",
            Signal::Rounded => "rounded",
            Signal::Subnormal => "subnormal",
            Signal::Underflow => "underflow",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of exceptional conditions.
///
/// A context holds three independent status sets: the accumulated flags, the
/// trap enablers, and the ignored signals. Deriving a context copies all
/// three, so mutating a derived context never affects its base.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Status {
    bits: u32,
}

impl Status {
    /// Returns a status with no conditions set.
    pub fn empty() -> Status {
        Status { bits: 0 }
    }

    /// Returns a status with every condition set.
    pub fn all() -> Status {
        let mut status = Status::empty();
        for signal in Signal::ALL {
            status.set(signal);
        }
        status
    }

    /// Reports whether any of the condition flags are set.
    pub fn any(&self) -> bool {
        self.bits != 0
    }

    /// Reports whether `signal` is set.
    pub fn contains(&self, signal: Signal) -> bool {
        self.bits & signal.bit() != 0
    }

    /// Sets `signal`.
    pub fn set(&mut self, signal: Signal) {
        self.bits |= signal.bit();
    }

    /// Clears `signal`.
    pub fn clear(&mut self, signal: Signal) {
        self.bits &= !signal.bit();
    }

    /// Clears every condition.
    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    /// Returns the union of `self` and `other`.
    pub fn union(&self, other: Status) -> Status {
        Status {
            bits: self.bits | other.bits,
        }
    }

    /// Returns the conditions set in both `self` and `other`.
    pub fn intersection(&self, other: Status) -> Status {
        Status {
            bits: self.bits & other.bits,
        }
    }

    /// Returns the conditions set in `self` but not in `other`.
    pub fn difference(&self, other: Status) -> Status {
        Status {
            bits: self.bits & !other.bits,
        }
    }

    /// Reports whether the conversion syntax flag is set.
    ///
    /// Operations set this flag when an invalid string is converted to a
    /// decimal.
    pub fn conversion_syntax(&self) -> bool {
        self.contains(Signal::ConversionSyntax)
    }

    /// Reports whether the division by zero flag is set.
    ///
    /// Operations set this flag when a nonzero dividend is divided by zero.
    pub fn division_by_zero(&self) -> bool {
        self.contains(Signal::DivisionByZero)
    }

    /// Reports whether the division impossible flag is set.
    ///
    /// Operations set this flag if the integer result of a division had too
    /// many digits.
    pub fn division_impossible(&self) -> bool {
        self.contains(Signal::DivisionImpossible)
    }

    /// Reports whether the division undefined flag is set.
    ///
    /// Operations set this flag when a zero dividend is divided by zero.
    pub fn division_undefined(&self) -> bool {
        self.contains(Signal::DivisionUndefined)
    }

    /// Reports whether the inexact flag is set.
    ///
    /// Operations set this flag when one or more nonzero coefficient digits
    /// were discarded during rounding from a result.
    pub fn inexact(&self) -> bool {
        self.contains(Signal::Inexact)
    }

    /// Reports whether the invalid operation flag is set.
    ///
    /// Various operations set this flag in response to invalid arguments.
    pub fn invalid_operation(&self) -> bool {
        self.contains(Signal::InvalidOperation)
    }

    /// Reports whether the overflow flag is set.
    ///
    /// Operations set this flag when the exponent of a result is too large to
    /// be represented.
    pub fn overflow(&self) -> bool {
        self.contains(Signal::Overflow)
    }

    /// Reports whether the clamped flag is set.
    ///
    /// Operations set this flag when the exponent of a result has been altered
    /// or constrained in order to fit the context's bounds.
    pub fn clamped(&self) -> bool {
        self.contains(Signal::Clamped)
    }

    /// Reports whether the rounded flag is set.
    ///
    /// Operations set this flag when one or more zero or nonzero coefficient
    /// digits were discarded from a result.
    pub fn rounded(&self) -> bool {
        self.contains(Signal::Rounded)
    }

    /// Reports whether the subnormal flag is set.
    ///
    /// Operations set this flag when a result's adjusted exponent is less than
    /// E<sub>min</sub> before any rounding.
    pub fn subnormal(&self) -> bool {
        self.contains(Signal::Subnormal)
    }

    /// Reports whether the underflow flag is set.
    ///
    /// Operations set this flag when a result is both subnormal and inexact.
    pub fn underflow(&self) -> bool {
        self.contains(Signal::Underflow)
    }

    pub(crate) fn most_severe(&self) -> Option<Signal> {
        Signal::ALL.iter().copied().find(|s| self.contains(*s))
    }
}

impl Default for Status {
    fn default() -> Status {
        Status::empty()
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set()
            .entries(Signal::ALL.iter().filter(|s| self.contains(**s)))
            .finish()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for signal in Signal::ALL {
            if self.contains(signal) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(signal.name())?;
                first = false;
            }
        }
        if first {
            f.write_str("(none)")?;
        }
        Ok(())
    }
}

impl From<Signal> for Status {
    fn from(signal: Signal) -> Status {
        let mut status = Status::empty();
        status.set(signal);
        status
    }
}

/// Algorithms for rounding decimal numbers.
///
/// The rounding modes are precisely defined in [The Arithmetic Model][model]
/// chapter of the General Decimal Arithmetic specification.
///
/// [model]: http://speleotrove.com/decimal/damodel.html
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Rounding {
    /// Round towards positive infinity.
    Ceiling,
    /// Round towards zero (truncation).
    Down,
    /// Round towards negative infinity.
    Floor,
    /// Round to nearest; if equidistant, round down.
    HalfDown,
    /// Round to nearest; if equidistant, round so that the final digit is even.
    HalfEven,
    /// Round to nearest; if equidistant, round up.
    HalfUp,
    /// Round away from zero.
    Up,
    /// The same as [`Rounding::Down`], except that rounding away from zero
    /// occurs if discarded digits are nonzero and the retained final digit
    /// is 0 or 5.
    ZeroFiveUp,
}

impl Default for Rounding {
    fn default() -> Rounding {
        Rounding::HalfEven
    }
}

/// The class of a decimal number.
///
/// These classes are precisely defined in [The Arithmetic Model][model] chapter
/// of the General Decimal Arithmetic specification.
///
/// [model]: http://speleotrove.com/decimal/damodel.html
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Class {
    /// Signaling NaN ("Not a Number").
    SignalingNan,
    /// Quiet NaN ("Not a Number").
    QuietNan,
    /// Negative infinity.
    NegInfinity,
    /// Negative normal.
    NegNormal,
    /// Negative subnormal.
    NegSubnormal,
    /// Negative zero.
    NegZero,
    /// Positive zero.
    PosZero,
    /// Positive subnormal.
    PosSubnormal,
    /// Positive normal.
    PosNormal,
    /// Positive infinity.
    PosInfinity,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Class::SignalingNan => f.write_str("sNaN"),
            Class::QuietNan => f.write_str("NaN"),
            Class::NegInfinity => f.write_str("-Infinity"),
            Class::NegNormal => f.write_str("-Normal"),
            Class::NegSubnormal => f.write_str("-Subnormal"),
            Class::NegZero => f.write_str("-Zero"),
            Class::PosZero => f.write_str("+Zero"),
            Class::PosSubnormal => f.write_str("+Subnormal"),
            Class::PosNormal => f.write_str("+Normal"),
            Class::PosInfinity => f.write_str("+Infinity"),
        }
    }
}

/// A context for performing decimal operations.
///
/// Contexts serve two purposes:
///
///   * They configure various properties of decimal arithmetic, like the
///     precision to round results to and the rounding algorithm to use.
///
///   * They accumulate any informational and exceptional conditions raised by
///     decimal operations. Multiple operations can be performed on a context
///     and the status need only be checked once at the end.
///
/// There is no ambient or thread-local context: every operation takes the
/// context it runs under explicitly. To evaluate a dynamic extent under
/// modified settings without disturbing the caller's context, see
/// [`Context::local`].
///
/// A `&Context` may be shared freely across threads for reading. Operations
/// take `&mut self` because they accumulate status, so concurrent use of one
/// context requires one context per thread (derive copies with [`Clone`]) or
/// external locking; the borrow checker enforces this.
#[derive(Clone)]
pub struct Context {
    precision: usize,
    rounding: Rounding,
    emin: i64,
    emax: i64,
    traps: Status,
    flags: Status,
    ignored: Status,
    clamp: bool,
    quiet: bool,
    capitals: bool,
}

impl Default for Context {
    /// The default context: precision 28, round half even, wide exponent
    /// bounds, and traps on invalid operation, division by zero, and
    /// overflow.
    fn default() -> Context {
        let mut traps = Status::empty();
        traps.set(Signal::InvalidOperation);
        traps.set(Signal::DivisionByZero);
        traps.set(Signal::Overflow);
        Context {
            precision: 28,
            rounding: Rounding::HalfEven,
            emin: MIN_EXPONENT,
            emax: MAX_EXPONENT,
            traps,
            flags: Status::empty(),
            ignored: Status::empty(),
            clamp: true,
            quiet: false,
            capitals: true,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("precision", &self.precision)
            .field("rounding", &self.rounding)
            .field("emin", &self.emin)
            .field("emax", &self.emax)
            .field("traps", &self.traps)
            .field("flags", &self.flags)
            .field("clamp", &self.clamp)
            .finish()
    }
}

impl Context {
    /// The basic context: precision 9, round half up, and traps on every
    /// error condition plus clamped and underflow.
    pub fn basic() -> Context {
        let mut cx = Context::default();
        cx.precision = 9;
        cx.rounding = Rounding::HalfUp;
        cx.traps.set(Signal::Clamped);
        cx.traps.set(Signal::Underflow);
        cx
    }

    /// The extended context: precision 9, round half even, no traps, and no
    /// exponent clamping.
    pub fn extended() -> Context {
        let mut cx = Context::default();
        cx.precision = 9;
        cx.rounding = Rounding::HalfEven;
        cx.traps = Status::empty();
        cx.clamp = false;
        cx
    }

    /// Returns the context's precision.
    ///
    /// Results of operations that use this context are rounded to this many
    /// significant digits. A precision of zero selects exact mode, in which
    /// no rounding occurs and any operation whose result cannot be
    /// represented exactly raises [`Signal::Inexact`].
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Sets the context's precision.
    ///
    /// The precision must be no greater than [`MAX_PRECISION`]. A precision
    /// of zero selects exact mode, which forces [`Signal::Inexact`] into the
    /// trap set; leaving exact mode removes it again.
    pub fn set_precision(&mut self, precision: usize) -> Result<(), InvalidPrecisionError> {
        if precision > MAX_PRECISION {
            return Err(InvalidPrecisionError);
        }
        self.precision = precision;
        if precision == 0 {
            self.traps.set(Signal::Inexact);
            self.ignored.clear(Signal::Inexact);
        } else {
            self.traps.clear(Signal::Inexact);
        }
        Ok(())
    }

    /// Reports whether the context is in exact mode.
    pub fn is_exact(&self) -> bool {
        self.precision == 0
    }

    /// Returns the context's rounding algorithm.
    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    /// Sets the context's rounding algorithm.
    pub fn set_rounding(&mut self, rounding: Rounding) {
        self.rounding = rounding;
    }

    /// Returns the context's maximum exponent.
    ///
    /// A result whose adjusted exponent would exceed this bound raises
    /// [`Signal::Overflow`].
    pub fn max_exponent(&self) -> i64 {
        self.emax
    }

    /// Sets the context's maximum exponent.
    ///
    /// The maximum exponent must not be negative and no greater than
    /// [`MAX_EXPONENT`].
    pub fn set_max_exponent(&mut self, e: i64) -> Result<(), InvalidExponentError> {
        if e < 0 || e > MAX_EXPONENT {
            return Err(InvalidExponentError);
        }
        self.emax = e;
        Ok(())
    }

    /// Returns the context's minimum exponent.
    ///
    /// A result whose adjusted exponent would fall below this bound is
    /// subnormal and may raise [`Signal::Underflow`].
    pub fn min_exponent(&self) -> i64 {
        self.emin
    }

    /// Sets the context's minimum exponent.
    ///
    /// The minimum exponent must not be positive and no smaller than
    /// [`MIN_EXPONENT`].
    pub fn set_min_exponent(&mut self, e: i64) -> Result<(), InvalidExponentError> {
        if e > 0 || e < MIN_EXPONENT {
            return Err(InvalidExponentError);
        }
        self.emin = e;
        Ok(())
    }

    /// Returns the minimum exponent a subnormal result may take,
    /// `emin - precision + 1`.
    pub fn etiny(&self) -> i64 {
        self.emin - self.precision_or_one() as i64 + 1
    }

    /// Returns the maximum exponent a result's coefficient may be written at,
    /// `emax - precision + 1`.
    pub fn etop(&self) -> i64 {
        self.emax - self.precision_or_one() as i64 + 1
    }

    /// Reports whether the context has exponent clamping enabled.
    ///
    /// When set, finite results are constrained to exponents no greater than
    /// [`etop`](Context::etop) by padding the coefficient with zeros, and an
    /// untrapped overflow yields the largest representable finite value in
    /// place of infinity.
    pub fn clamp(&self) -> bool {
        self.clamp
    }

    /// Sets whether the context has exponent clamping enabled.
    pub fn set_clamp(&mut self, clamp: bool) {
        self.clamp = clamp;
    }

    /// Reports whether the context is quiet.
    ///
    /// A quiet context neither records flags nor raises trap errors; results
    /// are still rounded and bounded normally.
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// Sets whether the context is quiet.
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Reports whether exponents format with an uppercase `E`.
    ///
    /// Affects [`Context::to_string`] and [`Context::to_eng_string`] only.
    pub fn capitals(&self) -> bool {
        self.capitals
    }

    /// Sets whether exponents format with an uppercase `E`.
    pub fn set_capitals(&mut self, capitals: bool) {
        self.capitals = capitals;
    }

    /// Returns the context's accumulated status.
    pub fn status(&self) -> Status {
        self.flags
    }

    /// Clears the context's accumulated status.
    pub fn clear_status(&mut self) {
        self.flags.clear_all();
    }

    /// Returns the context's trap enablers.
    ///
    /// An operation that raises a trapped signal returns an
    /// [`OperationError`] instead of recording a flag.
    pub fn traps(&self) -> Status {
        self.traps
    }

    /// Replaces the context's trap enablers.
    ///
    /// In exact mode, [`Signal::Inexact`] remains trapped regardless of
    /// `traps`.
    pub fn set_traps(&mut self, traps: Status) {
        self.traps = traps;
        if self.is_exact() {
            self.traps.set(Signal::Inexact);
        }
    }

    /// Adds `signal` to the trap enablers.
    pub fn trap(&mut self, signal: Signal) {
        self.traps.set(signal);
    }

    /// Removes `signal` from the trap enablers.
    pub fn untrap(&mut self, signal: Signal) {
        self.traps.clear(signal);
        if self.is_exact() {
            self.traps.set(Signal::Inexact);
        }
    }

    /// Returns the signals the context ignores.
    ///
    /// An ignored signal is suppressed entirely: it is neither recorded as a
    /// flag nor raised as a trap.
    pub fn ignored(&self) -> Status {
        self.ignored
    }

    /// Ignores `signal`.
    pub fn ignore(&mut self, signal: Signal) {
        self.ignored.set(signal);
        if self.is_exact() {
            self.ignored.clear(Signal::Inexact);
        }
    }

    /// Stops ignoring `signal`.
    pub fn regard(&mut self, signal: Signal) {
        self.ignored.clear(signal);
    }

    /// Ignores every signal.
    pub fn ignore_all(&mut self) {
        self.ignored = Status::all();
        if self.is_exact() {
            self.ignored.clear(Signal::Inexact);
        }
    }

    /// Runs `f` against a deep copy of this context.
    ///
    /// Settings changed and flags raised inside `f` are confined to the copy:
    /// when `f` returns — or unwinds — this context is exactly as it was,
    /// including its accumulated status. This is the explicit replacement for
    /// a thread-local "current context" with scoped activation.
    ///
    /// ```
    /// use gda::Context;
    ///
    /// let cx = Context::extended();
    /// let d = cx.local(|cx| {
    ///     cx.set_precision(2).unwrap();
    ///     let third = cx.div(&"1".parse()?, &"3".parse()?)?;
    ///     assert!(cx.status().inexact());
    ///     Ok::<_, Box<dyn std::error::Error>>(third)
    /// }).unwrap();
    /// assert!(!cx.status().inexact());
    /// assert_eq!(d.to_string(), "0.33");
    /// ```
    pub fn local<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Context) -> T,
    {
        let mut scoped = self.clone();
        f(&mut scoped)
    }

    pub(crate) fn precision_or_one(&self) -> usize {
        if self.precision == 0 {
            1
        } else {
            self.precision
        }
    }

    /// Resolves the signals raised by one operation against the ignored,
    /// trap, and flag sets. Each occurrence is reported through exactly one
    /// channel: a trapped signal becomes the error and is not also recorded.
    pub(crate) fn finish(
        &mut self,
        result: Decimal,
        raised: Status,
    ) -> Result<Decimal, OperationError> {
        if self.quiet {
            return Ok(result);
        }
        let effective = raised.difference(self.ignored);
        let trapped = effective.intersection(self.traps);
        self.flags = self.flags.union(effective.difference(self.traps));
        match trapped.most_severe() {
            Some(signal) => Err(OperationError::new(signal, effective, result)),
            None => Ok(result),
        }
    }
}
