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
use std::error::Error;
use std::hash::{Hash, Hasher};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;

use gda::{dec, Context, Decimal, OrderedDecimal, Rounding, Signal};

#[derive(Default)]
struct ValidatingHasher {
    bytes: Vec<u8>,
}

impl Hasher for ValidatingHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes)
    }

    fn finish(&self) -> u64 {
        unimplemented!()
    }
}

fn hash_data<H>(h: H) -> Vec<u8>
where
    H: Hash,
{
    let mut hasher = ValidatingHasher::default();
    h.hash(&mut hasher);
    hasher.bytes
}

const ROUND_TRIP_TESTS: &[&str] = &[
    "0",
    "-0",
    "0E+2",
    "0E-11",
    "1",
    "1.2",
    "1.200",
    "0.001",
    "-0.000001",
    "1E-7",
    "-1E-7",
    "1.234E+6",
    "123456789012345678901234567890",
    "9.999E+999999999",
];

#[test]
fn test_round_trip() -> Result<(), Box<dyn Error>> {
    for s in ROUND_TRIP_TESTS {
        let d: Decimal = s.parse()?;
        let formatted = d.to_string();
        assert_eq!(formatted, *s);
        let reparsed: Decimal = formatted.parse()?;
        assert_eq!(reparsed.is_negative(), d.is_negative());
        assert_eq!(reparsed.coefficient(), d.coefficient());
        assert_eq!(reparsed.exponent(), d.exponent());
    }
    Ok(())
}

#[test]
fn test_display() -> Result<(), Box<dyn Error>> {
    // GDAS to-scientific-string: plain notation while the exponent is at
    // most zero and the adjusted exponent at least -6.
    for (input, expected) in &[
        ("123.45E2", "12345"),
        ("12.34E+5", "1.234E+6"),
        ("0.00001", "0.00001"),
        ("1E-6", "0.000001"),
        ("1E-7", "1E-7"),
        ("-Infinity", "-Infinity"),
        ("inf", "Infinity"),
        ("nan", "NaN"),
        ("-NaN123", "-NaN123"),
        ("snan7", "sNaN7"),
    ] {
        let d: Decimal = input.parse()?;
        assert_eq!(d.to_string(), *expected);
    }
    // Engineering notation puts the exponent on a multiple of three.
    for (input, expected) in &[
        ("123E+1", "1.23E+3"),
        ("1.2E+4", "12E+3"),
        ("12E+2", "1.2E+3"),
        ("7E-7", "700E-9"),
        ("0E+1", "0.00E+3"),
    ] {
        let d: Decimal = input.parse()?;
        assert_eq!(format!("{:#}", d), *expected);
    }
    // Context formatting honors the capitals setting.
    let mut cx = Context::default();
    let d: Decimal = "1.234E+6".parse()?;
    assert_eq!(cx.to_string(&d), "1.234E+6");
    cx.set_capitals(false);
    assert_eq!(cx.to_string(&d), "1.234e+6");
    Ok(())
}

#[test]
fn test_parse_errors() {
    for s in &["", " 1", "+", "-", ".", "1..2", "e5", "1E", "1E+", "1E5.0", "abc", "NaN12x", "1_000"] {
        assert!(s.parse::<Decimal>().is_err(), "expected {:?} to fail", s);
    }
}

#[test]
fn test_parse_is_exact() -> Result<(), Box<dyn Error>> {
    // Construction does not round to the context precision; rounding
    // happens on the first operation.
    let mut cx = Context::extended();
    let d = cx.parse("1.23456789012345678901234567890")?;
    assert_eq!(d.digits(), 29);
    assert!(!cx.status().any());
    let rounded = cx.plus(&d)?;
    assert_eq!(rounded.to_string(), "1.23456789");
    assert!(cx.status().rounded());
    assert!(cx.status().inexact());
    Ok(())
}

const ROUNDING_TESTS: &[(&str, usize, Rounding, &str)] = &[
    ("2.5", 1, Rounding::HalfEven, "2"),
    ("3.5", 1, Rounding::HalfEven, "4"),
    ("2.5", 1, Rounding::HalfUp, "3"),
    ("2.5", 1, Rounding::HalfDown, "2"),
    ("2.6", 1, Rounding::HalfDown, "3"),
    ("2.1", 1, Rounding::Up, "3"),
    ("2.9", 1, Rounding::Down, "2"),
    ("2.01", 1, Rounding::Ceiling, "3"),
    ("-2.01", 1, Rounding::Ceiling, "-2"),
    ("2.01", 1, Rounding::Floor, "2"),
    ("-2.01", 1, Rounding::Floor, "-3"),
    ("1.01", 1, Rounding::ZeroFiveUp, "1"),
    ("2.01", 1, Rounding::ZeroFiveUp, "2"),
    ("5.01", 1, Rounding::ZeroFiveUp, "6"),
    ("10.1", 2, Rounding::ZeroFiveUp, "11"),
    ("25.1", 2, Rounding::ZeroFiveUp, "26"),
    ("10.1", 2, Rounding::HalfEven, "10"),
];

#[test]
fn test_rounding_modes() -> Result<(), Box<dyn Error>> {
    for (input, precision, rounding, expected) in ROUNDING_TESTS {
        println!("round({}, {}, {:?}): expected {}", input, precision, rounding, expected);
        let mut cx = Context::extended();
        cx.set_precision(*precision)?;
        cx.set_rounding(*rounding);
        let d = cx.plus(&input.parse()?)?;
        assert_eq!(d.to_string(), *expected);
    }
    Ok(())
}

#[test]
fn test_rounding_idempotent() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    cx.set_precision(3)?;
    let once = cx.plus(&"2.345678".parse()?)?;
    assert_eq!(once.to_string(), "2.35");
    cx.clear_status();
    let twice = cx.plus(&once)?;
    assert_eq!(twice.to_string(), "2.35");
    assert!(!cx.status().any());
    Ok(())
}

#[test]
fn test_exact_mode_division() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    cx.set_precision(0)?;
    assert!(cx.is_exact());

    // A terminating quotient is exact and raises nothing.
    let q = cx.div(&"1".parse()?, &"4".parse()?)?;
    assert_eq!(q.to_string(), "0.25");
    assert!(!cx.status().any());

    // A non-terminating quotient raises Inexact, which exact mode always
    // traps; the trapped signal is not also recorded as a flag.
    let err = cx.div(&"1".parse()?, &"3".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::Inexact);
    assert!(!cx.status().any());
    Ok(())
}

#[test]
fn test_exact_mode_arithmetic() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    cx.set_precision(0)?;
    let product = cx.mul(&"1.000000000000000001".parse()?, &"3".parse()?)?;
    assert_eq!(product.to_string(), "3.000000000000000003");
    let sum = cx.add(&"1E+20".parse()?, &"1E-20".parse()?)?;
    assert_eq!(sum.to_string(), "100000000000000000000.00000000000000000001");
    assert!(!cx.status().any());
    Ok(())
}

#[test]
fn test_overflow() -> Result<(), Box<dyn Error>> {
    // Untrapped overflow yields a sign-preserving infinity.
    let mut cx = Context::extended();
    cx.set_max_exponent(9)?;
    let d = cx.mul(&"1E+9".parse()?, &"10".parse()?)?;
    assert!(d.is_infinite());
    assert!(!d.is_negative());
    assert!(cx.status().overflow());
    assert!(cx.status().inexact());
    assert!(cx.status().rounded());

    // With exponent clamping, untrapped overflow yields the largest
    // representable finite value instead.
    let mut cx = Context::extended();
    cx.set_max_exponent(9)?;
    cx.set_clamp(true);
    let d = cx.mul(&"1E+9".parse()?, &"10".parse()?)?;
    assert_eq!(d.to_string(), "9.99999999E+9");
    assert!(cx.status().overflow());

    // The default context traps overflow.
    let mut cx = Context::default();
    cx.set_max_exponent(9)?;
    let err = cx.mul(&"1E+9".parse()?, &"10".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::Overflow);
    assert!(!cx.status().overflow());
    Ok(())
}

#[test]
fn test_underflow_and_subnormals() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    cx.set_precision(3)?;
    cx.set_min_exponent(-9)?;
    assert_eq!(cx.etiny(), -11);

    // Exactly representable subnormal: Subnormal but no Underflow.
    let d = cx.plus(&"1E-11".parse()?)?;
    assert_eq!(d.to_string(), "1E-11");
    assert!(cx.status().subnormal());
    assert!(!cx.status().underflow());

    // Inexact subnormal: Underflow as well.
    cx.clear_status();
    let d = cx.plus(&"1.23E-11".parse()?)?;
    assert_eq!(d.to_string(), "1E-11");
    assert!(cx.status().subnormal());
    assert!(cx.status().underflow());
    assert!(cx.status().inexact());

    // Underflow all the way to zero also clamps.
    cx.clear_status();
    let d = cx.plus(&"1E-20".parse()?)?;
    assert!(d.is_zero());
    assert_eq!(d.to_string(), "0E-11");
    assert!(cx.status().underflow());
    assert!(cx.status().clamped());
    Ok(())
}

#[test]
fn test_sign_preserving_round_to_zero() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    let d = cx.to_integral_value(&"-0.001".parse()?)?;
    assert!(d.is_zero());
    assert!(d.is_negative());
    assert_eq!(d.to_string(), "-0");
    Ok(())
}

#[test]
fn test_division_by_zero() -> Result<(), Box<dyn Error>> {
    // Trapped by default.
    let mut cx = Context::default();
    let err = cx.div(&"5".parse()?, &"0".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::DivisionByZero);
    assert!(!cx.status().division_by_zero());

    // Untrapped: a correctly-signed infinity.
    let mut cx = Context::extended();
    let d = cx.div(&"5".parse()?, &"0".parse()?)?;
    assert!(d.is_infinite());
    assert!(!d.is_negative());
    let d = cx.div(&"-5".parse()?, &"0".parse()?)?;
    assert!(d.is_infinite());
    assert!(d.is_negative());
    assert!(cx.status().division_by_zero());

    // 0/0 is invalid, not division by zero, regardless of trap state.
    cx.clear_status();
    let d = cx.div(&"0".parse()?, &"0".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());
    assert!(cx.status().division_undefined());
    assert!(!cx.status().division_by_zero());

    let mut cx = Context::default();
    let err = cx.div(&"0".parse()?, &"0".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::InvalidOperation);
    Ok(())
}

#[test]
fn test_scoped_flags_do_not_leak() -> Result<(), Box<dyn Error>> {
    let mut outer = Context::extended();
    outer.div(&"1".parse()?, &"8".parse()?)?;
    assert!(!outer.status().any());

    let quotient = outer.local(|cx| {
        cx.set_precision(2).unwrap();
        let q = cx.div(&"1".parse()?, &"3".parse()?)?;
        assert!(cx.status().inexact());
        Ok::<_, Box<dyn Error>>(q)
    })?;
    assert_eq!(quotient.to_string(), "0.33");

    // The inner scope's flags and settings are gone.
    assert!(!outer.status().inexact());
    assert_eq!(outer.precision(), 9);
    Ok(())
}

#[test]
fn test_fma_single_rounding() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    cx.set_precision(5)?;
    let a: Decimal = "10001".parse()?;
    let b: Decimal = "10001".parse()?;
    let c: Decimal = "-100020000".parse()?;

    // Fused: the exact product 100020001 plus c is 1.
    let fused = cx.fma(&a, &b, &c)?;
    assert_eq!(fused.to_string(), "1");

    // Unfused: the product rounds to 1.0002E+8 first, so the sum is 0.
    let product = cx.mul(&a, &b)?;
    let unfused = cx.add(&product, &c)?;
    assert!(unfused.is_zero());
    assert_ne!(fused, unfused);
    Ok(())
}

#[test]
fn test_integer_division_and_remainder() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.div_integer(&"11".parse()?, &"4".parse()?)?.to_string(), "2");
    assert_eq!(cx.rem(&"11".parse()?, &"4".parse()?)?.to_string(), "3");
    assert_eq!(cx.rem(&"-11".parse()?, &"4".parse()?)?.to_string(), "-3");
    assert_eq!(cx.rem_near(&"11".parse()?, &"4".parse()?)?.to_string(), "-1");
    assert_eq!(cx.rem_near(&"10".parse()?, &"4".parse()?)?.to_string(), "2");
    assert_eq!(cx.rem(&"10".parse()?, &"3".parse()?)?.to_string(), "1");
    assert_eq!(cx.rem(&"3.6".parse()?, &"1.3".parse()?)?.to_string(), "1.0");

    // The integer quotient must fit the precision.
    let mut cx = Context::extended();
    cx.set_precision(2)?;
    let d = cx.div_integer(&"1E+4".parse()?, &"1".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().division_impossible());
    assert!(cx.status().invalid_operation());

    // Remainder by zero is invalid, not division by zero.
    let mut cx = Context::extended();
    let d = cx.rem(&"5".parse()?, &"0".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());
    assert!(!cx.status().division_by_zero());
    Ok(())
}

#[test]
fn test_sqrt() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.sqrt(&"100".parse()?)?.to_string(), "10");
    assert_eq!(cx.sqrt(&"2".parse()?)?.to_string(), "1.41421356");
    assert!(cx.status().inexact());

    // Exact mode verifies the square.
    let mut cx = Context::extended();
    cx.set_precision(0)?;
    assert_eq!(cx.sqrt(&"0.0625".parse()?)?.to_string(), "0.25");
    assert!(!cx.status().any());
    let err = cx.sqrt(&"2".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::Inexact);

    // Negative operands are invalid.
    let mut cx = Context::default();
    let err = cx.sqrt(&"-1".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::InvalidOperation);

    // sqrt(-0) is -0.
    let mut cx = Context::extended();
    let d = cx.sqrt(&"-0".parse()?)?;
    assert!(d.is_zero());
    assert!(d.is_negative());
    Ok(())
}

#[test]
fn test_pow() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.pow(&"2".parse()?, &"10".parse()?)?.to_string(), "1024");
    assert_eq!(cx.pow(&"10".parse()?, &"3".parse()?)?.to_string(), "1000");
    assert_eq!(cx.pow(&"2".parse()?, &"-2".parse()?)?.to_string(), "0.25");
    assert_eq!(cx.pow(&"-3".parse()?, &"3".parse()?)?.to_string(), "-27");
    assert_eq!(cx.pow(&"5".parse()?, &"0".parse()?)?.to_string(), "1");
    assert!(!cx.status().any());

    // Inexact powers round to the context precision.
    let mut cx = Context::extended();
    cx.set_precision(4)?;
    assert_eq!(cx.pow(&"7".parse()?, &"7".parse()?)?.to_string(), "8.235E+5");
    assert!(cx.status().inexact());

    // Non-integral exponents are invalid.
    let mut cx = Context::extended();
    let d = cx.pow(&"2".parse()?, &"0.5".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());

    // 0**0 is invalid; 0**negative divides by zero.
    cx.clear_status();
    assert!(cx.pow(&"0".parse()?, &"0".parse()?)?.is_quiet_nan());
    assert!(cx.status().invalid_operation());
    cx.clear_status();
    let d = cx.pow(&"0".parse()?, &"-1".parse()?)?;
    assert!(d.is_infinite());
    assert!(cx.status().division_by_zero());
    Ok(())
}

#[test]
fn test_quantize() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    for (lhs, rhs, expected) in &[
        ("2.17", "0.001", "2.170"),
        ("2.17", "0.01", "2.17"),
        ("2.17", "0.1", "2.2"),
        ("2.17", "1E+0", "2"),
        ("2.17", "1E+1", "0E+1"),
        ("-0.1", "1", "-0"),
        ("217", "1E+1", "2.2E+2"),
    ] {
        let d = cx.quantize(&lhs.parse()?, &rhs.parse()?)?;
        assert_eq!(d.to_string(), *expected, "quantize({}, {})", lhs, rhs);
    }

    // Quantizing against an infinity is invalid unless both are infinite.
    let d = cx.quantize(&"2".parse()?, &"Infinity".parse()?)?;
    assert!(d.is_quiet_nan());
    let d = cx.quantize(&"-Infinity".parse()?, &"Infinity".parse()?)?;
    assert!(d.is_infinite());

    // The result must fit the precision.
    let mut cx = Context::extended();
    cx.set_precision(2)?;
    let d = cx.quantize(&"123".parse()?, &"1E+0".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());

    // Rescale is quantize by explicit exponent.
    let mut cx = Context::extended();
    assert_eq!(cx.rescale(&"2.17".parse()?, -1)?.to_string(), "2.2");
    Ok(())
}

#[test]
fn test_quantum_matches() -> Result<(), Box<dyn Error>> {
    let a: Decimal = "2.17".parse()?;
    let b: Decimal = "0.01".parse()?;
    let c: Decimal = "0.1".parse()?;
    assert!(a.quantum_matches(&b));
    assert!(!a.quantum_matches(&c));
    assert!(Decimal::infinity().quantum_matches(&"-Inf".parse()?));
    assert!(Decimal::nan().quantum_matches(&"sNaN".parse()?));
    assert!(!Decimal::nan().quantum_matches(&b));
    Ok(())
}

#[test]
fn test_reduce() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.reduce(&"1.200".parse()?)?.to_string(), "1.2");
    assert_eq!(cx.reduce(&"120E+2".parse()?)?.to_string(), "1.2E+4");
    assert_eq!(cx.reduce(&"0.00".parse()?)?.to_string(), "0");
    Ok(())
}

#[test]
fn test_to_integral() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();

    // The value variant raises no conditions.
    assert_eq!(cx.to_integral_value(&"2.5".parse()?)?.to_string(), "2");
    assert_eq!(cx.to_integral_value(&"3.5".parse()?)?.to_string(), "4");
    assert_eq!(cx.to_integral_value(&"5E+2".parse()?)?.to_string(), "5E+2");
    assert!(!cx.status().any());

    // The exact variant signals Rounded, and Inexact when digits were lost.
    assert_eq!(cx.to_integral_exact(&"2.0".parse()?)?.to_string(), "2");
    assert!(cx.status().rounded());
    assert!(!cx.status().inexact());
    cx.clear_status();
    assert_eq!(cx.to_integral_exact(&"2.5".parse()?)?.to_string(), "2");
    assert!(cx.status().rounded());
    assert!(cx.status().inexact());
    Ok(())
}

#[test]
fn test_logb_scaleb() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.logb(&"250".parse()?)?.to_string(), "2");
    assert_eq!(cx.logb(&"0.03".parse()?)?.to_string(), "-2");
    let d = cx.logb(&"0".parse()?)?;
    assert!(d.is_infinite());
    assert!(d.is_negative());
    assert!(cx.status().division_by_zero());

    cx.clear_status();
    assert_eq!(cx.scaleb(&"7.50".parse()?, &"3".parse()?)?.to_string(), "7.50E+3");
    let d = cx.scaleb(&"1".parse()?, &"0.5".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());
    Ok(())
}

#[test]
fn test_compare_and_extrema() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.compare(&"2.1".parse()?, &"2.10".parse()?)?.to_string(), "0");
    assert_eq!(cx.compare(&"2".parse()?, &"3".parse()?)?.to_string(), "-1");
    assert_eq!(cx.compare(&"3".parse()?, &"2".parse()?)?.to_string(), "1");

    // Quiet NaNs propagate through compare without a signal.
    let d = cx.compare(&"NaN".parse()?, &"1".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(!cx.status().any());

    // A quiet NaN loses min/max to any number.
    assert_eq!(cx.max(&"NaN".parse()?, &"2".parse()?)?.to_string(), "2");
    assert_eq!(cx.min(&"2".parse()?, &"NaN".parse()?)?.to_string(), "2");
    assert_eq!(cx.max(&"2".parse()?, &"3".parse()?)?.to_string(), "3");
    assert_eq!(cx.min(&"-2".parse()?, &"3".parse()?)?.to_string(), "-2");

    // Numerically equal operands are split by the total order.
    let d = cx.min(&"-0".parse()?, &"0".parse()?)?;
    assert!(d.is_zero() && d.is_negative());

    // Signaling NaNs are invalid everywhere.
    let mut cx = Context::default();
    let err = cx.max(&"sNaN".parse()?, &"2".parse()?).unwrap_err();
    assert_eq!(err.signal(), Signal::InvalidOperation);
    Ok(())
}

#[test]
fn test_total_cmp() -> Result<(), Box<dyn Error>> {
    let cx = Context::extended();
    for (lhs, rhs, expected) in &[
        ("12.3", "12.30", Ordering::Greater),
        ("12.30", "12.3", Ordering::Less),
        ("1", "1", Ordering::Equal),
        ("-0", "0", Ordering::Less),
        ("1", "Infinity", Ordering::Less),
        ("Infinity", "NaN", Ordering::Less),
        ("sNaN", "NaN", Ordering::Less),
        ("NaN21", "NaN42", Ordering::Less),
        ("-NaN", "0", Ordering::Less),
    ] {
        let lhs: Decimal = lhs.parse()?;
        let rhs: Decimal = rhs.parse()?;
        assert_eq!(cx.total_cmp(&lhs, &rhs), *expected);
    }
    Ok(())
}

#[test]
fn test_special_arithmetic() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();

    // Infinity absorbs addition; the indeterminate forms are invalid.
    assert!(cx.add(&"Infinity".parse()?, &"1".parse()?)?.is_infinite());
    let d = cx.add(&"Infinity".parse()?, &"-Infinity".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());
    cx.clear_status();
    let d = cx.mul(&"0".parse()?, &"Infinity".parse()?)?;
    assert!(d.is_quiet_nan());
    assert!(cx.status().invalid_operation());

    // Quiet NaNs propagate silently, payload intact.
    cx.clear_status();
    let d = cx.add(&"NaN123".parse()?, &"1".parse()?)?;
    assert!(d.is_quiet_nan());
    assert_eq!(d.to_string(), "NaN123");
    assert!(!cx.status().any());

    // Signaling NaNs always raise InvalidOperation and quiet down.
    let d = cx.add(&"sNaN123".parse()?, &"1".parse()?)?;
    assert!(d.is_quiet_nan());
    assert_eq!(d.to_string(), "NaN123");
    assert!(cx.status().invalid_operation());

    // A sum that cancels is positive zero, except under Floor.
    cx.clear_status();
    let d = cx.add(&"1".parse()?, &"-1".parse()?)?;
    assert!(d.is_zero() && !d.is_negative());
    cx.set_rounding(Rounding::Floor);
    let d = cx.add(&"1".parse()?, &"-1".parse()?)?;
    assert!(d.is_zero() && d.is_negative());
    Ok(())
}

#[test]
fn test_unary_ops() -> Result<(), Box<dyn Error>> {
    let mut cx = Context::extended();
    assert_eq!(cx.abs(&"-1.5".parse()?)?.to_string(), "1.5");
    assert_eq!(cx.minus(&"1.5".parse()?)?.to_string(), "-1.5");
    assert_eq!(cx.minus(&"-0".parse()?)?.to_string(), "0");
    assert_eq!(cx.plus(&"-0".parse()?)?.to_string(), "0");
    cx.set_rounding(Rounding::Floor);
    assert_eq!(cx.plus(&"-0".parse()?)?.to_string(), "-0");
    Ok(())
}

#[test]
fn test_ignored_and_quiet() -> Result<(), Box<dyn Error>> {
    // An ignored signal is neither trapped nor recorded.
    let mut cx = Context::default();
    cx.ignore(Signal::DivisionByZero);
    let d = cx.div(&"1".parse()?, &"0".parse()?)?;
    assert!(d.is_infinite());
    assert!(!cx.status().division_by_zero());

    // A quiet context records nothing at all.
    let mut cx = Context::extended();
    cx.set_quiet(true);
    cx.div(&"1".parse()?, &"3".parse()?)?;
    assert!(!cx.status().any());
    Ok(())
}

#[test]
fn test_int_conversions() -> Result<(), Box<dyn Error>> {
    assert_eq!(Decimal::from(42i64).to_string(), "42");
    assert_eq!(Decimal::from(-7i32).to_string(), "-7");
    assert_eq!(Decimal::from(0u8).to_string(), "0");
    assert_eq!(
        Decimal::from(u128::MAX).to_string(),
        "340282366920938463463374607431768211455"
    );

    assert_eq!(BigInt::try_from(&dec!(42))?, BigInt::from(42));
    assert_eq!(BigInt::try_from(&dec!(4.2E+3))?, BigInt::from(4200));
    assert!(BigInt::try_from(&dec!(2.5)).is_err());
    assert!(BigInt::try_from(&Decimal::nan()).is_err());

    assert_eq!(dec!(2.7).to_i64(), Some(2));
    assert_eq!(dec!(-2.7).to_i64(), Some(-2));
    assert_eq!(dec!(-1).to_u64(), None);
    assert_eq!(Decimal::nan().to_i64(), None);
    assert_eq!(dec!(1E+50).to_i64(), None);
    Ok(())
}

#[test]
fn test_rational_conversions() -> Result<(), Box<dyn Error>> {
    let quarter = BigRational::new(BigInt::from(1), BigInt::from(4));
    assert_eq!(Decimal::try_from(&quarter)?.to_string(), "0.25");
    assert_eq!(BigRational::try_from(&dec!(0.25))?, quarter);

    let third = BigRational::new(BigInt::from(1), BigInt::from(3));
    assert!(Decimal::try_from(&third).is_err());

    let mut cx = Context::extended();
    let d = cx.from_rational(&third)?;
    assert_eq!(d.to_string(), "0.333333333");
    assert!(cx.status().inexact());

    let mut cx = Context::extended();
    cx.set_precision(0)?;
    let err = cx.from_rational(&third).unwrap_err();
    assert_eq!(err.signal(), Signal::Inexact);
    Ok(())
}

#[test]
fn test_float_conversions() -> Result<(), Box<dyn Error>> {
    // Float-to-decimal is exact by construction.
    assert_eq!(Decimal::from(0.5f64).to_string(), "0.5");
    assert_eq!(Decimal::from(-0.25f64).to_string(), "-0.25");
    assert_eq!(Decimal::from(3.0f64).to_string(), "3");
    assert_eq!(
        Decimal::from(0.1f64).to_string(),
        "0.1000000000000000055511151231257827021181583404541015625"
    );
    assert_eq!(Decimal::from(0.5f32).to_string(), "0.5");
    assert!(Decimal::from(f64::NAN).is_quiet_nan());
    assert!(Decimal::from(f64::INFINITY).is_infinite());
    let zero = Decimal::from(-0.0f64);
    assert!(zero.is_zero() && zero.is_negative());

    // Decimal-to-float is nearest-representable.
    assert_eq!(dec!(0.5).to_f64(), Some(0.5));
    assert_eq!(dec!(0.1).to_f64(), Some(0.1));
    assert_eq!(dec!(1E+400).to_f64(), Some(f64::INFINITY));
    assert_eq!(Decimal::from(0.1f64).to_f64(), Some(0.1));
    assert!(Decimal::nan().to_f64().unwrap().is_nan());
    Ok(())
}

const ORDERING_TESTS: &[(&str, &str, Ordering)] = &[
    ("1.2", "1.2", Ordering::Equal),
    ("1.2", "1.200", Ordering::Equal),
    ("1", "2", Ordering::Less),
    ("2", "1", Ordering::Greater),
    ("1", "NaN", Ordering::Less),
    ("NaN", "1", Ordering::Greater),
    ("Inf", "NaN", Ordering::Less),
    ("NaN", "Inf", Ordering::Greater),
    ("-Inf", "NaN", Ordering::Less),
    ("NaN", "-Inf", Ordering::Greater),
    ("NaN", "NaN", Ordering::Equal),
    ("sNaN", "NaN", Ordering::Equal),
    ("NaN42", "NaN21", Ordering::Equal),
    ("-0", "+0", Ordering::Equal),
];

#[test]
fn test_ordered_decimal() -> Result<(), Box<dyn Error>> {
    for (lhs, rhs, expected) in ORDERING_TESTS {
        println!("cmp({}, {}): expected {:?}", lhs, rhs, expected);
        let lhs: OrderedDecimal = lhs.parse()?;
        let rhs: OrderedDecimal = rhs.parse()?;
        assert_eq!(lhs.cmp(&rhs), *expected);

        if lhs == rhs && hash_data(&lhs) != hash_data(&rhs) {
            panic!("{} and {} are equal but hashes are not equal", lhs, rhs);
        } else if lhs != rhs && hash_data(&lhs) == hash_data(&rhs) {
            panic!("{} and {} are not equal but hashes are equal", lhs, rhs);
        }
    }
    Ok(())
}

#[test]
fn test_decimal_partial_ord() -> Result<(), Box<dyn Error>> {
    let one: Decimal = "1".parse()?;
    let one_scaled: Decimal = "1.00".parse()?;
    let two: Decimal = "2".parse()?;
    let nan = Decimal::nan();
    assert_eq!(one, one_scaled);
    assert!(one < two);
    assert!(two > one);
    assert!(!(nan == nan));
    assert_eq!(one.partial_cmp(&nan), None);
    assert!(Decimal::infinity() > two);
    Ok(())
}

#[test]
fn test_context_presets() {
    let cx = Context::default();
    assert_eq!(cx.precision(), 28);
    assert_eq!(cx.rounding(), Rounding::HalfEven);
    assert!(cx.traps().invalid_operation());
    assert!(cx.traps().division_by_zero());
    assert!(cx.traps().overflow());
    assert!(!cx.traps().inexact());

    let cx = Context::basic();
    assert_eq!(cx.precision(), 9);
    assert_eq!(cx.rounding(), Rounding::HalfUp);
    assert!(cx.traps().underflow());
    assert!(cx.traps().clamped());

    let cx = Context::extended();
    assert_eq!(cx.precision(), 9);
    assert_eq!(cx.rounding(), Rounding::HalfEven);
    assert!(!cx.traps().any());
    assert!(!cx.clamp());
}

#[test]
fn test_context_validation() {
    let mut cx = Context::default();
    assert!(cx.set_precision(1_000_000_000).is_err());
    assert!(cx.set_max_exponent(-1).is_err());
    assert!(cx.set_min_exponent(1).is_err());
    assert!(cx.set_precision(34).is_ok());
    assert!(cx.set_max_exponent(6144).is_ok());
    assert!(cx.set_min_exponent(-6143).is_ok());
}

#[test]
fn test_dec_macro() {
    assert!(dec!(NaN).is_nan());
    assert!(dec!(0).is_zero());
    assert!(dec!(-0.1).is_negative());
    assert_eq!(dec!(1.753).to_string(), "1.753");
}
