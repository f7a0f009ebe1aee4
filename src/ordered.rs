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
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;
use crate::error::ParseDecimalError;

/// A wrapper for a decimal number that provides an implementation of [`Ord`]
/// and [`Hash`].
///
/// Like the [`OrderedFloat`] type provided by the [`ordered_float`] crate,
/// but for decimals.
///
/// NaN is treated as equal to itself and greater than all non-NaN values;
/// signaling and quiet NaNs compare equal and payloads are ignored. All
/// other values are compared numerically, so e.g. `1.2` and `1.20` are
/// equal. The hash is computed from the reduced form of the value, keeping
/// it consistent with equality.
///
/// Note that the order used by `OrderedDecimal` is *not* the same as the
/// order used by the [`total_cmp`](crate::Context::total_cmp) method, which
/// takes exponents into account and therefore does not consider e.g. `1.2`
/// and `1.20` to be equal.
///
/// [`OrderedFloat`]: https://docs.rs/ordered-float/2.0.1/ordered_float/struct.OrderedFloat.html
/// [`ordered_float`]: https://crates.io/crates/ordered-float
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderedDecimal(pub Decimal);

impl OrderedDecimal {
    /// Consumes the ordered decimal wrapper, returning the decimal within.
    pub fn into_inner(self) -> Decimal {
        self.0
    }
}

impl fmt::Display for OrderedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Decimal> for OrderedDecimal {
    fn from(d: Decimal) -> OrderedDecimal {
        OrderedDecimal(d)
    }
}

impl FromStr for OrderedDecimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<OrderedDecimal, ParseDecimalError> {
        s.parse().map(OrderedDecimal)
    }
}

impl PartialOrd for OrderedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderedDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedDecimal {}

impl Ord for OrderedDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.numeric_cmp(&other.0) {
            Some(ordering) => ordering,
            None => {
                if self.0.is_nan() {
                    if other.0.is_nan() {
                        Ordering::Equal
                    } else {
                        Ordering::Greater
                    }
                } else {
                    Ordering::Less
                }
            }
        }
    }
}

impl Hash for OrderedDecimal {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        let d = &self.0;
        if d.is_nan() {
            state.write_u8(4);
            return;
        }
        if d.is_infinite() {
            state.write_u8(if d.is_negative() { 2 } else { 3 });
            return;
        }
        if d.is_zero() {
            // All zeros are numerically equal regardless of sign and
            // exponent, so they must share a hash.
            state.write_u8(0);
            return;
        }
        state.write_u8(1);
        let ten = BigUint::from(10u8);
        let mut coeff = d.coefficient().clone();
        let mut exp = d.exponent();
        while (&coeff % &ten).is_zero() {
            coeff /= &ten;
            exp += 1;
        }
        d.is_negative().hash(state);
        coeff.to_bytes_le().hash(state);
        exp.hash(state);
    }
}
