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

use std::error::Error;
use std::fmt;

use crate::context::{Signal, Status};
use crate::decimal::Decimal;

/// An error indicating that a string is not a valid decimal number.
#[derive(Debug, Eq, PartialEq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid decimal syntax")
    }
}

impl Error for ParseDecimalError {}

/// An error indicating that a precision is not valid for a given context.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidPrecisionError;

impl fmt::Display for InvalidPrecisionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid decimal precision")
    }
}

impl Error for InvalidPrecisionError {}

/// An error indicating that a minimum exponent or maximum exponent is not valid
/// for a given context.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidExponentError;

impl fmt::Display for InvalidExponentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid decimal exponent")
    }
}

impl Error for InvalidExponentError {}

/// An error indicating that a value cannot be cast to another type.
///
/// Causes for this failure include calling cast functions on values:
/// - Representing infinity or NaN
/// - With non-zero fractional parts
/// - Whose coefficient doesn't fit into the target, e.g. values that require
///   too many digits of precision.
#[derive(Debug, Eq, PartialEq)]
pub struct TryFromDecimalError;

impl fmt::Display for TryFromDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("decimal cannot be expressed in target type")
    }
}

impl Error for TryFromDecimalError {}

/// An error indicating a value cannot be precisely cast to a Decimal value, e.g.
/// the cast requires truncating significant digits.
#[derive(Debug, Eq, PartialEq)]
pub struct TryIntoDecimalError;

impl fmt::Display for TryIntoDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("value cannot be precisely expressed as decimal")
    }
}

impl Error for TryIntoDecimalError {}

/// An error raised when an operation's exceptional condition is present in the
/// context's trap set.
///
/// A trapped signal is reported exclusively through this error; it is not also
/// recorded in the context's status. The error carries the complete status
/// raised by the operation and the result the operation would have produced
/// had the signal not been trapped.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationError {
    signal: Signal,
    status: Status,
    result: Decimal,
}

impl OperationError {
    pub(crate) fn new(signal: Signal, status: Status, result: Decimal) -> OperationError {
        OperationError {
            signal,
            status,
            result,
        }
    }

    /// Returns the trapped signal that caused this error.
    ///
    /// If an operation raises multiple trapped signals, the most severe one is
    /// reported.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns every condition the failed operation raised, trapped or not.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the result the operation would have produced had `signal` not
    /// been trapped.
    pub fn into_result(self) -> Decimal {
        self.result
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "decimal operation raised {}", self.signal)
    }
}

impl Error for OperationError {}
