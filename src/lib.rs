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

//! gda is a decimal arithmetic library for Rust.
//!
//! # Introduction
//!
//! From the [Decimal Arithmetic FAQ][faq]:
//!
//! > Most people in the world use decimal (base 10) arithmetic. When large or
//! > small values are needed, exponents which are powers of ten are used.
//! > However, most computers have only binary (base two) arithmetic, and when
//! > exponents are used (in floating-poing numbers) they are powers of two.
//! >
//! > Binary floating-point numbers can only approximate common decimal numbers.
//! > The value 0.1, for example, would need an infinitely recurring binary
//! > fraction. In contrast, a decimal number system can represent 0.1 exactly,
//! > as one tenth (that is, 10<sup>-1</sup>). Consequently, binary
//! > floating-point cannot be used for financial calculations, or indeed for
//! > any calculations where the results achieved are required to match those
//! > which might be calculated by hand.
//!
//! gda is a pure-Rust implementation of the arbitrary-precision
//! floating-point decimal arithmetic described by the General Decimal
//! Arithmetic standard. The latest draft of the standard is available online
//! at <http://speleotrove.com/decimal/decarith.html>.
//!
//! # Details
//!
//! The main types exposed by this library are as follows:
//!
//!  * [`Decimal`], an immutable arbitrary-precision decimal number: a sign,
//!    an integer coefficient, and a power-of-ten exponent, or one of the
//!    special values infinity, quiet NaN, and signaling NaN.
//!
//!  * [`Context`], which hosts every arithmetic operation. A context
//!    configures the behavior of the operations — precision, rounding
//!    algorithm, exponent bounds — and accumulates exceptional conditions
//!    (e.g. overflow). Conditions in the context's trap set turn into
//!    [`OperationError`]s instead.
//!
//!  * [`Status`] and [`Signal`], the set-of-conditions machinery shared by
//!    the context's flags, traps, and ignored signals.
//!
//!  * [`OrderedDecimal`], a wrapper providing [`Ord`] and [`Hash`]
//!    implementations over the numeric order.
//!
//! There is no ambient thread-local context: operations always take their
//! context explicitly, and [`Context::local`] scopes a derived context over
//! a closure.
//!
//! # Examples
//!
//! The following example demonstrates the basic usage of the library:
//!
//! ```
//! # use std::error::Error;
//! use gda::{Context, Decimal};
//!
//! let mut cx = Context::default();
//!
//! let x: Decimal = ".1".parse()?;
//! let y: Decimal = ".2".parse()?;
//! let z: Decimal = ".3".parse()?;
//!
//! let sum = cx.add(&x, &y)?;
//! assert_eq!(sum, z);
//! assert_eq!(cx.add(&sum, &z)?.to_string(), "0.6");
//!
//! # Ok::<_, Box<dyn Error>>(())
//! ```
//!
//! [faq]: http://speleotrove.com/decimal/decifaq.html

#![deny(missing_debug_implementations, missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod context;
mod conv;
mod decimal;
mod error;
mod macros;
mod ops;
mod ordered;

pub use context::{
    Class, Context, Rounding, Signal, Status, MAX_EXPONENT, MAX_PRECISION, MIN_EXPONENT,
};
pub use decimal::Decimal;
pub use error::{
    InvalidExponentError, InvalidPrecisionError, OperationError, ParseDecimalError,
    TryFromDecimalError, TryIntoDecimalError,
};
pub use ordered::OrderedDecimal;
