#[macro_export]
/// A macro to construct a [`Decimal`] from a literal.
/// Converts the input tokens to a string, and then parses the string into a [`Decimal`].
/// Panics if the provided input is not a valid [`Decimal`] literal.
///
/// [`Decimal`]: crate::Decimal
///
/// # Examples:
/// ```
/// use gda::dec;
///
/// assert!(dec!(NaN).is_nan());
/// assert!(dec!(0).is_zero());
/// assert!(dec!(-0.1).is_negative());
/// assert!(dec!(1.753).to_string() == "1.753");
/// ```
macro_rules! dec {
    ($l:expr) => {
        <$crate::Decimal as ::std::str::FromStr>::from_str(stringify!($l))
            .unwrap_or_else(|e| panic!("{}", e.to_string()))
    };
}
