//! Parsing of Kubernetes resource quantities (`500Mi`, `100m`, `1e3`, ...).
//!
//! Only what resource validation needs is supported: checking that a string
//! is well-formed and comparing two quantities. Rendering never rewrites the
//! strings it was given.
//!
//! See the [Kubernetes serialization format][k8s-serialization-format].
//!
//! [k8s-serialization-format]: https://github.com/kubernetes/apimachinery/blob/8c60292e48e46c4faa1e92acb232ce6adb37512c/pkg/api/resource/quantity.go#L37-L59
use std::{cmp::Ordering, num::ParseFloatError, str::FromStr};

use snafu::{ResultExt, Snafu, ensure};

#[derive(Debug, PartialEq, Snafu)]
pub enum ParseQuantityError {
    #[snafu(display("input is either empty or contains non-ascii characters"))]
    InvalidFormat,

    #[snafu(display("failed to parse floating point number"))]
    InvalidFloat { source: ParseFloatError },

    #[snafu(display("unknown suffix {suffix:?}"))]
    InvalidSuffix { suffix: String },
}

/// Byte multiples based on powers of 2, e.g. `Mi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum BinaryMultiple {
    #[strum(serialize = "Ki")]
    Kibi,

    #[strum(serialize = "Mi")]
    Mebi,

    #[strum(serialize = "Gi")]
    Gibi,

    #[strum(serialize = "Ti")]
    Tebi,

    #[strum(serialize = "Pi")]
    Pebi,

    #[strum(serialize = "Ei")]
    Exbi,
}

impl BinaryMultiple {
    pub fn factor(self) -> f64 {
        match self {
            Self::Kibi => 2f64.powi(10),
            Self::Mebi => 2f64.powi(20),
            Self::Gibi => 2f64.powi(30),
            Self::Tebi => 2f64.powi(40),
            Self::Pebi => 2f64.powi(50),
            Self::Exbi => 2f64.powi(60),
        }
    }
}

/// SI multiples based on powers of 10, e.g. `m` or `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum DecimalMultiple {
    #[strum(serialize = "n")]
    Nano,

    #[strum(serialize = "u")]
    Micro,

    #[strum(serialize = "m")]
    Milli,

    // (Note that 1024 = 1Ki but 1000 = 1k)
    #[strum(serialize = "k")]
    Kilo,

    #[strum(serialize = "M")]
    Mega,

    #[strum(serialize = "G")]
    Giga,

    #[strum(serialize = "T")]
    Tera,

    #[strum(serialize = "P")]
    Peta,

    #[strum(serialize = "E")]
    Exa,
}

impl DecimalMultiple {
    pub fn factor(self) -> f64 {
        match self {
            Self::Nano => 10f64.powi(-9),
            Self::Micro => 10f64.powi(-6),
            Self::Milli => 10f64.powi(-3),
            Self::Kilo => 10f64.powi(3),
            Self::Mega => 10f64.powi(6),
            Self::Giga => 10f64.powi(9),
            Self::Tera => 10f64.powi(12),
            Self::Peta => 10f64.powi(15),
            Self::Exa => 10f64.powi(18),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Suffix {
    Binary(BinaryMultiple),
    Decimal(DecimalMultiple),
    /// E notation, `1e3`.
    Exponent(f64),
}

impl Suffix {
    pub fn factor(self) -> f64 {
        match self {
            Self::Binary(multiple) => multiple.factor(),
            Self::Decimal(multiple) => multiple.factor(),
            Self::Exponent(exponent) => 10f64.powf(exponent),
        }
    }
}

impl FromStr for Suffix {
    type Err = ParseQuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Ok(binary) = BinaryMultiple::from_str(input) {
            return Ok(Self::Binary(binary));
        }

        if let Ok(decimal) = DecimalMultiple::from_str(input) {
            return Ok(Self::Decimal(decimal));
        }

        // A lone `E` is Exa (handled above), `E3`/`e-3` are exponents.
        if let Some(exponent) = input.strip_prefix(['e', 'E'])
            && let Ok(exponent) = exponent.parse::<i32>()
        {
            return Ok(Self::Exponent(f64::from(exponent)));
        }

        InvalidSuffixSnafu { suffix: input }.fail()
    }
}

/// A parsed quantity in the form `<signedNumber><suffix>`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantity {
    value: f64,
    suffix: Option<Suffix>,
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // Surrounding whitespace is rejected, rendering copies the string as is.
        ensure!(!input.is_empty() && input.is_ascii(), InvalidFormatSnafu);

        let number_start = usize::from(input.starts_with(['+', '-']));
        let suffix_index = input[number_start..]
            .find(|c: char| c != '.' && !c.is_ascii_digit())
            .map(|index| index + number_start);

        let (number, suffix) = match suffix_index {
            Some(index) => input.split_at(index),
            None => (input, ""),
        };

        let value = f64::from_str(number).context(InvalidFloatSnafu)?;
        let suffix = if suffix.is_empty() {
            None
        } else {
            Some(Suffix::from_str(suffix)?)
        };

        Ok(Self { value, suffix })
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.scaled_value().partial_cmp(&other.scaled_value())
    }
}

impl Quantity {
    /// The value multiplied out to its base unit, `1Ki` is `1024.0`.
    pub fn scaled_value(&self) -> f64 {
        self.value * self.suffix.map_or(1.0, Suffix::factor)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0", 0.0)]
    #[case("100m", 0.1)]
    #[case("1.5", 1.5)]
    #[case("2Ki", 2048.0)]
    #[case("1Gi", 1_073_741_824.0)]
    #[case("500Mi", 524_288_000.0)]
    #[case("1k", 1000.0)]
    #[case("1e3", 1000.0)]
    #[case("1E", 1e18)]
    #[case("+4", 4.0)]
    fn parse_pass(#[case] input: &str, #[case] expected: f64) {
        let quantity = Quantity::from_str(input).unwrap();
        assert!((quantity.scaled_value() - expected).abs() < 1e-6);
    }

    #[rstest]
    #[case("")]
    #[case("Mi")]
    #[case("1Zi")]
    #[case("1.2.3")]
    #[case("ä")]
    #[case("100 m")]
    #[case(" 100m")]
    #[case("100m ")]
    #[case("1Gi\n")]
    fn parse_fail(#[case] input: &str) {
        assert!(Quantity::from_str(input).is_err());
    }

    #[rstest]
    #[case("500Mi", "1Gi", true)]
    #[case("1Gi", "1024Mi", true)]
    #[case("2", "1500m", false)]
    #[case("50Mi", "100Mi", true)]
    fn compare(#[case] lower: &str, #[case] upper: &str, #[case] less_or_equal: bool) {
        let lower = Quantity::from_str(lower).unwrap();
        let upper = Quantity::from_str(upper).unwrap();
        assert_eq!(lower <= upper, less_or_equal);
    }
}
