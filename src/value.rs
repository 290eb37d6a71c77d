use core::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty value")]
    Empty,

    #[error("'{0}' is not a base-10 integer")]
    Malformed(String),

    #[error("'{0}' is out of range, valid range is [-1000, 1000]")]
    OutOfRange(String),
}

/// OOM killer score bias, always within `[Adjustment::MIN, Adjustment::MAX]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Adjustment(i32);

impl Adjustment {
    pub const MIN: Adjustment = Adjustment(-1000);
    pub const MAX: Adjustment = Adjustment(1000);
    /// Kernel default, writing it would change nothing.
    pub const DEFAULT: Adjustment = Adjustment(0);

    pub const fn get(self) -> i32 {
        self.0
    }

    pub const fn is_noop(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl TryFrom<i32> for Adjustment {
    type Error = ParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Adjustment(value))
        } else {
            Err(ParseError::OutOfRange(value.to_string()))
        }
    }
}

impl FromStr for Adjustment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_adjustment(s)
    }
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a whole string as a signed decimal and checks it against the
/// accepted range. Only `-` may precede the digits and nothing is trimmed:
/// `"+5"`, `" 5"` and `"5\n"` are rejected.
pub fn parse_adjustment(input: &str) -> Result<Adjustment, ParseError> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }

    let digits = input.strip_prefix('-').unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::Malformed(input.to_owned()));
    }

    // Only overflow can fail here, the grammar was checked above
    let value: i64 = input
        .parse()
        .map_err(|_| ParseError::OutOfRange(input.to_owned()))?;

    i32::try_from(value)
        .ok()
        .and_then(|v| Adjustment::try_from(v).ok())
        .ok_or_else(|| ParseError::OutOfRange(input.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::{parse_adjustment, Adjustment, ParseError};
    use proptest::prelude::*;

    #[test]
    fn given_boundaries_then_both_are_accepted() {
        assert_eq!(parse_adjustment("-1000").unwrap().get(), -1000);
        assert_eq!(parse_adjustment("1000").unwrap().get(), 1000);
        assert_eq!(parse_adjustment("0").unwrap(), Adjustment::DEFAULT);
    }

    #[test]
    fn given_value_just_outside_range_then_rejected() {
        assert_eq!(
            parse_adjustment("1001"),
            Err(ParseError::OutOfRange("1001".into()))
        );
        assert_eq!(
            parse_adjustment("-1001"),
            Err(ParseError::OutOfRange("-1001".into()))
        );
    }

    #[test]
    fn given_trailing_garbage_then_malformed() {
        assert_eq!(parse_adjustment("12x"), Err(ParseError::Malformed("12x".into())));
        assert_eq!(parse_adjustment("abc"), Err(ParseError::Malformed("abc".into())));
        assert_eq!(parse_adjustment("-"), Err(ParseError::Malformed("-".into())));
        assert_eq!(parse_adjustment(" 5"), Err(ParseError::Malformed(" 5".into())));
        assert_eq!(parse_adjustment("5\n"), Err(ParseError::Malformed("5\n".into())));
    }

    #[test]
    fn given_empty_input_then_rejected() {
        assert_eq!(parse_adjustment(""), Err(ParseError::Empty));
    }

    #[test]
    fn given_numeral_overflowing_i64_then_out_of_range() {
        let input = "99999999999999999999999";
        assert_eq!(
            parse_adjustment(input),
            Err(ParseError::OutOfRange(input.into()))
        );
    }

    #[test]
    fn given_explicit_plus_sign_then_malformed() {
        assert_eq!(parse_adjustment("+15"), Err(ParseError::Malformed("+15".into())));
        assert_eq!(parse_adjustment("-+15"), Err(ParseError::Malformed("-+15".into())));
    }

    #[test]
    fn given_out_of_range_i32_then_try_from_fails() {
        assert!(Adjustment::try_from(1000).is_ok());
        assert!(Adjustment::try_from(i32::MIN).is_err());
    }

    proptest! {
        #[test]
        fn any_in_range_decimal_parses_to_itself(v in -1000i32..=1000) {
            prop_assert_eq!(parse_adjustment(&v.to_string()).unwrap().get(), v);
        }

        #[test]
        fn zero_padded_in_range_decimal_parses(v in 0i32..=1000, pad in 1usize..5) {
            let input = format!("{}{}", "0".repeat(pad), v);
            prop_assert_eq!(parse_adjustment(&input).unwrap().get(), v);
        }

        #[test]
        fn any_out_of_range_decimal_is_rejected(v in prop_oneof![i64::MIN..-1000, 1001..i64::MAX]) {
            prop_assert!(matches!(
                parse_adjustment(&v.to_string()),
                Err(ParseError::OutOfRange(_))
            ));
        }

        #[test]
        fn any_non_numeric_suffix_is_rejected(v in -1000i32..=1000, suffix in "[a-zA-Z .]{1,4}") {
            let input = format!("{v}{suffix}");
            prop_assert!(parse_adjustment(&input).is_err());
        }
    }
}
