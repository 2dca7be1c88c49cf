//! Integer range and multirange literals.
//!
//! Postgres prints discrete ranges in canonical `[a,b)` form, but literals
//! written by hand (column defaults, fixtures) may use any bound style.
//! Everything is normalized to an inclusive [`RangeInclusive`]:
//!
//! ```text
//! "[1,5]" -> 1..=5
//! "(1,5)" -> 2..=4
//! "[1,)"  -> 1..=MAX
//! "()"    -> empty (1..=0)
//! ```

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Errors from decoding range literals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("range literal '{0}' must start with '[' or '(' and end with ']' or ')'")]
    Brackets(String),

    #[error("range literal '{0}' must contain exactly one ','")]
    Separator(String),

    #[error("invalid range bound '{bound}' in '{literal}'")]
    Bound { literal: String, bound: String },

    #[error("exclusive bound in '{0}' overflows the range type")]
    Overflow(String),

    #[error("multirange literal '{0}' must be wrapped in '{{' and '}}'")]
    MultirangeBraces(String),

    #[error("multirange literal '{0}' has an odd number of range borders")]
    MultirangeBorders(String),
}

/// Element types of discrete ranges.
pub trait RangeBound: Copy + Ord + FromStr + Display {
    const MIN: Self;
    const MAX: Self;
    const ZERO: Self;
    const ONE: Self;

    fn checked_succ(self) -> Option<Self>;
    fn checked_pred(self) -> Option<Self>;

    /// The canonical empty range.
    fn empty() -> RangeInclusive<Self> {
        Self::ONE..=Self::ZERO
    }
}

impl RangeBound for i32 {
    const MIN: Self = i32::MIN;
    const MAX: Self = i32::MAX;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    fn checked_succ(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn checked_pred(self) -> Option<Self> {
        self.checked_sub(1)
    }
}

impl RangeBound for i64 {
    const MIN: Self = i64::MIN;
    const MAX: Self = i64::MAX;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    fn checked_succ(self) -> Option<Self> {
        self.checked_add(1)
    }

    fn checked_pred(self) -> Option<Self> {
        self.checked_sub(1)
    }
}

/// Decode a range literal into an inclusive range.
pub fn parse_range<T: RangeBound>(literal: &str) -> Result<RangeInclusive<T>, RangeError> {
    let s = literal.trim();
    if s == "()" || s.eq_ignore_ascii_case("empty") {
        return Ok(T::empty());
    }

    let lower_inclusive = match s.chars().next() {
        Some('[') => true,
        Some('(') => false,
        _ => return Err(RangeError::Brackets(literal.to_string())),
    };
    let upper_inclusive = match s.chars().last() {
        Some(']') => true,
        Some(')') => false,
        _ => return Err(RangeError::Brackets(literal.to_string())),
    };
    if s.len() < 2 {
        return Err(RangeError::Brackets(literal.to_string()));
    }

    let inner = &s[1..s.len() - 1];
    let Some((lower, upper)) = inner.split_once(',') else {
        return Err(RangeError::Separator(literal.to_string()));
    };
    if upper.contains(',') {
        return Err(RangeError::Separator(literal.to_string()));
    }

    let start = match parse_bound::<T>(literal, lower)? {
        None => T::MIN,
        Some(v) if lower_inclusive => v,
        Some(v) => v
            .checked_succ()
            .ok_or_else(|| RangeError::Overflow(literal.to_string()))?,
    };
    let end = match parse_bound::<T>(literal, upper)? {
        None => T::MAX,
        Some(v) if upper_inclusive => v,
        Some(v) => v
            .checked_pred()
            .ok_or_else(|| RangeError::Overflow(literal.to_string()))?,
    };

    if start > end {
        return Ok(T::empty());
    }
    Ok(start..=end)
}

fn parse_bound<T: RangeBound>(literal: &str, bound: &str) -> Result<Option<T>, RangeError> {
    let bound = bound.trim().trim_matches('"');
    if bound.is_empty() {
        return Ok(None);
    }
    bound.parse::<T>().map(Some).map_err(|_| RangeError::Bound {
        literal: literal.to_string(),
        bound: bound.to_string(),
    })
}

/// Encode an inclusive range in canonical `[start,end]` form.
///
/// Empty ranges encode as `empty`, which Postgres accepts as input.
pub fn encode_range<T: RangeBound>(range: &RangeInclusive<T>) -> String {
    if range.start() > range.end() {
        return "empty".to_string();
    }
    format!("[{},{}]", range.start(), range.end())
}

/// Decode a multirange literal such as `{[1,3],[5,7]}`.
pub fn parse_multirange<T: RangeBound>(
    literal: &str,
) -> Result<Vec<RangeInclusive<T>>, RangeError> {
    let s = literal.trim();
    let Some(inner) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        return Err(RangeError::MultirangeBraces(literal.to_string()));
    };
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let borders: Vec<&str> = inner.split(',').collect();
    if borders.len() % 2 != 0 {
        return Err(RangeError::MultirangeBorders(literal.to_string()));
    }

    borders
        .chunks(2)
        .map(|pair| parse_range::<T>(&format!("{},{}", pair[0], pair[1])))
        .collect()
}

/// Encode ranges as a multirange literal.
pub fn encode_multirange<T: RangeBound>(ranges: &[RangeInclusive<T>]) -> String {
    let parts: Vec<String> = ranges.iter().map(encode_range).collect();
    format!("{{{}}}", parts.join(","))
}
