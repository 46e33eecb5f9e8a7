//! Permissive numeric coercion for raw CSV values.
//!
//! Values such as `"5,5"` use a comma as the decimal separator. Every comma
//! is replaced by a dot and nothing else is rewritten, so grouped values like
//! `"1.234,56"` do not parse and fall back to zero.

/// Why a value was substituted with zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultReason {
    /// The column does not exist.
    Missing,
    /// The value is empty or only whitespace.
    Empty,
    /// The value is not a finite number.
    Unparseable,
}

/// Outcome of coercing a raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    Parsed(f64),
    Defaulted(DefaultReason),
}

impl Coerced {
    /// The numeric value, zero when defaulted.
    pub fn value(self) -> f64 {
        match self {
            Coerced::Parsed(v) => v,
            Coerced::Defaulted(_) => 0.0,
        }
    }

    #[allow(dead_code)] // Distinguishes substituted zeros in tests and diagnostics
    pub fn is_defaulted(self) -> bool {
        matches!(self, Coerced::Defaulted(_))
    }
}

/// Coerce a raw value, reporting whether it was parsed or defaulted.
pub fn coerce(raw: Option<&str>) -> Coerced {
    let Some(raw) = raw else {
        return Coerced::Defaulted(DefaultReason::Missing);
    };

    let cleaned: String = raw.chars().filter(|c| *c != ' ').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Coerced::Defaulted(DefaultReason::Empty);
    }

    match cleaned.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => Coerced::Parsed(v),
        _ => Coerced::Defaulted(DefaultReason::Unparseable),
    }
}

/// Convert a raw value to a number. Never fails; bad input yields `0.0`.
pub fn to_number(raw: Option<&str>) -> f64 {
    coerce(raw).value()
}

/// Integer variant of [`to_number`], truncated toward zero.
#[allow(dead_code)] // Counterpart of to_number for integer columns
pub fn to_integer(raw: Option<&str>) -> i64 {
    to_number(raw).trunc() as i64
}
