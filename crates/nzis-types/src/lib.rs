//! Validated primitive types shared across the NZIS referral crates.
//!
//! NZIS identifiers are digit strings with fixed widths (the health provision
//! number is 12 digits, the personal identification number 10). They must stay
//! strings end to end: a numeric representation would silently drop leading
//! zeros and corrupt the identifier on the wire.

/// Errors that can occur when creating validated primitive types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The input was not made up exclusively of ASCII digits
    #[error("'{0}' must contain only digits")]
    NotDigits(String),
    /// The input did not have the required number of digits
    #[error("'{value}' must be exactly {expected} digits, got {actual}")]
    BadLength {
        value: String,
        expected: usize,
        actual: usize,
    },
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` that contains at least one non-whitespace character; the
/// input is trimmed during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A digit string with a fixed width `W`.
///
/// This is the shape of every numeric NZIS identifier: `DigitCode<12>` for the
/// health provision number, `DigitCode<10>` for the personal identification
/// number, `DigitCode<2>` for condition codes. Leading zeros are significant
/// and preserved, so the value serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DigitCode<const W: usize>(String);

impl<const W: usize> DigitCode<W> {
    /// Parses a digit string that must already have exactly `W` digits.
    ///
    /// The input is trimmed first. No padding is applied here; use
    /// [`DigitCode::padded`] when shorter all-digit input should be widened.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Empty` for blank input, `TypeError::NotDigits` if
    /// any character is not an ASCII digit, and `TypeError::BadLength` if the
    /// digit count is not exactly `W`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::NotDigits(trimmed.to_owned()));
        }
        if trimmed.len() != W {
            return Err(TypeError::BadLength {
                value: trimmed.to_owned(),
                expected: W,
                actual: trimmed.len(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Parses a digit string, left-padding with zeros up to width `W`.
    ///
    /// Input longer than `W` digits is still rejected; padding never truncates.
    ///
    /// # Errors
    ///
    /// Same as [`DigitCode::parse`], except short input is padded instead of
    /// rejected.
    pub fn padded(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypeError::NotDigits(trimmed.to_owned()));
        }
        if trimmed.len() > W {
            return Err(TypeError::BadLength {
                value: trimmed.to_owned(),
                expected: W,
                actual: trimmed.len(),
            });
        }
        let width = W;
        Ok(Self(format!("{trimmed:0>width$}")))
    }

    /// Returns the digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fixed width of this code.
    pub const fn width() -> usize {
        W
    }
}

impl<const W: usize> std::fmt::Display for DigitCode<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<const W: usize> AsRef<str> for DigitCode<W> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const W: usize> serde::Serialize for DigitCode<W> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de, const W: usize> serde::Deserialize<'de> for DigitCode<W> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DigitCode::parse(&s).map_err(serde::de::Error::custom)
    }
}
