use std::{fmt::Display, str::FromStr};

use super::ArgumentError;

/// A non-empty string without leading or trailing whitespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrimmedString(String);

impl FromStr for TrimmedString {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ArgumentError("The value must not be blank.".to_owned())),
            trimmed => Ok(TrimmedString(trimmed.to_owned())),
        }
    }
}

impl From<TrimmedString> for String {
    fn from(value: TrimmedString) -> Self {
        value.0
    }
}

impl Display for TrimmedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
