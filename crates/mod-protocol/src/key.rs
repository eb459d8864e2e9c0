use std::{borrow::Cow, fmt, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies a host method that overrides can be attached to.
///
/// Keys compare structurally, so two keys built from the same type and method names are the
/// same key regardless of where the strings came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverrideKey {
    /// Name of the host type declaring the method, e.g. `Character`.
    pub declaring_type: Cow<'static, str>,

    /// Name of the method as the host knows it, e.g. `isValidChooseName`.
    pub method: Cow<'static, str>,
}

impl OverrideKey {
    pub const fn new(declaring_type: &'static str, method: &'static str) -> Self {
        Self {
            declaring_type: Cow::Borrowed(declaring_type),
            method: Cow::Borrowed(method),
        }
    }

    pub fn owned<T: Into<String>, M: Into<String>>(declaring_type: T, method: M) -> Self {
        Self {
            declaring_type: Cow::Owned(declaring_type.into()),
            method: Cow::Owned(method.into()),
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.method)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("\"{0}\" is not of the form `Type::method`")]
    MissingSeparator(String),

    #[error("\"{0}\" has an empty type or method name")]
    EmptyComponent(String),
}

impl FromStr for OverrideKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (declaring_type, method) = s
            .rsplit_once("::")
            .ok_or_else(|| KeyParseError::MissingSeparator(s.to_owned()))?;

        let (declaring_type, method) = (declaring_type.trim(), method.trim());

        if declaring_type.is_empty() || method.is_empty() {
            return Err(KeyParseError::EmptyComponent(s.to_owned()));
        }

        Ok(Self::owned(declaring_type, method))
    }
}
