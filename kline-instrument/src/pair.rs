use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Exchange trading pair symbol, eg/ "BTCUSDT".
///
/// A [`Pair`] is never empty. The symbol is kept exactly as supplied since the exchange treats
/// it as an opaque market identifier.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct Pair(SmolStr);

/// Error returned when constructing a [`Pair`] from an empty symbol.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[error("trading pair must not be empty")]
pub struct EmptyPairError;

impl Pair {
    /// Construct a new [`Pair`], failing if the symbol is empty.
    pub fn new<S>(symbol: S) -> Result<Self, EmptyPairError>
    where
        S: AsRef<str>,
    {
        let symbol = symbol.as_ref();
        if symbol.is_empty() {
            Err(EmptyPairError)
        } else {
            Ok(Self(SmolStr::new(symbol)))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Pair {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Pair {
    type Error = EmptyPairError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pair> for String {
    fn from(value: Pair) -> Self {
        value.0.to_string()
    }
}

impl std::str::FromStr for Pair {
    type Err = EmptyPairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
