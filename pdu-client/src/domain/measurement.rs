use std::{fmt, str::FromStr};

use serde_json::Number;

/// A numeric sensor value exactly as the device reported it.
///
/// The decimal text is kept verbatim, so `230` stays `230` and long
/// fractions are not rounded through `f64` on their way to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement(Number);

impl Measurement {
    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }
}

impl From<Number> for Measurement {
    fn from(n: Number) -> Self {
        Self(n)
    }
}

impl FromStr for Measurement {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str::<Number>(s).map(Self)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl serde::Serialize for Measurement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}
