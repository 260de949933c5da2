use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub const MAX_BAND: f64 = 9.0;

/// A score on the 0–9 scale in half-band steps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Band(f64);

impl Band {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || !(0.0..=MAX_BAND).contains(&value) {
            return Err(Error::BadRequest(format!(
                "Band {} is outside the 0-9 range",
                value
            )));
        }
        if (value * 2.0).fract() != 0.0 {
            return Err(Error::BadRequest(format!(
                "Band {} is not a multiple of 0.5",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Rounds to the nearest half band, halves going up.
    pub fn rounded(value: f64) -> Result<Self> {
        Self::new((value * 2.0).round() / 2.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl TryFrom<f64> for Band {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Band::new(value)
    }
}

impl From<Band> for f64 {
    fn from(band: Band) -> f64 {
        band.0
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_half_steps() {
        assert_eq!(Band::new(6.5).unwrap().value(), 6.5);
        assert_eq!(Band::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Band::new(9.0).unwrap().value(), 9.0);
    }

    #[test]
    fn rejects_out_of_range_and_odd_steps() {
        assert!(Band::new(9.5).is_err());
        assert!(Band::new(-0.5).is_err());
        assert!(Band::new(6.25).is_err());
        assert!(Band::new(f64::NAN).is_err());
    }

    #[test]
    fn rounding_goes_to_nearest_half() {
        assert_eq!(Band::rounded(6.667).unwrap().value(), 6.5);
        assert_eq!(Band::rounded(6.75).unwrap().value(), 7.0);
        assert_eq!(Band::rounded(6.2).unwrap().value(), 6.0);
    }

    #[test]
    fn deserializing_an_invalid_band_fails() {
        assert!(serde_json::from_str::<Band>("7.5").is_ok());
        assert!(serde_json::from_str::<Band>("7.3").is_err());
        assert!(serde_json::from_str::<Band>("10").is_err());
    }
}
