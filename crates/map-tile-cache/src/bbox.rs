//! Geographic bounding boxes in WGS84 degrees

use crate::error::{Result, TileCacheError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `(lon_min, lat_min, lon_max, lat_max)` in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Latin America, the region preloaded by default
    pub const LATIN_AMERICA: BoundingBox = BoundingBox {
        lon_min: -118.0,
        lat_min: -56.0,
        lon_max: -34.0,
        lat_max: 33.0,
    };

    pub fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Result<Self> {
        let bbox = Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    pub fn validate(&self) -> Result<()> {
        let coords = [self.lon_min, self.lat_min, self.lon_max, self.lat_max];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(TileCacheError::InvalidBoundingBox(format!(
                "non-finite coordinate in {}",
                self
            )));
        }
        if self.lon_min >= self.lon_max || self.lat_min >= self.lat_max {
            return Err(TileCacheError::InvalidBoundingBox(format!(
                "min must be below max in {}",
                self
            )));
        }
        if self.lon_min < -180.0 || self.lon_max > 180.0 {
            return Err(TileCacheError::InvalidBoundingBox(format!(
                "longitude outside [-180, 180] in {}",
                self
            )));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err(TileCacheError::InvalidBoundingBox(format!(
                "latitude outside [-90, 90] in {}",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.lon_min, self.lat_min, self.lon_max, self.lat_max
        )
    }
}

impl FromStr for BoundingBox {
    type Err = TileCacheError;

    /// Parses `"lon_min,lat_min,lon_max,lat_max"`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| TileCacheError::InvalidBoundingBox(format!("{}: {}", s, e)))?;

        match parts.as_slice() {
            [lon_min, lat_min, lon_max, lat_max] => {
                Self::new(*lon_min, *lat_min, *lon_max, *lat_max)
            }
            _ => Err(TileCacheError::InvalidBoundingBox(format!(
                "expected 4 comma-separated values, got {}",
                parts.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox: BoundingBox = "-10, -5.5, 10, 5.5".parse().unwrap();
        assert_eq!(bbox, BoundingBox::new(-10.0, -5.5, 10.0, 5.5).unwrap());
    }

    #[test]
    fn test_parse_bbox_wrong_arity() {
        let err = "1,2,3".parse::<BoundingBox>().unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn test_parse_bbox_not_a_number() {
        assert!("a,b,c,d".parse::<BoundingBox>().is_err());
    }

    #[test]
    fn test_rejects_inverted_bbox() {
        assert!(BoundingBox::new(10.0, 0.0, -10.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, 5.0, 10.0, 5.0).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_bbox() {
        assert!(BoundingBox::new(-190.0, 0.0, 10.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, -95.0, 10.0, 5.0).is_err());
        assert!(BoundingBox::new(0.0, f64::NAN, 10.0, 5.0).is_err());
    }

    #[test]
    fn test_latin_america_is_valid() {
        assert!(BoundingBox::LATIN_AMERICA.validate().is_ok());
    }
}
