use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Coordinate components must be finite")]
    NonFinite,

    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Malformed coordinate text: {0:?}")]
    Malformed(String),
}

/// A (longitude, latitude) pair in degrees.
///
/// Serializes as a `[lon, lat]` array, the same order GeoJSON and the mapping
/// provider use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    lon: f64,
    lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Result<Self, CoordinateError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        Ok(Self { lon, lat })
    }

    /// Builds a coordinate from untrusted provider data: non-finite input is
    /// rejected, anything else is clamped into range.
    pub fn clamped(lon: f64, lat: f64) -> Option<Self> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self {
            lon: lon.clamp(-180.0, 180.0),
            lat: lat.clamp(-90.0, 90.0),
        })
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

impl TryFrom<[f64; 2]> for Coordinate {
    type Error = CoordinateError;

    fn try_from(pair: [f64; 2]) -> Result<Self, Self::Error> {
        Coordinate::new(pair[0], pair[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lon, coord.lat]
    }
}

/// Canonical persisted form: `(lon,lat)`.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.lon, self.lat)
    }
}

/// Reads the canonical `(lon,lat)` form. Older rows stored the bare tuple
/// (`lon,lat` or `[lon,lat]`), so those are accepted too.
impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .or_else(|| {
                trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
            })
            .unwrap_or(trimmed);

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(CoordinateError::Malformed(s.to_string()));
        }

        let lon = parts[0]
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        let lat = parts[1]
            .parse::<f64>()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;

        Coordinate::new(lon, lat)
    }
}

/// Axis-aligned envelope used to fit the viewport around a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn from_path(path: &[Coordinate]) -> Option<Self> {
        let first = path.first()?;
        let start = Bounds {
            south_west: *first,
            north_east: *first,
        };
        Some(path.iter().skip(1).fold(start, |bounds, coord| bounds.extend(*coord)))
    }

    pub fn extend(self, coord: Coordinate) -> Self {
        Bounds {
            south_west: Coordinate {
                lon: self.south_west.lon.min(coord.lon),
                lat: self.south_west.lat.min(coord.lat),
            },
            north_east: Coordinate {
                lon: self.north_east.lon.max(coord.lon),
                lat: self.north_east.lat.max(coord.lat),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert_eq!(
            Coordinate::new(181.0, 0.0),
            Err(CoordinateError::LongitudeOutOfRange(181.0))
        );
        assert_eq!(
            Coordinate::new(0.0, -90.5),
            Err(CoordinateError::LatitudeOutOfRange(-90.5))
        );
        assert_eq!(Coordinate::new(f64::NAN, 0.0), Err(CoordinateError::NonFinite));
    }

    #[test]
    fn clamped_pulls_values_into_range() {
        let coord = Coordinate::clamped(200.0, -95.0).unwrap();
        assert_eq!(coord.lon(), 180.0);
        assert_eq!(coord.lat(), -90.0);
        assert!(Coordinate::clamped(f64::INFINITY, 0.0).is_none());
    }

    #[test]
    fn text_form_is_parenthesized_pair() {
        let coord = Coordinate::new(34.7818, 32.0853).unwrap();
        assert_eq!(coord.to_string(), "(34.7818,32.0853)");
        assert_eq!("(34.7818,32.0853)".parse::<Coordinate>().unwrap(), coord);
    }

    #[test]
    fn legacy_tuple_forms_are_accepted() {
        let expected = Coordinate::new(34.78, 32.08).unwrap();
        assert_eq!("34.78,32.08".parse::<Coordinate>().unwrap(), expected);
        assert_eq!("[34.78, 32.08]".parse::<Coordinate>().unwrap(), expected);
        assert_eq!(" ( 34.78 , 32.08 ) ".parse::<Coordinate>().unwrap(), expected);
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(matches!(
            "(34.78)".parse::<Coordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            "(a,b)".parse::<Coordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            "(1,2,3)".parse::<Coordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
    }

    #[test]
    fn serde_uses_lon_lat_array() {
        let coord = Coordinate::new(-73.9, 40.7).unwrap();
        assert_eq!(serde_json::to_string(&coord).unwrap(), "[-73.9,40.7]");
        assert!(serde_json::from_str::<Coordinate>("[-190.0,40.7]").is_err());
    }

    #[test]
    fn bounds_envelope_path() {
        let path = vec![
            Coordinate::new(34.80, 32.10).unwrap(),
            Coordinate::new(34.75, 32.20).unwrap(),
            Coordinate::new(34.90, 32.05).unwrap(),
        ];
        let bounds = Bounds::from_path(&path).unwrap();
        assert_eq!(bounds.south_west, Coordinate::new(34.75, 32.05).unwrap());
        assert_eq!(bounds.north_east, Coordinate::new(34.90, 32.20).unwrap());
        assert!(Bounds::from_path(&[]).is_none());
    }
}
