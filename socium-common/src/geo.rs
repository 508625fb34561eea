use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KILOMETERS_PER_MILE: f64 = 1.609_344;
pub const MILES_PER_NAUTICAL_DEGREE: f64 = 60.0 * 1.1515;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Coordinates must be finite with a latitude within ±90 and a longitude within ±180")]
pub struct InvalidCoordinatesError;

/// A point on the globe in decimal degrees.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinatesError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && latitude.abs() <= 90.0
            && longitude.abs() <= 180.0;

        if valid {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(InvalidCoordinatesError)
        }
    }

    /// Builds a location out of two independently optional fields; a
    /// location exists only when both halves are given.
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, InvalidCoordinatesError> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::new(latitude, longitude).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub fn latitude(self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(self) -> f64 {
        self.longitude
    }

    /// Both components strictly positive.
    #[must_use]
    pub fn is_north_east(self) -> bool {
        self.latitude > 0.0 && self.longitude > 0.0
    }

    /// Great-circle distance using the spherical law of cosines.
    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        let latitude_a = self.latitude.to_radians();
        let latitude_b = other.latitude.to_radians();
        let theta = (self.longitude - other.longitude).to_radians();

        let cosine = latitude_a.sin() * latitude_b.sin()
            + latitude_a.cos() * latitude_b.cos() * theta.cos();

        // rounding can push identical points slightly above 1
        let degrees = cosine.clamp(-1.0, 1.0).acos().to_degrees();

        degrees * MILES_PER_NAUTICAL_DEGREE * KILOMETERS_PER_MILE
    }
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = InvalidCoordinatesError;

    fn try_from(value: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}
