use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Coordinate;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown transport mode: {0}")]
pub struct UnknownTransportMode(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    #[default]
    Driving,
    Walking,
    Cycling,
    DrivingTraffic,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Driving,
        TransportMode::Walking,
        TransportMode::Cycling,
        TransportMode::DrivingTraffic,
    ];

    /// Routing profile id understood by the directions endpoint.
    pub fn profile(&self) -> &'static str {
        match self {
            TransportMode::Driving => "driving",
            TransportMode::Walking => "walking",
            TransportMode::Cycling => "cycling",
            TransportMode::DrivingTraffic => "driving-traffic",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransportMode::Driving => "Driving",
            TransportMode::Walking => "Walking",
            TransportMode::Cycling => "Cycling",
            TransportMode::DrivingTraffic => "Traffic",
        }
    }

    /// Route line color for this mode.
    pub fn color(&self) -> &'static str {
        match self {
            TransportMode::Driving => "#3b82f6",
            TransportMode::Walking => "#22c55e",
            TransportMode::Cycling => "#f59e0b",
            TransportMode::DrivingTraffic => "#ef4444",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile())
    }
}

impl FromStr for TransportMode {
    type Err = UnknownTransportMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TransportMode::ALL
            .into_iter()
            .find(|mode| mode.profile() == wanted || mode.label().to_lowercase() == wanted)
            .ok_or_else(|| UnknownTransportMode(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub geometry: Vec<Coordinate>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
}

impl RouteResult {
    /// Negative or NaN measurements from the provider are floored to zero.
    pub fn new(geometry: Vec<Coordinate>, duration_seconds: f64, distance_meters: f64) -> Self {
        Self {
            geometry,
            duration_seconds: duration_seconds.max(0.0),
            distance_meters: distance_meters.max(0.0),
        }
    }
}
