use serde::Serialize;
use shared_types::{Bounds, Coordinate, RouteResult, TransportMode};

use crate::error::{ProviderError, SelectionError};

/// Origin/destination pair. A destination is never present without an origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SelectionState {
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Empty,
    OriginSet,
    BothSet,
}

impl SelectionState {
    pub fn phase(&self) -> SelectionPhase {
        match (self.origin, self.destination) {
            (None, _) => SelectionPhase::Empty,
            (Some(_), None) => SelectionPhase::OriginSet,
            (Some(_), Some(_)) => SelectionPhase::BothSet,
        }
    }
}

/// One directions request for a specific (origin, destination, mode) triple.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTicket {
    pub generation: u64,
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub result: RouteResult,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RouteStatus {
    #[default]
    Idle,
    Pending,
    Ready(PlannedRoute),
    Unavailable,
}

/// Owns the selection and transport mode, and decides when a directions
/// request is due and whether an arriving response may still be shown.
#[derive(Debug, Default)]
pub struct RouteRequestCoordinator {
    selection: SelectionState,
    mode: TransportMode,
    generation: u64,
    status: RouteStatus,
}

impl RouteRequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn status(&self) -> &RouteStatus {
        &self.status
    }

    pub fn route(&self) -> Option<&PlannedRoute> {
        match &self.status {
            RouteStatus::Ready(route) => Some(route),
            _ => None,
        }
    }

    pub fn set_origin(&mut self, origin: Coordinate) -> Option<RouteTicket> {
        self.selection.origin = Some(origin);
        self.invalidate()
    }

    pub fn set_destination(
        &mut self,
        destination: Coordinate,
    ) -> Result<Option<RouteTicket>, SelectionError> {
        if self.selection.origin.is_none() {
            return Err(SelectionError::DestinationWithoutOrigin);
        }
        self.selection.destination = Some(destination);
        Ok(self.invalidate())
    }

    /// Switching to the mode that is already active changes nothing.
    pub fn set_mode(&mut self, mode: TransportMode) -> Option<RouteTicket> {
        if self.mode == mode {
            return None;
        }
        self.mode = mode;
        self.invalidate()
    }

    /// Third-click transition: drop destination and route, start over from `origin`.
    pub fn reset_with_origin(&mut self, origin: Coordinate) {
        self.selection = SelectionState {
            origin: Some(origin),
            destination: None,
        };
        self.invalidate();
    }

    /// Applies a directions response. Returns false when the ticket no longer
    /// matches the current triple.
    pub fn apply(
        &mut self,
        ticket: &RouteTicket,
        outcome: Result<RouteResult, ProviderError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                "Dropping stale {} route (generation {}, current {})",
                ticket.mode,
                ticket.generation,
                self.generation
            );
            return false;
        }

        self.status = match outcome {
            Ok(result) => match Bounds::from_path(&result.geometry) {
                Some(bounds) => RouteStatus::Ready(PlannedRoute { result, bounds }),
                None => {
                    tracing::warn!("Directions response had an empty geometry");
                    RouteStatus::Unavailable
                }
            },
            Err(e) => {
                tracing::error!(
                    "Directions failed for {} -> {} ({}): {}",
                    ticket.origin,
                    ticket.destination,
                    ticket.mode,
                    e
                );
                RouteStatus::Unavailable
            }
        };
        true
    }

    fn invalidate(&mut self) -> Option<RouteTicket> {
        self.generation += 1;
        match (self.selection.origin, self.selection.destination) {
            (Some(origin), Some(destination)) => {
                self.status = RouteStatus::Pending;
                Some(RouteTicket {
                    generation: self.generation,
                    origin,
                    destination,
                    mode: self.mode,
                })
            }
            _ => {
                self.status = RouteStatus::Idle;
                None
            }
        }
    }
}

/// `2h 5m` from one hour up, `45m` below. Minutes are rounded before splitting.
pub fn format_duration(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) / 60.0).round() as u64;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// `1.5km` from one kilometre up, whole metres below.
pub fn format_distance(meters: f64) -> String {
    let rounded = meters.max(0.0).round();
    if rounded >= 1000.0 {
        format!("{:.1}km", meters / 1000.0)
    } else {
        format!("{}m", rounded as u64)
    }
}
