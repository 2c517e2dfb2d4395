use serde::Serialize;
use shared_types::{Coordinate, SearchCandidate, TransportMode};

use crate::components::{
    format_distance, format_duration, GeocodeSearchSession, RouteStatus, SelectedPlace,
    SelectionState,
};

pub const ORIGIN_COLOR: &str = "#22c55e";
pub const DESTINATION_COLOR: &str = "#ef4444";
const ROUTE_WIDTH: u32 = 8;
const ROUTE_OPACITY: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: Coordinate,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLine {
    pub path: Vec<Coordinate>,
    pub color: &'static str,
    pub width: u32,
    pub opacity: f64,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfoPanel {
    pub duration: String,
    pub distance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCard {
    pub label: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDropdown {
    pub candidates: Vec<SearchCandidate>,
    pub loading: bool,
    pub no_results: bool,
}

/// Everything drawn on top of the base map.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OverlaySet {
    pub origin_marker: Option<Marker>,
    pub destination_marker: Option<Marker>,
    pub route_line: Option<RouteLine>,
    pub route_info: Option<RouteInfoPanel>,
    pub place_card: Option<PlaceCard>,
    pub search_dropdown: Option<SearchDropdown>,
    /// Inline "no route available" notice for the current triple.
    pub route_unavailable: bool,
    /// "Click to set origin" hint, shown until an origin exists.
    pub instructions: bool,
}

pub fn derive_overlays(
    selection: &SelectionState,
    status: &RouteStatus,
    mode: TransportMode,
    focus: Option<&SelectedPlace>,
    search: &GeocodeSearchSession,
) -> OverlaySet {
    let search_dropdown = (search.is_loading()
        || search.no_results()
        || (search.results_visible() && !search.candidates().is_empty()))
    .then(|| SearchDropdown {
        candidates: if search.results_visible() {
            search.candidates().to_vec()
        } else {
            Vec::new()
        },
        loading: search.is_loading(),
        no_results: search.no_results(),
    });

    let route = match status {
        RouteStatus::Ready(planned) => Some(planned),
        _ => None,
    };

    OverlaySet {
        origin_marker: selection.origin.map(|position| Marker {
            position,
            color: ORIGIN_COLOR,
        }),
        destination_marker: selection.destination.map(|position| Marker {
            position,
            color: DESTINATION_COLOR,
        }),
        route_line: route.map(|planned| RouteLine {
            path: planned.result.geometry.clone(),
            color: mode.color(),
            width: ROUTE_WIDTH,
            opacity: ROUTE_OPACITY,
            mode,
        }),
        route_info: route.map(|planned| RouteInfoPanel {
            duration: format_duration(planned.result.duration_seconds),
            distance: format_distance(planned.result.distance_meters),
        }),
        place_card: focus.map(|place| PlaceCard {
            label: place.label.clone(),
            coordinate: place.coordinate,
        }),
        search_dropdown,
        route_unavailable: matches!(status, RouteStatus::Unavailable),
        instructions: selection.origin.is_none(),
    }
}
