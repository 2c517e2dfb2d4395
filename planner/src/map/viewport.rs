use serde::Serialize;
use shared_types::{Bounds, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSettings {
    pub initial_center: Coordinate,
    pub initial_zoom: f64,
    /// Zoom used when centering on a search selection or geolocated position.
    pub focus_zoom: f64,
    /// Pixels kept free around a route when fitting to it.
    pub fit_padding: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    Centered { center: Coordinate, zoom: f64 },
    Fitted { bounds: Bounds, padding: u32 },
}

impl Viewport {
    pub fn initial(settings: &MapSettings) -> Self {
        Viewport::Centered {
            center: settings.initial_center,
            zoom: settings.initial_zoom,
        }
    }

    pub fn focus(settings: &MapSettings, center: Coordinate) -> Self {
        Viewport::Centered {
            center,
            zoom: settings.focus_zoom,
        }
    }

    pub fn fit(settings: &MapSettings, bounds: Bounds) -> Self {
        Viewport::Fitted {
            bounds,
            padding: settings.fit_padding,
        }
    }
}
