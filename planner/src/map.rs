pub mod controller;
pub mod overlay;
pub mod viewport;

pub use controller::{
    Completion, CompletionReceiver, CompletionSender, ControllerSettings,
    MapInteractionController, Snapshot,
};
pub use overlay::{derive_overlays, OverlaySet};
pub use viewport::{MapSettings, Viewport};
