//! Log targets for the widget crate.
//!
//! Core event-loop targets live in [`horizon_elements_core::logging`].

/// Target names for log filtering.
pub mod targets {
    /// Before/after transition protocol target.
    pub const ANIMATION: &str = "horizon_elements::animation";
    /// Select widget target.
    pub const SELECT: &str = "horizon_elements::select";
}
