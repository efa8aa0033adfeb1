//! Logging facilities for Horizon Elements.
//!
//! Horizon Elements uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the host application installs a subscriber:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_elements=debug")
//!         .init();
//! }
//! ```
//!
//! Transitions and lifecycle changes are logged at `debug`, signal emission
//! and timer internals at `trace`. Failures swallowed by
//! [`safe_call`](crate::safe_call) are logged at `warn`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "horizon_elements_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_elements_core::signal";
    /// Timer system target.
    pub const TIMER: &str = "horizon_elements_core::timer";
    /// Document event loop target (dispatch, microtasks, mutations).
    pub const DOCUMENT: &str = "horizon_elements_core::document";
    /// Custom element registry target.
    pub const REGISTRY: &str = "horizon_elements_core::registry";
    /// Attribute decoding target.
    pub const ATTRIBUTES: &str = "horizon_elements_core::attributes";
    /// Error boundary target.
    pub const SAFE_CALL: &str = "horizon_elements_core::safe_call";
}
