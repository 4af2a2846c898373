//! kw Host
//!
//! Single-threaded host environment the animation engine runs against.
//! Everything that would be a callback in a browser (timers, animation
//! frames, intersection and mutation notifications, scroll and resize
//! events) is surfaced as a [`HostEvent`] pulled from [`Host::poll_event`].
//!
//! Handles returned by the scheduling APIs are plain IDs; whoever holds a
//! handle is the owner of the matching events.

mod event;
mod event_loop;
mod host;
mod intersection;
pub mod layout;
mod mutation;
mod viewport;

pub use event::{
    FrameId, HostEvent, IntersectionObserverId, ListenerId, MutationObserverId, TimerId,
};
pub use event_loop::{EventLoop, FRAME_INTERVAL_MS};
pub use host::Host;
pub use intersection::{
    IntersectionEntry, IntersectionObserver, IntersectionObserverOptions, MarginValue, RootMargin,
};
pub use mutation::{MutationObserver, MutationObserverInit};
pub use viewport::Viewport;

/// Host API errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("invalid root margin: {0:?}")]
    InvalidRootMargin(String),

    #[error("threshold {0} is outside 0.0..=1.0")]
    InvalidThreshold(f64),

    #[error("unknown observer")]
    UnknownObserver,
}
