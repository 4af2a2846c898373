//! Host events and handles

use crate::IntersectionEntry;
use kw_dom::MutationRecord;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// One-shot timer
    TimerId
);
handle!(
    /// Animation-frame callback
    FrameId
);
handle!(IntersectionObserverId);
handle!(MutationObserverId);
handle!(
    /// Scroll or resize listener
    ListenerId
);

/// A deferred notification delivered by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Timer(TimerId),
    AnimationFrame {
        id: FrameId,
        time: f64,
    },
    /// Entries in observation order
    Intersection {
        observer: IntersectionObserverId,
        entries: Vec<IntersectionEntry>,
    },
    Mutation {
        observer: MutationObserverId,
        records: Vec<MutationRecord>,
    },
    Scroll {
        listener: ListenerId,
        scroll_x: f64,
        scroll_y: f64,
    },
    Resize {
        listener: ListenerId,
        width: f64,
        height: f64,
    },
}
