//! Intersection Observer
//!
//! Observe element visibility against the viewport, notifying only when an
//! element crosses one of the observer's thresholds.

use crate::{HostError, IntersectionObserverId};
use kw_dom::{DOMRect, NodeId};

/// One side of a root margin
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginValue {
    Px(f64),
    /// Percentage of the root's width (left/right) or height (top/bottom)
    Percent(f64),
}

impl MarginValue {
    fn parse(s: &str) -> Option<Self> {
        if let Some(n) = s.strip_suffix("px") {
            n.trim().parse().ok().map(MarginValue::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            n.trim().parse().ok().map(MarginValue::Percent)
        } else if s.parse::<f64>().ok() == Some(0.0) {
            Some(MarginValue::Px(0.0))
        } else {
            None
        }
    }

    fn resolve(self, extent: f64) -> f64 {
        match self {
            MarginValue::Px(v) => v,
            MarginValue::Percent(p) => extent * p / 100.0,
        }
    }
}

/// CSS-style margin around the root, 1 to 4 values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginValue,
    pub right: MarginValue,
    pub bottom: MarginValue,
    pub left: MarginValue,
}

impl Default for RootMargin {
    fn default() -> Self {
        let zero = MarginValue::Px(0.0);
        Self { top: zero, right: zero, bottom: zero, left: zero }
    }
}

impl RootMargin {
    /// Parse `"10px"`, `"10px 5%"`, `"1px 2px 3px"` or `"1px 2px 3px 4px"`
    pub fn parse(s: &str) -> Result<Self, HostError> {
        let invalid = || HostError::InvalidRootMargin(s.to_string());
        let values = s
            .split_whitespace()
            .map(MarginValue::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let (top, right, bottom, left) = match values.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return Err(invalid()),
        };
        Ok(Self { top, right, bottom, left })
    }

    /// Root bounds grown by this margin
    pub fn apply(&self, root: DOMRect) -> DOMRect {
        root.inflate(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }
}

/// Intersection observer options
#[derive(Debug, Clone)]
pub struct IntersectionObserverOptions {
    pub root_margin: String,
    /// Thresholds to trigger callback, each within `0.0..=1.0`
    pub threshold: Vec<f64>,
}

impl Default for IntersectionObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: "0px".to_string(),
            threshold: vec![0.0],
        }
    }
}

/// Intersection observer entry
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub bounding_client_rect: DOMRect,
    pub intersection_rect: DOMRect,
    pub root_bounds: DOMRect,
    pub intersection_ratio: f64,
    pub is_intersecting: bool,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObservedState {
    threshold_index: usize,
    is_intersecting: bool,
}

/// Intersection observer
#[derive(Debug)]
pub struct IntersectionObserver {
    id: IntersectionObserverId,
    root_margin: RootMargin,
    thresholds: Vec<f64>,
    /// Targets in observation order with their last notified state
    observed: Vec<(NodeId, Option<ObservedState>)>,
}

impl IntersectionObserver {
    pub(crate) fn new(
        id: IntersectionObserverId,
        options: &IntersectionObserverOptions,
    ) -> Result<Self, HostError> {
        let root_margin = RootMargin::parse(&options.root_margin)?;
        if let Some(&bad) = options.threshold.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(HostError::InvalidThreshold(bad));
        }

        let mut thresholds = options.threshold.clone();
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();

        Ok(Self {
            id,
            root_margin,
            thresholds,
            observed: Vec::new(),
        })
    }

    pub fn id(&self) -> IntersectionObserverId {
        self.id
    }

    pub fn root_margin(&self) -> RootMargin {
        self.root_margin
    }

    /// Sorted, de-duplicated thresholds
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Observe a target; observing twice is a no-op
    pub fn observe(&mut self, target: NodeId) {
        if !self.is_observing(target) {
            self.observed.push((target, None));
        }
    }

    pub fn unobserve(&mut self, target: NodeId) {
        self.observed.retain(|(id, _)| *id != target);
    }

    pub fn disconnect(&mut self) {
        self.observed.clear();
    }

    pub fn is_observing(&self, target: NodeId) -> bool {
        self.observed.iter().any(|(id, _)| *id == target)
    }

    /// Observed targets in observation order
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.observed.iter().map(|(id, _)| *id)
    }

    fn threshold_index(&self, ratio: f64, is_intersecting: bool) -> usize {
        if !is_intersecting {
            return 0;
        }
        self.thresholds.iter().filter(|&&t| ratio >= t).count()
    }

    /// Compute entries for targets whose threshold state changed.
    /// `rect_of` yields a target's rect in viewport coordinates, `None` for
    /// targets without a box (those are skipped).
    pub(crate) fn check_intersections(
        &mut self,
        viewport: DOMRect,
        time: f64,
        rect_of: impl Fn(NodeId) -> Option<DOMRect>,
    ) -> Vec<IntersectionEntry> {
        let root_bounds = self.root_margin.apply(viewport);
        let mut entries = Vec::new();

        for i in 0..self.observed.len() {
            let (target, last) = self.observed[i];
            let Some(rect) = rect_of(target) else {
                continue;
            };

            // Zero-area targets intersect when they lie within the root,
            // edges included, and then count as fully visible.
            let (intersection, ratio) = if rect.is_empty() {
                let hit = rect.edge_intersection(&root_bounds);
                (hit, if hit.is_some() { 1.0 } else { 0.0 })
            } else {
                let hit = rect.intersection(&root_bounds);
                (hit, hit.map_or(0.0, |r| r.area() / rect.area()))
            };
            let is_intersecting = intersection.is_some();
            let state = ObservedState {
                threshold_index: self.threshold_index(ratio, is_intersecting),
                is_intersecting,
            };

            if last != Some(state) {
                self.observed[i].1 = Some(state);
                entries.push(IntersectionEntry {
                    target,
                    bounding_client_rect: rect,
                    intersection_rect: intersection.unwrap_or_default(),
                    root_bounds,
                    intersection_ratio: ratio,
                    is_intersecting,
                    time,
                });
            }
        }
        entries
    }
}
