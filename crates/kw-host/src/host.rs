//! Host environment
//!
//! Owns the document, viewport, event loop and observers, and turns their
//! state changes into an ordered stream of [`HostEvent`]s.

use std::collections::VecDeque;

use crate::{
    EventLoop, FrameId, HostError, HostEvent, IntersectionObserver, IntersectionObserverId,
    IntersectionObserverOptions, ListenerId, MutationObserver, MutationObserverId,
    MutationObserverInit, TimerId, Viewport,
};
use kw_dom::{DOMRect, Document, NodeId};

/// Pending work, in delivery order
#[derive(Debug)]
enum Step {
    Deliver(HostEvent),
    /// Runs after a frame's callbacks so they see the committed geometry
    UpdateIntersections,
}

/// Host environment
#[derive(Debug)]
pub struct Host {
    document: Document,
    viewport: Viewport,
    event_loop: EventLoop,
    intersection_observers: Vec<IntersectionObserver>,
    mutation_observers: Vec<MutationObserver>,
    scroll_listeners: Vec<ListenerId>,
    resize_listeners: Vec<ListenerId>,
    queue: VecDeque<Step>,
    reduced_motion: bool,
    next_listener_id: u32,
    next_observer_id: u32,
}

impl Host {
    pub fn new(document: Document, viewport: Viewport) -> Self {
        Self {
            document,
            viewport,
            event_loop: EventLoop::new(),
            intersection_observers: Vec::new(),
            mutation_observers: Vec::new(),
            scroll_listeners: Vec::new(),
            resize_listeners: Vec::new(),
            queue: VecDeque::new(),
            reduced_motion: false,
            next_listener_id: 1,
            next_observer_id: 1,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Current timestamp (ms)
    pub fn now(&self) -> f64 {
        self.event_loop.now()
    }

    /// `prefers-reduced-motion: reduce`
    pub fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn set_prefers_reduced_motion(&mut self, reduce: bool) {
        self.reduced_motion = reduce;
    }

    pub fn set_timeout(&mut self, delay_ms: f64) -> TimerId {
        self.event_loop.set_timeout(delay_ms)
    }

    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.event_loop.clear_timeout(id)
    }

    pub fn request_animation_frame(&mut self) -> FrameId {
        self.event_loop.request_animation_frame()
    }

    pub fn cancel_animation_frame(&mut self, id: FrameId) -> bool {
        self.event_loop.cancel_animation_frame(id)
    }

    fn next_listener(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        id
    }

    pub fn add_scroll_listener(&mut self) -> ListenerId {
        let id = self.next_listener();
        self.scroll_listeners.push(id);
        id
    }

    pub fn remove_scroll_listener(&mut self, id: ListenerId) -> bool {
        remove_id(&mut self.scroll_listeners, id)
    }

    pub fn scroll_listener_count(&self) -> usize {
        self.scroll_listeners.len()
    }

    pub fn add_resize_listener(&mut self) -> ListenerId {
        let id = self.next_listener();
        self.resize_listeners.push(id);
        id
    }

    pub fn remove_resize_listener(&mut self, id: ListenerId) -> bool {
        remove_id(&mut self.resize_listeners, id)
    }

    pub fn resize_listener_count(&self) -> usize {
        self.resize_listeners.len()
    }

    /// Scroll the window; each listener gets one event per effective change
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        let (x, y) = (x.max(0.0), y.max(0.0));
        if x == self.viewport.scroll_x && y == self.viewport.scroll_y {
            return;
        }
        self.viewport.scroll_x = x;
        self.viewport.scroll_y = y;
        for &listener in &self.scroll_listeners {
            self.queue.push_back(Step::Deliver(HostEvent::Scroll {
                listener,
                scroll_x: x,
                scroll_y: y,
            }));
        }
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll_to(self.viewport.scroll_x + dx, self.viewport.scroll_y + dy);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width.max(0.0);
        self.viewport.height = height.max(0.0);
        for &listener in &self.resize_listeners {
            self.queue.push_back(Step::Deliver(HostEvent::Resize {
                listener,
                width: self.viewport.width,
                height: self.viewport.height,
            }));
        }
    }

    /// Viewport-space rect of a connected element
    pub fn bounding_client_rect(&self, node: NodeId) -> Option<DOMRect> {
        let tree = self.document.tree();
        if !tree.is_connected(node) {
            return None;
        }
        tree.element(node)
            .and_then(|e| e.rect())
            .map(|r| self.viewport.to_client(r))
    }

    pub fn create_intersection_observer(
        &mut self,
        options: &IntersectionObserverOptions,
    ) -> Result<IntersectionObserverId, HostError> {
        let id = IntersectionObserverId(self.next_observer_id);
        let observer = IntersectionObserver::new(id, options)?;
        self.next_observer_id += 1;
        self.intersection_observers.push(observer);
        tracing::trace!("created intersection observer {:?}", id);
        Ok(id)
    }

    pub fn intersection_observer(&self, id: IntersectionObserverId) -> Option<&IntersectionObserver> {
        self.intersection_observers.iter().find(|o| o.id() == id)
    }

    fn intersection_observer_mut(
        &mut self,
        id: IntersectionObserverId,
    ) -> Result<&mut IntersectionObserver, HostError> {
        self.intersection_observers
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or(HostError::UnknownObserver)
    }

    pub fn observe_intersection(
        &mut self,
        id: IntersectionObserverId,
        target: NodeId,
    ) -> Result<(), HostError> {
        self.intersection_observer_mut(id)?.observe(target);
        Ok(())
    }

    pub fn unobserve_intersection(
        &mut self,
        id: IntersectionObserverId,
        target: NodeId,
    ) -> Result<(), HostError> {
        self.intersection_observer_mut(id)?.unobserve(target);
        Ok(())
    }

    /// Disconnect and drop an intersection observer
    pub fn disconnect_intersection_observer(&mut self, id: IntersectionObserverId) -> bool {
        let before = self.intersection_observers.len();
        self.intersection_observers.retain(|o| o.id() != id);
        before != self.intersection_observers.len()
    }

    pub fn create_mutation_observer(&mut self) -> MutationObserverId {
        let id = MutationObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.mutation_observers.push(MutationObserver::new(id));
        id
    }

    pub fn observe_mutations(
        &mut self,
        id: MutationObserverId,
        target: NodeId,
        options: MutationObserverInit,
    ) -> Result<(), HostError> {
        self.mutation_observers
            .iter_mut()
            .find(|o| o.id() == id)
            .ok_or(HostError::UnknownObserver)?
            .observe(target, options);
        Ok(())
    }

    /// Disconnect and drop a mutation observer
    pub fn disconnect_mutation_observer(&mut self, id: MutationObserverId) -> bool {
        let before = self.mutation_observers.len();
        self.mutation_observers.retain(|o| o.id() != id);
        before != self.mutation_observers.len()
    }

    pub fn mutation_observer_count(&self) -> usize {
        self.mutation_observers.len()
    }

    fn needs_frame(&self) -> bool {
        self.event_loop.has_frame_requests()
            || self
                .intersection_observers
                .iter()
                .any(|o| o.targets().next().is_some())
    }

    /// Next event due at or before `deadline`, advancing the clock to it.
    /// Returns `None` once nothing else is due; the clock then sits at
    /// `deadline`.
    ///
    /// Order: already-queued events, then pending mutation records, then
    /// the earlier of the next timer and the next frame (timers first on a
    /// tie). A frame delivers its callbacks and then the intersection
    /// changes they caused.
    pub fn poll_event(&mut self, deadline: f64) -> Option<HostEvent> {
        loop {
            if let Some(step) = self.queue.pop_front() {
                match step {
                    Step::Deliver(event) => {
                        if self.is_live(&event) {
                            return Some(event);
                        }
                    }
                    Step::UpdateIntersections => {
                        let events = self.update_intersections();
                        for event in events.into_iter().rev() {
                            self.queue.push_front(Step::Deliver(event));
                        }
                    }
                }
                continue;
            }

            if self.queue_mutations() {
                continue;
            }

            let timer_due = self
                .event_loop
                .next_timer_due()
                .filter(|&t| t <= deadline);
            let frame_due = if self.needs_frame() {
                Some(self.event_loop.next_frame_time()).filter(|&t| t <= deadline)
            } else {
                None
            };

            match (timer_due, frame_due) {
                (Some(t), frame) if frame.is_none_or(|f| t <= f) => {
                    if let Some(id) = self.event_loop.pop_due_timer() {
                        return Some(HostEvent::Timer(id));
                    }
                }
                (_, Some(f)) => self.begin_frame(f),
                _ => {
                    self.event_loop.advance_to(deadline);
                    return None;
                }
            }
        }
    }

    fn begin_frame(&mut self, time: f64) {
        for id in self.event_loop.begin_frame(time) {
            self.queue
                .push_back(Step::Deliver(HostEvent::AnimationFrame { id, time }));
        }
        self.queue.push_back(Step::UpdateIntersections);
    }

    /// Drop events whose owner went away after they were queued
    fn is_live(&mut self, event: &HostEvent) -> bool {
        match event {
            HostEvent::Timer(_) => true,
            HostEvent::AnimationFrame { id, .. } => self.event_loop.take_running(*id),
            HostEvent::Intersection { observer, .. } => {
                self.intersection_observer(*observer).is_some()
            }
            HostEvent::Mutation { observer, .. } => {
                self.mutation_observers.iter().any(|o| o.id() == *observer)
            }
            HostEvent::Scroll { listener, .. } => self.scroll_listeners.contains(listener),
            HostEvent::Resize { listener, .. } => self.resize_listeners.contains(listener),
        }
    }

    fn update_intersections(&mut self) -> Vec<HostEvent> {
        let tree = self.document.tree();
        let viewport = self.viewport;
        let now = self.event_loop.now();
        let rect_of = |id: NodeId| {
            if !tree.is_connected(id) {
                return None;
            }
            tree.element(id)
                .and_then(|e| e.rect())
                .map(|r| viewport.to_client(r))
        };

        self.intersection_observers
            .iter_mut()
            .filter_map(|observer| {
                let entries = observer.check_intersections(viewport.client_rect(), now, rect_of);
                (!entries.is_empty()).then(|| HostEvent::Intersection {
                    observer: observer.id(),
                    entries,
                })
            })
            .collect()
    }

    /// Route pending tree mutations to observers; true if anything was queued
    fn queue_mutations(&mut self) -> bool {
        if !self.document.tree().has_pending_mutations() {
            return false;
        }
        let records = self.document.tree_mut().take_mutations();
        let tree = self.document.tree();

        let mut queued = false;
        for observer in &self.mutation_observers {
            let matched: Vec<_> = records
                .iter()
                .filter(|r| observer.matches(tree, r))
                .cloned()
                .collect();
            if !matched.is_empty() {
                self.queue.push_back(Step::Deliver(HostEvent::Mutation {
                    observer: observer.id(),
                    records: matched,
                }));
                queued = true;
            }
        }
        queued
    }
}

fn remove_id(ids: &mut Vec<ListenerId>, id: ListenerId) -> bool {
    let before = ids.len();
    ids.retain(|&l| l != id);
    before != ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FRAME_INTERVAL_MS;

    fn host_with_block(top: f64) -> (Host, NodeId) {
        let mut doc = Document::default();
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let el = tree.create_element("div");
        tree.append_child(body, el).unwrap();
        tree.element_mut(el)
            .unwrap()
            .set_rect(DOMRect::from_xywh(0.0, top, 100.0, 100.0));
        tree.take_mutations();
        (Host::new(doc, Viewport::new(800.0, 600.0)), el)
    }

    fn drain(host: &mut Host, deadline: f64) -> Vec<HostEvent> {
        std::iter::from_fn(|| host.poll_event(deadline)).collect()
    }

    #[test]
    fn test_idle_host_advances_clock() {
        let (mut host, _) = host_with_block(0.0);
        assert_eq!(host.poll_event(100.0), None);
        assert_eq!(host.now(), 100.0);
    }

    #[test]
    fn test_timer_before_frame_on_tie() {
        let (mut host, _) = host_with_block(0.0);
        let warmup = host.set_timeout(1.0);
        assert_eq!(drain(&mut host, 1.0), vec![HostEvent::Timer(warmup)]);

        let timer = host.set_timeout(FRAME_INTERVAL_MS - 1.0);
        let frame = host.request_animation_frame();

        let events = drain(&mut host, 40.0);
        assert_eq!(events[0], HostEvent::Timer(timer));
        assert_eq!(events[1], HostEvent::AnimationFrame { id: frame, time: FRAME_INTERVAL_MS });
    }

    #[test]
    fn test_cancelled_frame_not_delivered() {
        let (mut host, _) = host_with_block(0.0);
        let frame = host.request_animation_frame();
        host.cancel_animation_frame(frame);
        assert!(drain(&mut host, 100.0).is_empty());
    }

    #[test]
    fn test_intersection_delivery() {
        let (mut host, el) = host_with_block(700.0);
        let obs = host
            .create_intersection_observer(&IntersectionObserverOptions::default())
            .unwrap();
        host.observe_intersection(obs, el).unwrap();

        let events = drain(&mut host, 0.0);
        let HostEvent::Intersection { entries, .. } = &events[0] else {
            panic!("expected intersection, got {events:?}");
        };
        assert!(!entries[0].is_intersecting);

        host.scroll_to(0.0, 300.0);
        let events = drain(&mut host, 20.0);
        let HostEvent::Intersection { entries, .. } = &events[0] else {
            panic!("expected intersection, got {events:?}");
        };
        assert!(entries[0].is_intersecting);
        assert_eq!(entries[0].bounding_client_rect.top(), 400.0);
    }

    #[test]
    fn test_zero_height_target_in_view_intersects() {
        let (mut host, el) = host_with_block(0.0);
        host.document_mut()
            .tree_mut()
            .element_mut(el)
            .unwrap()
            .set_rect(DOMRect::from_xywh(0.0, 100.0, 800.0, 0.0));
        let obs = host
            .create_intersection_observer(&IntersectionObserverOptions::default())
            .unwrap();
        host.observe_intersection(obs, el).unwrap();

        let events = drain(&mut host, 20.0);
        let HostEvent::Intersection { entries, .. } = &events[0] else {
            panic!("expected intersection, got {events:?}");
        };
        assert!(entries[0].is_intersecting);
        assert_eq!(entries[0].intersection_ratio, 1.0);
    }

    #[test]
    fn test_target_without_layout_is_skipped() {
        let (mut host, _) = host_with_block(0.0);
        let body = host.document().body().unwrap();
        let tree = host.document_mut().tree_mut();
        let fresh = tree.create_element("div");
        tree.append_child(body, fresh).unwrap();
        tree.take_mutations();

        let obs = host
            .create_intersection_observer(&IntersectionObserverOptions::default())
            .unwrap();
        host.observe_intersection(obs, fresh).unwrap();

        assert_eq!(host.bounding_client_rect(fresh), None);
        assert!(drain(&mut host, 50.0).is_empty());
    }

    #[test]
    fn test_scroll_events_per_listener() {
        let (mut host, _) = host_with_block(0.0);
        let a = host.add_scroll_listener();
        let b = host.add_scroll_listener();
        host.scroll_to(0.0, 10.0);
        host.scroll_to(0.0, 10.0);
        host.remove_scroll_listener(b);

        let events = drain(&mut host, 0.0);
        assert_eq!(
            events,
            vec![HostEvent::Scroll { listener: a, scroll_x: 0.0, scroll_y: 10.0 }]
        );
    }

    #[test]
    fn test_mutation_delivery() {
        let (mut host, el) = host_with_block(0.0);
        let obs = host.create_mutation_observer();
        host.observe_mutations(
            obs,
            NodeId::ROOT,
            MutationObserverInit { child_list: true, subtree: true },
        )
        .unwrap();

        let tree = host.document_mut().tree_mut();
        let child = tree.create_element("p");
        tree.append_child(el, child).unwrap();

        let events = drain(&mut host, 0.0);
        let HostEvent::Mutation { records, .. } = &events[0] else {
            panic!("expected mutation, got {events:?}");
        };
        assert_eq!(records[0].added_nodes, vec![child]);

        host.disconnect_mutation_observer(obs);
        let tree = host.document_mut().tree_mut();
        let other = tree.create_element("p");
        tree.append_child(el, other).unwrap();
        assert!(drain(&mut host, 0.0).is_empty());
    }
}
