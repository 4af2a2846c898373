//! Event Loop Implementation
//!
//! Virtual clock with one-shot timers and animation-frame callbacks.
//! Time only moves when the host is polled, which keeps every run
//! deterministic.

use crate::{FrameId, TimerId};

/// Frame cadence (ms)
pub const FRAME_INTERVAL_MS: f64 = 16.0;

/// Timer task
#[derive(Debug, Clone, Copy)]
struct Timer {
    id: TimerId,
    due: f64,
}

/// Event loop state
#[derive(Debug)]
pub struct EventLoop {
    now: f64,
    timers: Vec<Timer>,
    /// Callbacks requested for the upcoming frame
    frame_requests: Vec<FrameId>,
    /// Callbacks of the frame currently being delivered
    running_frames: Vec<FrameId>,
    last_frame_time: f64,
    frames_run: u64,
    next_timer_id: u32,
    next_frame_id: u32,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            timers: Vec::new(),
            frame_requests: Vec::new(),
            running_frames: Vec::new(),
            last_frame_time: f64::NEG_INFINITY,
            frames_run: 0,
            next_timer_id: 1,
            next_frame_id: 1,
        }
    }

    /// Current timestamp (ms)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule a one-shot timer
    pub fn set_timeout(&mut self, delay_ms: f64) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay_ms.max(0.0),
        });
        id
    }

    /// Cancel a timer; false if it already fired or never existed
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest due time; ties resolve in scheduling order
    pub(crate) fn next_timer_due(&self) -> Option<f64> {
        self.timers.iter().map(|t| t.due).reduce(f64::min)
    }

    /// Remove and return the earliest timer, moving the clock to its due time
    pub(crate) fn pop_due_timer(&mut self) -> Option<TimerId> {
        let due = self.next_timer_due()?;
        let pos = self.timers.iter().position(|t| t.due == due)?;
        let timer = self.timers.remove(pos);
        self.now = self.now.max(timer.due);
        Some(timer.id)
    }

    pub fn request_animation_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        self.frame_requests.push(id);
        id
    }

    /// Cancel a frame callback, including one whose frame already started
    /// but which has not been delivered yet.
    pub fn cancel_animation_frame(&mut self, id: FrameId) -> bool {
        let before = self.frame_requests.len() + self.running_frames.len();
        self.frame_requests.retain(|&f| f != id);
        self.running_frames.retain(|&f| f != id);
        before != self.frame_requests.len() + self.running_frames.len()
    }

    pub fn has_frame_requests(&self) -> bool {
        !self.frame_requests.is_empty()
    }

    /// Time of the next frame boundary at or after `now`
    pub(crate) fn next_frame_time(&self) -> f64 {
        let mut t = (self.now / FRAME_INTERVAL_MS).ceil() * FRAME_INTERVAL_MS;
        if t <= self.last_frame_time {
            t = self.last_frame_time + FRAME_INTERVAL_MS;
        }
        t
    }

    /// Start the frame at `time`; returns the callbacks it will deliver.
    /// Requests made from here on go to the following frame.
    pub(crate) fn begin_frame(&mut self, time: f64) -> Vec<FrameId> {
        self.now = time;
        self.last_frame_time = time;
        self.frames_run += 1;
        self.running_frames = std::mem::take(&mut self.frame_requests);
        self.running_frames.clone()
    }

    /// Claim a running callback for delivery; false if it was cancelled
    pub(crate) fn take_running(&mut self, id: FrameId) -> bool {
        match self.running_frames.iter().position(|&f| f == id) {
            Some(pos) => {
                self.running_frames.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of frames run so far
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    pub(crate) fn advance_to(&mut self, time: f64) {
        self.now = self.now.max(time);
    }
}
