// Scheduler - Look-ahead event queue
// Events are computed ahead of the driving timer and released once due

use crate::sequencer::events::ScheduledEvent;
use crate::sequencer::track::TrackId;
use std::collections::VecDeque;

/// Slack when comparing due times, absorbs float noise in driver timestamps
pub(crate) const TIME_EPSILON: f64 = 1e-9;

/// Pending events ordered by scheduled time
///
/// The sequencer fills the queue up to `now + schedule_ahead` and releases
/// events whose time has come. Anything still queued can be cancelled, per
/// track or entirely.
#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    schedule_ahead: f64,
    pending: VecDeque<ScheduledEvent>,
}

impl LookaheadScheduler {
    pub fn new(schedule_ahead: f64) -> Self {
        Self {
            schedule_ahead: schedule_ahead.max(0.0),
            pending: VecDeque::new(),
        }
    }

    /// Look-ahead window in seconds
    pub fn schedule_ahead(&self) -> f64 {
        self.schedule_ahead
    }

    pub fn set_schedule_ahead(&mut self, seconds: f64) {
        self.schedule_ahead = seconds.max(0.0);
    }

    /// Latest time that should already be scheduled at `now`
    pub fn horizon(&self, now: f64) -> f64 {
        now + self.schedule_ahead
    }

    /// Queue an event; keeps the queue sorted, equal times stay in push order
    pub fn push(&mut self, event: ScheduledEvent) {
        let time = event.time();
        match self.pending.back() {
            Some(last) if last.time() > time => {
                let index = self.pending.partition_point(|queued| queued.time() <= time);
                self.pending.insert(index, event);
            }
            _ => self.pending.push_back(event),
        }
    }

    /// Remove and return every event due at `now`, in time order
    pub fn drain_due(&mut self, now: f64) -> Vec<ScheduledEvent> {
        let due = self
            .pending
            .partition_point(|event| event.time() <= now + TIME_EPSILON);
        self.pending.drain(..due).collect()
    }

    /// Drop every pending event, returns how many were cancelled
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    /// Drop the pending events of one track
    pub fn cancel_track(&mut self, track_id: TrackId) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|event| event.track_id() != Some(track_id));
        before - self.pending.len()
    }

    /// Move every pending event later by `delta` seconds
    pub fn shift(&mut self, delta: f64) {
        for event in self.pending.iter_mut() {
            event.shift(delta);
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Time of the earliest pending event
    pub fn next_time(&self) -> Option<f64> {
        self.pending.front().map(ScheduledEvent::time)
    }
}
