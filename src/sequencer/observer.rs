// Observer - UI subscriptions
// Callbacks registered per subscriber; delivery is best effort, in call order

use crate::instrument::InstrumentRef;
use crate::sequencer::pattern::PatternBank;
use crate::sequencer::timeline::Position;
use crate::sequencer::track::TrackId;
use crate::sequencer::transport::TransportState;

/// Something a UI may want to redraw for
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerNotice {
    /// A step started sounding
    Position(Position),
    TransportChanged(TransportState),
    TempoChanged(f64),
    /// Tracks play another bank from the bar being scheduled
    BankChanged(PatternBank),
    MuteChanged { track: TrackId, muted: bool },
    SoloChanged { track: TrackId, soloed: bool },
    TrackAdded(TrackId),
    TrackRemoved(TrackId),
    /// Last bar finished with looping disabled
    SequenceComplete,
    /// A due trigger was dropped because its instrument was unavailable
    TriggerDropped { track: TrackId, instrument: InstrumentRef },
}

/// Handle returned by `subscribe`, pass it back to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&SequencerNotice) + Send>;

/// Subscriber list
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(SubscriptionId, Callback)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SequencerNotice) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, notice: &SequencerNotice) {
        for (_, callback) in self.observers.iter_mut() {
            callback(notice);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("subscribers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribe_notify_unsubscribe() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();

        let sink = Arc::clone(&received);
        let id = registry.subscribe(move |notice| sink.lock().unwrap().push(notice.clone()));

        registry.notify(&SequencerNotice::TempoChanged(140.0));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.notify(&SequencerNotice::SequenceComplete);

        let received = received.lock().unwrap();
        assert_eq!(*received, vec![SequencerNotice::TempoChanged(140.0)]);
    }

    #[test]
    fn test_multiple_subscribers() {
        let count = Arc::new(Mutex::new(0));
        let mut registry = ObserverRegistry::new();
        for _ in 0..3 {
            let count = Arc::clone(&count);
            registry.subscribe(move |_| *count.lock().unwrap() += 1);
        }
        registry.notify(&SequencerNotice::TrackAdded(TrackId::new(1)));
        assert_eq!(*count.lock().unwrap(), 3);
        assert_eq!(registry.len(), 3);
    }
}
