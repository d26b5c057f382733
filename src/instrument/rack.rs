// Instrument rack - loaded instrument instances keyed by handle

use crate::instrument::registry::{Instrument, InstrumentRegistry};
use crate::instrument::{InstrumentKind, InstrumentRef};
use crate::sequencer::error::{SequencerError, SequencerResult};
use crate::sequencer::events::{
    InstrumentOutput, MixerOutput, OutputError, ParameterChangeEvent, TriggerEvent,
};
use std::collections::HashMap;

/// Loaded instruments, the usual instrument + mixer collaborator of a transport
#[derive(Default)]
pub struct InstrumentRack {
    instances: HashMap<InstrumentRef, Box<dyn Instrument>>,
}

impl InstrumentRack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instance of `kind` through the registry and store it under `handle`
    ///
    /// A previous instance under the same handle is released first. Without a
    /// factory for `kind` the handle cannot be resolved: `UnknownInstrument`.
    pub fn load(
        &mut self,
        registry: &InstrumentRegistry,
        handle: InstrumentRef,
        kind: InstrumentKind,
    ) -> SequencerResult<()> {
        let Some(instance) = registry.create(kind) else {
            log::warn!(target: "instrument", "No factory registered for {}, {} not loaded", kind, handle);
            return Err(SequencerError::UnknownInstrument(handle));
        };
        self.insert(handle, instance);
        Ok(())
    }

    /// Store an already built instance
    pub fn insert(&mut self, handle: InstrumentRef, instance: Box<dyn Instrument>) {
        log::debug!(target: "instrument", "Loaded {} as {}", instance.kind(), handle);
        if let Some(mut previous) = self.instances.insert(handle, instance) {
            previous.release();
        }
    }

    /// Release and drop an instance
    pub fn unload(&mut self, handle: &InstrumentRef) -> SequencerResult<()> {
        let mut instance = self
            .instances
            .remove(handle)
            .ok_or_else(|| SequencerError::UnknownInstrument(handle.clone()))?;
        instance.release();
        Ok(())
    }

    /// Release everything
    pub fn clear(&mut self) {
        for (_, mut instance) in self.instances.drain() {
            instance.release();
        }
    }

    pub fn contains(&self, handle: &InstrumentRef) -> bool {
        self.instances.contains_key(handle)
    }

    /// Loaded and ready to sound
    pub fn is_ready(&self, handle: &InstrumentRef) -> bool {
        self.instances
            .get(handle)
            .is_some_and(|instance| instance.is_loaded())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn ready_instance(
        &mut self,
        handle: &InstrumentRef,
    ) -> Result<&mut Box<dyn Instrument>, OutputError> {
        let instance = self
            .instances
            .get_mut(handle)
            .ok_or_else(|| OutputError::UnknownInstrument(handle.clone()))?;
        if !instance.is_loaded() {
            return Err(OutputError::NotLoaded(handle.clone()));
        }
        Ok(instance)
    }
}

impl InstrumentOutput for InstrumentRack {
    fn trigger(&mut self, event: &TriggerEvent) -> Result<(), OutputError> {
        self.ready_instance(&event.instrument)?.trigger(event);
        Ok(())
    }
}

impl MixerOutput for InstrumentRack {
    fn set_parameter(&mut self, event: &ParameterChangeEvent) -> Result<(), OutputError> {
        self.ready_instance(&event.instrument)?.set_parameter(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::timeline::Position;
    use crate::sequencer::track::TrackId;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Probe {
        hits: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
        loaded: bool,
    }

    impl Instrument for Probe {
        fn kind(&self) -> InstrumentKind {
            InstrumentKind::Tr909
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn trigger(&mut self, _event: &TriggerEvent) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::Relaxed);
        }
    }

    fn event(handle: &str) -> TriggerEvent {
        TriggerEvent {
            track_id: TrackId::new(1),
            instrument: InstrumentRef::from(handle),
            velocity: 1.0,
            gain: 1.0,
            pan: 0.0,
            position: Position::zero(),
            scheduled_time: 0.0,
        }
    }

    #[test]
    fn test_trigger_loaded_instrument() {
        let hits = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicBool::new(false));
        let mut registry = InstrumentRegistry::new();
        {
            let hits = Arc::clone(&hits);
            let released = Arc::clone(&released);
            registry.register(InstrumentKind::Tr909, move || {
                Box::new(Probe {
                    hits: Arc::clone(&hits),
                    released: Arc::clone(&released),
                    loaded: true,
                })
            });
        }

        let mut rack = InstrumentRack::new();
        rack.load(&registry, "drums".into(), InstrumentKind::Tr909)
            .unwrap();
        assert!(rack.is_ready(&"drums".into()));

        rack.trigger(&event("drums")).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        rack.unload(&"drums".into()).unwrap();
        assert!(released.load(Ordering::Relaxed));
        assert!(rack.is_empty());
    }

    #[test]
    fn test_unknown_and_unloaded() {
        let mut rack = InstrumentRack::new();
        assert_eq!(
            rack.trigger(&event("ghost")),
            Err(OutputError::UnknownInstrument("ghost".into()))
        );

        rack.insert(
            "pending".into(),
            Box::new(Probe {
                hits: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicBool::new(false)),
                loaded: false,
            }),
        );
        assert!(!rack.is_ready(&"pending".into()));
        assert_eq!(
            rack.trigger(&event("pending")),
            Err(OutputError::NotLoaded("pending".into()))
        );
        assert!(rack.unload(&"ghost".into()).is_err());
    }

    #[test]
    fn test_load_without_factory() {
        let registry = InstrumentRegistry::new();
        let mut rack = InstrumentRack::new();
        assert_eq!(
            rack.load(&registry, "bass".into(), InstrumentKind::Tb303),
            Err(SequencerError::UnknownInstrument("bass".into()))
        );
        assert!(!rack.contains(&"bass".into()));
    }
}
