// Instrument registry - kind -> factory
// Absence of an engine is an explicit None, never a runtime probe

use crate::instrument::InstrumentKind;
use crate::sequencer::events::{ParameterChangeEvent, TriggerEvent};
use std::collections::HashMap;
use std::fmt;

/// A sound-producing instance driven by the sequencer
///
/// Synthesis itself lives outside this crate; implementations forward to the
/// host audio API. Calls arrive on the sequencer's owner thread and must not block.
pub trait Instrument: Send {
    /// Family this instance belongs to
    fn kind(&self) -> InstrumentKind;

    /// False while samples or patches are still loading
    fn is_loaded(&self) -> bool {
        true
    }

    /// Sound a note/hit at `event.scheduled_time`
    fn trigger(&mut self, event: &TriggerEvent);

    /// Apply an automation value
    fn set_parameter(&mut self, _event: &ParameterChangeEvent) {}

    /// Free audio resources before the instance is dropped
    fn release(&mut self) {}
}

/// Constructor for one instrument kind
pub type InstrumentFactory = Box<dyn Fn() -> Box<dyn Instrument> + Send + Sync>;

/// Registry of instrument factories
#[derive(Default)]
pub struct InstrumentRegistry {
    factories: HashMap<InstrumentKind, InstrumentFactory>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `kind`
    pub fn register<F>(&mut self, kind: InstrumentKind, factory: F)
    where
        F: Fn() -> Box<dyn Instrument> + Send + Sync + 'static,
    {
        if self.factories.insert(kind, Box::new(factory)).is_some() {
            log::debug!(target: "instrument", "Replaced factory for {}", kind);
        }
    }

    pub fn is_registered(&self, kind: InstrumentKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Build a new instance, `None` when no factory exists for `kind`
    pub fn create(&self, kind: InstrumentKind) -> Option<Box<dyn Instrument>> {
        self.factories.get(&kind).map(|factory| factory())
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<InstrumentKind> {
        InstrumentKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.factories.contains_key(kind))
            .collect()
    }
}

impl fmt::Debug for InstrumentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent(InstrumentKind);

    impl Instrument for Silent {
        fn kind(&self) -> InstrumentKind {
            self.0
        }

        fn trigger(&mut self, _event: &TriggerEvent) {}
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = InstrumentRegistry::new();
        assert!(registry.create(InstrumentKind::Tb303).is_none());

        registry.register(InstrumentKind::Tb303, || Box::new(Silent(InstrumentKind::Tb303)));
        assert!(registry.is_registered(InstrumentKind::Tb303));

        let instance = registry.create(InstrumentKind::Tb303).unwrap();
        assert_eq!(instance.kind(), InstrumentKind::Tb303);
        assert!(instance.is_loaded());
    }

    #[test]
    fn test_kinds_in_declaration_order() {
        let mut registry = InstrumentRegistry::new();
        registry.register(InstrumentKind::Sampler, || Box::new(Silent(InstrumentKind::Sampler)));
        registry.register(InstrumentKind::Tr808, || Box::new(Silent(InstrumentKind::Tr808)));
        assert_eq!(
            registry.kinds(),
            vec![InstrumentKind::Tr808, InstrumentKind::Sampler]
        );
    }
}
