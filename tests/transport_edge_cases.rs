//! Edge case tests for the transport and its collaborators
//!
//! Observers, instrument racks, grid changes and automation around stop/start.

use haos_sequencer::instrument::Instrument;
use haos_sequencer::sequencer::events::{OutputPair, ParameterChangeEvent, TriggerEvent};
use haos_sequencer::sequencer::{
    EventLog, OfflineRenderer, SequencerNotice, StepPattern, TrackConfig, Transport, params,
};
use haos_sequencer::{
    EngineConfig, InstrumentKind, InstrumentRack, InstrumentRef, InstrumentRegistry,
    SequencerError, TransportState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn config() -> EngineConfig {
    EngineConfig {
        tempo_bpm: 60.0,
        steps_per_beat: 1,
        steps_per_bar: 4,
        total_bars: 2,
        ..EngineConfig::default()
    }
}

struct Counter {
    kind: InstrumentKind,
    hits: Arc<AtomicUsize>,
    ready: bool,
}

impl Instrument for Counter {
    fn kind(&self) -> InstrumentKind {
        self.kind
    }

    fn is_loaded(&self) -> bool {
        self.ready
    }

    fn trigger(&mut self, _event: &TriggerEvent) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_rack_skips_missing_and_loading_instruments() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = InstrumentRegistry::new();
    let counter = hits.clone();
    registry.register(InstrumentKind::Tr808, move || {
        Box::new(Counter {
            kind: InstrumentKind::Tr808,
            hits: counter.clone(),
            ready: true,
        })
    });

    let mut rack = InstrumentRack::new();
    rack.load(&registry, InstrumentRef::from("tr808"), InstrumentKind::Tr808)
        .unwrap();
    rack.insert(
        InstrumentRef::from("tb303"),
        Box::new(Counter {
            kind: InstrumentKind::Tb303,
            hits: hits.clone(),
            ready: false,
        }),
    );
    assert!(rack.load(&registry, InstrumentRef::from("pad"), InstrumentKind::StringMachine).is_err());

    let mut transport = Transport::from_config(&config()).unwrap();
    let every_step = StepPattern::from_bools(&[true; 4]);
    for (name, instrument) in [("Kick", "tr808"), ("Bass", "tb303"), ("Pad", "pad")] {
        transport
            .sequencer_mut()
            .add_track(TrackConfig::new(name, instrument).with_pattern(every_step.clone()))
            .unwrap();
    }

    let dropped = Arc::new(Mutex::new(Vec::new()));
    let sink = dropped.clone();
    transport.subscribe(move |notice| {
        if let SequencerNotice::TriggerDropped { instrument, .. } = notice
            && let Ok(mut list) = sink.lock()
        {
            list.push(instrument.clone());
        }
    });

    OfflineRenderer::new(0.25).render_into(&mut transport, 3.0, &mut rack);

    assert_eq!(hits.load(Ordering::SeqCst), 4);
    let dropped = dropped.lock().unwrap();
    assert_eq!(dropped.len(), 8);
    assert!(dropped.contains(&InstrumentRef::from("tb303")));
    assert!(dropped.contains(&InstrumentRef::from("pad")));
}

#[test]
fn test_observer_sees_transport_and_positions() {
    let mut transport = Transport::from_config(&config()).unwrap();
    let notices = Arc::new(Mutex::new(Vec::new()));
    let sink = notices.clone();
    let id = transport.subscribe(move |notice| {
        if let Ok(mut list) = sink.lock() {
            list.push(notice.clone());
        }
    });

    OfflineRenderer::new(0.25).render(&mut transport, 1.0);
    transport.stop().unwrap();
    assert!(transport.unsubscribe(id));
    transport.play().unwrap();

    let notices = notices.lock().unwrap();
    assert_eq!(
        notices.first(),
        Some(&SequencerNotice::TransportChanged(TransportState::Playing))
    );
    let positions = notices
        .iter()
        .filter(|n| matches!(n, SequencerNotice::Position(_)))
        .count();
    assert_eq!(positions, 2);
    assert_eq!(
        notices.last(),
        Some(&SequencerNotice::TransportChanged(TransportState::Stopped))
    );
}

#[test]
fn test_automation_replayed_after_stop() {
    let mut transport = Transport::from_config(&config()).unwrap();
    let bass = transport
        .sequencer_mut()
        .add_track(TrackConfig::new("Bass", "tb303"))
        .unwrap();
    let seq = transport.sequencer_mut();
    seq.schedule_automation(bass, 0, params::CUTOFF, 0.2).unwrap();
    seq.schedule_automation(bass, 1, params::CUTOFF, 0.2).unwrap();

    let log = OfflineRenderer::new(0.25).render(&mut transport, 7.0);
    // Unchanged value at bar 1 is not sent again
    assert_eq!(log.parameters.len(), 1);

    transport.stop().unwrap();
    let log = OfflineRenderer::new(0.25).render(&mut transport, 1.0);
    assert_eq!(log.parameters.len(), 1);
    assert_eq!(log.parameters[0].value, 0.2);
}

#[test]
fn test_separate_instrument_and_mixer_outputs() {
    #[derive(Default)]
    struct Mixer(Vec<(String, f32)>);

    impl haos_sequencer::sequencer::MixerOutput for Mixer {
        fn set_parameter(
            &mut self,
            event: &ParameterChangeEvent,
        ) -> Result<(), haos_sequencer::sequencer::OutputError> {
            self.0.push((event.param.clone(), event.value));
            Ok(())
        }
    }

    let mut transport = Transport::from_config(&config()).unwrap();
    let kick = transport
        .sequencer_mut()
        .add_track(
            TrackConfig::new("Kick", "tr808")
                .with_pattern(StepPattern::from_bools(&[true, false, false, false])),
        )
        .unwrap();
    transport
        .sequencer_mut()
        .schedule_automation(kick, 0, params::VOLUME, 0.5)
        .unwrap();

    let mut instruments = EventLog::new();
    let mut mixer = Mixer::default();
    let mut output = OutputPair::new(&mut instruments, &mut mixer);
    OfflineRenderer::new(0.25).render_into(&mut transport, 0.5, &mut output);

    assert_eq!(instruments.trigger_times(kick), vec![0.0]);
    assert!(instruments.parameters.is_empty());
    assert_eq!(mixer.0, vec![(params::VOLUME.to_string(), 0.5)]);
}

#[test]
fn test_grid_change_resizes_patterns() {
    let mut transport = Transport::from_config(&config()).unwrap();
    let kick = transport
        .sequencer_mut()
        .add_track(TrackConfig::new("Kick", "tr808").with_pattern(StepPattern::from_bools(&[true; 4])))
        .unwrap();

    transport.sequencer_mut().set_steps_per_bar(8).unwrap();
    let steps = transport.sequencer().track(kick).unwrap().pattern().steps().to_vec();
    assert_eq!(steps.len(), 8);
    assert_eq!(&steps[..4], &[1.0; 4]);
    assert!(steps[4..].iter().all(|&v| v == 0.0));

    let err = transport
        .sequencer_mut()
        .add_track(TrackConfig::new("Snare", "tr909").with_pattern(StepPattern::new(4)))
        .unwrap_err();
    assert_eq!(
        err,
        SequencerError::LengthMismatch {
            expected: 8,
            actual: 4
        }
    );
}

#[test]
fn test_invalid_time_inputs_are_ignored() {
    let mut transport = Transport::from_config(&config()).unwrap();
    let mut log = EventLog::new();
    transport.play().unwrap();
    transport.process_at(2.0, &mut log);
    transport.process_at(f64::NAN, &mut log);
    transport.process_at(1.0, &mut log);
    assert_eq!(transport.now(), 2.0);

    transport.advance(-5.0, &mut log);
    assert_eq!(transport.now(), 2.0);
    assert!(transport.sequencer_mut().set_tempo(f64::INFINITY).is_err());
    assert_eq!(transport.sequencer().tempo().bpm(), 60.0);
}
