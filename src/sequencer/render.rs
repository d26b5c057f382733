// Offline render - deterministic driver
// Steps a transport through fixed time quanta and records what it emits

use crate::instrument::InstrumentRef;
use crate::sequencer::events::{
    InstrumentOutput, MixerOutput, OutputError, ParameterChangeEvent, TriggerEvent,
};
use crate::sequencer::track::TrackId;
use crate::sequencer::transport::Transport;
use std::collections::HashSet;

/// Recording output: every accepted trigger and parameter change, in dispatch order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub triggers: Vec<TriggerEvent>,
    pub parameters: Vec<ParameterChangeEvent>,
    unavailable: HashSet<InstrumentRef>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse triggers for `instrument` as if it were not loaded
    pub fn mark_unavailable(&mut self, instrument: impl Into<InstrumentRef>) {
        self.unavailable.insert(instrument.into());
    }

    pub fn mark_available(&mut self, instrument: &InstrumentRef) {
        self.unavailable.remove(instrument);
    }

    /// Trigger times of one track
    pub fn trigger_times(&self, track_id: TrackId) -> Vec<f64> {
        self.triggers
            .iter()
            .filter(|event| event.track_id == track_id)
            .map(|event| event.scheduled_time)
            .collect()
    }

    /// Tracks that triggered, in dispatch order, without duplicates
    pub fn triggered_tracks(&self) -> Vec<TrackId> {
        let mut seen = Vec::new();
        for event in &self.triggers {
            if !seen.contains(&event.track_id) {
                seen.push(event.track_id);
            }
        }
        seen
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
        self.parameters.clear();
    }
}

impl InstrumentOutput for EventLog {
    fn trigger(&mut self, event: &TriggerEvent) -> Result<(), OutputError> {
        if self.unavailable.contains(&event.instrument) {
            return Err(OutputError::NotLoaded(event.instrument.clone()));
        }
        self.triggers.push(event.clone());
        Ok(())
    }
}

impl MixerOutput for EventLog {
    fn set_parameter(&mut self, event: &ParameterChangeEvent) -> Result<(), OutputError> {
        self.parameters.push(event.clone());
        Ok(())
    }
}

/// Drives a transport in fixed steps of `quantum` seconds
///
/// Produces the same sequencing decisions as a real-time timer would; a
/// quantum that is a power-of-two fraction of a second keeps times exact.
#[derive(Debug, Clone, Copy)]
pub struct OfflineRenderer {
    quantum: f64,
}

impl OfflineRenderer {
    /// Default quantum of 25 ms, the usual look-ahead timer interval
    pub const DEFAULT_QUANTUM: f64 = 0.025;

    pub fn new(quantum: f64) -> Self {
        let quantum = if quantum.is_finite() && quantum > 0.0 {
            quantum
        } else {
            Self::DEFAULT_QUANTUM
        };
        Self { quantum }
    }

    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    /// Render `duration` seconds into a fresh log
    ///
    /// The transport is started if it is stopped. Rendering ends early when
    /// the sequence completes.
    pub fn render(&self, transport: &mut Transport, duration: f64) -> EventLog {
        let mut log = EventLog::new();
        self.render_into(transport, duration, &mut log);
        log
    }

    /// Render into any output, returns how many quanta were processed
    pub fn render_into<O>(&self, transport: &mut Transport, duration: f64, output: &mut O) -> usize
    where
        O: InstrumentOutput + MixerOutput + ?Sized,
    {
        if !transport.is_playing() {
            // Either starts or resumes; already playing is fine too
            let _ = transport.play();
        }

        let start = transport.now();
        let quanta = (duration.max(0.0) / self.quantum).round() as usize;
        log::debug!(
            target: "sequencer",
            "Offline render: {:.3}s in {} quanta of {:.3}s",
            duration, quanta, self.quantum
        );

        // Time is derived from the index so no error accumulates
        let mut processed = 0;
        for i in 0..=quanta {
            let now = start + i as f64 * self.quantum;
            let report = transport.process_at(now, output);
            processed += 1;
            if report.complete {
                break;
            }
        }
        processed
    }
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUANTUM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sequencer::pattern::StepPattern;
    use crate::sequencer::track::TrackConfig;

    fn transport() -> (Transport, TrackId) {
        let config = EngineConfig {
            tempo_bpm: 120.0,
            steps_per_beat: 4,
            steps_per_bar: 16,
            total_bars: 2,
            ..EngineConfig::default()
        };
        let mut transport = Transport::from_config(&config).unwrap();
        let mut steps = [false; 16];
        steps[0] = true;
        steps[8] = true;
        let id = transport
            .sequencer_mut()
            .add_track(TrackConfig::new("Kick", "tr808").with_pattern(StepPattern::from_bools(&steps)))
            .unwrap();
        (transport, id)
    }

    #[test]
    fn test_render_is_deterministic() {
        let (mut a, id) = transport();
        let (mut b, _) = transport();

        let coarse = OfflineRenderer::new(0.25).render(&mut a, 4.0);
        let fine = OfflineRenderer::new(0.03125).render(&mut b, 4.0);

        // 2 bars of 2s, kick on steps 0 and 8 (every second)
        assert_eq!(coarse.trigger_times(id), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(coarse.trigger_times(id), fine.trigger_times(id));
    }

    #[test]
    fn test_unavailable_instrument_dropped() {
        let (mut transport, id) = transport();
        let mut log = EventLog::new();
        log.mark_unavailable("tr808");
        OfflineRenderer::new(0.25).render_into(&mut transport, 1.0, &mut log);
        assert!(log.trigger_times(id).is_empty());
    }

    #[test]
    fn test_invalid_quantum_falls_back() {
        assert_eq!(OfflineRenderer::new(0.0).quantum(), OfflineRenderer::DEFAULT_QUANTUM);
        assert_eq!(OfflineRenderer::new(f64::NAN).quantum(), OfflineRenderer::DEFAULT_QUANTUM);
    }
}
