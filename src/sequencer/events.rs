// Events - What the sequencer hands to its collaborators
// Triggers go to instruments, parameter changes go to the mixer

use crate::instrument::InstrumentRef;
use crate::sequencer::timeline::Position;
use crate::sequencer::track::TrackId;

/// Instruction to sound an instrument at a precise time
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    pub track_id: TrackId,
    pub instrument: InstrumentRef,
    /// Step velocity (0, 1]
    pub velocity: f32,
    /// Track volume times master volume
    pub gain: f32,
    pub pan: f32,
    pub position: Position,
    /// Absolute time in seconds, computed ahead of the driving timer
    pub scheduled_time: f64,
}

/// Automation value to push to the mixer
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChangeEvent {
    pub track_id: TrackId,
    pub instrument: InstrumentRef,
    pub param: String,
    pub value: f32,
    pub bar: u32,
    pub scheduled_time: f64,
}

/// Anything waiting in the look-ahead queue
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledEvent {
    /// Step boundary marker, drives UI position updates
    Step { position: Position, time: f64 },
    Trigger(TriggerEvent),
    Parameter(ParameterChangeEvent),
}

impl ScheduledEvent {
    pub fn time(&self) -> f64 {
        match self {
            ScheduledEvent::Step { time, .. } => *time,
            ScheduledEvent::Trigger(event) => event.scheduled_time,
            ScheduledEvent::Parameter(event) => event.scheduled_time,
        }
    }

    /// Owning track, `None` for step markers
    pub fn track_id(&self) -> Option<TrackId> {
        match self {
            ScheduledEvent::Step { .. } => None,
            ScheduledEvent::Trigger(event) => Some(event.track_id),
            ScheduledEvent::Parameter(event) => Some(event.track_id),
        }
    }

    pub(crate) fn shift(&mut self, delta: f64) {
        match self {
            ScheduledEvent::Step { time, .. } => *time += delta,
            ScheduledEvent::Trigger(event) => event.scheduled_time += delta,
            ScheduledEvent::Parameter(event) => event.scheduled_time += delta,
        }
    }
}

/// Collaborator failures, absorbed by the tick loop as warnings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutputError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(InstrumentRef),

    #[error("Instrument not loaded: {0}")]
    NotLoaded(InstrumentRef),

    #[error("Output rejected event: {0}")]
    Rejected(String),
}

/// Sound-producing collaborator
pub trait InstrumentOutput {
    /// Play `event.instrument` at `event.scheduled_time`
    fn trigger(&mut self, event: &TriggerEvent) -> Result<(), OutputError>;
}

/// Mixing collaborator
pub trait MixerOutput {
    fn set_parameter(&mut self, event: &ParameterChangeEvent) -> Result<(), OutputError>;
}

/// Two separate collaborators viewed as one output
pub struct OutputPair<'a, I: ?Sized, M: ?Sized> {
    pub instruments: &'a mut I,
    pub mixer: &'a mut M,
}

impl<'a, I: ?Sized, M: ?Sized> OutputPair<'a, I, M> {
    pub fn new(instruments: &'a mut I, mixer: &'a mut M) -> Self {
        Self { instruments, mixer }
    }
}

impl<I: InstrumentOutput + ?Sized, M: ?Sized> InstrumentOutput for OutputPair<'_, I, M> {
    fn trigger(&mut self, event: &TriggerEvent) -> Result<(), OutputError> {
        self.instruments.trigger(event)
    }
}

impl<I: ?Sized, M: MixerOutput + ?Sized> MixerOutput for OutputPair<'_, I, M> {
    fn set_parameter(&mut self, event: &ParameterChangeEvent) -> Result<(), OutputError> {
        self.mixer.set_parameter(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Triggers(Vec<f64>);

    impl InstrumentOutput for Triggers {
        fn trigger(&mut self, event: &TriggerEvent) -> Result<(), OutputError> {
            self.0.push(event.scheduled_time);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Params(Vec<String>);

    impl MixerOutput for Params {
        fn set_parameter(&mut self, event: &ParameterChangeEvent) -> Result<(), OutputError> {
            self.0.push(event.param.clone());
            Ok(())
        }
    }

    fn trigger_at(time: f64) -> TriggerEvent {
        TriggerEvent {
            track_id: TrackId::new(1),
            instrument: InstrumentRef::from("tr808"),
            velocity: 1.0,
            gain: 0.8,
            pan: 0.0,
            position: Position::zero(),
            scheduled_time: time,
        }
    }

    #[test]
    fn test_scheduled_event_accessors() {
        let mut event = ScheduledEvent::Trigger(trigger_at(1.5));
        assert_eq!(event.time(), 1.5);
        assert_eq!(event.track_id(), Some(TrackId::new(1)));

        event.shift(0.5);
        assert_eq!(event.time(), 2.0);

        let marker = ScheduledEvent::Step {
            position: Position::zero(),
            time: 0.0,
        };
        assert_eq!(marker.track_id(), None);
    }

    #[test]
    fn test_output_pair_delegates() {
        let mut triggers = Triggers::default();
        let mut params = Params::default();
        {
            let mut pair = OutputPair::new(&mut triggers, &mut params);
            pair.trigger(&trigger_at(0.25)).unwrap();
            pair.set_parameter(&ParameterChangeEvent {
                track_id: TrackId::new(1),
                instrument: InstrumentRef::from("tr808"),
                param: "volume".to_string(),
                value: 0.5,
                bar: 0,
                scheduled_time: 0.0,
            })
            .unwrap();
        }
        assert_eq!(triggers.0, vec![0.25]);
        assert_eq!(params.0, vec!["volume".to_string()]);
    }
}
