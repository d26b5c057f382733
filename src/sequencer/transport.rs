// Transport - Playback control and state management
// Play/pause/stop state machine around the sequencer, driven by an external time source

use crate::config::EngineConfig;
use crate::messaging::channels::CommandConsumer;
use crate::messaging::command::Command;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::error::{SequencerError, SequencerResult};
use crate::sequencer::events::{InstrumentOutput, MixerOutput};
use crate::sequencer::observer::{SequencerNotice, SubscriptionId};
use crate::sequencer::player::{ProcessReport, Sequencer};
use crate::sequencer::timeline::Position;
use ringbuf::traits::Consumer;

/// Transport state (play/pause/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// Check if transport is stopped or paused
    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped | TransportState::Paused)
    }
}

/// Transport - owns the sequencer, not the audio hardware
///
/// Time only moves through `process_at` / `advance`, so a real-time timer, an
/// audio callback and the offline renderer all drive it the same way.
/// Transitions that would do nothing return `AlreadyPlaying` / `NotPlaying`.
#[derive(Debug)]
pub struct Transport {
    state: TransportState,
    sequencer: Sequencer,
    /// Last time seen from the driver, in seconds
    now: f64,
    paused_at: Option<f64>,
}

impl Transport {
    pub fn new(sequencer: Sequencer) -> Self {
        Self {
            state: TransportState::Stopped,
            sequencer,
            now: 0.0,
            paused_at: None,
        }
    }

    /// Build a sequencer from `config` and wrap it
    pub fn from_config(config: &EngineConfig) -> SequencerResult<Self> {
        Ok(Self::new(Sequencer::new(config)?))
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    /// Give the sequencer back, stopping playback first
    pub fn into_sequencer(mut self) -> Sequencer {
        self.sequencer.halt();
        self.sequencer
    }

    /// Current driver time in seconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Position for UI display (bar, beat, step)
    pub fn position(&self) -> Position {
        self.sequencer.position()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SequencerNotice) + Send + 'static,
    {
        self.sequencer.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.sequencer.unsubscribe(id)
    }

    fn set_state(&mut self, state: TransportState) {
        if self.state != state {
            log::info!(target: "transport", "{:?} -> {:?} at {:.3}s", self.state, state, self.now);
            self.state = state;
            self.sequencer.notify(SequencerNotice::TransportChanged(state));
        }
    }

    /// Start playback; while paused this resumes
    pub fn play(&mut self) -> SequencerResult<()> {
        match self.state {
            TransportState::Playing => Err(SequencerError::AlreadyPlaying),
            TransportState::Paused => self.resume(),
            TransportState::Stopped => {
                self.sequencer.start(self.now);
                self.set_state(TransportState::Playing);
                Ok(())
            }
        }
    }

    /// Freeze playback; pending events stay queued
    pub fn pause(&mut self) -> SequencerResult<()> {
        if self.state != TransportState::Playing {
            return Err(SequencerError::NotPlaying);
        }
        self.paused_at = Some(self.now);
        self.set_state(TransportState::Paused);
        Ok(())
    }

    /// Continue after pause, moving the remaining timeline by the time spent paused
    pub fn resume(&mut self) -> SequencerResult<()> {
        match self.state {
            TransportState::Playing => Err(SequencerError::AlreadyPlaying),
            TransportState::Stopped => Err(SequencerError::NotPlaying),
            TransportState::Paused => {
                let paused_for = self.now - self.paused_at.take().unwrap_or(self.now);
                if paused_for > 0.0 {
                    self.sequencer.shift_timeline(paused_for);
                }
                self.set_state(TransportState::Playing);
                Ok(())
            }
        }
    }

    /// Stop, cancel pending events and rewind to the loop start
    ///
    /// Safe to call repeatedly.
    pub fn stop(&mut self) -> SequencerResult<()> {
        self.sequencer.halt();
        self.paused_at = None;
        self.set_state(TransportState::Stopped);
        Ok(())
    }

    /// Play when stopped/paused, pause when playing
    pub fn toggle_play(&mut self) -> SequencerResult<()> {
        if self.state.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Drive the timeline to absolute time `now`
    ///
    /// Time never goes backwards; an earlier `now` is treated as the last one.
    pub fn process_at<O>(&mut self, now: f64, output: &mut O) -> ProcessReport
    where
        O: InstrumentOutput + MixerOutput + ?Sized,
    {
        if now.is_finite() && now > self.now {
            self.now = now;
        }
        if self.state != TransportState::Playing {
            return ProcessReport::default();
        }

        let report = self.sequencer.process(self.now, output);
        if report.complete {
            log::info!(target: "transport", "Sequence complete at {:.3}s", self.now);
            self.sequencer.notify(SequencerNotice::SequenceComplete);
            self.sequencer.halt();
            self.set_state(TransportState::Stopped);
        }
        report
    }

    /// Drive the timeline forward by `delta` seconds
    pub fn advance<O>(&mut self, delta: f64, output: &mut O) -> ProcessReport
    where
        O: InstrumentOutput + MixerOutput + ?Sized,
    {
        let now = self.now + delta.max(0.0);
        self.process_at(now, output)
    }

    /// Apply one queued request on the owner thread
    pub fn apply_command(&mut self, command: Command) -> SequencerResult<()> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            edit => apply_edit(&mut self.sequencer, edit),
        }
    }

    /// Apply every queued command, returns how many were taken off the queue
    ///
    /// Call between ticks so a tick never sees a half-applied change. Nobody is
    /// waiting on the result, so failures are logged and pushed as notifications.
    pub fn drain_commands(&mut self, commands: &mut CommandConsumer) -> usize {
        let mut applied = 0;
        while let Some(command) = commands.try_pop() {
            applied += 1;
            let label = command.label();
            match self.apply_command(command) {
                Ok(()) => {}
                Err(err) if err.is_transport_notice() => {
                    log::debug!(target: "transport", "{} ignored: {}", label, err);
                }
                Err(err) => {
                    log::warn!(target: "transport", "{} failed: {}", label, err);
                    self.sequencer.push_notification(Notification::warning(
                        NotificationCategory::Command,
                        format!("{} failed: {}", label, err),
                    ));
                }
            }
        }
        applied
    }
}

fn apply_edit(seq: &mut Sequencer, command: Command) -> SequencerResult<()> {
    match command {
        Command::SetTempo(bpm) => seq.set_tempo(bpm),
        Command::SetSwing(amount) => seq.set_swing(amount).map(|_| ()),
        Command::ToggleStep { track, index } => seq.toggle_step(track, index).map(|_| ()),
        Command::SetSteps { track, steps } => seq.set_steps(track, steps),
        Command::SetStepVelocity {
            track,
            index,
            velocity,
        } => seq.set_step_velocity(track, index, velocity),
        Command::SetMute { track, muted } => seq.set_mute(track, muted),
        Command::SetSolo { track, soloed } => seq.set_solo(track, soloed),
        Command::SetVolume { track, volume } => seq.set_volume(track, volume).map(|_| ()),
        Command::SetPan { track, pan } => seq.set_pan(track, pan).map(|_| ()),
        Command::SetMasterVolume(volume) => seq.set_master_volume(volume).map(|_| ()),
        Command::ScheduleAutomation {
            track,
            bar,
            param,
            value,
        } => seq.schedule_automation(track, bar, &param, value),
        Command::ClearAutomation { track, param } => {
            seq.clear_automation(track, &param).map(|_| ())
        }
        Command::SetLoop {
            enabled,
            start,
            end,
        } => seq.set_loop(enabled, start, end),
        Command::SwitchBank(bank) => {
            seq.switch_bank(bank);
            Ok(())
        }
        Command::SetChain(banks) => {
            seq.set_chain(banks);
            Ok(())
        }
        Command::CopyBank { from, to } => {
            seq.copy_bank(from, to);
            Ok(())
        }
        Command::ClearBank(bank) => {
            seq.clear_bank(bank);
            Ok(())
        }
        Command::SetBankSteps { track, bank, steps } => seq.set_bank_steps(track, bank, steps),
        Command::Play | Command::Pause | Command::Resume | Command::Stop => Ok(()),
    }
}
