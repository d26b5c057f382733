// Sequencer Player - Reads patterns and schedules triggers
// One clock drives every track; events are computed ahead and dispatched when due

use crate::config::EngineConfig;
use crate::instrument::InstrumentRef;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::automation::params;
use crate::sequencer::clock::{Clock, LoopRegion, StepAdvance};
use crate::sequencer::error::{SequencerError, SequencerResult};
use crate::sequencer::events::{
    InstrumentOutput, MixerOutput, ParameterChangeEvent, ScheduledEvent, TriggerEvent,
};
use crate::sequencer::observer::{ObserverRegistry, SequencerNotice, SubscriptionId};
use crate::sequencer::pattern::{PatternBank, StepPattern};
use crate::sequencer::scheduler::{LookaheadScheduler, TIME_EPSILON};
use crate::sequencer::timeline::{Position, StepGrid, Tempo};
use crate::sequencer::track::{Track, TrackConfig, TrackId, TrackSummary};
use ringbuf::traits::Producer;
use std::collections::HashMap;

/// Slack used when deciding the last step of a finished sequence has elapsed
const END_EPSILON: f64 = 1e-9;

/// What one `process` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Step markers released (UI position updates)
    pub steps: usize,
    /// Triggers accepted by the instrument output
    pub triggered: usize,
    /// Parameter changes accepted by the mixer output
    pub parameter_changes: usize,
    /// Triggers or parameter changes the outputs refused
    pub dropped: usize,
    /// The final bar has fully elapsed with looping disabled
    pub complete: bool,
}

/// Multi-track step sequencer
///
/// Owns the clock and the tracks. `process` fills the look-ahead queue up to
/// `now + schedule_ahead` and hands due events to the outputs. Track data is
/// only mutated through the methods below, between `process` calls, so a tick
/// always sees whole values.
pub struct Sequencer {
    clock: Clock,
    tracks: Vec<Track>,
    next_track_id: u64,
    max_tracks: usize,
    master_volume: f32,

    // Bank every track plays, a queued switch lands on the next bar
    bank: PatternBank,
    queued_bank: Option<PatternBank>,
    chain: Vec<PatternBank>,
    chain_position: usize,

    scheduler: LookaheadScheduler,

    // Last automation value handed to the mixer per (track, param)
    last_applied: HashMap<(TrackId, String), f32>,
    // The next scheduled step opens a bar, resolve automation for it
    enter_bar: bool,
    // Step most recently released to the outputs
    sounding: Option<Position>,

    observers: ObserverRegistry,
    notifications: Option<NotificationProducer>,
}

impl Sequencer {
    /// Create a sequencer from engine settings
    pub fn new(config: &EngineConfig) -> SequencerResult<Self> {
        let grid = StepGrid::new(config.steps_per_beat, config.steps_per_bar)?;
        let mut clock = Clock::new(Tempo::new(config.tempo_bpm)?, grid, config.total_bars)?;
        clock.set_loop_region(LoopRegion {
            enabled: config.loop_enabled,
            start: 0,
            end: config.total_bars,
        })?;

        clock.set_swing(config.swing)?;

        if config.max_tracks == 0 {
            return Err(SequencerError::invalid("max tracks must be > 0"));
        }

        Ok(Self {
            clock,
            tracks: Vec::new(),
            next_track_id: 1,
            max_tracks: config.max_tracks,
            master_volume: clamp_unit(config.master_volume, "master volume")?,
            bank: PatternBank::default(),
            queued_bank: None,
            chain: Vec::new(),
            chain_position: 0,
            scheduler: LookaheadScheduler::new(config.schedule_ahead_secs),
            last_applied: HashMap::new(),
            enter_bar: true,
            sounding: None,
            observers: ObserverRegistry::new(),
            notifications: None,
        })
    }

    /// Route recoverable warnings to a notification channel as well as the log
    pub fn set_notification_sender(&mut self, producer: NotificationProducer) {
        self.notifications = Some(producer);
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&SequencerNotice) + Send + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub(crate) fn notify(&mut self, notice: SequencerNotice) {
        self.observers.notify(&notice);
    }

    pub(crate) fn push_notification(&mut self, notification: Notification) {
        if let Some(producer) = self.notifications.as_mut() {
            // A full channel drops the notification, the log still has it
            let _ = producer.try_push(notification);
        }
    }

    // ---- Tracks ----

    /// Add a track at the end of the processing order
    ///
    /// Without a pattern the track gets an empty one of the current bar length.
    /// The pattern lands in the current bank.
    pub fn add_track(&mut self, config: TrackConfig) -> SequencerResult<TrackId> {
        let id = TrackId::new(self.next_track_id);
        self.insert_track(id, config)?;
        Ok(id)
    }

    /// Add a track under a known id (project restore)
    pub(crate) fn insert_track(&mut self, id: TrackId, mut config: TrackConfig) -> SequencerResult<()> {
        if self.tracks.len() >= self.max_tracks {
            return Err(SequencerError::invalid(format!(
                "track limit reached ({} tracks)",
                self.max_tracks
            )));
        }
        if self.tracks.iter().any(|track| track.id() == id) {
            return Err(SequencerError::invalid(format!("duplicate track id {}", id)));
        }

        let expected = self.steps_per_bar() as usize;
        let pattern = config
            .pattern
            .take()
            .unwrap_or_else(|| StepPattern::new(expected));
        let mismatch = std::iter::once(&pattern)
            .chain(config.bar_patterns.values())
            .find(|pattern| pattern.len() != expected);
        if let Some(pattern) = mismatch {
            return Err(SequencerError::LengthMismatch {
                expected,
                actual: pattern.len(),
            });
        }

        let track = Track::new(id, config, pattern, self.bank);
        log::info!(
            target: "sequencer",
            "Added {} '{}' -> {}",
            id, track.name(), track.instrument()
        );
        self.tracks.push(track);
        self.next_track_id = self.next_track_id.max(id.raw() + 1);
        self.notify(SequencerNotice::TrackAdded(id));
        Ok(())
    }

    /// Remove a track and cancel its pending events
    ///
    /// The returned track still names its instrument; releasing it is up to the caller.
    pub fn remove_track(&mut self, id: TrackId) -> SequencerResult<Track> {
        let index = self
            .tracks
            .iter()
            .position(|track| track.id() == id)
            .ok_or(SequencerError::UnknownTrack(id))?;

        let track = self.tracks.remove(index);
        let cancelled = self.scheduler.cancel_track(id);
        self.last_applied.retain(|(track_id, _), _| *track_id != id);
        log::info!(
            target: "sequencer",
            "Removed {} '{}' ({} pending events cancelled)",
            id, track.name(), cancelled
        );
        self.notify(SequencerNotice::TrackRemoved(id));
        Ok(track)
    }

    /// Remove every track, returns them in processing order
    pub fn clear_tracks(&mut self) -> Vec<Track> {
        let ids: Vec<TrackId> = self.tracks.iter().map(Track::id).collect();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(track) = self.remove_track(id) {
                removed.push(track);
            }
        }
        removed
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id() == id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    pub fn summaries(&self) -> Vec<TrackSummary> {
        self.tracks.iter().map(Track::summary).collect()
    }

    fn track_mut(&mut self, id: TrackId) -> SequencerResult<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id() == id)
            .ok_or(SequencerError::UnknownTrack(id))
    }

    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> SequencerResult<()> {
        self.track_mut(id)?.set_name(name.into());
        Ok(())
    }

    /// Point a track at another instrument; events already queued keep the old one
    pub fn set_instrument(&mut self, id: TrackId, instrument: InstrumentRef) -> SequencerResult<()> {
        self.track_mut(id)?.set_instrument(instrument);
        Ok(())
    }

    pub fn set_mute(&mut self, id: TrackId, muted: bool) -> SequencerResult<()> {
        self.track_mut(id)?.set_mute(muted);
        self.notify(SequencerNotice::MuteChanged { track: id, muted });
        Ok(())
    }

    /// Flip mute, returns the new flag
    pub fn toggle_mute(&mut self, id: TrackId) -> SequencerResult<bool> {
        let muted = !self.track_mut(id)?.is_muted();
        self.set_mute(id, muted)?;
        Ok(muted)
    }

    pub fn set_solo(&mut self, id: TrackId, soloed: bool) -> SequencerResult<()> {
        self.track_mut(id)?.set_solo(soloed);
        self.notify(SequencerNotice::SoloChanged { track: id, soloed });
        Ok(())
    }

    /// Flip solo, returns the new flag
    pub fn toggle_solo(&mut self, id: TrackId) -> SequencerResult<bool> {
        let soloed = !self.track_mut(id)?.is_soloed();
        self.set_solo(id, soloed)?;
        Ok(soloed)
    }

    /// True when at least one track is soloed
    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(Track::is_soloed)
    }

    pub fn set_volume(&mut self, id: TrackId, volume: f32) -> SequencerResult<f32> {
        self.track_mut(id)?.set_volume(volume)
    }

    pub fn set_pan(&mut self, id: TrackId, pan: f32) -> SequencerResult<f32> {
        self.track_mut(id)?.set_pan(pan)
    }

    pub fn toggle_step(&mut self, id: TrackId, index: usize) -> SequencerResult<f32> {
        self.track_mut(id)?.pattern_mut().toggle_step(index)
    }

    pub fn set_steps(&mut self, id: TrackId, steps: Vec<f32>) -> SequencerResult<()> {
        self.track_mut(id)?.pattern_mut().set_steps(steps)
    }

    pub fn set_step_velocity(&mut self, id: TrackId, index: usize, velocity: f32) -> SequencerResult<()> {
        self.track_mut(id)?.pattern_mut().set_velocity(index, velocity)
    }

    /// Replace the steps of one bank, current or not
    pub fn set_bank_steps(&mut self, id: TrackId, bank: PatternBank, steps: Vec<f32>) -> SequencerResult<()> {
        self.track_mut(id)?.bank_mut(bank).set_steps(steps)
    }

    /// Give a track its own pattern for `bar`
    ///
    /// Once a track has any per-bar pattern, bars without one are silent and
    /// the bank pattern is ignored for playback.
    pub fn set_bar_pattern(&mut self, id: TrackId, bar: u32, pattern: StepPattern) -> SequencerResult<()> {
        let expected = self.steps_per_bar() as usize;
        if pattern.len() != expected {
            return Err(SequencerError::LengthMismatch {
                expected,
                actual: pattern.len(),
            });
        }
        self.track_mut(id)?.set_bar_pattern(bar, pattern);
        Ok(())
    }

    pub fn remove_bar_pattern(&mut self, id: TrackId, bar: u32) -> SequencerResult<Option<StepPattern>> {
        Ok(self.track_mut(id)?.remove_bar_pattern(bar))
    }

    /// Back to bank playback, returns how many bar patterns went
    pub fn clear_bar_patterns(&mut self, id: TrackId) -> SequencerResult<usize> {
        Ok(self.track_mut(id)?.clear_bar_patterns())
    }

    pub fn schedule_automation(
        &mut self,
        id: TrackId,
        bar: u32,
        param: &str,
        value: f32,
    ) -> SequencerResult<()> {
        self.track_mut(id)?.schedule_automation(bar, param, value)
    }

    /// Drop every automation entry of `param` on a track, returns how many went
    pub fn clear_automation(&mut self, id: TrackId, param: &str) -> SequencerResult<usize> {
        let removed = self.track_mut(id)?.automation_mut().clear_param(param);
        self.last_applied.remove(&(id, param.to_string()));
        Ok(removed)
    }

    // ---- Global settings ----

    pub fn tempo(&self) -> Tempo {
        self.clock.tempo()
    }

    /// Change tempo from the next step on; steps already scheduled keep their times
    pub fn set_tempo(&mut self, bpm: f64) -> SequencerResult<()> {
        self.clock.set_tempo(bpm)?;
        log::debug!(target: "sequencer", "Tempo set to {:.2} BPM", bpm);
        self.notify(SequencerNotice::TempoChanged(bpm));
        Ok(())
    }

    pub fn swing(&self) -> f32 {
        self.clock.swing()
    }

    /// Clamped to [0, 1]; steps already scheduled keep their times
    pub fn set_swing(&mut self, amount: f32) -> SequencerResult<f32> {
        let swing = self.clock.set_swing(amount)?;
        log::debug!(target: "sequencer", "Swing set to {:.2}", swing);
        Ok(swing)
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Clamped to [0, 1], returns the stored value
    pub fn set_master_volume(&mut self, volume: f32) -> SequencerResult<f32> {
        self.master_volume = clamp_unit(volume, "master volume")?;
        Ok(self.master_volume)
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.clock.loop_region()
    }

    /// Set loop bounds in bars, `end` exclusive
    pub fn set_loop(&mut self, enabled: bool, start: u32, end: u32) -> SequencerResult<()> {
        self.clock.set_loop_region(LoopRegion { enabled, start, end })
    }

    pub fn total_bars(&self) -> u32 {
        self.clock.total_bars()
    }

    pub fn set_total_bars(&mut self, total_bars: u32) -> SequencerResult<()> {
        self.clock.set_total_bars(total_bars)
    }

    pub fn grid(&self) -> StepGrid {
        self.clock.grid()
    }

    pub fn steps_per_bar(&self) -> u32 {
        self.clock.grid().steps_per_bar
    }

    /// Change the bar length, resizing every pattern in the same call
    ///
    /// Patterns are truncated or extended with silent steps.
    pub fn set_steps_per_bar(&mut self, steps_per_bar: u32) -> SequencerResult<()> {
        let grid = StepGrid::new(self.clock.grid().steps_per_beat, steps_per_bar)?;
        for track in self.tracks.iter_mut() {
            track.resize_patterns(steps_per_bar as usize);
        }
        self.clock.set_grid(grid);
        log::debug!(target: "sequencer", "Grid changed to {}", grid);
        Ok(())
    }

    // ---- Pattern banks ----

    /// Bank the tracks are playing (and edits go to)
    pub fn current_bank(&self) -> PatternBank {
        self.bank
    }

    /// Switch waiting for the next bar
    pub fn queued_bank(&self) -> Option<PatternBank> {
        self.queued_bank
    }

    /// Switch every track to `bank` when the next bar starts
    ///
    /// While stopped the switch lands on the first bar played. An active
    /// chain takes precedence.
    pub fn switch_bank(&mut self, bank: PatternBank) {
        self.queued_bank = (bank != self.bank).then_some(bank);
    }

    /// Switch immediately, used when nothing is scheduled yet
    pub(crate) fn select_bank(&mut self, bank: PatternBank) {
        self.bank = bank;
        self.queued_bank = None;
        for track in self.tracks.iter_mut() {
            track.select_bank(bank);
        }
    }

    /// Copy `from` over `to` on every track
    pub fn copy_bank(&mut self, from: PatternBank, to: PatternBank) {
        if from == to {
            return;
        }
        for track in self.tracks.iter_mut() {
            track.copy_bank(from, to);
        }
        log::debug!(target: "sequencer", "Copied bank {} to {}", from, to);
    }

    /// Silence `bank` on every track
    pub fn clear_bank(&mut self, bank: PatternBank) {
        for track in self.tracks.iter_mut() {
            track.bank_mut(bank).clear();
        }
    }

    pub fn chain(&self) -> &[PatternBank] {
        &self.chain
    }

    /// Play `banks` one bar each, in order, wrapping at the end
    ///
    /// The chain starts over from its first bank on the next bar; an empty
    /// chain turns chaining off and keeps the current bank.
    pub fn set_chain(&mut self, banks: Vec<PatternBank>) {
        self.chain = banks;
        self.chain_position = 0;
        self.queued_bank = None;
    }

    // Resolve the bank of the bar about to be scheduled
    fn enter_bar_bank(&mut self) {
        let next = if self.chain.is_empty() {
            self.queued_bank.take()
        } else {
            let bank = self.chain[self.chain_position % self.chain.len()];
            self.chain_position = (self.chain_position + 1) % self.chain.len();
            Some(bank)
        };
        if let Some(bank) = next
            && bank != self.bank
        {
            self.select_bank(bank);
            log::debug!(target: "sequencer", "Bank {} from bar {}", bank, self.clock.position().bar + 1);
            self.notify(SequencerNotice::BankChanged(bank));
        }
    }

    pub fn schedule_ahead(&self) -> f64 {
        self.scheduler.schedule_ahead()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Events scheduled but not yet dispatched
    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.scheduler.pending()
    }

    /// Step currently sounding, or the next one to play when idle
    pub fn position(&self) -> Position {
        self.sounding.unwrap_or_else(|| self.clock.position())
    }

    // ---- Tick processing ----

    /// Schedule the events of the step the clock points at, then advance
    ///
    /// Triggers are pushed in track order; automation for a new bar follows
    /// them at the same timestamp. Bank switches land on the first step of a bar.
    /// Trigger gain uses the bar's volume automation when the track has any.
    pub fn process_step(&mut self) -> StepAdvance {
        let time = self.clock.next_step_time();
        let position = self.clock.position();
        self.scheduler.push(ScheduledEvent::Step { position, time });

        let entering = self.enter_bar;
        if entering {
            self.enter_bar_bank();
        }

        let any_solo = self.any_solo();
        let step = position.step as usize;
        for track in self.tracks.iter().filter(|track| track.is_eligible(any_solo)) {
            let Some(pattern) = track.pattern_for_bar(position.bar) else {
                continue;
            };
            let velocity = pattern.steps().get(step).copied().unwrap_or(0.0);
            let volume = track
                .resolve_automation(params::VOLUME, position.bar)
                .map_or(track.volume(), |value| value.clamp(0.0, 1.0));
            if velocity > 0.0 {
                self.scheduler.push(ScheduledEvent::Trigger(TriggerEvent {
                    track_id: track.id(),
                    instrument: track.instrument().clone(),
                    velocity,
                    gain: volume * self.master_volume,
                    pan: track.pan(),
                    position,
                    scheduled_time: time,
                }));
            }
        }

        if entering {
            self.enter_bar = false;
            self.schedule_bar_automation(position.bar, time);
        }

        let advance = self.clock.advance();
        if advance.bar_changed {
            self.enter_bar = true;
        }
        if advance.complete {
            log::debug!(target: "sequencer", "Last bar scheduled, clock halted");
        }
        advance
    }

    fn schedule_bar_automation(&mut self, bar: u32, time: f64) {
        for track in self.tracks.iter() {
            for param in track.automation().params() {
                let Some(value) = track.resolve_automation(param, bar) else {
                    continue;
                };
                let key = (track.id(), param.to_string());
                if self.last_applied.get(&key) == Some(&value) {
                    continue;
                }
                self.last_applied.insert(key, value);
                self.scheduler
                    .push(ScheduledEvent::Parameter(ParameterChangeEvent {
                        track_id: track.id(),
                        instrument: track.instrument().clone(),
                        param: param.to_string(),
                        value,
                        bar,
                        scheduled_time: time,
                    }));
            }
        }
    }

    /// Schedule up to `now + schedule_ahead` and dispatch everything due at `now`
    ///
    /// Output failures never stop the timeline: they become warnings and the
    /// remaining events are still dispatched.
    pub fn process<O>(&mut self, now: f64, output: &mut O) -> ProcessReport
    where
        O: InstrumentOutput + MixerOutput + ?Sized,
    {
        // Inclusive, so a step exactly at the horizon is scheduled now
        let horizon = self.scheduler.horizon(now) + TIME_EPSILON;
        while !self.clock.is_complete() && self.clock.next_step_time() <= horizon {
            self.process_step();
        }

        let mut report = ProcessReport::default();
        for event in self.scheduler.drain_due(now) {
            self.dispatch(event, output, &mut report);
        }

        report.complete = self.clock.is_complete()
            && self.scheduler.is_empty()
            && now + END_EPSILON >= self.clock.next_step_time();
        report
    }

    fn dispatch<O>(&mut self, event: ScheduledEvent, output: &mut O, report: &mut ProcessReport)
    where
        O: InstrumentOutput + MixerOutput + ?Sized,
    {
        match event {
            ScheduledEvent::Step { position, .. } => {
                self.sounding = Some(position);
                report.steps += 1;
                self.notify(SequencerNotice::Position(position));
            }
            ScheduledEvent::Trigger(trigger) => match output.trigger(&trigger) {
                Ok(()) => report.triggered += 1,
                Err(err) => {
                    report.dropped += 1;
                    log::warn!(
                        target: "sequencer",
                        "Dropped trigger for {} at {}: {}",
                        trigger.track_id, trigger.position, err
                    );
                    self.push_notification(Notification::warning(
                        NotificationCategory::Instrument,
                        format!("{} skipped: {}", trigger.instrument, err),
                    ));
                    self.notify(SequencerNotice::TriggerDropped {
                        track: trigger.track_id,
                        instrument: trigger.instrument,
                    });
                }
            },
            ScheduledEvent::Parameter(change) => match output.set_parameter(&change) {
                Ok(()) => report.parameter_changes += 1,
                Err(err) => {
                    report.dropped += 1;
                    log::warn!(
                        target: "sequencer",
                        "Parameter '{}' = {} on {} rejected: {}",
                        change.param, change.value, change.track_id, err
                    );
                    self.push_notification(Notification::warning(
                        NotificationCategory::Instrument,
                        format!("{} ignored '{}': {}", change.instrument, change.param, err),
                    ));
                }
            },
        }
    }

    // ---- Transport hooks ----

    /// Start the timeline at `now` from the current position
    pub(crate) fn start(&mut self, now: f64) {
        self.clock.start_at(now);
        self.enter_bar = true;
        self.sounding = None;
    }

    /// Cancel every pending event and rewind to the loop start
    pub(crate) fn halt(&mut self) {
        let cancelled = self.scheduler.cancel_all();
        if cancelled > 0 {
            log::debug!(target: "sequencer", "Cancelled {} pending events", cancelled);
        }
        let start_bar = self.clock.loop_region().start_bar();
        self.clock.reset_to(start_bar);
        self.last_applied.clear();
        self.chain_position = 0;
        self.enter_bar = true;
        self.sounding = None;
    }

    /// Push the future timeline later by `delta` seconds (resume after pause)
    pub(crate) fn shift_timeline(&mut self, delta: f64) {
        self.clock.shift(delta);
        self.scheduler.shift(delta);
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("clock", &self.clock)
            .field("tracks", &self.tracks.len())
            .field("master_volume", &self.master_volume)
            .field("bank", &self.bank)
            .field("chain", &self.chain)
            .field("pending", &self.scheduler.len())
            .field("observers", &self.observers)
            .finish()
    }
}

fn clamp_unit(value: f32, what: &str) -> SequencerResult<f32> {
    if !value.is_finite() {
        return Err(SequencerError::invalid(format!("{} must be finite", what)));
    }
    Ok(value.clamp(0.0, 1.0))
}
