// Track - One sequenced lane
// Pattern, mixer flags and automation for a single instrument reference

use crate::instrument::InstrumentRef;
use crate::sequencer::automation::Automation;
use crate::sequencer::error::{SequencerError, SequencerResult};
use crate::sequencer::pattern::{PatternBank, StepPattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable track identifier, unique within a sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Settings for a new track
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub name: String,
    pub instrument: InstrumentRef,
    pub volume: f32,
    pub pan: f32,
    /// Initial pattern, an empty one of the sequencer's bar length when `None`
    pub pattern: Option<StepPattern>,
    /// Per-bar patterns, see `Track`
    pub bar_patterns: BTreeMap<u32, StepPattern>,
}

impl TrackConfig {
    pub fn new(name: impl Into<String>, instrument: impl Into<InstrumentRef>) -> Self {
        Self {
            name: name.into(),
            instrument: instrument.into(),
            volume: 0.8,
            pan: 0.0,
            pattern: None,
            bar_patterns: BTreeMap::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: StepPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_bar_pattern(mut self, bar: u32, pattern: StepPattern) -> Self {
        self.bar_patterns.insert(bar, pattern);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }
}

/// Read-only overview of a track for UI lists
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub id: TrackId,
    pub name: String,
    pub instrument: InstrumentRef,
    pub volume: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    pub bank: PatternBank,
    /// Active steps of the current bank pattern
    pub active_steps: usize,
    /// Bars with their own pattern, 0 for bank-driven tracks
    pub arranged_bars: usize,
    pub automation_points: usize,
}

/// A sequenced track
///
/// The instrument is a back-reference only; removing the track leaves the
/// instrument for the caller to release.
///
/// A track plays the pattern of the selected bank, unless it has per-bar
/// patterns: then each bar plays its own pattern and bars without one are
/// silent.
#[derive(Debug, Clone)]
pub struct Track {
    id: TrackId,
    name: String,
    banks: [StepPattern; 4],
    bank: PatternBank,
    bar_patterns: BTreeMap<u32, StepPattern>,
    mute: bool,
    solo: bool,
    volume: f32,
    pan: f32,
    instrument: InstrumentRef,
    automation: Automation,
}

impl Track {
    /// `pattern` goes into `bank`; the other banks start empty
    pub(crate) fn new(
        id: TrackId,
        config: TrackConfig,
        pattern: StepPattern,
        bank: PatternBank,
    ) -> Self {
        let length = pattern.len();
        let mut banks: [StepPattern; 4] = std::array::from_fn(|_| StepPattern::new(length));
        banks[bank.index()] = pattern;
        let mut track = Self {
            id,
            name: config.name,
            banks,
            bank,
            bar_patterns: config.bar_patterns,
            mute: false,
            solo: false,
            volume: 0.0,
            pan: 0.0,
            instrument: config.instrument,
            automation: Automation::new(),
        };
        // Non-finite values fall back to the defaults
        track.volume = clamp_or(config.volume, 0.0, 1.0, 0.8);
        track.pan = clamp_or(config.pan, -1.0, 1.0, 0.0);
        track
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Pattern of the selected bank
    pub fn pattern(&self) -> &StepPattern {
        &self.banks[self.bank.index()]
    }

    pub(crate) fn pattern_mut(&mut self) -> &mut StepPattern {
        &mut self.banks[self.bank.index()]
    }

    pub fn current_bank(&self) -> PatternBank {
        self.bank
    }

    pub fn bank(&self, bank: PatternBank) -> &StepPattern {
        &self.banks[bank.index()]
    }

    pub(crate) fn bank_mut(&mut self, bank: PatternBank) -> &mut StepPattern {
        &mut self.banks[bank.index()]
    }

    pub(crate) fn select_bank(&mut self, bank: PatternBank) {
        self.bank = bank;
    }

    pub(crate) fn copy_bank(&mut self, from: PatternBank, to: PatternBank) {
        self.banks[to.index()] = self.banks[from.index()].clone();
    }

    /// Pattern of `bar` when the track has per-bar patterns
    pub fn bar_pattern(&self, bar: u32) -> Option<&StepPattern> {
        self.bar_patterns.get(&bar)
    }

    /// Per-bar patterns in bar order
    pub fn bar_patterns(&self) -> impl Iterator<Item = (u32, &StepPattern)> {
        self.bar_patterns.iter().map(|(&bar, pattern)| (bar, pattern))
    }

    /// True when bars play their own patterns instead of the bank
    pub fn is_arranged(&self) -> bool {
        !self.bar_patterns.is_empty()
    }

    /// Caller checks the length
    pub(crate) fn set_bar_pattern(&mut self, bar: u32, pattern: StepPattern) {
        self.bar_patterns.insert(bar, pattern);
    }

    pub(crate) fn remove_bar_pattern(&mut self, bar: u32) -> Option<StepPattern> {
        self.bar_patterns.remove(&bar)
    }

    pub(crate) fn clear_bar_patterns(&mut self) -> usize {
        let removed = self.bar_patterns.len();
        self.bar_patterns.clear();
        removed
    }

    /// Pattern that plays in `bar`, `None` when the bar is silent
    pub fn pattern_for_bar(&self, bar: u32) -> Option<&StepPattern> {
        if self.bar_patterns.is_empty() {
            Some(self.pattern())
        } else {
            self.bar_patterns.get(&bar)
        }
    }

    /// Truncate or zero-extend every pattern of the track
    pub(crate) fn resize_patterns(&mut self, length: usize) {
        for pattern in self
            .banks
            .iter_mut()
            .chain(self.bar_patterns.values_mut())
        {
            pattern.resize(length);
        }
    }

    pub fn instrument(&self) -> &InstrumentRef {
        &self.instrument
    }

    pub fn set_instrument(&mut self, instrument: InstrumentRef) {
        self.instrument = instrument;
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn is_soloed(&self) -> bool {
        self.solo
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Set volume, clamped to [0, 1]; returns the stored value
    ///
    /// Sliders overshoot while dragging, so finite values are clamped rather
    /// than rejected. NaN/infinity are rejected.
    pub fn set_volume(&mut self, volume: f32) -> SequencerResult<f32> {
        self.volume = clamp_finite(volume, 0.0, 1.0, "volume")?;
        Ok(self.volume)
    }

    /// Set pan, clamped to [-1, 1]; returns the stored value
    pub fn set_pan(&mut self, pan: f32) -> SequencerResult<f32> {
        self.pan = clamp_finite(pan, -1.0, 1.0, "pan")?;
        Ok(self.pan)
    }

    pub fn automation(&self) -> &Automation {
        &self.automation
    }

    pub(crate) fn automation_mut(&mut self) -> &mut Automation {
        &mut self.automation
    }

    /// Schedule an automation value; overwrites the same (bar, param)
    pub fn schedule_automation(&mut self, bar: u32, param: &str, value: f32) -> SequencerResult<()> {
        self.automation.schedule(bar, param, value)
    }

    /// Value in effect for `param` at `at_bar` (step function)
    pub fn resolve_automation(&self, param: &str, at_bar: u32) -> Option<f32> {
        self.automation.resolve(param, at_bar)
    }

    /// Whether this track may trigger given the solo state of the whole set
    ///
    /// Any solo silences every non-soloed track, and a soloed track plays
    /// even when muted.
    pub fn is_eligible(&self, any_solo: bool) -> bool {
        if any_solo { self.solo } else { !self.mute }
    }

    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            id: self.id,
            name: self.name.clone(),
            instrument: self.instrument.clone(),
            volume: self.volume,
            pan: self.pan,
            mute: self.mute,
            solo: self.solo,
            bank: self.bank,
            active_steps: self.pattern().active_count(),
            arranged_bars: self.bar_patterns.len(),
            automation_points: self.automation.len(),
        }
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, what: &str) -> SequencerResult<f32> {
    if !value.is_finite() {
        return Err(SequencerError::invalid(format!("{} must be finite", what)));
    }
    Ok(value.clamp(min, max))
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::automation::params;

    fn track() -> Track {
        Track::new(
            TrackId::new(1),
            TrackConfig::new("Bass", "tb303"),
            StepPattern::default(),
            PatternBank::A,
        )
    }

    #[test]
    fn test_track_defaults() {
        let track = track();
        assert_eq!(track.id(), TrackId::new(1));
        assert_eq!(track.name(), "Bass");
        assert_eq!(track.instrument().as_str(), "tb303");
        assert_eq!(track.volume(), 0.8);
        assert_eq!(track.pan(), 0.0);
        assert!(!track.is_muted());
        assert!(!track.is_soloed());
    }

    #[test]
    fn test_volume_pan_clamp() {
        let mut track = track();
        assert_eq!(track.set_volume(1.4).unwrap(), 1.0);
        assert_eq!(track.set_volume(-0.2).unwrap(), 0.0);
        assert_eq!(track.set_pan(-3.0).unwrap(), -1.0);
        assert_eq!(track.set_pan(0.25).unwrap(), 0.25);

        assert!(track.set_volume(f32::NAN).is_err());
        assert_eq!(track.volume(), 0.0);
    }

    #[test]
    fn test_config_values_clamped() {
        let track = Track::new(
            TrackId::new(2),
            TrackConfig::new("Lead", "arp2600")
                .with_volume(3.0)
                .with_pan(f32::NAN),
            StepPattern::default(),
            PatternBank::A,
        );
        assert_eq!(track.volume(), 1.0);
        assert_eq!(track.pan(), 0.0);
    }

    #[test]
    fn test_eligibility() {
        let mut track = track();
        assert!(track.is_eligible(false));

        track.set_mute(true);
        assert!(!track.is_eligible(false));
        assert!(!track.is_eligible(true));

        // Solo wins over mute
        track.set_solo(true);
        assert!(track.is_eligible(true));
    }

    #[test]
    fn test_automation_on_track() {
        let mut track = track();
        track.schedule_automation(10, params::CUTOFF, 0.3).unwrap();
        track.schedule_automation(20, params::CUTOFF, 0.8).unwrap();
        assert_eq!(track.resolve_automation(params::CUTOFF, 15), Some(0.3));
        assert_eq!(track.resolve_automation(params::CUTOFF, 25), Some(0.8));
        assert_eq!(track.resolve_automation(params::CUTOFF, 5), None);
    }

    #[test]
    fn test_summary() {
        let mut track = track();
        track.pattern_mut().toggle_step(0).unwrap();
        track.pattern_mut().toggle_step(8).unwrap();
        track.schedule_automation(0, params::VOLUME, 0.5).unwrap();

        let summary = track.summary();
        assert_eq!(summary.active_steps, 2);
        assert_eq!(summary.automation_points, 1);
        assert_eq!(summary.name, "Bass");
    }

    #[test]
    fn test_banks() {
        let mut track = Track::new(
            TrackId::new(3),
            TrackConfig::new("Kick", "tr808"),
            StepPattern::from_bools(&[true, false, false, false]),
            PatternBank::B,
        );
        assert_eq!(track.current_bank(), PatternBank::B);
        assert_eq!(track.pattern().active_count(), 1);
        assert_eq!(track.bank(PatternBank::A).active_count(), 0);

        track.copy_bank(PatternBank::B, PatternBank::C);
        track.select_bank(PatternBank::C);
        assert_eq!(track.pattern().steps(), &[1.0, 0.0, 0.0, 0.0]);

        track.bank_mut(PatternBank::C).clear();
        assert_eq!(track.bank(PatternBank::B).active_count(), 1);
        assert_eq!(track.summary().bank, PatternBank::C);
    }

    #[test]
    fn test_bar_patterns_silence_other_bars() {
        let mut track = track();
        track.pattern_mut().toggle_step(0).unwrap();
        assert!(track.pattern_for_bar(5).is_some());

        let mut fill = StepPattern::default();
        fill.toggle_step(15).unwrap();
        track.set_bar_pattern(2, fill.clone());
        assert!(track.is_arranged());
        assert_eq!(track.pattern_for_bar(2), Some(&fill));
        assert_eq!(track.pattern_for_bar(0), None);

        track.resize_patterns(8);
        assert_eq!(track.bar_pattern(2).map(|p| p.len()), Some(8));
        assert_eq!(track.bank(PatternBank::D).len(), 8);

        assert_eq!(track.clear_bar_patterns(), 1);
        assert_eq!(track.pattern_for_bar(0).map(|p| p.active_count()), Some(1));
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(TrackId::new(7).to_string(), "track-7");
        assert_eq!(serde_json::to_string(&TrackId::new(7)).unwrap(), "7");
    }
}
