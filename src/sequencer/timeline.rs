// Timeline - Musical time representation
// Tempo, step grid and the bar/beat/step position shown to the UI

use crate::sequencer::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    /// Lowest accepted tempo
    pub const MIN_BPM: f64 = 20.0;
    /// Highest accepted tempo
    pub const MAX_BPM: f64 = 999.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> SequencerResult<Self> {
        Self::check(bpm)?;
        Ok(Self { bpm })
    }

    fn check(bpm: f64) -> SequencerResult<()> {
        if !bpm.is_finite() || !(Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm) {
            return Err(SequencerError::invalid(format!(
                "tempo {} BPM outside {}..={}",
                bpm,
                Self::MIN_BPM,
                Self::MAX_BPM
            )));
        }
        Ok(())
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set BPM value, leaving the tempo untouched on error
    pub fn set_bpm(&mut self, bpm: f64) -> SequencerResult<()> {
        Self::check(bpm)?;
        self.bpm = bpm;
        Ok(())
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one step in seconds: 60 / bpm / steps_per_beat
    pub fn step_duration_seconds(&self, steps_per_beat: u32) -> f64 {
        60.0 / self.bpm / steps_per_beat as f64
    }

    /// Duration of one bar in seconds on the given grid
    pub fn bar_duration_seconds(&self, grid: &StepGrid) -> f64 {
        self.step_duration_seconds(grid.steps_per_beat) * grid.steps_per_bar as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl TryFrom<f64> for Tempo {
    type Error = SequencerError;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.bpm
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Step grid: how many steps make a beat and a bar
/// The default grid is 16th notes in 4/4 (4 steps per beat, 16 per bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGrid {
    pub steps_per_beat: u32,
    pub steps_per_bar: u32,
}

impl StepGrid {
    /// Creates a new grid, both sizes must be > 0
    pub fn new(steps_per_beat: u32, steps_per_bar: u32) -> SequencerResult<Self> {
        if steps_per_beat == 0 {
            return Err(SequencerError::invalid("steps per beat must be > 0"));
        }
        if steps_per_bar == 0 {
            return Err(SequencerError::invalid("steps per bar must be > 0"));
        }
        Ok(Self {
            steps_per_beat,
            steps_per_bar,
        })
    }

    /// 16th notes, one 4/4 bar
    pub fn sixteenths() -> Self {
        Self {
            steps_per_beat: 4,
            steps_per_bar: 16,
        }
    }

    /// Beat index of a step within its bar
    pub fn beat_of(&self, step: u32) -> u32 {
        step / self.steps_per_beat
    }
}

impl Default for StepGrid {
    fn default() -> Self {
        Self::sixteenths()
    }
}

impl fmt::Display for StepGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} steps/beat, {} steps/bar", self.steps_per_beat, self.steps_per_bar)
    }
}

/// Position in the sequence
/// All fields are 0-based; `Display` renders the 1-based form a UI shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub bar: u32,
    pub beat: u32,
    pub step: u32,
}

impl Position {
    /// Creates a position from bar and step, deriving the beat from the grid
    pub fn new(bar: u32, step: u32, grid: &StepGrid) -> Self {
        Self {
            bar,
            beat: grid.beat_of(step),
            step,
        }
    }

    /// Zero position (bar 0, beat 0, step 0)
    pub fn zero() -> Self {
        Self::default()
    }

    /// True for the first step of a bar
    pub fn is_bar_start(&self) -> bool {
        self.step == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.bar + 1, self.beat + 1, self.step + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.bpm(), 120.0);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);
        assert_eq!(tempo.step_duration_seconds(4), 0.125);
    }

    #[test]
    fn test_tempo_bounds() {
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(-10.0).is_err());
        assert!(Tempo::new(19.9).is_err());
        assert!(Tempo::new(1000.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(20.0).is_ok());
        assert!(Tempo::new(999.0).is_ok());
    }

    #[test]
    fn test_set_bpm_rejects_without_change() {
        let mut tempo = Tempo::default();
        assert!(matches!(
            tempo.set_bpm(5000.0),
            Err(SequencerError::InvalidParameter(_))
        ));
        assert_eq!(tempo.bpm(), 120.0);
    }

    #[test]
    fn test_step_duration_formula() {
        for bpm in [20.0, 60.0, 90.5, 130.0, 174.0, 999.0] {
            let tempo = Tempo::new(bpm).unwrap();
            for steps_per_beat in 1..=8 {
                let expected = 60.0 / bpm / steps_per_beat as f64;
                assert_eq!(tempo.step_duration_seconds(steps_per_beat), expected);
            }
        }
    }

    #[test]
    fn test_bar_duration() {
        let tempo = Tempo::new(120.0).unwrap();
        // 16 sixteenths at 120 BPM = 2 seconds
        assert_eq!(tempo.bar_duration_seconds(&StepGrid::sixteenths()), 2.0);
    }

    #[test]
    fn test_grid_validation() {
        assert!(StepGrid::new(0, 16).is_err());
        assert!(StepGrid::new(4, 0).is_err());
        let grid = StepGrid::new(3, 12).unwrap();
        assert_eq!(grid.beat_of(0), 0);
        assert_eq!(grid.beat_of(5), 1);
        assert_eq!(grid.beat_of(11), 3);
    }

    #[test]
    fn test_position_display() {
        let grid = StepGrid::sixteenths();
        let pos = Position::new(2, 9, &grid);
        assert_eq!(pos.beat, 2);
        assert_eq!(pos.to_string(), "3:03:10");
        assert!(Position::zero().is_bar_start());
    }

    #[test]
    fn test_tempo_serde() {
        let tempo = Tempo::new(128.0).unwrap();
        let json = serde_json::to_string(&tempo).unwrap();
        assert_eq!(json, "128.0");
        let back: Tempo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tempo);
        assert!(serde_json::from_str::<Tempo>("5.0").is_err());
    }
}
