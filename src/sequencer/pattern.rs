// Pattern - Per-track step grid
// One bar of steps, each holding a velocity (0.0 = off)

use crate::sequencer::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default pattern length (one bar of 16th notes)
pub const DEFAULT_PATTERN_LENGTH: usize = 16;

/// Velocity a step gets when toggled on for the first time
const DEFAULT_VELOCITY: f32 = 1.0;

/// Pattern bank slot; every track holds one pattern per bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PatternBank {
    #[default]
    A,
    B,
    C,
    D,
}

impl PatternBank {
    pub const ALL: [PatternBank; 4] = [PatternBank::A, PatternBank::B, PatternBank::C, PatternBank::D];

    pub fn index(&self) -> usize {
        match self {
            PatternBank::A => 0,
            PatternBank::B => 1,
            PatternBank::C => 2,
            PatternBank::D => 3,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "A" => Some(PatternBank::A),
            "B" => Some(PatternBank::B),
            "C" => Some(PatternBank::C),
            "D" => Some(PatternBank::D),
            _ => None,
        }
    }
}

impl fmt::Display for PatternBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternBank::A => "A",
            PatternBank::B => "B",
            PatternBank::C => "C",
            PatternBank::D => "D",
        };
        f.write_str(name)
    }
}

/// Step pattern
///
/// Boolean patterns are velocity patterns whose "on" steps hold 1.0.
/// Toggling an active step off remembers its velocity so toggling it back
/// restores it.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPattern {
    steps: Vec<f32>,
    remembered: Vec<f32>,
}

impl StepPattern {
    /// Create an empty pattern of `length` steps
    pub fn new(length: usize) -> Self {
        Self {
            steps: vec![0.0; length],
            remembered: vec![DEFAULT_VELOCITY; length],
        }
    }

    /// Create from on/off flags
    pub fn from_bools(flags: &[bool]) -> Self {
        let steps: Vec<f32> = flags
            .iter()
            .map(|&on| if on { DEFAULT_VELOCITY } else { 0.0 })
            .collect();
        let remembered = vec![DEFAULT_VELOCITY; steps.len()];
        Self { steps, remembered }
    }

    /// Create from velocities, each in [0, 1]
    pub fn from_velocities(velocities: Vec<f32>) -> SequencerResult<Self> {
        check_velocities(&velocities)?;
        let remembered = velocities
            .iter()
            .map(|&v| if v > 0.0 { v } else { DEFAULT_VELOCITY })
            .collect();
        Ok(Self {
            steps: velocities,
            remembered,
        })
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the pattern has no steps at all
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All step velocities
    pub fn steps(&self) -> &[f32] {
        &self.steps
    }

    /// Number of steps with a velocity > 0
    pub fn active_count(&self) -> usize {
        self.steps.iter().filter(|&&v| v > 0.0).count()
    }

    fn check_index(&self, index: usize) -> SequencerResult<()> {
        if index >= self.steps.len() {
            return Err(SequencerError::IndexOutOfRange {
                index,
                length: self.steps.len(),
            });
        }
        Ok(())
    }

    /// Velocity at `index`, 0.0 when the step is off
    pub fn is_active(&self, index: usize) -> SequencerResult<f32> {
        self.check_index(index)?;
        Ok(self.steps[index])
    }

    /// Flip a step on/off, returns the new velocity
    pub fn toggle_step(&mut self, index: usize) -> SequencerResult<f32> {
        self.check_index(index)?;
        let current = self.steps[index];
        if current > 0.0 {
            self.remembered[index] = current;
            self.steps[index] = 0.0;
        } else {
            self.steps[index] = self.remembered[index];
        }
        Ok(self.steps[index])
    }

    /// Set a single step velocity
    pub fn set_velocity(&mut self, index: usize, velocity: f32) -> SequencerResult<()> {
        self.check_index(index)?;
        check_velocities(&[velocity])?;
        self.steps[index] = velocity;
        if velocity > 0.0 {
            self.remembered[index] = velocity;
        }
        Ok(())
    }

    /// Replace every step at once
    ///
    /// The new steps must have exactly the current length; on error nothing changes.
    pub fn set_steps(&mut self, new_steps: Vec<f32>) -> SequencerResult<()> {
        if new_steps.len() != self.steps.len() {
            return Err(SequencerError::LengthMismatch {
                expected: self.steps.len(),
                actual: new_steps.len(),
            });
        }
        *self = Self::from_velocities(new_steps)?;
        Ok(())
    }

    /// Turn every step off
    pub fn clear(&mut self) {
        for (step, remembered) in self.steps.iter_mut().zip(self.remembered.iter_mut()) {
            if *step > 0.0 {
                *remembered = *step;
            }
            *step = 0.0;
        }
    }

    /// Truncate or zero-extend to `length` steps
    pub(crate) fn resize(&mut self, length: usize) {
        self.steps.resize(length, 0.0);
        self.remembered.resize(length, DEFAULT_VELOCITY);
    }
}

impl Default for StepPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_LENGTH)
    }
}

fn check_velocities(velocities: &[f32]) -> SequencerResult<()> {
    if let Some(bad) = velocities
        .iter()
        .find(|v| !v.is_finite() || !(0.0..=1.0).contains(*v))
    {
        return Err(SequencerError::invalid(format!(
            "step velocity {} outside 0..=1",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let pattern = StepPattern::default();
        assert_eq!(pattern.len(), 16);
        assert_eq!(pattern.active_count(), 0);
        assert!(!pattern.is_empty());
    }

    #[test]
    fn test_from_bools() {
        let pattern = StepPattern::from_bools(&[true, false, false, true]);
        assert_eq!(pattern.is_active(0).unwrap(), 1.0);
        assert_eq!(pattern.is_active(1).unwrap(), 0.0);
        assert_eq!(pattern.is_active(3).unwrap(), 1.0);
        assert_eq!(pattern.active_count(), 2);
    }

    #[test]
    fn test_toggle_step() {
        let mut pattern = StepPattern::new(4);
        assert_eq!(pattern.toggle_step(2).unwrap(), 1.0);
        assert_eq!(pattern.toggle_step(2).unwrap(), 0.0);
    }

    #[test]
    fn test_toggle_restores_velocity() {
        let mut pattern = StepPattern::from_velocities(vec![0.6, 0.0, 0.3, 0.0]).unwrap();
        let original = pattern.clone();

        assert_eq!(pattern.toggle_step(0).unwrap(), 0.0);
        assert_eq!(pattern.toggle_step(0).unwrap(), 0.6);
        assert_eq!(pattern, original);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut pattern = StepPattern::new(16);
        assert_eq!(
            pattern.toggle_step(16),
            Err(SequencerError::IndexOutOfRange {
                index: 16,
                length: 16
            })
        );
        assert!(pattern.is_active(99).is_err());
    }

    #[test]
    fn test_set_steps_length_mismatch() {
        let mut pattern = StepPattern::new(16);
        let err = pattern.set_steps(vec![1.0; 8]).unwrap_err();
        assert_eq!(
            err,
            SequencerError::LengthMismatch {
                expected: 16,
                actual: 8
            }
        );
        assert_eq!(pattern.active_count(), 0);
    }

    #[test]
    fn test_set_steps_rejects_bad_velocity() {
        let mut pattern = StepPattern::new(2);
        assert!(pattern.set_steps(vec![0.5, 1.5]).is_err());
        assert!(pattern.set_steps(vec![f32::NAN, 0.0]).is_err());
        assert_eq!(pattern.steps(), &[0.0, 0.0]);

        pattern.set_steps(vec![0.5, 1.0]).unwrap();
        assert_eq!(pattern.steps(), &[0.5, 1.0]);
    }

    #[test]
    fn test_set_velocity() {
        let mut pattern = StepPattern::new(4);
        pattern.set_velocity(1, 0.25).unwrap();
        assert_eq!(pattern.is_active(1).unwrap(), 0.25);
        assert!(pattern.set_velocity(1, -0.1).is_err());
        assert!(pattern.set_velocity(4, 0.5).is_err());

        // Toggling off and on keeps the explicit velocity
        pattern.toggle_step(1).unwrap();
        assert_eq!(pattern.toggle_step(1).unwrap(), 0.25);
    }

    #[test]
    fn test_bank_names() {
        assert_eq!(PatternBank::from_name("c"), Some(PatternBank::C));
        assert_eq!(PatternBank::from_name("E"), None);
        assert_eq!(PatternBank::D.to_string(), "D");
        assert_eq!(PatternBank::B.index(), 1);
        assert_eq!(serde_json::to_string(&PatternBank::A).unwrap(), "\"A\"");
    }

    #[test]
    fn test_clear_and_resize() {
        let mut pattern = StepPattern::from_velocities(vec![0.7, 1.0, 0.0, 0.0]).unwrap();
        pattern.clear();
        assert_eq!(pattern.active_count(), 0);
        assert_eq!(pattern.toggle_step(0).unwrap(), 0.7);

        pattern.resize(8);
        assert_eq!(pattern.len(), 8);
        assert_eq!(pattern.is_active(7).unwrap(), 0.0);
        pattern.resize(2);
        assert_eq!(pattern.steps(), &[0.7, 0.0]);
    }
}
