// Clock - Step clock shared by every track
// Converts tempo into step durations and advances the bar/step counter

use crate::sequencer::error::{SequencerError, SequencerResult};
use crate::sequencer::timeline::{Position, StepGrid, Tempo};

/// Loop region in bars, `end` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    pub enabled: bool,
    pub start: u32,
    pub end: u32,
}

impl LoopRegion {
    /// Loop over the whole sequence
    pub fn whole(total_bars: u32) -> Self {
        Self {
            enabled: true,
            start: 0,
            end: total_bars,
        }
    }

    /// Bar the transport returns to on stop
    pub fn start_bar(&self) -> u32 {
        if self.enabled { self.start } else { 0 }
    }

    fn check(&self, total_bars: u32) -> SequencerResult<()> {
        if self.start >= self.end {
            return Err(SequencerError::invalid(format!(
                "loop start {} must be before loop end {}",
                self.start, self.end
            )));
        }
        if self.end > total_bars {
            return Err(SequencerError::invalid(format!(
                "loop end {} beyond sequence length {} bars",
                self.end, total_bars
            )));
        }
        Ok(())
    }
}

/// Result of advancing the clock by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAdvance {
    /// Position the clock now points at
    pub position: Position,
    /// The advance crossed into a new bar
    pub bar_changed: bool,
    /// The advance jumped from the loop end back to the loop start
    pub looped: bool,
    /// The final bar finished with looping disabled; the clock halted
    pub complete: bool,
}

/// Step clock
///
/// The clock always points at the next step to be played. Step start times are
/// derived from an anchor (time, step count) rather than summed durations, so a
/// tempo change re-anchors at the next step boundary and never rewrites the
/// times of steps already handed out.
///
/// Swing delays every odd step of a bar by up to half a step; the bar length
/// and the even steps stay on the grid.
#[derive(Debug, Clone)]
pub struct Clock {
    tempo: Tempo,
    grid: StepGrid,
    total_bars: u32,
    loop_region: LoopRegion,
    /// 0 = straight, 1 = odd steps half a step late
    swing: f32,

    current_bar: u32,
    current_step: u32,
    complete: bool,

    // Time of the step the anchor refers to, and steps advanced since then
    anchor_time: f64,
    steps_since_anchor: u64,

    // Elapsed time not yet converted into steps (accumulator driver)
    accumulated: f64,
}

impl Clock {
    /// Create a clock, `total_bars` must be > 0. Looping covers the whole sequence.
    pub fn new(tempo: Tempo, grid: StepGrid, total_bars: u32) -> SequencerResult<Self> {
        if total_bars == 0 {
            return Err(SequencerError::invalid("total bars must be > 0"));
        }
        Ok(Self {
            tempo,
            grid,
            total_bars,
            loop_region: LoopRegion::whole(total_bars),
            swing: 0.0,
            current_bar: 0,
            current_step: 0,
            complete: false,
            anchor_time: 0.0,
            steps_since_anchor: 0,
            accumulated: 0.0,
        })
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn grid(&self) -> StepGrid {
        self.grid
    }

    pub fn total_bars(&self) -> u32 {
        self.total_bars
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.loop_region
    }

    pub fn current_bar(&self) -> u32 {
        self.current_bar
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Position of the next step to be played
    pub fn position(&self) -> Position {
        Position::new(self.current_bar, self.current_step, &self.grid)
    }

    /// True once the last bar finished with looping disabled
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Duration of one step in seconds
    pub fn step_duration_seconds(&self) -> f64 {
        self.tempo.step_duration_seconds(self.grid.steps_per_beat)
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    /// Set swing, clamped to [0, 1]; returns the stored value
    ///
    /// Only steps not yet handed out are affected.
    pub fn set_swing(&mut self, amount: f32) -> SequencerResult<f32> {
        if !amount.is_finite() {
            return Err(SequencerError::invalid("swing must be finite"));
        }
        self.swing = amount.clamp(0.0, 1.0);
        Ok(self.swing)
    }

    /// Delay applied to `step` by the current swing amount
    pub fn swing_offset(&self, step: u32) -> f64 {
        if step % 2 == 1 {
            f64::from(self.swing) * 0.5 * self.step_duration_seconds()
        } else {
            0.0
        }
    }

    /// Scheduled start time of the step the clock points at, swing included
    pub fn next_step_time(&self) -> f64 {
        self.grid_time() + self.swing_offset(self.current_step)
    }

    // Unswung start time of the current step
    fn grid_time(&self) -> f64 {
        self.anchor_time + self.steps_since_anchor as f64 * self.step_duration_seconds()
    }

    /// Change tempo
    ///
    /// Rejects out-of-range values without touching the clock. The step in
    /// progress keeps its old duration; every later step uses the new one.
    /// The current step counter is not reset.
    pub fn set_tempo(&mut self, bpm: f64) -> SequencerResult<()> {
        let tempo = Tempo::new(bpm)?;
        self.anchor_time = self.grid_time();
        self.steps_since_anchor = 0;
        self.tempo = tempo;
        Ok(())
    }

    /// Set loop region; `end` is exclusive and must not exceed the sequence length
    pub fn set_loop_region(&mut self, region: LoopRegion) -> SequencerResult<()> {
        region.check(self.total_bars)?;
        self.loop_region = region;
        Ok(())
    }

    /// Change the sequence length, shrinking the loop end with it
    pub fn set_total_bars(&mut self, total_bars: u32) -> SequencerResult<()> {
        if total_bars == 0 {
            return Err(SequencerError::invalid("total bars must be > 0"));
        }
        let mut region = self.loop_region;
        region.end = region.end.min(total_bars);
        if region.start >= region.end {
            region.start = 0;
        }
        self.total_bars = total_bars;
        self.loop_region = region;
        if self.current_bar >= total_bars {
            self.current_bar = region.start_bar();
            self.current_step = 0;
        }
        Ok(())
    }

    /// Replace the step grid, wrapping the current step into the new bar length
    pub(crate) fn set_grid(&mut self, grid: StepGrid) {
        self.anchor_time = self.grid_time();
        self.steps_since_anchor = 0;
        self.grid = grid;
        if self.current_step >= grid.steps_per_bar {
            self.current_step = 0;
        }
    }

    /// Start counting from `time` at the current position
    pub fn start_at(&mut self, time: f64) {
        self.anchor_time = time;
        self.steps_since_anchor = 0;
        self.accumulated = 0.0;
        self.complete = false;
    }

    /// Move the whole future timeline later by `delta` seconds (pause/resume)
    pub fn shift(&mut self, delta: f64) {
        self.anchor_time += delta;
    }

    /// Rewind to the first step of `bar`
    pub fn reset_to(&mut self, bar: u32) {
        self.current_bar = bar.min(self.total_bars.saturating_sub(1));
        self.current_step = 0;
        self.complete = false;
        self.accumulated = 0.0;
        self.anchor_time = 0.0;
        self.steps_since_anchor = 0;
    }

    /// Advance by exactly one step, handling bar and loop wraparound
    pub fn advance(&mut self) -> StepAdvance {
        if self.complete {
            return StepAdvance {
                position: self.position(),
                bar_changed: false,
                looped: false,
                complete: true,
            };
        }

        self.steps_since_anchor += 1;
        self.current_step += 1;

        let mut bar_changed = false;
        let mut looped = false;

        if self.current_step >= self.grid.steps_per_bar {
            self.current_step = 0;
            self.current_bar += 1;
            bar_changed = true;

            let region = self.loop_region;
            if region.enabled && self.current_bar >= region.end {
                self.current_bar = region.start;
                looped = true;
            } else if !region.enabled && self.current_bar >= self.total_bars {
                // Halt on the last bar; the transport stops and rewinds
                self.current_bar = self.total_bars - 1;
                self.current_step = self.grid.steps_per_bar - 1;
                self.complete = true;
            }
        }

        StepAdvance {
            position: self.position(),
            bar_changed,
            looped,
            complete: self.complete,
        }
    }

    /// Advance time by one scheduling quantum
    ///
    /// Accumulator driver for hosts that only know elapsed time, not an
    /// absolute clock; `Sequencer::process` uses `next_step_time` instead.
    /// Elapsed time accumulates; once it covers a step duration the clock moves
    /// one step and the remainder is kept. A quantum longer than a step leaves
    /// time in the accumulator, drained by further calls (a zero delta works).
    /// Swing shifts scheduled times only and does not change when `tick` advances.
    pub fn tick(&mut self, delta_seconds: f64) -> Option<StepAdvance> {
        if self.complete {
            return None;
        }
        self.accumulated += delta_seconds.max(0.0);
        let duration = self.step_duration_seconds();
        if self.accumulated >= duration {
            self.accumulated -= duration;
            Some(self.advance())
        } else {
            None
        }
    }
}
