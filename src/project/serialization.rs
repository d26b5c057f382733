// Serialization utilities for project persistence

use crate::config::EngineConfig;
use crate::project::ProjectError;
use crate::project::types::*;
use crate::sequencer::automation::AutomationPoint;
use crate::sequencer::pattern::{PatternBank, StepPattern};
use crate::sequencer::player::Sequencer;
use crate::sequencer::track::TrackConfig;
use ron::ser::PrettyConfig;

/// Serialize project state to RON format
pub fn serialize_to_ron(state: &ProjectState) -> Result<String, ProjectError> {
    ron::ser::to_string_pretty(state, PrettyConfig::default()).map_err(|e| {
        ProjectError::SerializationError(format!("Failed to serialize to RON: {}", e))
    })
}

/// Deserialize project state from RON format
pub fn deserialize_from_ron(ron_data: &str) -> Result<ProjectState, ProjectError> {
    ron::from_str(ron_data).map_err(|e| {
        ProjectError::SerializationError(format!("Failed to deserialize from RON: {}", e))
    })
}

/// Serialize project state to JSON (the layout web clients exchange)
pub fn serialize_to_json(state: &ProjectState) -> Result<String, ProjectError> {
    Ok(serde_json::to_string(state)?)
}

pub fn deserialize_from_json(json_data: &str) -> Result<ProjectState, ProjectError> {
    Ok(serde_json::from_str(json_data)?)
}

/// Serialize project metadata to JSON format
pub fn serialize_metadata_to_json(metadata: &ProjectMetadata) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(metadata)?)
}

/// Deserialize project metadata from JSON format
pub fn deserialize_metadata_from_json(json_data: &str) -> Result<ProjectMetadata, ProjectError> {
    Ok(serde_json::from_str(json_data)?)
}

impl Sequencer {
    /// Capture tracks, patterns, automation, tempo and loop bounds
    ///
    /// A bank switch still waiting for its bar is saved as the current bank.
    pub fn snapshot(&self) -> ProjectState {
        let region = self.loop_region();
        let grid = self.grid();
        let bank = self.queued_bank().unwrap_or(self.current_bank());
        ProjectState {
            tempo_bpm: self.tempo().bpm(),
            steps_per_beat: grid.steps_per_beat,
            steps_per_bar: grid.steps_per_bar,
            total_bars: self.total_bars(),
            loop_enabled: region.enabled,
            loop_start: region.start,
            loop_end: region.end,
            master_volume: self.master_volume(),
            swing: self.swing(),
            current_bank: bank,
            chain: self.chain().to_vec(),
            tracks: self
                .tracks()
                .iter()
                .map(|track| TrackState {
                    id: track.id(),
                    name: track.name().to_string(),
                    pattern_steps: track.bank(bank).steps().to_vec(),
                    banks: PatternBank::ALL
                        .into_iter()
                        .filter(|&other| other != bank && track.bank(other).active_count() > 0)
                        .map(|other| BankSteps {
                            bank: other,
                            steps: track.bank(other).steps().to_vec(),
                        })
                        .collect(),
                    bar_patterns: track
                        .bar_patterns()
                        .map(|(bar, pattern)| BarSteps {
                            bar,
                            steps: pattern.steps().to_vec(),
                        })
                        .collect(),
                    mute: track.is_muted(),
                    solo: track.is_soloed(),
                    volume: track.volume(),
                    pan: track.pan(),
                    instrument_ref: track.instrument().clone(),
                    automation: track.automation().points(),
                })
                .collect(),
            ..ProjectState::default()
        }
    }

    /// Rebuild a stopped sequencer from a saved state
    ///
    /// Track ids, order, patterns and automation are restored as saved, so the
    /// rebuilt sequencer makes the same playback decisions. Scheduling settings
    /// (look-ahead, track limit) come from `config`.
    pub fn from_project(state: &ProjectState, config: &EngineConfig) -> Result<Self, ProjectError> {
        crate::project::validate_project_structure(state)?;

        let engine = EngineConfig {
            tempo_bpm: state.tempo_bpm,
            steps_per_beat: state.steps_per_beat,
            steps_per_bar: state.steps_per_bar,
            total_bars: state.total_bars,
            loop_enabled: state.loop_enabled,
            master_volume: state.master_volume,
            swing: state.swing,
            max_tracks: config.max_tracks.max(state.tracks.len()),
            ..config.clone()
        };
        let mut seq = Sequencer::new(&engine)?;
        seq.set_loop(state.loop_enabled, state.loop_start, state.loop_end)?;
        seq.select_bank(state.current_bank);
        seq.set_chain(state.chain.clone());

        for track in &state.tracks {
            let track_config = TrackConfig::new(track.name.clone(), track.instrument_ref.clone())
                .with_volume(track.volume)
                .with_pan(track.pan)
                .with_pattern(StepPattern::from_velocities(track.pattern_steps.clone())?);
            seq.insert_track(track.id, track_config)?;
            seq.set_mute(track.id, track.mute)?;
            seq.set_solo(track.id, track.solo)?;
            for BankSteps { bank, steps } in &track.banks {
                seq.set_bank_steps(track.id, *bank, steps.clone())?;
            }
            for BarSteps { bar, steps } in &track.bar_patterns {
                seq.set_bar_pattern(track.id, *bar, StepPattern::from_velocities(steps.clone())?)?;
            }
            for AutomationPoint { bar, param, value } in &track.automation {
                seq.schedule_automation(track.id, *bar, param, *value)?;
            }
        }

        log::info!(
            target: "project",
            "Restored '{}': {} tracks at {:.1} BPM",
            state.name, state.tracks.len(), state.tempo_bpm
        );
        Ok(seq)
    }
}
