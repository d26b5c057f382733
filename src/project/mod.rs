// Project persistence
// Plain-data snapshots of a sequencer, stored as JSON documents or ZIP archives

pub mod manager;
pub mod serialization;
pub mod types;

pub use manager::{ArchiveProjectStore, MemoryProjectStore, ProjectError, ProjectStore};
pub use serialization::{
    deserialize_from_json, deserialize_from_ron, serialize_to_json, serialize_to_ron,
};
pub use types::{
    BankSteps, BarSteps, ProjectId, ProjectMetadata, ProjectState, ProjectVersion, TrackState,
};

use crate::sequencer::timeline::Tempo;
use crate::sequencer::track::TrackId;
use std::collections::HashSet;

fn invalid(message: impl Into<String>) -> ProjectError {
    ProjectError::InvalidStructure(message.into())
}

fn check_steps(track: TrackId, what: &str, steps: &[f32], expected: u32) -> Result<(), ProjectError> {
    if steps.len() != expected as usize {
        return Err(invalid(format!(
            "Track {} {} has {} steps, expected {}",
            track,
            what,
            steps.len(),
            expected
        )));
    }
    if steps.iter().any(|velocity| !(0.0..=1.0).contains(velocity)) {
        return Err(invalid(format!(
            "Track {} {} has a step velocity outside 0..=1",
            track, what
        )));
    }
    Ok(())
}

/// Helper function to validate project structure
pub fn validate_project_structure(state: &ProjectState) -> Result<(), ProjectError> {
    if state.name.trim().is_empty() {
        return Err(invalid("Project name cannot be empty"));
    }

    if state.name.len() > 255 {
        return Err(invalid("Project name cannot exceed 255 characters"));
    }

    if !state.tempo_bpm.is_finite()
        || state.tempo_bpm < Tempo::MIN_BPM
        || state.tempo_bpm > Tempo::MAX_BPM
    {
        return Err(invalid(format!(
            "Tempo must be between {} and {} BPM",
            Tempo::MIN_BPM,
            Tempo::MAX_BPM
        )));
    }

    if state.steps_per_beat == 0 || state.steps_per_bar == 0 {
        return Err(invalid("Grid sizes must be greater than zero"));
    }

    if state.total_bars == 0 {
        return Err(invalid("Project must have at least one bar"));
    }

    if state.loop_start >= state.loop_end || state.loop_end > state.total_bars {
        return Err(invalid(format!(
            "Loop {}..{} does not fit in {} bars",
            state.loop_start, state.loop_end, state.total_bars
        )));
    }

    if !(0.0..=1.0).contains(&state.master_volume) {
        return Err(invalid("Master volume must be between 0 and 1"));
    }

    if !(0.0..=1.0).contains(&state.swing) {
        return Err(invalid("Swing must be between 0 and 1"));
    }

    let mut track_ids = HashSet::new();
    for track in &state.tracks {
        if !track_ids.insert(track.id) {
            return Err(invalid(format!("Duplicate track ID: {}", track.id)));
        }

        check_steps(track.id, "pattern", &track.pattern_steps, state.steps_per_bar)?;

        let mut banks = HashSet::from([state.current_bank]);
        for bank in &track.banks {
            if !banks.insert(bank.bank) {
                return Err(invalid(format!(
                    "Track {} stores bank {} twice",
                    track.id, bank.bank
                )));
            }
            check_steps(track.id, &format!("bank {}", bank.bank), &bank.steps, state.steps_per_bar)?;
        }

        let mut bars = HashSet::new();
        for bar in &track.bar_patterns {
            if !bars.insert(bar.bar) {
                return Err(invalid(format!(
                    "Track {} has two patterns for bar {}",
                    track.id, bar.bar
                )));
            }
            check_steps(track.id, &format!("bar {}", bar.bar), &bar.steps, state.steps_per_bar)?;
        }

        if !(0.0..=1.0).contains(&track.volume) {
            return Err(invalid(format!("Track {} volume out of range", track.id)));
        }

        if !(-1.0..=1.0).contains(&track.pan) {
            return Err(invalid(format!("Track {} pan out of range", track.id)));
        }

        for point in &track.automation {
            if point.param.trim().is_empty() {
                return Err(invalid(format!(
                    "Track {} has automation without a parameter name",
                    track.id
                )));
            }
            if !point.value.is_finite() {
                return Err(invalid(format!(
                    "Track {} automation for '{}' at bar {} is not finite",
                    track.id, point.param, point.bar
                )));
            }
        }
    }

    Ok(())
}
