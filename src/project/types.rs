// Types for project persistence

use serde::{Deserialize, Serialize};

use crate::instrument::InstrumentRef;
use crate::sequencer::automation::AutomationPoint;
use crate::sequencer::pattern::PatternBank;
use crate::sequencer::track::TrackId;

/// Project format version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ProjectVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn current() -> Self {
        Self::new(1, 0, 0)
    }

    /// Same major version as the current format; minor bumps only add fields
    pub fn is_compatible(&self) -> bool {
        self.major == Self::current().major
    }
}

impl std::fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Archive manifest, readable without parsing the project itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetadata {
    pub name: String,
    /// Version of the project format
    pub version: ProjectVersion,
    /// RFC 3339 creation timestamp
    pub created: String,
    /// RFC 3339 last modification timestamp
    pub modified: String,
    pub tempo_bpm: f64,
    pub track_count: usize,
}

impl ProjectMetadata {
    /// Fresh metadata for `state`, created and modified now
    pub fn for_state(state: &ProjectState) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            name: state.name.clone(),
            version: ProjectVersion::current(),
            created: now.clone(),
            modified: now,
            tempo_bpm: state.tempo_bpm,
            track_count: state.tracks.len(),
        }
    }

    /// Creation time, `None` if the stored string is not RFC 3339
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.created)
            .ok()
            .map(|time| time.with_timezone(&chrono::Utc))
    }
}

/// Opaque handle returned by a project store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Steps of a bank other than the current one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankSteps {
    pub bank: PatternBank,
    pub steps: Vec<f32>,
}

/// Steps a track plays in one bar of an arrangement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BarSteps {
    pub bar: u32,
    pub steps: Vec<f32>,
}

/// Persisted track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackState {
    pub id: TrackId,
    #[serde(default)]
    pub name: String,
    /// Step velocities of the current bank, 0.0 = off
    pub pattern_steps: Vec<f32>,
    /// Other banks with at least one active step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub banks: Vec<BankSteps>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bar_patterns: Vec<BarSteps>,
    pub mute: bool,
    pub solo: bool,
    pub volume: f32,
    pub pan: f32,
    pub instrument_ref: InstrumentRef,
    #[serde(default)]
    pub automation: Vec<AutomationPoint>,
}

/// Plain-data image of a sequencer, no cyclic references
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(rename = "tempoBPM")]
    pub tempo_bpm: f64,
    #[serde(default = "default_steps_per_beat")]
    pub steps_per_beat: u32,
    pub steps_per_bar: u32,
    pub total_bars: u32,
    pub loop_enabled: bool,
    pub loop_start: u32,
    pub loop_end: u32,
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
    #[serde(default)]
    pub swing: f32,
    #[serde(default)]
    pub current_bank: PatternBank,
    #[serde(default)]
    pub chain: Vec<PatternBank>,
    pub tracks: Vec<TrackState>,
}

fn default_name() -> String {
    "Untitled Project".to_string()
}

fn default_steps_per_beat() -> u32 {
    4
}

fn default_master_volume() -> f32 {
    0.8
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            name: default_name(),
            tempo_bpm: 120.0,
            steps_per_beat: default_steps_per_beat(),
            steps_per_bar: 16,
            total_bars: 4,
            loop_enabled: true,
            loop_start: 0,
            loop_end: 4,
            master_volume: default_master_volume(),
            swing: 0.0,
            current_bank: PatternBank::A,
            chain: Vec::new(),
            tracks: Vec::new(),
        }
    }
}
