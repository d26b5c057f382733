// Presets - Generated patterns and arrangement templates
// Role-based one-bar patterns, mix defaults and 32-bar section dynamics

use crate::instrument::{InstrumentKind, InstrumentRef};
use crate::sequencer::automation::params;
use crate::sequencer::error::SequencerResult;
use crate::sequencer::pattern::StepPattern;
use crate::sequencer::player::Sequencer;
use crate::sequencer::track::{TrackConfig, TrackId};

/// Length of an arrangement in bars
pub const ARRANGEMENT_BARS: u32 = 32;

/// Musical role of a track, selects its generated pattern and mix level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundRole {
    Drums,
    Bass,
    Lead,
    Pad,
    Fx,
}

impl SoundRole {
    /// Default track volume for the role
    pub fn default_volume(&self) -> f32 {
        match self {
            SoundRole::Drums => 0.9,
            SoundRole::Bass => 0.85,
            SoundRole::Lead => 0.7,
            SoundRole::Pad => 0.6,
            SoundRole::Fx => 0.5,
        }
    }

    /// Lead and bass get a filter sweep into the drop
    pub fn has_filter_sweep(&self) -> bool {
        matches!(self, SoundRole::Lead | SoundRole::Bass)
    }
}

/// One-bar pattern for `role` at `bar`, `length` steps long
///
/// Designed on a 16-step bar; steps past `length` are dropped.
pub fn preset_pattern(role: SoundRole, bar: u32, length: usize) -> StepPattern {
    let steps: Vec<usize> = match role {
        SoundRole::Drums => {
            let mut steps = vec![0, 4, 8, 12];
            // Fill at the end of every 8-bar phrase
            if bar % 8 == 7 {
                steps.extend([14, 15]);
            }
            steps
        }
        SoundRole::Bass => match (bar / 4) % 3 {
            0 => vec![0, 4, 8, 12],
            1 => vec![0, 3, 6, 9, 12],
            _ => vec![0, 2, 4, 6, 8, 10, 12, 14],
        },
        SoundRole::Lead => {
            if bar % 2 == 0 {
                vec![0, 4, 8, 12]
            } else {
                vec![2, 6, 10, 14]
            }
        }
        SoundRole::Pad => {
            if bar % 4 == 0 {
                vec![0, 8]
            } else {
                vec![0]
            }
        }
        SoundRole::Fx => {
            if bar % 4 == 3 {
                vec![12, 14]
            } else {
                Vec::new()
            }
        }
    };

    let mut flags = vec![false; length];
    for step in steps.into_iter().filter(|&step| step < length) {
        flags[step] = true;
    }
    StepPattern::from_bools(&flags)
}

/// Stereo position for track `index` of `count`, spread over [-0.4, 0.4]
pub fn spread_pan(index: usize, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let position = index as f32 / (count - 1) as f32;
    (position - 0.5) * 0.8
}

/// Track slot of a template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateTrack {
    pub name: &'static str,
    pub kind: InstrumentKind,
    pub role: SoundRole,
    /// Bars the track plays, end exclusive
    pub bars: (u32, u32),
}

const fn slot(
    name: &'static str,
    kind: InstrumentKind,
    role: SoundRole,
    bars: (u32, u32),
) -> TemplateTrack {
    TemplateTrack {
        name,
        kind,
        role,
        bars,
    }
}

const STANDARD: [TemplateTrack; 4] = [
    slot("Drums", InstrumentKind::Tr808, SoundRole::Drums, (0, 32)),
    slot("Bass", InstrumentKind::Tb303, SoundRole::Bass, (8, 32)),
    slot("Lead", InstrumentKind::Arp2600, SoundRole::Lead, (16, 28)),
    slot("Pad", InstrumentKind::Arp2600, SoundRole::Pad, (12, 32)),
];

const MINIMAL: [TemplateTrack; 3] = [
    slot("Kick", InstrumentKind::Tr808, SoundRole::Drums, (0, 32)),
    slot("Bass", InstrumentKind::Tb303, SoundRole::Bass, (4, 32)),
    slot("Perc", InstrumentKind::Tr808, SoundRole::Fx, (8, 32)),
];

const EPIC: [TemplateTrack; 6] = [
    slot("Drums", InstrumentKind::Tr808, SoundRole::Drums, (0, 32)),
    slot("Sub Bass", InstrumentKind::Tb303, SoundRole::Bass, (8, 32)),
    slot("Mid Bass", InstrumentKind::Arp2600, SoundRole::Bass, (12, 32)),
    slot("Lead 1", InstrumentKind::Arp2600, SoundRole::Lead, (16, 28)),
    slot("Pad", InstrumentKind::StringMachine, SoundRole::Pad, (8, 32)),
    slot("FX", InstrumentKind::Arp2600, SoundRole::Fx, (12, 32)),
];

/// Ready-made track layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrangementTemplate {
    #[default]
    Standard,
    Minimal,
    Epic,
}

impl ArrangementTemplate {
    pub fn tracks(&self) -> &'static [TemplateTrack] {
        match self {
            ArrangementTemplate::Standard => &STANDARD,
            ArrangementTemplate::Minimal => &MINIMAL,
            ArrangementTemplate::Epic => &EPIC,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(ArrangementTemplate::Standard),
            "minimal" => Some(ArrangementTemplate::Minimal),
            "epic" => Some(ArrangementTemplate::Epic),
            _ => None,
        }
    }
}

/// Add the template's tracks to `seq`, with patterns, mix and section dynamics
///
/// Each track gets one pattern per bar of its slot, so it is silent outside
/// the slot and follows the role's variations (fills, bass rotation) inside.
/// The bank pattern holds the slot's first bar for editing.
///
/// The sequence is extended to [`ARRANGEMENT_BARS`] if shorter. Instrument
/// handles are the instrument kind names (`"tr808"`, `"tb303"`, ...).
/// Returns the new track ids in template order.
pub fn build_arrangement(
    seq: &mut Sequencer,
    template: ArrangementTemplate,
) -> SequencerResult<Vec<TrackId>> {
    if seq.total_bars() < ARRANGEMENT_BARS {
        seq.set_total_bars(ARRANGEMENT_BARS)?;
        let region = seq.loop_region();
        seq.set_loop(region.enabled, 0, ARRANGEMENT_BARS)?;
    }

    let slots = template.tracks();
    let length = seq.steps_per_bar() as usize;
    let mut ids = Vec::with_capacity(slots.len());

    for (index, slot) in slots.iter().enumerate() {
        let volume = slot.role.default_volume();
        let (enter, exit) = slot.bars;
        let mut config = TrackConfig::new(slot.name, InstrumentRef::new(slot.kind.as_str()))
            .with_volume(volume)
            .with_pan(spread_pan(index, slots.len()))
            .with_pattern(preset_pattern(slot.role, enter, length));
        for bar in enter..exit.min(ARRANGEMENT_BARS) {
            config = config.with_bar_pattern(bar, preset_pattern(slot.role, bar, length));
        }
        let id = seq.add_track(config)?;
        add_section_dynamics(seq, id, slot.role, volume)?;
        ids.push(id);
    }

    log::info!(
        target: "sequencer",
        "Built {:?} arrangement: {} tracks over {} bars",
        template, ids.len(), ARRANGEMENT_BARS
    );
    Ok(ids)
}

/// Intro fade-in, pre-drop dip, drop boost, breakdown and outro fade-out
fn add_section_dynamics(
    seq: &mut Sequencer,
    id: TrackId,
    role: SoundRole,
    volume: f32,
) -> SequencerResult<()> {
    for bar in 0..8 {
        seq.schedule_automation(id, bar, params::VOLUME, bar as f32 / 8.0 * volume)?;
    }
    seq.schedule_automation(id, 15, params::VOLUME, volume * 0.7)?;
    seq.schedule_automation(id, 16, params::VOLUME, volume * 1.2)?;
    for bar in 24..28 {
        seq.schedule_automation(id, bar, params::VOLUME, volume * 0.6)?;
    }
    for bar in 28..32 {
        let fade = 1.0 - (bar - 28) as f32 / 4.0;
        seq.schedule_automation(id, bar, params::VOLUME, volume * fade)?;
    }

    if role.has_filter_sweep() {
        for bar in 12..16 {
            let cutoff = 200.0 + (bar - 12) as f32 / 4.0 * 2000.0;
            seq.schedule_automation(id, bar, params::CUTOFF, cutoff)?;
            seq.schedule_automation(id, bar, params::RESONANCE, 0.7)?;
        }
    }
    Ok(())
}
