// Types de commandes - Communication UI → thread propriétaire du séquenceur

use crate::sequencer::pattern::PatternBank;
use crate::sequencer::track::TrackId;

/// Requête de modification envoyée par l'UI
///
/// Appliquée entre deux ticks par `Transport::drain_commands`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    SetTempo(f64),
    /// Borné à [0, 1] comme le volume
    SetSwing(f32),
    ToggleStep {
        track: TrackId,
        index: usize,
    },
    SetSteps {
        track: TrackId,
        steps: Vec<f32>,
    },
    SetStepVelocity {
        track: TrackId,
        index: usize,
        velocity: f32,
    },
    SetMute {
        track: TrackId,
        muted: bool,
    },
    SetSolo {
        track: TrackId,
        soloed: bool,
    },
    SetVolume {
        track: TrackId,
        volume: f32,
    },
    SetPan {
        track: TrackId,
        pan: f32,
    },
    SetMasterVolume(f32),
    ScheduleAutomation {
        track: TrackId,
        bar: u32,
        param: String,
        value: f32,
    },
    ClearAutomation {
        track: TrackId,
        param: String,
    },
    SetLoop {
        enabled: bool,
        start: u32,
        end: u32,
    },
    /// Changement de banque à la prochaine mesure
    SwitchBank(PatternBank),
    /// Vide = enchaînement désactivé
    SetChain(Vec<PatternBank>),
    CopyBank {
        from: PatternBank,
        to: PatternBank,
    },
    ClearBank(PatternBank),
    SetBankSteps {
        track: TrackId,
        bank: PatternBank,
        steps: Vec<f32>,
    },
}

impl Command {
    /// Nom court pour les logs
    pub fn label(&self) -> &'static str {
        match self {
            Command::Play => "Play",
            Command::Pause => "Pause",
            Command::Resume => "Resume",
            Command::Stop => "Stop",
            Command::SetTempo(_) => "SetTempo",
            Command::SetSwing(_) => "SetSwing",
            Command::ToggleStep { .. } => "ToggleStep",
            Command::SetSteps { .. } => "SetSteps",
            Command::SetStepVelocity { .. } => "SetStepVelocity",
            Command::SetMute { .. } => "SetMute",
            Command::SetSolo { .. } => "SetSolo",
            Command::SetVolume { .. } => "SetVolume",
            Command::SetPan { .. } => "SetPan",
            Command::SetMasterVolume(_) => "SetMasterVolume",
            Command::ScheduleAutomation { .. } => "ScheduleAutomation",
            Command::ClearAutomation { .. } => "ClearAutomation",
            Command::SetLoop { .. } => "SetLoop",
            Command::SwitchBank(_) => "SwitchBank",
            Command::SetChain(_) => "SetChain",
            Command::CopyBank { .. } => "CopyBank",
            Command::ClearBank(_) => "ClearBank",
            Command::SetBankSteps { .. } => "SetBankSteps",
        }
    }

    /// Vrai pour les commandes de transport (play/pause/resume/stop)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Command::Play | Command::Pause | Command::Resume | Command::Stop
        )
    }
}
