// Sequencer module
// Step clock, per-track patterns and automation, look-ahead scheduling and transport

pub mod automation;
pub mod clock;
pub mod error;
pub mod events;
pub mod observer;
pub mod pattern;
pub mod player;
pub mod presets;
pub mod render;
pub mod scheduler;
pub mod timeline;
pub mod track;
pub mod transport;

pub use automation::{Automation, AutomationPoint, params};
pub use clock::{Clock, LoopRegion, StepAdvance};
pub use error::{SequencerError, SequencerResult};
pub use events::{
    InstrumentOutput, MixerOutput, OutputError, OutputPair, ParameterChangeEvent, ScheduledEvent,
    TriggerEvent,
};
pub use observer::{ObserverRegistry, SequencerNotice, SubscriptionId};
pub use pattern::{DEFAULT_PATTERN_LENGTH, PatternBank, StepPattern};
pub use player::{ProcessReport, Sequencer};
pub use presets::{ArrangementTemplate, SoundRole, build_arrangement, preset_pattern, spread_pan};
pub use render::{EventLog, OfflineRenderer};
pub use scheduler::LookaheadScheduler;
pub use timeline::{Position, StepGrid, Tempo};
pub use track::{Track, TrackConfig, TrackId, TrackSummary};
pub use transport::{Transport, TransportState};
