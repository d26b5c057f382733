// HAOS.fm sequencer - Library exports for tests, benchmarks and hosts

pub mod config;
pub mod instrument;
pub mod messaging;
pub mod project;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use config::{ConfigError, EngineConfig};
pub use instrument::{InstrumentKind, InstrumentRack, InstrumentRef, InstrumentRegistry};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use messaging::{Command, Notification};
pub use project::{ArchiveProjectStore, MemoryProjectStore, ProjectError, ProjectState, ProjectStore};
pub use sequencer::{
    ArrangementTemplate, EventLog, OfflineRenderer, PatternBank, Position, Sequencer,
    SequencerError, SequencerNotice, StepPattern, Tempo, TrackConfig, TrackId, Transport,
    TransportState,
};
