// Sequencer errors
// Input validation failures reported synchronously by the mutating call

use crate::instrument::InstrumentRef;
use crate::sequencer::track::TrackId;

/// Result type for sequencer operations
pub type SequencerResult<T> = Result<T, SequencerError>;

/// Errors returned by the sequencing core
///
/// Structural errors (bad index, bad length, bad tempo) leave the state untouched.
/// Transport no-ops are reported through `AlreadyPlaying` / `NotPlaying` but are
/// not failures, see [`SequencerError::is_transport_notice`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequencerError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Step index {index} out of range (pattern length {length})")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("Pattern length mismatch: expected {expected} steps, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(InstrumentRef),

    #[error("Transport is already playing")]
    AlreadyPlaying,

    #[error("Transport is not playing")]
    NotPlaying,
}

impl SequencerError {
    /// True for transport state-transition no-ops
    pub fn is_transport_notice(&self) -> bool {
        matches!(self, SequencerError::AlreadyPlaying | SequencerError::NotPlaying)
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SequencerError::InvalidParameter(message.into())
    }
}
