// Instrument module
// Typed handles, kinds and the registry of sound-producing collaborators
//
// The sequencer never owns instruments: a track only stores an InstrumentRef.
// Hosts register one factory per InstrumentKind and load instances into an
// InstrumentRack, which receives triggers and parameter changes.

pub mod rack;
pub mod registry;

pub use rack::InstrumentRack;
pub use registry::{Instrument, InstrumentFactory, InstrumentRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle naming an instrument instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentRef(String);

impl InstrumentRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instrument families the app ships emulations of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstrumentKind {
    /// TB-303 bass line
    Tb303,
    /// TR-808 drum machine
    Tr808,
    /// TR-909 drum machine
    Tr909,
    /// ARP 2600 semi-modular
    Arp2600,
    /// String machine pads
    StringMachine,
    /// Oberheim DMX drum machine
    DmxDrum,
    /// LinnDrum
    LinnDrum,
    /// Generic one-shot sample player
    Sampler,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 8] = [
        InstrumentKind::Tb303,
        InstrumentKind::Tr808,
        InstrumentKind::Tr909,
        InstrumentKind::Arp2600,
        InstrumentKind::StringMachine,
        InstrumentKind::DmxDrum,
        InstrumentKind::LinnDrum,
        InstrumentKind::Sampler,
    ];

    /// Short identifier, also used as the default instrument handle
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Tb303 => "tb303",
            InstrumentKind::Tr808 => "tr808",
            InstrumentKind::Tr909 => "tr909",
            InstrumentKind::Arp2600 => "arp2600",
            InstrumentKind::StringMachine => "stringMachine",
            InstrumentKind::DmxDrum => "dmx",
            InstrumentKind::LinnDrum => "linndrum",
            InstrumentKind::Sampler => "sampler",
        }
    }

    /// Drum machines play one-shot hits rather than pitched notes
    pub fn is_drum_machine(&self) -> bool {
        matches!(
            self,
            InstrumentKind::Tr808
                | InstrumentKind::Tr909
                | InstrumentKind::DmxDrum
                | InstrumentKind::LinnDrum
        )
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_ref() {
        let handle = InstrumentRef::from("tr808");
        assert_eq!(handle.as_str(), "tr808");
        assert_eq!(handle.to_string(), "tr808");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"tr808\"");
    }

    #[test]
    fn test_kind_names_unique() {
        let mut names: Vec<_> = InstrumentKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), InstrumentKind::ALL.len());
        assert!(InstrumentKind::Tr909.is_drum_machine());
        assert!(!InstrumentKind::Tb303.is_drum_machine());
    }
}
