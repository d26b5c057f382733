// Automation - Per-bar parameter snapshots
// Step-function lookup: the latest point at or before a bar wins

use crate::sequencer::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known parameter names
pub mod params {
    pub const VOLUME: &str = "volume";
    pub const PAN: &str = "pan";
    pub const CUTOFF: &str = "cutoff";
    pub const RESONANCE: &str = "resonance";
}

/// A single automation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub bar: u32,
    pub param: String,
    pub value: f32,
}

/// Sparse automation: parameter name -> (bar -> value)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Automation {
    lanes: BTreeMap<String, BTreeMap<u32, f32>>,
}

impl Automation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `value` for `param` at `bar`, replacing any entry at the same (bar, param)
    pub fn schedule(&mut self, bar: u32, param: &str, value: f32) -> SequencerResult<()> {
        if param.is_empty() {
            return Err(SequencerError::invalid("automation parameter name is empty"));
        }
        if !value.is_finite() {
            return Err(SequencerError::invalid(format!(
                "automation value for '{}' at bar {} is not finite",
                param, bar
            )));
        }
        self.lanes
            .entry(param.to_string())
            .or_default()
            .insert(bar, value);
        Ok(())
    }

    /// Value in effect for `param` at `at_bar`
    ///
    /// No ramping between points: the latest entry with `bar <= at_bar` holds
    /// until the next one. `None` before the first entry.
    pub fn resolve(&self, param: &str, at_bar: u32) -> Option<f32> {
        self.lanes
            .get(param)?
            .range(..=at_bar)
            .next_back()
            .map(|(_, value)| *value)
    }

    /// Remove one entry
    pub fn remove(&mut self, bar: u32, param: &str) -> Option<f32> {
        let lane = self.lanes.get_mut(param)?;
        let removed = lane.remove(&bar);
        if lane.is_empty() {
            self.lanes.remove(param);
        }
        removed
    }

    /// Remove every entry of a parameter, returns how many were dropped
    pub fn clear_param(&mut self, param: &str) -> usize {
        self.lanes.remove(param).map_or(0, |lane| lane.len())
    }

    /// Parameter names with at least one entry, sorted
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.lanes.keys().map(String::as_str)
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.lanes.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// All entries sorted by parameter then bar
    pub fn points(&self) -> Vec<AutomationPoint> {
        self.lanes
            .iter()
            .flat_map(|(param, lane)| {
                lane.iter().map(move |(&bar, &value)| AutomationPoint {
                    bar,
                    param: param.clone(),
                    value,
                })
            })
            .collect()
    }

    /// Build from entries; later duplicates overwrite earlier ones
    pub fn from_points(points: &[AutomationPoint]) -> SequencerResult<Self> {
        let mut automation = Self::new();
        for point in points {
            automation.schedule(point.bar, &point.param, point.value)?;
        }
        Ok(automation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_function_resolution() {
        let mut automation = Automation::new();
        automation.schedule(10, params::CUTOFF, 0.3).unwrap();
        automation.schedule(20, params::CUTOFF, 0.8).unwrap();

        assert_eq!(automation.resolve(params::CUTOFF, 5), None);
        assert_eq!(automation.resolve(params::CUTOFF, 10), Some(0.3));
        assert_eq!(automation.resolve(params::CUTOFF, 15), Some(0.3));
        assert_eq!(automation.resolve(params::CUTOFF, 20), Some(0.8));
        assert_eq!(automation.resolve(params::CUTOFF, 25), Some(0.8));
        assert_eq!(automation.resolve(params::VOLUME, 25), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut automation = Automation::new();
        automation.schedule(4, params::VOLUME, 0.2).unwrap();
        automation.schedule(4, params::VOLUME, 0.9).unwrap();
        assert_eq!(automation.len(), 1);
        assert_eq!(automation.resolve(params::VOLUME, 4), Some(0.9));
    }

    #[test]
    fn test_params_are_independent() {
        let mut automation = Automation::new();
        automation.schedule(0, params::VOLUME, 0.5).unwrap();
        automation.schedule(8, params::CUTOFF, 0.1).unwrap();

        assert_eq!(automation.resolve(params::VOLUME, 8), Some(0.5));
        assert_eq!(automation.resolve(params::CUTOFF, 7), None);
        assert_eq!(automation.params().collect::<Vec<_>>(), vec!["cutoff", "volume"]);
    }

    #[test]
    fn test_rejects_invalid_entries() {
        let mut automation = Automation::new();
        assert!(automation.schedule(0, "", 0.5).is_err());
        assert!(automation.schedule(0, params::PAN, f32::INFINITY).is_err());
        assert!(automation.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut automation = Automation::new();
        automation.schedule(1, params::VOLUME, 0.5).unwrap();
        automation.schedule(2, params::VOLUME, 0.6).unwrap();
        automation.schedule(3, params::PAN, -0.5).unwrap();

        assert_eq!(automation.remove(1, params::VOLUME), Some(0.5));
        assert_eq!(automation.remove(1, params::VOLUME), None);
        assert_eq!(automation.clear_param(params::PAN), 1);
        assert_eq!(automation.len(), 1);

        assert_eq!(automation.remove(2, params::VOLUME), Some(0.6));
        assert!(automation.is_empty());
    }

    #[test]
    fn test_points_round_trip() {
        let mut automation = Automation::new();
        automation.schedule(12, params::CUTOFF, 0.4).unwrap();
        automation.schedule(0, params::VOLUME, 0.0).unwrap();
        automation.schedule(8, params::VOLUME, 0.8).unwrap();

        let points = automation.points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].param, "cutoff");

        let rebuilt = Automation::from_points(&points).unwrap();
        assert_eq!(rebuilt, automation);
    }
}
