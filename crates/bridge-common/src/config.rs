//! Recognised configuration surface for the bridge pool and selection core.
//!
//! Loading these values from TOML/env/CLI is explicitly out of scope here;
//! the embedding application builds a [`BridgeSelectionConfig`] however it
//! likes and hands it in. [`BridgeSelectionConfig::validate`] is the one
//! fatal, startup-time check this crate performs.

use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Which concrete selection strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategyKind {
    Single,
    Region,
    IntraRegion,
    Split,
}

impl SelectionStrategyKind {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "single" => Ok(Self::Single),
            "region" => Ok(Self::Region),
            "intra-region" => Ok(Self::IntraRegion),
            "split" => Ok(Self::Split),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// A static partition of region strings into equivalence groups, used by the
/// region-group primitives. An empty group is not retained; each region
/// absent from every configured group is treated as its own singleton group
/// (spec boundary rule).
#[derive(Debug, Clone, Default)]
pub struct RegionGroups {
    groups: Vec<Vec<String>>,
}

impl RegionGroups {
    pub fn new(groups: Vec<Vec<String>>) -> ConfigResult<Self> {
        for (group_index, group) in groups.iter().enumerate() {
            if group.iter().any(|region| region.trim().is_empty()) {
                return Err(ConfigError::InvalidRegionGroup {
                    group_index,
                    reason: "region names must not be blank".to_string(),
                });
            }
        }
        Ok(Self { groups })
    }

    /// The group-mates of `region`, including `region` itself. Falls back to
    /// a singleton containing only `region` when it appears in no configured
    /// group (or the configured group for it is empty).
    pub fn group_of<'a>(&'a self, region: &'a str) -> Vec<&'a str> {
        for group in &self.groups {
            if group.iter().any(|member| member == region) {
                if group.is_empty() {
                    break;
                }
                return group.iter().map(String::as_str).collect();
            }
        }
        vec![region]
    }

    pub fn same_group(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        self.group_of(a).contains(&b)
    }
}

/// Tunable knobs governing health probing, stress accounting, and selection
/// behavior across the bridge pool.
#[derive(Debug, Clone)]
pub struct BridgeSelectionConfig {
    pub health_checks_interval: Duration,
    pub health_checks_retry_delay: Duration,
    pub failure_reset_threshold: Duration,
    pub participant_rampup_interval: Duration,
    pub average_participant_stress: f64,
    pub average_participant_packet_rate_pps: u64,
    pub max_bridge_packet_rate_pps: u64,
    pub stress_threshold: f64,
    pub selection_strategy: SelectionStrategyKind,
    pub region_groups: RegionGroups,
    pub octo_enabled: bool,
    pub brewery_room: String,
}

impl Default for BridgeSelectionConfig {
    fn default() -> Self {
        Self {
            health_checks_interval: Duration::from_secs(10),
            health_checks_retry_delay: Duration::from_secs(5),
            failure_reset_threshold: Duration::from_secs(60),
            participant_rampup_interval: Duration::from_secs(20),
            average_participant_stress: 0.01,
            average_participant_packet_rate_pps: 500,
            max_bridge_packet_rate_pps: 50_000,
            stress_threshold: 0.8,
            selection_strategy: SelectionStrategyKind::Region,
            region_groups: RegionGroups::default(),
            octo_enabled: true,
            brewery_room: "jvbbrewery@internal.example.com".to_string(),
        }
    }
}

impl BridgeSelectionConfig {
    /// Startup-time validation. Everything this rejects is a configuration
    /// error, not a runtime error: the process should refuse to start rather
    /// than run with a partially-sane configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.average_participant_stress) {
            return Err(ConfigError::OutOfUnitRange {
                field: "averageParticipantStress",
                value: self.average_participant_stress.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.stress_threshold) {
            return Err(ConfigError::OutOfUnitRange {
                field: "stressThreshold",
                value: self.stress_threshold.to_string(),
            });
        }
        if self.max_bridge_packet_rate_pps == 0 {
            return Err(ConfigError::MustBePositive {
                field: "maxBridgePacketRatePps",
            });
        }
        if self.health_checks_interval.is_zero() {
            return Err(ConfigError::MustBePositive {
                field: "healthChecksInterval",
            });
        }
        Ok(())
    }
}
