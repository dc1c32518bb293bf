//! The four concrete selection strategies. Each owns its own
//! [`RuleCounters`] and a shared reference to the configured region groups;
//! none dispatch through a shared enum match — they are distinct values
//! behind one [`SelectionStrategy`] trait object, selected once when the
//! selector is built.

use std::sync::Arc;

use bridge_common::config::{RegionGroups, SelectionStrategyKind};
use bridge_common::BridgeSelectionConfig;
use bridge_registry::BridgeRecord;
use tracing::error;

use crate::conference::ConferenceBridges;
use crate::counters::RuleCounters;
use crate::error::SelectionError;
use crate::primitives::Primitives;

/// A pure candidate-filter cascade: given operational candidates (ascending
/// stress), the conference's current bridges, and the joining participant's
/// region, picks a winner or reports none.
pub trait SelectionStrategy: Send + Sync {
    fn select(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        participant_region: Option<&str>,
        allow_multi_bridge: bool,
    ) -> Option<Arc<BridgeRecord>>;

    /// Per-rule firing counters as name/value pairs, for the statistics
    /// snapshot.
    fn counters_snapshot(&self) -> Vec<(String, u64)>;
}

/// If the conference already has bridges and either multi-bridge placement
/// is disallowed or the first conference bridge advertises no relay id,
/// pin to that bridge without consulting the strategy cascade.
fn pinned_bridge(conference: &ConferenceBridges, allow_multi_bridge: bool) -> Option<Arc<BridgeRecord>> {
    let (first, _) = conference.first()?;
    if !allow_multi_bridge || !first.has_relay() {
        return Some(Arc::clone(first));
    }
    None
}

/// Builds the configured concrete strategy.
pub fn build(kind: SelectionStrategyKind, region_groups: RegionGroups) -> Box<dyn SelectionStrategy> {
    match kind {
        SelectionStrategyKind::Single => Box::new(SingleBridgeStrategy::new()),
        SelectionStrategyKind::Region => Box::new(RegionStrategy::new(region_groups)),
        SelectionStrategyKind::IntraRegion => Box::new(IntraRegionStrategy::new(region_groups)),
        SelectionStrategyKind::Split => Box::new(SplitStrategy::new()),
    }
}

/// Validates `config` before building its configured strategy — the one
/// fatal, startup-time path in this crate.
pub fn build_validated(config: &BridgeSelectionConfig) -> Result<Box<dyn SelectionStrategy>, SelectionError> {
    config.validate()?;
    Ok(build(config.selection_strategy, config.region_groups.clone()))
}

/// 4.4.1 — forbids multi-bridge conferences outright.
pub struct SingleBridgeStrategy {
    counters: RuleCounters,
}

impl SingleBridgeStrategy {
    pub fn new() -> Self {
        Self { counters: RuleCounters::new() }
    }
}

impl Default for SingleBridgeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for SingleBridgeStrategy {
    fn select(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        _participant_region: Option<&str>,
        _allow_multi_bridge: bool,
    ) -> Option<Arc<BridgeRecord>> {
        if candidates.is_empty() {
            return None;
        }
        let region_groups = RegionGroups::default();
        let primitives = Primitives { counters: &self.counters, region_groups: &region_groups };

        if conference.is_empty() {
            return primitives.least_loaded(candidates);
        }
        if conference.len() == 1 {
            let (bridge, _) = conference.first().expect("len checked above");
            return bridge.is_operational().then(|| Arc::clone(bridge));
        }
        error!(conference_bridge_count = conference.len(), "single-bridge strategy cannot place a multi-bridge conference");
        None
    }

    fn counters_snapshot(&self) -> Vec<(String, u64)> {
        self.counters.snapshot()
    }
}

/// 4.4.2 — the primary production strategy: a ten-rule cascade preferring
/// region, then region group, then cross-region as a last resort.
pub struct RegionStrategy {
    counters: RuleCounters,
    region_groups: RegionGroups,
}

impl RegionStrategy {
    pub fn new(region_groups: RegionGroups) -> Self {
        Self { counters: RuleCounters::new(), region_groups }
    }

    fn do_select(&self, candidates: &[Arc<BridgeRecord>], conference: &ConferenceBridges, region: Option<&str>) -> Option<Arc<BridgeRecord>> {
        let p = Primitives { counters: &self.counters, region_groups: &self.region_groups };
        p.not_loaded_in_conference_in_region(candidates, conference, region)
            .or_else(|| p.not_loaded_in_conference_in_region_group(candidates, conference, region))
            .or_else(|| p.not_loaded_in_region(candidates, region))
            .or_else(|| p.not_loaded_in_region_group(candidates, region))
            .or_else(|| p.least_loaded_in_conference_in_region(candidates, conference, region))
            .or_else(|| p.least_loaded_in_conference_in_region_group(candidates, conference, region))
            .or_else(|| p.least_loaded_in_region(candidates, region))
            .or_else(|| p.least_loaded_in_region_group(candidates, region))
            .or_else(|| p.not_loaded_in_conference(candidates, conference))
            .or_else(|| p.least_loaded(candidates))
    }
}

impl SelectionStrategy for RegionStrategy {
    fn select(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        participant_region: Option<&str>,
        allow_multi_bridge: bool,
    ) -> Option<Arc<BridgeRecord>> {
        if candidates.is_empty() {
            return None;
        }
        if let Some(pinned) = pinned_bridge(conference, allow_multi_bridge) {
            return Some(pinned);
        }
        self.do_select(candidates, conference, participant_region)
    }

    fn counters_snapshot(&self) -> Vec<(String, u64)> {
        self.counters.snapshot()
    }
}

/// 4.4.3 — load-testing a single region: an empty conference picks any
/// non-overloaded bridge in the participant's region; otherwise the first
/// three cascade rules run against the conference's own region.
pub struct IntraRegionStrategy {
    counters: RuleCounters,
    region_groups: RegionGroups,
}

impl IntraRegionStrategy {
    pub fn new(region_groups: RegionGroups) -> Self {
        Self { counters: RuleCounters::new(), region_groups }
    }
}

impl SelectionStrategy for IntraRegionStrategy {
    fn select(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        participant_region: Option<&str>,
        allow_multi_bridge: bool,
    ) -> Option<Arc<BridgeRecord>> {
        if candidates.is_empty() {
            return None;
        }
        if let Some(pinned) = pinned_bridge(conference, allow_multi_bridge) {
            return Some(pinned);
        }

        let p = Primitives { counters: &self.counters, region_groups: &self.region_groups };

        if conference.is_empty() {
            return p.not_loaded_in_region(candidates, participant_region).or_else(|| p.least_loaded(candidates));
        }

        let conference_region = conference.first().and_then(|(bridge, _)| bridge.region());
        let conference_region = conference_region.as_deref();
        p.not_loaded_in_conference_in_region(candidates, conference, conference_region)
            .or_else(|| p.not_loaded_in_conference_in_region_group(candidates, conference, conference_region))
            .or_else(|| p.not_loaded_in_region(candidates, conference_region))
            .or_else(|| p.least_loaded(candidates))
    }

    fn counters_snapshot(&self) -> Vec<(String, u64)> {
        self.counters.snapshot()
    }
}

/// 4.4.4 — prefers spreading a conference across bridges it is not yet on;
/// always treats multi-bridge placement as allowed.
pub struct SplitStrategy {
    counters: RuleCounters,
}

impl SplitStrategy {
    pub fn new() -> Self {
        Self { counters: RuleCounters::new() }
    }
}

impl Default for SplitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for SplitStrategy {
    fn select(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        _participant_region: Option<&str>,
        _allow_multi_bridge: bool,
    ) -> Option<Arc<BridgeRecord>> {
        if candidates.is_empty() {
            return None;
        }

        if let Some(candidate) = candidates.iter().find(|c| !conference.contains(c.address())) {
            self.counters.bump_named("total_split_not_in_conference");
            return Some(Arc::clone(candidate));
        }

        conference.fewest_participants().map(|(bridge, _)| {
            self.counters.bump_named("total_split_fewest_participants");
            Arc::clone(bridge)
        })
    }

    fn counters_snapshot(&self) -> Vec<(String, u64)> {
        self.counters.snapshot()
    }
}
