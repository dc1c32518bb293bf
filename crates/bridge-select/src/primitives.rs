//! Named candidate-filter primitives shared by every concrete strategy. Each
//! takes the already-operational, ascending-stress-sorted candidate slice
//! and returns the first match, bumping its counter when it fires. A missing
//! participant region short-circuits every region-aware primitive to `None`
//! without touching its counter.

use std::sync::Arc;

use bridge_common::config::RegionGroups;
use bridge_registry::BridgeRecord;

use crate::conference::ConferenceBridges;
use crate::counters::RuleCounters;

fn in_region(candidate: &BridgeRecord, region: &str) -> bool {
    candidate.region().as_deref() == Some(region)
}

fn in_region_group(region_groups: &RegionGroups, candidate: &BridgeRecord, region: &str) -> bool {
    match candidate.region() {
        Some(candidate_region) => region_groups.same_group(&candidate_region, region),
        None => false,
    }
}

fn first_where<'a>(
    candidates: &'a [Arc<BridgeRecord>],
    predicate: impl Fn(&BridgeRecord) -> bool,
) -> Option<&'a Arc<BridgeRecord>> {
    candidates.iter().find(|candidate| predicate(candidate))
}

/// Bundles the shared counters and region-group table every primitive needs.
pub struct Primitives<'a> {
    pub counters: &'a RuleCounters,
    pub region_groups: &'a RegionGroups,
}

impl<'a> Primitives<'a> {
    pub fn not_loaded_in_conference_in_region(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        region: Option<&str>,
    ) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| {
            !c.is_overloaded() && conference.contains(c.address()) && in_region(c, region)
        })
        .cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.not_loaded_in_conference_in_region, "total_not_loaded_in_conference_in_region");
        }
        found
    }

    pub fn not_loaded_in_conference_in_region_group(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        region: Option<&str>,
    ) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| {
            !c.is_overloaded() && conference.contains(c.address()) && in_region_group(self.region_groups, c, region)
        })
        .cloned();
        if found.is_some() {
            RuleCounters::fire(
                &self.counters.not_loaded_in_conference_in_region_group,
                "total_not_loaded_in_conference_in_region_group",
            );
        }
        found
    }

    pub fn not_loaded_in_region(&self, candidates: &[Arc<BridgeRecord>], region: Option<&str>) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| !c.is_overloaded() && in_region(c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.not_loaded_in_region, "total_not_loaded_in_region");
        }
        found
    }

    pub fn not_loaded_in_region_group(&self, candidates: &[Arc<BridgeRecord>], region: Option<&str>) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| !c.is_overloaded() && in_region_group(self.region_groups, c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.not_loaded_in_region_group, "total_not_loaded_in_region_group");
        }
        found
    }

    pub fn least_loaded_in_conference_in_region(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        region: Option<&str>,
    ) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| conference.contains(c.address()) && in_region(c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(
                &self.counters.least_loaded_in_conference_in_region,
                "total_least_loaded_in_conference_in_region",
            );
        }
        found
    }

    pub fn least_loaded_in_conference_in_region_group(
        &self,
        candidates: &[Arc<BridgeRecord>],
        conference: &ConferenceBridges,
        region: Option<&str>,
    ) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| conference.contains(c.address()) && in_region_group(self.region_groups, c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(
                &self.counters.least_loaded_in_conference_in_region_group,
                "total_least_loaded_in_conference_in_region_group",
            );
        }
        found
    }

    pub fn least_loaded_in_region(&self, candidates: &[Arc<BridgeRecord>], region: Option<&str>) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| in_region(c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.least_loaded_in_region, "total_least_loaded_in_region");
        }
        found
    }

    pub fn least_loaded_in_region_group(&self, candidates: &[Arc<BridgeRecord>], region: Option<&str>) -> Option<Arc<BridgeRecord>> {
        let region = region?;
        let found = first_where(candidates, |c| in_region_group(self.region_groups, c, region)).cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.least_loaded_in_region_group, "total_least_loaded_in_region_group");
        }
        found
    }

    pub fn not_loaded_in_conference(&self, candidates: &[Arc<BridgeRecord>], conference: &ConferenceBridges) -> Option<Arc<BridgeRecord>> {
        let found = first_where(candidates, |c| !c.is_overloaded() && conference.contains(c.address())).cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.not_loaded_in_conference, "total_not_loaded_in_conference");
        }
        found
    }

    pub fn least_loaded(&self, candidates: &[Arc<BridgeRecord>]) -> Option<Arc<BridgeRecord>> {
        let found = candidates.first().cloned();
        if found.is_some() {
            RuleCounters::fire(&self.counters.least_loaded, "total_least_loaded");
        }
        found
    }
}
