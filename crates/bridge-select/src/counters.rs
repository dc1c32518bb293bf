//! Monotonically-increasing per-rule firing counters, observational only —
//! no selection logic ever reads these back.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

macro_rules! rule_counters {
    ($($field:ident => $metric:literal),+ $(,)?) => {
        #[derive(Debug, Default)]
        pub struct RuleCounters {
            $(pub $field: AtomicU64,)+
            extra: DashMap<String, AtomicU64>,
        }

        impl RuleCounters {
            pub fn new() -> Self {
                Self::default()
            }

            /// Renders every named field into a plain snapshot for the
            /// statistics interface.
            pub fn snapshot(&self) -> Vec<(String, u64)> {
                let mut values = vec![
                    $(($metric.to_string(), self.$field.load(Ordering::Relaxed)),)+
                ];
                for entry in self.extra.iter() {
                    values.push((entry.key().clone(), entry.value().load(Ordering::Relaxed)));
                }
                values
            }
        }
    };
}

rule_counters! {
    not_loaded_in_conference_in_region => "total_not_loaded_in_conference_in_region",
    not_loaded_in_conference_in_region_group => "total_not_loaded_in_conference_in_region_group",
    not_loaded_in_region => "total_not_loaded_in_region",
    not_loaded_in_region_group => "total_not_loaded_in_region_group",
    least_loaded_in_conference_in_region => "total_least_loaded_in_conference_in_region",
    least_loaded_in_conference_in_region_group => "total_least_loaded_in_conference_in_region_group",
    least_loaded_in_region => "total_least_loaded_in_region",
    least_loaded_in_region_group => "total_least_loaded_in_region_group",
    not_loaded_in_conference => "total_not_loaded_in_conference",
    least_loaded => "total_least_loaded",
}

impl RuleCounters {
    /// Bumps an ad hoc, strategy-specific counter not covered by the named
    /// primitive fields above (e.g. the split strategy's own two rules).
    pub fn bump_named(&self, metric_name: &str) {
        self.extra
            .entry(metric_name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Increments a named field counter and mirrors it into the process-wide
    /// `metrics` recorder, if one is installed.
    pub fn fire(field: &AtomicU64, metric_name: &'static str) {
        field.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(metric_name, 1);
    }
}
