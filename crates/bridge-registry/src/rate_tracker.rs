//! A bounded, decaying rate tracker estimating recent local load that has
//! not yet shown up in a bridge's own reported stats (`newEndpointsRate`).
//!
//! Implemented as a ring of fixed-width buckets rather than a growing list
//! of timestamps, so a bridge under sustained churn doesn't grow this
//! tracker's memory without bound.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const BUCKET_WIDTH: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct State {
    /// Oldest bucket at the front, newest at the back.
    buckets: VecDeque<(Instant, u32)>,
}

#[derive(Debug)]
pub struct NewEndpointsRateTracker {
    window: Duration,
    state: Mutex<State>,
}

impl NewEndpointsRateTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(State {
                buckets: VecDeque::new(),
            }),
        }
    }

    fn purge_stale(state: &mut State, now: Instant, window: Duration) {
        while let Some(&(bucket_start, _)) = state.buckets.front() {
            if now.saturating_duration_since(bucket_start) > window {
                state.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records one participant allocated to this bridge right now.
    pub fn record(&self) {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::purge_stale(&mut state, now, self.window);
        match state.buckets.back_mut() {
            Some((bucket_start, count)) if now.saturating_duration_since(*bucket_start) < BUCKET_WIDTH => {
                *count += 1;
            }
            _ => state.buckets.push_back((now, 1)),
        }
    }

    /// The accumulated count across the sliding window, as of now.
    pub fn recent_count(&self) -> u32 {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::purge_stale(&mut state, now, self.window);
        state.buckets.iter().map(|(_, count)| *count).sum()
    }
}
