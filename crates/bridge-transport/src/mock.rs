//! An in-memory, scriptable transport used by the health-scheduler tests —
//! no sockets, no async runtime dependency beyond the trait's `async fn`.

use std::collections::{HashMap, VecDeque};

use bridge_common::BridgeAddress;
use parking_lot::Mutex;

use crate::{MessageTransport, ProbeReply, TransportError};

pub type ScriptedReply = Result<ProbeReply, TransportError>;

struct AddressScript {
    queue: VecDeque<ScriptedReply>,
    /// Replayed forever once the queue drains, so a test doesn't need to
    /// script every tick of a long-running scheduler.
    fallback: ScriptedReply,
    calls: usize,
}

/// A transport whose replies are scripted per bridge address.
pub struct MockTransport {
    connected: Mutex<bool>,
    scripts: Mutex<HashMap<BridgeAddress, AddressScript>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connected: Mutex::new(true),
            scripts: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        *self.connected.lock() = connected;
    }

    /// Queue a sequence of replies for `address`; once exhausted, further
    /// probes receive `fallback`.
    pub fn script(&self, address: BridgeAddress, replies: Vec<ScriptedReply>, fallback: ScriptedReply) {
        self.scripts.lock().insert(
            address,
            AddressScript {
                queue: replies.into(),
                fallback,
                calls: 0,
            },
        );
    }

    /// Convenience: script a single address to always return the same
    /// outcome.
    pub fn always(&self, address: BridgeAddress, reply: ScriptedReply) {
        self.script(address, Vec::new(), reply);
    }

    pub fn call_count(&self, address: &BridgeAddress) -> usize {
        self.scripts
            .lock()
            .get(address)
            .map(|script| script.calls)
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl MessageTransport for MockTransport {
    fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    async fn send_health_probe(&self, to: &BridgeAddress) -> Result<ProbeReply, TransportError> {
        let mut scripts = self.scripts.lock();
        let script = scripts
            .entry(to.clone())
            .or_insert_with(|| AddressScript {
                queue: VecDeque::new(),
                fallback: Ok(ProbeReply::Success),
                calls: 0,
            });
        script.calls += 1;
        script.queue.pop_front().unwrap_or_else(|| script.fallback.clone())
    }
}
