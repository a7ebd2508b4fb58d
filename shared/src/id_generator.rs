use log::warn;

use crate::backends::Timestamp;

/// Hands out strictly increasing, timestamp-like identifiers.
///
/// Ids are microseconds since the UNIX epoch, bumped past the last value
/// handed out (or observed from a peer) so two calls never collide even
/// within the same microsecond.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { last: 0 }
    }

    pub fn generate(&mut self) -> u64 {
        let now = match Timestamp::try_now_micros() {
            Ok(now) => now,
            Err(err) => {
                warn!("IdGenerator falling back to a counter: {}", err);
                0
            }
        };
        let next = now.max(self.last.saturating_add(1));
        self.last = next;
        next
    }

    /// Makes sure every later id is greater than `id`.
    pub fn observe(&mut self, id: u64) {
        if id > self.last {
            self.last = id;
        }
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}
