use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::time::Instant;

use crate::wire::TcpSeqNumber;

use super::SocketInfo;

/// Initial sequence number generation as described in RFC 6528.
///
/// The number is the sum of a keyed hash over the connection four-tuple and a clock ticking
/// every four microseconds. The key comes from the randomly seeded hasher of the standard library.
#[derive(Clone, Debug)]
pub struct IsnGenerator {
    keys: RandomState,
    epoch: Instant,
}

impl IsnGenerator {
    /// Create a generator keyed from the standard library hasher, its clock starting now.
    pub fn from_std_hash() -> Self {
        IsnGenerator {
            keys: RandomState::new(),
            epoch: Instant::now(),
        }
    }

    /// The initial sequence number for a connection opened now.
    pub fn isn(&self, socket: &SocketInfo) -> TcpSeqNumber {
        self.isn_at(socket, Instant::now())
    }

    /// The initial sequence number for a connection opened at `now`.
    pub fn isn_at(&self, socket: &SocketInfo, now: Instant) -> TcpSeqNumber {
        let mut hasher = self.keys.build_hasher();
        socket.hash(&mut hasher);
        let offset = hasher.finish() as u32;
        // Truncation wraps the clock around every 2^32 ticks.
        let ticks = (now.saturating_duration_since(self.epoch).as_micros() / 4) as u32;
        TcpSeqNumber::from(offset.wrapping_add(ticks))
    }
}
