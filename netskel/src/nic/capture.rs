//! A software device recording every transmitted buffer.
use std::collections::VecDeque;
use std::sync::{mpsc, Mutex, MutexGuard, PoisonError};

use super::{Device, PacketBuf, SendError};

/// A device that keeps what it is asked to send.
///
/// Nothing leaves the process. Transmitted buffers are appended to a log and copied to every
/// tap, which lets a simulated peer on another thread react to outgoing segments. Send failures
/// can be scheduled to exercise the error paths of the layers above.
#[derive(Debug, Default)]
pub struct Capture {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<PacketBuf>,
    failures: VecDeque<i32>,
    taps: Vec<mpsc::Sender<PacketBuf>>,
}

impl Capture {
    /// Create a device that accepts every buffer.
    pub fn new() -> Self {
        Capture::default()
    }

    /// Make the next not yet failed transmission fail with `code`.
    ///
    /// Failures queue up, each one is consumed by exactly one call to `transmit`. A failed buffer
    /// is neither logged nor tapped.
    pub fn fail_next(&self, code: i32) {
        self.lock().failures.push_back(code);
    }

    /// Receive a copy of every buffer transmitted from now on.
    ///
    /// Dropping the receiver detaches the tap.
    pub fn tap(&self) -> mpsc::Receiver<PacketBuf> {
        let (send, recv) = mpsc::channel();
        self.lock().taps.push(send);
        recv
    }

    /// A copy of all buffers transmitted so far, in order.
    pub fn sent(&self) -> Vec<PacketBuf> {
        self.lock().sent.clone()
    }

    /// The number of buffers transmitted so far.
    pub fn sent_count(&self) -> usize {
        self.lock().sent.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for Capture {
    fn transmit(&self, packet: PacketBuf) -> Result<(), SendError> {
        let mut inner = self.lock();
        if let Some(code) = inner.failures.pop_front() {
            net_debug!("capture: injected send failure, code {}", code);
            return Err(SendError { code });
        }

        inner.taps.retain(|tap| tap.send(packet.clone()).is_ok());
        inner.sent.push(packet);
        Ok(())
    }
}
