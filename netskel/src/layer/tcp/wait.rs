use core::fmt;
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use super::{Connection, Error, Result};

/// An event the receive path reports to a waiting operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The peer answered our SYN.
    SynAck,
    /// The peer acknowledged our FIN during a passive close.
    Ack,
    /// The peer answered our FIN with its own.
    FinAck,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Signal::SynAck => f.write_str("SYN-ACK"),
            Signal::Ack => f.write_str("ACK"),
            Signal::FinAck => f.write_str("FIN-ACK"),
        }
    }
}

/// Signals reported but not yet consumed by a wait.
///
/// A report that arrives before anyone waits stays here, the next wait returns immediately. Each
/// report satisfies exactly one wait.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Pending {
    syn_ack: bool,
    ack: bool,
    fin_ack: bool,
}

impl Pending {
    pub(crate) fn raise(&mut self, signal: Signal) {
        *self.slot(signal) = true;
    }

    /// Consume a reported signal.
    pub(crate) fn take(&mut self, signal: Signal) -> bool {
        core::mem::replace(self.slot(signal), false)
    }

    /// Forget a stale report before sending the segment it answers.
    pub(crate) fn clear(&mut self, signal: Signal) {
        *self.slot(signal) = false;
    }

    fn slot(&mut self, signal: Signal) -> &mut bool {
        match signal {
            Signal::SynAck => &mut self.syn_ack,
            Signal::Ack => &mut self.ack,
            Signal::FinAck => &mut self.fin_ack,
        }
    }
}

impl<D> Connection<D> {
    /// Block until `signal` is reported or `timeout` expired.
    ///
    /// Returns immediately if the signal was reported since it was last consumed. Spurious
    /// wake-ups are absorbed, only the deadline ends the wait. A cancelled connection fails every
    /// wait with [`Error::Cancelled`].
    ///
    /// [`Error::Cancelled`]: enum.Error.html#variant.Cancelled
    pub fn wait_for(&self, signal: Signal, timeout: Duration) -> Result<()> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or(Error::ClockUnavailable)?;
        let condvar = self.condvar(signal);

        let mut shared = self.lock();
        loop {
            if shared.cancelled {
                return Err(Error::Cancelled);
            }
            if shared.pending.take(signal) {
                net_trace!("tcp {}: observed {}", self.socket, signal);
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                net_debug!("tcp {}: no {} within {:?}", self.socket, signal, timeout);
                return Err(Error::Timeout(signal));
            }

            shared = condvar
                .wait_timeout(shared, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::layer::tcp::{Config, SocketInfo};
    use crate::nic::Capture;
    use crate::wire::{Ipv4Address, TcpSeqNumber};

    fn connection() -> Arc<Connection<Capture>> {
        let socket = SocketInfo {
            local: Ipv4Address::new(192, 168, 0, 1),
            local_port: 5000,
            remote: Ipv4Address::new(192, 168, 0, 2),
            remote_port: 7,
        };
        Arc::new(Connection::with_isn(socket, Capture::new(), Config::default(), TcpSeqNumber(0)))
    }

    #[test]
    fn early_report_is_kept() {
        let conn = connection();
        conn.on_ack(TcpSeqNumber(1));
        assert_eq!(conn.wait_for(Signal::Ack, Duration::from_millis(0)), Ok(()));
    }

    #[test]
    fn report_is_consumed_once() {
        let conn = connection();
        conn.on_fin_ack(TcpSeqNumber(1));
        conn.on_fin_ack(TcpSeqNumber(1));
        assert_eq!(conn.wait_for(Signal::FinAck, Duration::from_millis(0)), Ok(()));
        assert_eq!(
            conn.wait_for(Signal::FinAck, Duration::from_millis(10)),
            Err(Error::Timeout(Signal::FinAck)));
    }

    #[test]
    fn signals_do_not_cross() {
        let conn = connection();
        conn.on_syn_ack(TcpSeqNumber(1));
        assert_eq!(
            conn.wait_for(Signal::FinAck, Duration::from_millis(10)),
            Err(Error::Timeout(Signal::FinAck)));
        assert_eq!(conn.wait_for(Signal::SynAck, Duration::from_millis(0)), Ok(()));
    }

    #[test]
    fn wakes_on_report() {
        let conn = connection();
        let waiter = {
            let conn = Arc::clone(&conn);
            thread::spawn(move || conn.wait_for(Signal::SynAck, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        conn.on_syn_ack(TcpSeqNumber(4242));
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert_eq!(conn.remote_seq(), TcpSeqNumber(4242));
    }

    #[test]
    fn times_out_after_deadline() {
        let conn = connection();
        let start = Instant::now();
        assert_eq!(
            conn.wait_for(Signal::SynAck, Duration::from_millis(30)),
            Err(Error::Timeout(Signal::SynAck)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn unrepresentable_deadline() {
        let conn = connection();
        assert_eq!(
            conn.wait_for(Signal::Ack, Duration::from_secs(u64::MAX)),
            Err(Error::ClockUnavailable));
    }

    #[test]
    fn cancel_wakes_waiter() {
        let conn = connection();
        let waiter = {
            let conn = Arc::clone(&conn);
            thread::spawn(move || conn.wait_for(Signal::FinAck, Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        conn.cancel();
        assert_eq!(waiter.join().unwrap(), Err(Error::Cancelled));
        assert_eq!(
            conn.wait_for(Signal::FinAck, Duration::from_secs(10)),
            Err(Error::Cancelled));
    }
}
