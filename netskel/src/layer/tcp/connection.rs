use core::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::nic::Device;
use crate::wire::{Ipv4Address, TcpSeqNumber};

use super::io::{RecvQueue, Segment};
use super::isn::IsnGenerator;
use super::wait::{Pending, Signal};
use super::{Config, Error, Result, State};

/// The addresses and ports identifying a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SocketInfo {
    /// Our address, the source of every emitted segment.
    pub local: Ipv4Address,
    /// Our port.
    pub local_port: u16,
    /// The peer address.
    pub remote: Ipv4Address,
    /// The peer port.
    pub remote_port: u16,
}

impl fmt::Display for SocketInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} -> {}:{}", self.local, self.local_port, self.remote, self.remote_port)
    }
}

/// A single TCP connection.
///
/// All methods take `&self`. The blocking operations ([`open`], [`close`], [`read_data`]) are
/// called from an application thread while the receive path reports arriving segments through the
/// `on_*` methods from another thread. Share the connection in an `Arc` to do so.
///
/// State, sequence numbers, the pending signals and the receive queue live behind one lock. Each
/// kind of signal has its own condition variable so that a wake-up for one event is never taken
/// by a waiter for another.
///
/// [`open`]: #method.open
/// [`close`]: #method.close
/// [`read_data`]: #method.read_data
pub struct Connection<D> {
    pub(crate) socket: SocketInfo,
    pub(crate) config: Config,
    pub(crate) device: D,
    shared: Mutex<Shared>,
    pub(crate) syn_ack: Condvar,
    pub(crate) ack: Condvar,
    pub(crate) fin_ack: Condvar,
    pub(crate) arrived: Condvar,
    /// Held for the whole of an open or close.
    pub(crate) control: Mutex<()>,
    /// Held for the whole of a read.
    pub(crate) reader: Mutex<()>,
}

/// Everything a receive thread and an application thread both touch.
pub(crate) struct Shared {
    pub(crate) state: State,
    /// The sequence number of the next segment we emit.
    pub(crate) local_seq: TcpSeqNumber,
    /// The last sequence number received from the peer.
    pub(crate) remote_seq: TcpSeqNumber,
    pub(crate) pending: Pending,
    pub(crate) queue: RecvQueue,
    pub(crate) cancelled: bool,
    transitions: Vec<(State, State)>,
}

impl Shared {
    /// Move from `from` to `to`, checked against the current state and the machine.
    pub(crate) fn transition(&mut self, from: State, to: State) -> Result<()> {
        if self.state != from || !from.permits(to) {
            return Err(Error::IllegalState { expected: from, found: self.state });
        }

        net_debug!("tcp state {} -> {}", from, to);
        self.state = to;
        self.transitions.push((from, to));
        Ok(())
    }
}

impl<D: Device> Connection<D> {
    /// Create a closed connection with an initial sequence number chosen per RFC 6528.
    ///
    /// Share one generator between all connections of a host. Its clock then advances the
    /// numbers of successive connections on the same four-tuple.
    pub fn new(socket: SocketInfo, device: D, config: Config, isn: &IsnGenerator) -> Self {
        let isn = isn.isn(&socket);
        Connection::with_isn(socket, device, config, isn)
    }

    /// Create a closed connection starting at a chosen sequence number.
    pub fn with_isn(socket: SocketInfo, device: D, config: Config, isn: TcpSeqNumber) -> Self {
        Connection {
            socket,
            config,
            device,
            shared: Mutex::new(Shared {
                state: State::Closed,
                local_seq: isn,
                remote_seq: TcpSeqNumber::default(),
                pending: Pending::default(),
                queue: RecvQueue::default(),
                cancelled: false,
                transitions: Vec::new(),
            }),
            syn_ack: Condvar::new(),
            ack: Condvar::new(),
            fin_ack: Condvar::new(),
            arrived: Condvar::new(),
            control: Mutex::new(()),
            reader: Mutex::new(()),
        }
    }
}

impl<D> Connection<D> {
    /// The addresses and ports of this connection.
    pub fn socket(&self) -> &SocketInfo {
        &self.socket
    }

    /// The configuration the connection was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The device segments are sent on.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.lock().state
    }

    /// The sequence number the next emitted segment will carry.
    pub fn local_seq(&self) -> TcpSeqNumber {
        self.lock().local_seq
    }

    /// The last sequence number received from the peer.
    ///
    /// For a SYN-ACK or a FIN this is the number of the control bit itself, for data the number of
    /// the last payload byte. The next acknowledgment is always one past it.
    pub fn remote_seq(&self) -> TcpSeqNumber {
        self.lock().remote_seq
    }

    /// All state transitions so far, oldest first.
    pub fn transitions(&self) -> Vec<(State, State)> {
        self.lock().transitions.clone()
    }

    /// Look at the receive queue without consuming anything.
    pub fn inspect_queue<R>(&self, f: impl FnOnce(&RecvQueue) -> R) -> R {
        f(&self.lock().queue)
    }

    /// Abort all current and future waits with [`Error::Cancelled`].
    ///
    /// [`Error::Cancelled`]: enum.Error.html#variant.Cancelled
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        net_debug!("tcp {}: cancelled", self.socket);
        self.syn_ack.notify_all();
        self.ack.notify_all();
        self.fin_ack.notify_all();
        self.arrived.notify_all();
    }

    /// Check if the connection was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Report a SYN-ACK whose own sequence number is `seq`.
    pub fn on_syn_ack(&self, seq: TcpSeqNumber) {
        let mut shared = self.lock();
        shared.remote_seq = seq;
        self.raise(&mut shared, Signal::SynAck);
    }

    /// Report an ACK acknowledging up to `ack`.
    pub fn on_ack(&self, ack: TcpSeqNumber) {
        let mut shared = self.lock();
        net_trace!("tcp {}: acknowledged up to {}", self.socket, ack);
        self.raise(&mut shared, Signal::Ack);
    }

    /// Report the peer's answer to our FIN, carrying its own FIN at `seq`.
    pub fn on_fin_ack(&self, seq: TcpSeqNumber) {
        let mut shared = self.lock();
        shared.remote_seq = seq;
        self.raise(&mut shared, Signal::FinAck);
    }

    /// Report a FIN the peer sent on its own initiative.
    ///
    /// An established connection moves to `CLOSE_WAIT`, from where [`close`] completes the passive
    /// close. In any other state only the sequence number is recorded.
    ///
    /// [`close`]: #method.close
    pub fn on_fin(&self, seq: TcpSeqNumber) {
        let mut shared = self.lock();
        shared.remote_seq = seq;
        if shared.state == State::Established {
            // Can not fail, the state was just checked.
            let _ = shared.transition(State::Established, State::CloseWait);
        } else {
            net_debug!("tcp {}: FIN in state {}, not closing", self.socket, shared.state);
        }
    }

    /// Queue an arrived data segment and wake a blocked reader.
    pub fn on_segment_arrived(&self, segment: Segment) {
        let mut shared = self.lock();
        let len = segment.payload_len();
        if len > 0 {
            shared.remote_seq = segment.seq_number() + (len - 1);
        }
        net_trace!("tcp {}: queued {} bytes at {}", self.socket, len, segment.seq_number());
        shared.queue.push(segment);
        self.arrived.notify_all();
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the shared state locked.
    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        f(&mut self.lock())
    }

    /// Move from `from` to `to`, failing if the connection is not in `from`.
    pub(crate) fn transition(&self, from: State, to: State) -> Result<()> {
        self.lock().transition(from, to)
    }

    fn raise(&self, shared: &mut Shared, signal: Signal) {
        shared.pending.raise(signal);
        self.condvar(signal).notify_all();
    }

    pub(crate) fn condvar(&self, signal: Signal) -> &Condvar {
        match signal {
            Signal::SynAck => &self.syn_ack,
            Signal::Ack => &self.ack,
            Signal::FinAck => &self.fin_ack,
        }
    }
}

impl<D> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shared = self.lock();
        f.debug_struct("Connection")
            .field("socket", &self.socket)
            .field("state", &shared.state)
            .field("local_seq", &shared.local_seq)
            .field("remote_seq", &shared.remote_seq)
            .field("queued", &shared.queue.len())
            .finish()
    }
}
