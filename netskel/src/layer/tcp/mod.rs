//! The TCP layer abstraction.
//!
//! Offers the connection lifecycle on top of a [`Device`]: an active open, an active or passive
//! close and a blocking byte-stream read of received payload. A [`Connection`] is meant to be
//! shared, usually in an `Arc`, between the application thread calling the blocking operations and
//! the receive thread that demultiplexes incoming segments and reports them through the `on_*`
//! notification methods.
//!
//! [`Device`]: ../../nic/trait.Device.html
//! [`Connection`]: struct.Connection.html
//!
//! ## Opening a connection
//!
//! [`Connection::open`] sends a SYN, waits for the receive path to report the SYN-ACK and answers
//! it with the final ACK. There is a single attempt: when no SYN-ACK arrives within
//! [`Config::syn_ack_timeout`] the call fails with [`Error::HandshakeTimeout`] and the connection
//! stays `CLOSED`, ready for another attempt.
//!
//! ## Closing a connection
//!
//! [`Connection::close`] performs the active close from `ESTABLISHED`
//! (`FIN_WAIT_1 → FIN_WAIT_2 → TIME_WAIT → CLOSED`) or the passive close from `CLOSE_WAIT`
//! (`LAST_ACK → CLOSED`). `TIME_WAIT` is a transient marker, no timer runs in it. A timeout does
//! not roll the state back, instead calling `close` again retransmits the FIN with the same
//! sequence number and waits once more.
//!
//! ## Reading
//!
//! Arrived segments queue up in arrival order. [`Connection::read_data`] fills the whole buffer,
//! draining segments and remembering how far a partially read segment was consumed. It blocks
//! until enough payload arrived.
//!
//! [`Connection::open`]: struct.Connection.html#method.open
//! [`Connection::close`]: struct.Connection.html#method.close
//! [`Connection::read_data`]: struct.Connection.html#method.read_data
//! [`Config::syn_ack_timeout`]: struct.Config.html#structfield.syn_ack_timeout
//! [`Error::HandshakeTimeout`]: enum.Error.html#variant.HandshakeTimeout
//!
//! ## Deviations
//!
//! There is no retransmission of data, no congestion control, no window scaling and no
//! reassembly of out-of-order segments. Sequence numbers of received data are trusted to be in
//! order.
//!
//! A SYN or FIN only advances the local sequence number once the peer has acknowledged it. Until
//! then a retransmission reuses the same number.
use crate::nic::{BufferError, SendError};
use crate::wire;

mod config;
mod connection;
mod io;
mod isn;
mod packet;
mod socket;
mod state;
mod wait;

#[cfg(test)]
mod tests;

pub use config::{
    Config,
    DEFAULT_WINDOW};

pub use connection::{
    Connection,
    SocketInfo};

pub use io::{
    RecvQueue,
    Segment};

pub use isn::IsnGenerator;

pub use packet::write_header;

pub use state::State;

pub use wait::Signal;

/// The result type of connection operations.
pub type Result<T> = core::result::Result<T, Error>;

/// An error of a connection operation.
///
/// No error is fatal to the connection. After any of them the connection is in a well defined
/// state that can be inspected with [`Connection::state`] and from which the operation may be
/// retried.
///
/// [`Connection::state`]: struct.Connection.html#method.state
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Open was called on a connection that is not `CLOSED`.
    #[error("connection already initiated, state {0}")]
    AlreadyInitiated(State),

    /// The network layer failed to transmit a segment, with its code passed through.
    #[error("transmission failed with code {0}")]
    SendFailed(i32),

    /// No SYN-ACK was reported within the handshake timeout.
    #[error("no SYN-ACK within the handshake timeout")]
    HandshakeTimeout,

    /// A timed wait for a signal expired.
    #[error("timed out waiting for {0}")]
    Timeout(Signal),

    /// Close was called on a connection that is neither established nor closing.
    #[error("connection not established, state {0}")]
    NotEstablished(State),

    /// A transition was requested from a state the connection is not in.
    #[error("illegal transition from {found}, expected {expected}")]
    IllegalState {
        /// The state the transition starts from.
        expected: State,
        /// The state the connection was actually in.
        found: State,
    },

    /// The clock can not represent the deadline of a wait.
    #[error("clock unavailable for computing a deadline")]
    ClockUnavailable,

    /// The connection was cancelled while waiting.
    #[error("operation cancelled")]
    Cancelled,

    /// A packet buffer was too small for a segment.
    #[error("packet buffer: {0}")]
    Buffer(#[from] BufferError),

    /// A received frame could not be parsed.
    #[error("malformed frame: {0}")]
    Wire(#[from] wire::Error),
}

impl From<SendError> for Error {
    fn from(err: SendError) -> Self {
        Error::SendFailed(err.code)
    }
}
