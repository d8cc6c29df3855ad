use core::fmt;

/// State enum of the statemachine.
///
/// Only the lifecycle subset of the standard state machine. There is no listening socket and no
/// simultaneous close.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// No connection, or one that has fully terminated.
    Closed,

    /// Our SYN was answered, the final handshake ACK is not sent yet.
    SynSent,

    /// An open connection.
    Established,

    /// Closed our side of the connection.
    FinWait1,

    /// Our FIN was acknowledged by the remote.
    FinWait2,

    /// Both sides closed, our final ACK is pending.
    ///
    /// Transient, no timer runs in this state.
    TimeWait,

    /// Other side closed its connection.
    CloseWait,

    /// Connection closed by us after the other side closed its already.
    LastAck,
}

impl State {
    /// Check if the state machine permits moving from `self` to `next`.
    pub fn permits(self, next: State) -> bool {
        use State::*;
        match (self, next) {
            (Closed, SynSent)
            | (SynSent, Established)
            | (Established, FinWait1)
            | (Established, CloseWait)
            | (FinWait1, FinWait2)
            | (FinWait2, TimeWait)
            | (TimeWait, Closed)
            | (CloseWait, LastAck)
            | (LastAck, Closed) => true,
            _ => false,
        }
    }

    /// Check if the connection has data flowing in both directions.
    pub fn is_established(self) -> bool {
        self == State::Established
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            State::Closed => "CLOSED",
            State::SynSent => "SYN_SENT",
            State::Established => "ESTABLISHED",
            State::FinWait1 => "FIN_WAIT_1",
            State::FinWait2 => "FIN_WAIT_2",
            State::TimeWait => "TIME_WAIT",
            State::CloseWait => "CLOSE_WAIT",
            State::LastAck => "LAST_ACK",
        };
        f.write_str(name)
    }
}
