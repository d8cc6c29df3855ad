//! The handshake and teardown of a connection.
use std::sync::PoisonError;

use crate::nic::{Device, PacketBuf};
use crate::wire::TcpPacket;

use super::{Connection, Error, Result, Signal, State};

impl<D: Device> Connection<D> {
    /// Actively open the connection with a three-way handshake.
    ///
    /// Sends a SYN, waits for the receive path to report the SYN-ACK through [`on_syn_ack`] and
    /// answers with the final ACK. On success the connection is `ESTABLISHED`.
    ///
    /// Failures leave the state where the handshake stopped: `CLOSED` if the SYN could not be sent
    /// or was not answered in time, `SYN_SENT` if the final ACK could not be sent. Calling `open`
    /// again from `SYN_SENT` only resends the final ACK.
    ///
    /// [`on_syn_ack`]: #method.on_syn_ack
    pub fn open(&self) -> Result<()> {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        let span = tracing::debug_span!("tcp_open", socket = %self.socket);
        let _enter = span.enter();

        let answered = self.with_shared(|shared| match shared.state {
            State::Closed => {
                shared.pending.clear(Signal::SynAck);
                Ok(false)
            },
            // The SYN-ACK was observed, only our ACK is missing.
            State::SynSent => Ok(true),
            other => Err(Error::AlreadyInitiated(other)),
        })?;

        if !answered {
            self.synchronize()?;
        }

        let ack = self.build_ack(self.remote_seq() + 1)?;
        self.send(ack)?;
        self.transition(State::SynSent, State::Established)
    }

    /// Send the SYN and wait for its answer, leaving `CLOSED` for `SYN_SENT`.
    fn synchronize(&self) -> Result<()> {
        let syn = self.build_syn()?;
        self.send(syn)?;

        match self.wait_for(Signal::SynAck, self.config.syn_ack_timeout) {
            Ok(()) => (),
            Err(Error::Timeout(_)) => return Err(Error::HandshakeTimeout),
            Err(err) => return Err(err),
        }

        // The SYN occupies one sequence number, acknowledged now.
        self.with_shared(|shared| {
            shared.local_seq += 1;
            shared.transition(State::Closed, State::SynSent)
        })
    }

    /// Close the connection.
    ///
    /// From `ESTABLISHED` this is the active close: send a FIN, wait for the peer's FIN-ACK
    /// reported through [`on_fin_ack`] and acknowledge it. From `CLOSE_WAIT`, entered when the
    /// peer closed first, this is the passive close: send a FIN and wait for its ACK reported
    /// through [`on_ack`].
    ///
    /// A timeout leaves the connection in `FIN_WAIT_1` or `LAST_ACK`. Calling `close` again from
    /// there retransmits the FIN with its original sequence number. A failed final ACK leaves
    /// `TIME_WAIT` from which `close` resends it. A FIN of the peer reported while our own is being
    /// sent turns the active close into a passive one.
    ///
    /// Fails with `NotEstablished` in any other state, without changing it.
    ///
    /// [`on_fin_ack`]: #method.on_fin_ack
    /// [`on_ack`]: #method.on_ack
    pub fn close(&self) -> Result<()> {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        let span = tracing::debug_span!("tcp_close", socket = %self.socket);
        let _enter = span.enter();

        let state = self.with_shared(|shared| {
            match shared.state {
                State::Established => {
                    shared.pending.clear(Signal::FinAck);
                    shared.pending.clear(Signal::Ack);
                },
                State::CloseWait => shared.pending.clear(Signal::Ack),
                _ => (),
            }
            shared.state
        });

        match state {
            State::Established => self.active_close(false),
            State::FinWait1 => self.active_close(true),
            State::TimeWait => self.acknowledge_fin(),
            State::CloseWait => self.passive_close(false),
            State::LastAck => self.passive_close(true),
            other => Err(Error::NotEstablished(other)),
        }
    }

    fn active_close(&self, retransmit: bool) -> Result<()> {
        let fin = self.build_fin_ack(self.remote_seq() + 1)?;
        self.send(fin)?;
        if !retransmit {
            let crossed = self.with_shared(|shared| {
                if shared.state == State::CloseWait {
                    shared.transition(State::CloseWait, State::LastAck).map(|()| true)
                } else {
                    shared.transition(State::Established, State::FinWait1).map(|()| false)
                }
            })?;

            // The peer's FIN arrived while ours was on the way. Finish as the passive side, the
            // retransmitted FIN also acknowledges theirs.
            if crossed {
                net_debug!("tcp {}: FIN crossed the peer's, closing passively", self.socket);
                return self.passive_close(true);
            }
        }

        self.wait_for(Signal::FinAck, self.config.fin_ack_timeout)?;

        // The peer acknowledged our FIN and sent its own.
        self.with_shared(|shared| {
            shared.local_seq += 1;
            shared.transition(State::FinWait1, State::FinWait2)?;
            shared.transition(State::FinWait2, State::TimeWait)
        })?;

        self.acknowledge_fin()
    }

    /// Send the final ACK of an active close and leave `TIME_WAIT`.
    fn acknowledge_fin(&self) -> Result<()> {
        let ack = self.build_ack(self.remote_seq() + 1)?;
        self.send(ack)?;
        self.transition(State::TimeWait, State::Closed)
    }

    fn passive_close(&self, retransmit: bool) -> Result<()> {
        let fin = self.build_fin_ack(self.remote_seq() + 1)?;
        self.send(fin)?;
        if !retransmit {
            self.transition(State::CloseWait, State::LastAck)?;
        }

        self.wait_for(Signal::Ack, self.config.ack_timeout)?;

        self.with_shared(|shared| {
            shared.local_seq += 1;
            shared.transition(State::LastAck, State::Closed)
        })
    }

    fn send(&self, packet: PacketBuf) -> Result<()> {
        net_trace!("tcp {}: send {}", self.socket, TcpPacket::new_unchecked(packet.data()));
        self.device.transmit(packet).map_err(|err| {
            net_debug!("tcp {}: {}", self.socket, err);
            Error::from(err)
        })
    }
}
