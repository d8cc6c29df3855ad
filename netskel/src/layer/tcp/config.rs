use std::time::Duration;

use super::Signal;

/// The receive window advertised in every emitted segment.
pub const DEFAULT_WINDOW: u16 = 64240;

/// Timing and header parameters of a connection.
///
/// Fixed when the connection is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Config {
    /// How long an open waits for the SYN-ACK.
    pub syn_ack_timeout: Duration,

    /// How long a passive close waits for the ACK of its FIN.
    pub ack_timeout: Duration,

    /// How long an active close waits for the FIN-ACK.
    pub fin_ack_timeout: Duration,

    /// The advertised receive window.
    pub window: u16,
}

impl Config {
    /// Change the SYN-ACK timeout.
    pub fn with_syn_ack_timeout(self, syn_ack_timeout: Duration) -> Self {
        Config { syn_ack_timeout, ..self }
    }

    /// Change the ACK timeout.
    pub fn with_ack_timeout(self, ack_timeout: Duration) -> Self {
        Config { ack_timeout, ..self }
    }

    /// Change the FIN-ACK timeout.
    pub fn with_fin_ack_timeout(self, fin_ack_timeout: Duration) -> Self {
        Config { fin_ack_timeout, ..self }
    }

    /// Change the advertised window.
    pub fn with_window(self, window: u16) -> Self {
        Config { window, ..self }
    }

    /// The configured timeout for waiting on `signal`.
    pub fn timeout(&self, signal: Signal) -> Duration {
        match signal {
            Signal::SynAck => self.syn_ack_timeout,
            Signal::Ack => self.ack_timeout,
            Signal::FinAck => self.fin_ack_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            syn_ack_timeout: Duration::from_secs(1),
            ack_timeout: Duration::from_secs(5),
            fin_ack_timeout: Duration::from_secs(5),
            window: DEFAULT_WINDOW,
        }
    }
}
