use std::sync::{mpsc, Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use super::*;
use crate::nic::{Capture, Device, PacketBuf, SendError};
use crate::wire::{Ipv4Address, TcpFlags, TcpPacket, TcpRepr, TcpSeqNumber};

const SOCKET: SocketInfo = SocketInfo {
    local: Ipv4Address::new(10, 0, 0, 1),
    local_port: 49152,
    remote: Ipv4Address::new(10, 0, 0, 2),
    remote_port: 8080,
};

const ISN: TcpSeqNumber = TcpSeqNumber(1000);
const PEER_ISN: TcpSeqNumber = TcpSeqNumber(5000);
const PEER_FIN: TcpSeqNumber = TcpSeqNumber(5301);

type Conn = Connection<Arc<Capture>>;

/// How the simulated remote answers our control segments.
#[derive(Clone, Copy)]
struct Peer {
    answer_syn: bool,
    answer_fin: bool,
    /// Fail our transmission following the SYN-ACK with this code.
    fail_after_syn: Option<i32>,
    /// Fail our transmission following the FIN-ACK with this code.
    fail_after_fin: Option<i32>,
}

impl Peer {
    const SILENT: Peer = Peer {
        answer_syn: false,
        answer_fin: false,
        fail_after_syn: None,
        fail_after_fin: None,
    };

    const ANSWERING: Peer = Peer { answer_syn: true, answer_fin: true, ..Peer::SILENT };

    fn answer(self, conn: &Conn, repr: &TcpRepr) {
        if repr.flags == TcpFlags::SYN && self.answer_syn {
            if let Some(code) = self.fail_after_syn {
                conn.device().fail_next(code);
            }
            conn.on_syn_ack(PEER_ISN);
        } else if repr.flags.fin() && self.answer_fin {
            match conn.state() {
                // Our FIN answers theirs, acknowledge it.
                State::CloseWait | State::LastAck => conn.on_ack(repr.seq_number + 1),
                _ => {
                    if let Some(code) = self.fail_after_fin {
                        conn.device().fail_next(code);
                    }
                    conn.on_fin_ack(PEER_FIN)
                },
            }
        }
    }
}

fn setup(config: Config) -> (Arc<Conn>, mpsc::Receiver<PacketBuf>) {
    let capture = Arc::new(Capture::new());
    let tap = capture.tap();
    let conn = Arc::new(Connection::with_isn(SOCKET, capture, config, ISN));
    (conn, tap)
}

/// Answer every segment on `tap` as `peer` would.
///
/// The thread ends when the connection and with it the device is dropped.
fn spawn_peer(conn: &Arc<Conn>, tap: mpsc::Receiver<PacketBuf>, peer: Peer) {
    let weak: Weak<Conn> = Arc::downgrade(conn);
    thread::spawn(move || {
        for packet in tap.iter() {
            let conn = match weak.upgrade() {
                Some(conn) => conn,
                None => return,
            };
            peer.answer(&conn, &parse(&packet));
        }
    });
}

fn parse(packet: &PacketBuf) -> TcpRepr {
    let tcp = TcpPacket::new_checked(packet.data()).unwrap();
    assert!(tcp.verify_checksum(SOCKET.local, SOCKET.remote));
    TcpRepr::parse(&tcp).unwrap()
}

fn sent(conn: &Conn) -> Vec<TcpRepr> {
    conn.device().sent().iter().map(parse).collect()
}

fn short() -> Config {
    Config::default()
        .with_syn_ack_timeout(Duration::from_millis(50))
        .with_ack_timeout(Duration::from_millis(50))
        .with_fin_ack_timeout(Duration::from_millis(50))
}

/// An open connection whose peer then behaves as `peer`.
fn established(peer: Peer, config: Config) -> Arc<Conn> {
    let (conn, tap) = setup(config);
    spawn_peer(&conn, tap, Peer { answer_syn: true, ..peer });
    conn.open().unwrap();
    conn
}

#[test]
fn open_sends_syn_then_ack() {
    let (conn, tap) = setup(Config::default());
    spawn_peer(&conn, tap, Peer::ANSWERING);

    assert_eq!(conn.open(), Ok(()));
    assert_eq!(conn.state(), State::Established);
    assert_eq!(conn.transitions(), vec![
        (State::Closed, State::SynSent),
        (State::SynSent, State::Established),
    ]);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].flags, TcpFlags::SYN);
    assert_eq!(sent[0].seq_number, ISN);
    assert_eq!(sent[0].ack_number, TcpSeqNumber(0));
    assert_eq!(sent[0].window_len, DEFAULT_WINDOW);
    assert_eq!(sent[1].flags, TcpFlags::ACK);
    assert_eq!(sent[1].seq_number, ISN + 1);
    assert_eq!(sent[1].ack_number, PEER_ISN + 1);
    assert_eq!(conn.local_seq(), ISN + 1);
}

#[test]
fn open_without_syn_ack() {
    let (conn, tap) = setup(short());
    spawn_peer(&conn, tap, Peer::SILENT);

    assert_eq!(conn.open(), Err(Error::HandshakeTimeout));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.local_seq(), ISN);
    assert!(conn.transitions().is_empty());

    let sent = sent(&conn);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].flags, TcpFlags::SYN);
}

#[test]
fn open_twice() {
    let conn = established(Peer::ANSWERING, Config::default());
    assert_eq!(conn.open(), Err(Error::AlreadyInitiated(State::Established)));
    assert_eq!(conn.device().sent_count(), 2);
}

#[test]
fn open_syn_not_sent() {
    let (conn, _tap) = setup(short());
    conn.device().fail_next(-5);

    assert_eq!(conn.open(), Err(Error::SendFailed(-5)));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.device().sent_count(), 0);
}

#[test]
fn open_ack_not_sent() {
    let (conn, tap) = setup(Config::default());
    spawn_peer(&conn, tap, Peer { fail_after_syn: Some(-9), ..Peer::ANSWERING });

    assert_eq!(conn.open(), Err(Error::SendFailed(-9)));
    assert_eq!(conn.state(), State::SynSent);
    assert_eq!(conn.device().sent_count(), 1);
}

#[test]
fn open_resends_lost_ack() {
    let (conn, tap) = setup(Config::default());
    spawn_peer(&conn, tap, Peer { fail_after_syn: Some(-9), ..Peer::ANSWERING });
    assert_eq!(conn.open(), Err(Error::SendFailed(-9)));

    // No second SYN, the handshake only lacks our ACK.
    assert_eq!(conn.open(), Ok(()));
    assert_eq!(conn.state(), State::Established);
    assert_eq!(conn.transitions(), vec![
        (State::Closed, State::SynSent),
        (State::SynSent, State::Established),
    ]);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].flags, TcpFlags::SYN);
    assert_eq!(sent[1].flags, TcpFlags::ACK);
    assert_eq!(sent[1].seq_number, ISN + 1);
    assert_eq!(sent[1].ack_number, PEER_ISN + 1);
}

#[test]
fn close_when_closed() {
    let (conn, _tap) = setup(Config::default());
    assert_eq!(conn.close(), Err(Error::NotEstablished(State::Closed)));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.device().sent_count(), 0);
}

#[test]
fn active_close() {
    let conn = established(Peer::ANSWERING, Config::default());

    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.transitions()[2..], [
        (State::Established, State::FinWait1),
        (State::FinWait1, State::FinWait2),
        (State::FinWait2, State::TimeWait),
        (State::TimeWait, State::Closed),
    ]);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[2].flags, TcpFlags::FIN | TcpFlags::ACK);
    assert_eq!(sent[2].seq_number, ISN + 1);
    assert_eq!(sent[2].ack_number, PEER_ISN + 1);
    assert_eq!(sent[3].flags, TcpFlags::ACK);
    assert_eq!(sent[3].seq_number, ISN + 2);
    assert_eq!(sent[3].ack_number, PEER_FIN + 1);
}

#[test]
fn close_retransmits_fin() {
    let conn = established(Peer::SILENT, short());

    assert_eq!(conn.close(), Err(Error::Timeout(Signal::FinAck)));
    assert_eq!(conn.state(), State::FinWait1);

    conn.on_fin_ack(PEER_FIN);
    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[2].flags, sent[3].flags);
    assert_eq!(sent[2].seq_number, sent[3].seq_number);
    assert_eq!(sent[4].ack_number, PEER_FIN + 1);
}

#[test]
fn close_fin_not_sent() {
    let conn = established(Peer::ANSWERING, Config::default());
    conn.device().fail_next(-1);

    assert_eq!(conn.close(), Err(Error::SendFailed(-1)));
    assert_eq!(conn.state(), State::Established);
}

#[test]
fn close_final_ack_resent() {
    let conn = established(Peer { fail_after_fin: Some(-2), ..Peer::ANSWERING }, Config::default());

    assert_eq!(conn.close(), Err(Error::SendFailed(-2)));
    assert_eq!(conn.state(), State::TimeWait);

    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].flags, TcpFlags::ACK);
    assert_eq!(sent[3].ack_number, PEER_FIN + 1);
}

#[test]
fn passive_close() {
    let conn = established(Peer::ANSWERING, Config::default());
    conn.on_fin(PEER_FIN);
    assert_eq!(conn.state(), State::CloseWait);

    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.transitions()[2..], [
        (State::Established, State::CloseWait),
        (State::CloseWait, State::LastAck),
        (State::LastAck, State::Closed),
    ]);

    let sent = sent(&conn);
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2].flags, TcpFlags::FIN | TcpFlags::ACK);
    assert_eq!(sent[2].ack_number, PEER_FIN + 1);
}

#[test]
fn passive_close_timeout() {
    let conn = established(Peer::SILENT, short());
    conn.on_fin(PEER_FIN);

    assert_eq!(conn.close(), Err(Error::Timeout(Signal::Ack)));
    assert_eq!(conn.state(), State::LastAck);

    conn.on_ack(ISN + 2);
    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);
}

/// A remote answering from inside `transmit`, before the sender looks at the state again.
///
/// Its FIN is reported while our first FIN is being sent.
struct CrossingPeer {
    capture: Capture,
    conn: Mutex<Weak<Connection<Arc<CrossingPeer>>>>,
}

impl Device for CrossingPeer {
    fn transmit(&self, packet: PacketBuf) -> core::result::Result<(), SendError> {
        let repr = parse(&packet);
        self.capture.transmit(packet)?;

        let conn = match self.conn.lock().unwrap().upgrade() {
            Some(conn) => conn,
            None => return Ok(()),
        };
        if repr.flags == TcpFlags::SYN {
            conn.on_syn_ack(PEER_ISN);
        } else if repr.flags.fin() {
            match conn.state() {
                State::Established => conn.on_fin(PEER_FIN),
                State::LastAck => conn.on_ack(repr.seq_number + 1),
                _ => (),
            }
        }
        Ok(())
    }
}

#[test]
fn close_crossing_fins() {
    let peer = Arc::new(CrossingPeer { capture: Capture::new(), conn: Mutex::new(Weak::new()) });
    let conn = Arc::new(Connection::with_isn(SOCKET, Arc::clone(&peer), short(), ISN));
    *peer.conn.lock().unwrap() = Arc::downgrade(&conn);

    assert_eq!(conn.open(), Ok(()));
    assert_eq!(conn.close(), Ok(()));
    assert_eq!(conn.state(), State::Closed);
    assert_eq!(conn.transitions()[2..], [
        (State::Established, State::CloseWait),
        (State::CloseWait, State::LastAck),
        (State::LastAck, State::Closed),
    ]);

    let sent: Vec<TcpRepr> = peer.capture.sent().iter().map(parse).collect();
    assert_eq!(sent.len(), 4);
    assert!(sent[2].flags.fin() && sent[3].flags.fin());
    // The FIN is resent with the same number, now acknowledging theirs.
    assert_eq!(sent[2].seq_number, ISN + 1);
    assert_eq!(sent[3].seq_number, ISN + 1);
    assert_eq!(sent[2].ack_number, PEER_ISN + 1);
    assert_eq!(sent[3].ack_number, PEER_FIN + 1);
    assert_eq!(conn.local_seq(), ISN + 2);
}

#[test]
fn cancel_aborts_open() {
    let (conn, tap) = setup(Config::default().with_syn_ack_timeout(Duration::from_secs(10)));
    spawn_peer(&conn, tap, Peer::SILENT);

    let opener = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || conn.open())
    };
    thread::sleep(Duration::from_millis(20));
    conn.cancel();

    assert_eq!(opener.join().unwrap(), Err(Error::Cancelled));
    assert_eq!(conn.state(), State::Closed);
}

fn data(seq: TcpSeqNumber, fill: u8, len: usize) -> Segment {
    Segment::new(seq, vec![fill; len], 0, len).unwrap()
}

#[test]
fn read_spans_segments() {
    let (conn, _tap) = setup(Config::default());
    conn.on_segment_arrived(data(TcpSeqNumber(1), b'a', 300));
    conn.on_segment_arrived(data(TcpSeqNumber(301), b'b', 300));

    let mut buf = [0u8; 536];
    assert_eq!(conn.read_data(&mut buf), Ok(536));
    assert!(buf[..300].iter().all(|&b| b == b'a'));
    assert!(buf[300..].iter().all(|&b| b == b'b'));

    conn.inspect_queue(|queue| {
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().map(Segment::consumed), Some(236));
        assert_eq!(queue.pending_bytes(), 64);
    });
    assert_eq!(conn.remote_seq(), TcpSeqNumber(600));
}

#[test]
fn read_large_segment_in_chunks() {
    let (conn, _tap) = setup(Config::default());
    let payload: Vec<u8> = (0..1460).map(|i| i as u8).collect();
    conn.on_segment_arrived(Segment::new(TcpSeqNumber(1), payload.clone(), 0, 1460).unwrap());

    let mut read = Vec::new();
    for &len in &[536, 536, 388] {
        let mut buf = vec![0; len];
        assert_eq!(conn.read_data(&mut buf), Ok(len));
        read.extend_from_slice(&buf);
    }

    assert_eq!(read, payload);
    assert!(conn.inspect_queue(RecvQueue::is_empty));
}

#[test]
fn read_blocks_for_data() {
    let (conn, _tap) = setup(Config::default());
    let reader = {
        let conn = Arc::clone(&conn);
        thread::spawn(move || {
            let mut buf = [0u8; 10];
            conn.read_data(&mut buf).map(|len| (len, buf))
        })
    };

    conn.on_segment_arrived(data(TcpSeqNumber(1), 1, 4));
    thread::sleep(Duration::from_millis(20));
    conn.on_segment_arrived(data(TcpSeqNumber(5), 2, 6));

    let (len, buf) = reader.join().unwrap().unwrap();
    assert_eq!(len, 10);
    assert_eq!(buf, [1, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
}

#[test]
fn read_empty_buffer() {
    let (conn, _tap) = setup(Config::default());
    assert_eq!(conn.read_data(&mut []), Ok(0));
}

#[test]
fn read_cancelled() {
    let (conn, _tap) = setup(Config::default());
    conn.on_segment_arrived(data(TcpSeqNumber(1), 7, 3));
    conn.cancel();

    // What was queued before the cancel is still handed out.
    let mut buf = [0u8; 8];
    assert_eq!(conn.read_data(&mut buf), Ok(3));
    assert_eq!(&buf[..3], &[7, 7, 7]);
    assert!(conn.inspect_queue(RecvQueue::is_empty));

    assert_eq!(conn.read_data(&mut buf), Err(Error::Cancelled));
}

#[test]
fn read_cancelled_while_waiting() {
    let (conn, _tap) = setup(Config::default());
    conn.on_segment_arrived(data(TcpSeqNumber(1), 4, 2));

    let reader = Arc::clone(&conn);
    let read = thread::spawn(move || {
        let mut buf = [0u8; 6];
        let result = reader.read_data(&mut buf);
        (result, buf)
    });

    // Give the reader time to drain the queue and block.
    thread::sleep(Duration::from_millis(50));
    conn.cancel();

    let (result, buf) = read.join().unwrap();
    assert_eq!(result, Ok(2));
    assert_eq!(buf, [4, 4, 0, 0, 0, 0]);
}
