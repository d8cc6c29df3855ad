//! The receive side: queued segments and the blocking reader.
use core::ops::Range;
use std::collections::{vec_deque, VecDeque};
use std::sync::{Arc, PoisonError};

use crate::wire::{
    self,
    ipv4_header,
    IpProtocol,
    TcpPacket,
    TcpSeqNumber,
    ETHERNET_HEADER_LEN,
};

use super::{Connection, Error, Result};

/// A received segment holding payload for the reader.
///
/// The frame bytes are kept whole and shared, only the payload window is read from them.
#[derive(Clone, Debug)]
pub struct Segment {
    seq: TcpSeqNumber,
    bytes: Arc<[u8]>,
    payload: Range<usize>,
    consumed: usize,
}

impl Segment {
    /// Wrap `bytes` whose payload is `payload_len` bytes starting at `payload_start`.
    ///
    /// `seq` is the sequence number of the first payload byte. Fails with `Truncated` when the
    /// payload window does not fit into the bytes.
    pub fn new(
        seq: TcpSeqNumber,
        bytes: impl Into<Arc<[u8]>>,
        payload_start: usize,
        payload_len: usize,
    ) -> wire::Result<Self> {
        let bytes = bytes.into();
        let end = payload_start.checked_add(payload_len).ok_or(wire::Error::Truncated)?;
        if end > bytes.len() {
            return Err(wire::Error::Truncated);
        }

        Ok(Segment {
            seq,
            bytes,
            payload: payload_start..end,
            consumed: 0,
        })
    }

    /// Locate the payload of a whole Ethernet frame carrying IPv4 and TCP.
    ///
    /// The payload length is taken from the IPv4 total length and the TCP data offset, so
    /// trailing link layer padding is excluded.
    pub fn from_frame(frame: impl Into<Arc<[u8]>>) -> wire::Result<Self> {
        let frame = frame.into();
        let ip = frame.get(ETHERNET_HEADER_LEN..).ok_or(wire::Error::Truncated)?;
        ipv4_header::check_len(ip)?;
        if ipv4_header::protocol(ip) != IpProtocol::Tcp {
            return Err(wire::Error::Unsupported);
        }

        let tcp_start = ETHERNET_HEADER_LEN + ipv4_header::header_len(ip);
        let tcp_end = tcp_start + ipv4_header::payload_len(ip);
        let tcp = TcpPacket::new_checked(&frame[tcp_start..tcp_end])?;
        let payload_start = tcp_start + usize::from(tcp.header_len());
        let seq = tcp.seq_number();
        Segment::new(seq, frame, payload_start, tcp_end - payload_start)
    }

    /// The sequence number of the first payload byte.
    pub fn seq_number(&self) -> TcpSeqNumber {
        self.seq
    }

    /// The full payload length.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// The index of the first payload byte within the frame.
    pub fn payload_start(&self) -> usize {
        self.payload.start
    }

    /// How many payload bytes a reader already took.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// How many payload bytes are left for a reader.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.consumed
    }

    /// The whole payload, read or not.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.payload.clone()]
    }

    /// The payload not yet read.
    pub fn unread(&self) -> &[u8] {
        &self.payload()[self.consumed..]
    }

    fn unread_range(&self) -> Range<usize> {
        self.payload.start + self.consumed..self.payload.end
    }
}

/// Received segments in arrival order.
///
/// Only the head can be partially consumed.
#[derive(Debug, Default)]
pub struct RecvQueue {
    segments: VecDeque<Segment>,
}

impl RecvQueue {
    /// The number of queued segments, partially read ones included.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if no segment is queued.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment a reader takes from next.
    pub fn front(&self) -> Option<&Segment> {
        self.segments.front()
    }

    /// Iterate over the queued segments, oldest first.
    pub fn iter(&self) -> vec_deque::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// The number of payload bytes not yet read.
    pub fn pending_bytes(&self) -> usize {
        self.segments.iter().map(Segment::remaining).sum()
    }

    pub(crate) fn push(&mut self, segment: Segment) {
        self.segments.push_back(segment);
    }

    /// The shared frame of the head and the range of its unread payload.
    fn unread_head(&self) -> Option<(Arc<[u8]>, Range<usize>)> {
        self.segments.front().map(|head| (Arc::clone(&head.bytes), head.unread_range()))
    }

    /// Mark `taken` bytes of the head as read, dequeuing it when it is drained.
    ///
    /// A segment without payload is dequeued by taking zero bytes.
    fn consume(&mut self, taken: usize) {
        let drained = match self.segments.front_mut() {
            None => return,
            Some(head) => {
                debug_assert!(taken <= head.remaining());
                if taken >= head.remaining() {
                    true
                } else {
                    head.consumed += taken;
                    false
                }
            },
        };

        if drained {
            self.segments.pop_front();
        }
    }
}

impl<D> Connection<D> {
    /// Fill all of `buf` with received payload, blocking until enough has arrived.
    ///
    /// Segments are drained in arrival order. Bytes are copied outside the connection lock so the
    /// receive path is never held up by a slow copy. Concurrent readers are served one after the
    /// other. Does not look at the connection state, payload queued before a close can still be
    /// read.
    ///
    /// Returns the number of bytes read, which is `buf.len()` unless the connection was cancelled
    /// while waiting for more payload. Then the bytes copied so far are returned as a short read,
    /// or `Cancelled` if there were none.
    pub fn read_data(&self, buf: &mut [u8]) -> Result<usize> {
        let _reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let mut filled = 0;

        while filled < buf.len() {
            let head = {
                let mut shared = self.lock();
                loop {
                    if let Some(head) = shared.queue.unread_head() {
                        break Some(head);
                    }
                    if shared.cancelled {
                        break None;
                    }
                    shared = self.arrived
                        .wait(shared)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            let (bytes, unread) = match head {
                Some(head) => head,
                // Bytes already taken from the queue are handed out as a short read.
                None if filled > 0 => break,
                None => return Err(Error::Cancelled),
            };

            let take = unread.len().min(buf.len() - filled);
            buf[filled..filled + take].copy_from_slice(&bytes[unread.start..unread.start + take]);
            filled += take;

            self.lock().queue.consume(take);
        }

        net_trace!("tcp {}: read {} bytes", self.socket, filled);
        Ok(filled)
    }
}
