//! Building outgoing control segments.
use core::convert::TryFrom;

use crate::nic::{BufferError, Device, PacketBuf};
use crate::wire::{
    IpProtocol,
    TcpFlags,
    TcpPacket,
    TcpRepr,
    TcpSeqNumber,
    ETHERNET_HEADER_LEN,
    IPV4_HEADER_LEN,
    TCP_HEADER_LEN,
};

use super::{Connection, Result, SocketInfo};

/// Write a TCP header for `socket` into the front of `segment` and checksum the whole segment.
///
/// `segment` is the header followed by the payload, which must already be in place. The
/// checksum covers both and the IPv4 pseudo header, computed by the device.
///
/// Fails with `Buffer` if `segment` is shorter than a header or its payload does not fit the
/// 16-bit length of the pseudo header. Nothing is written then.
pub fn write_header<D: Device + ?Sized>(
    device: &D,
    segment: &mut [u8],
    socket: &SocketInfo,
    flags: TcpFlags,
    seq_number: TcpSeqNumber,
    ack_number: TcpSeqNumber,
    window_len: u16,
) -> Result<()> {
    let payload_len = segment.len()
        .checked_sub(TCP_HEADER_LEN)
        .ok_or(BufferError::BadSize { requested: TCP_HEADER_LEN, available: segment.len() })?;
    let payload_len = u16::try_from(payload_len).map_err(|_| BufferError::BadSize {
        requested: segment.len(),
        available: TCP_HEADER_LEN + usize::from(u16::MAX),
    })?;

    let repr = TcpRepr {
        src_port: socket.local_port,
        dst_port: socket.remote_port,
        flags,
        seq_number,
        ack_number,
        window_len,
        payload_len,
    };

    let mut packet = TcpPacket::new_unchecked(&mut *segment);
    repr.emit(&mut packet);
    let checksum = device.checksum(packet.into_inner(), IpProtocol::Tcp, socket.local, socket.remote);
    TcpPacket::new_unchecked(segment).set_checksum(checksum);
    Ok(())
}

/// Allocate a buffer for a segment with `payload_len` bytes of payload.
///
/// The whole frame is reserved as headroom so the header and lower layers can be pushed in front.
fn alloc_segment<D: Device>(device: &D, payload_len: usize) -> core::result::Result<PacketBuf, BufferError> {
    let total = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + TCP_HEADER_LEN + payload_len;
    let mut packet = device.alloc(total);
    packet.reserve(total)?;
    packet.set_protocol(IpProtocol::Tcp);
    Ok(packet)
}

impl<D: Device> Connection<D> {
    /// Build a SYN carrying the current local sequence number.
    pub fn build_syn(&self) -> Result<PacketBuf> {
        self.build_control(TcpFlags::SYN, TcpSeqNumber::default())
    }

    /// Build a pure ACK acknowledging up to `ack`.
    pub fn build_ack(&self, ack: TcpSeqNumber) -> Result<PacketBuf> {
        self.build_control(TcpFlags::ACK, ack)
    }

    /// Build a FIN that also acknowledges up to `ack`.
    pub fn build_fin_ack(&self, ack: TcpSeqNumber) -> Result<PacketBuf> {
        self.build_control(TcpFlags::FIN | TcpFlags::ACK, ack)
    }

    fn build_control(&self, flags: TcpFlags, ack: TcpSeqNumber) -> Result<PacketBuf> {
        let mut packet = alloc_segment(&self.device, 0)?;
        let seq = self.local_seq();
        let segment = packet.push(TCP_HEADER_LEN)?;
        write_header(&self.device, segment, &self.socket, flags, seq, ack, self.config.window)?;
        Ok(packet)
    }
}
