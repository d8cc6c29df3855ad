//! The device side of the segment layer.
//!
//! Building and sending a segment needs three things from below: memory for a packet buffer, the
//! transport checksum and a way to hand the finished buffer to the network layer. All three are
//! bundled in the [`Device`] trait. Only `transmit` is required, allocation and checksumming have
//! software implementations that a device may replace, e.g. to hand out pooled buffers or to
//! offload the checksum.
//!
//! [`Device`]: trait.Device.html
use std::sync::Arc;

use crate::wire::{checksum, IpProtocol, Ipv4Address};

mod buffer;
mod capture;

pub use self::buffer::{
    Error as BufferError,
    PacketBuf};

pub use self::capture::Capture;

/// The network layer refused or failed to send a buffer.
///
/// The code is passed through from the layer below untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[error("transmission failed with code {code}")]
pub struct SendError {
    /// The failure code reported by the network layer.
    pub code: i32,
}

/// A network device carrying tcp segments.
///
/// A connection is used from the application thread and the receive thread at once, so a device
/// must be shareable between threads. All methods take `&self`.
pub trait Device: Send + Sync {
    /// Allocate a packet buffer of `len` bytes with an empty data region.
    fn alloc(&self, len: usize) -> PacketBuf {
        PacketBuf::new(len)
    }

    /// Compute the transport checksum over `segment` and the IPv4 pseudo header.
    ///
    /// The checksum field inside `segment` is zero when this is called. The result is written
    /// into the field as is.
    fn checksum(
        &self,
        segment: &[u8],
        protocol: IpProtocol,
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
    ) -> u16 {
        checksum::transport(segment, protocol, &src_addr, &dst_addr)
    }

    /// Hand a finished buffer to the network layer.
    fn transmit(&self, packet: PacketBuf) -> Result<(), SendError>;
}

impl<D: Device + ?Sized> Device for &'_ D {
    fn alloc(&self, len: usize) -> PacketBuf {
        (**self).alloc(len)
    }

    fn checksum(
        &self,
        segment: &[u8],
        protocol: IpProtocol,
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
    ) -> u16 {
        (**self).checksum(segment, protocol, src_addr, dst_addr)
    }

    fn transmit(&self, packet: PacketBuf) -> Result<(), SendError> {
        (**self).transmit(packet)
    }
}

impl<D: Device + ?Sized> Device for Arc<D> {
    fn alloc(&self, len: usize) -> PacketBuf {
        (**self).alloc(len)
    }

    fn checksum(
        &self,
        segment: &[u8],
        protocol: IpProtocol,
        src_addr: Ipv4Address,
        dst_addr: Ipv4Address,
    ) -> u16 {
        (**self).checksum(segment, protocol, src_addr, dst_addr)
    }

    fn transmit(&self, packet: PacketBuf) -> Result<(), SendError> {
        (**self).transmit(packet)
    }
}
