use core::fmt;
use byteorder::{ByteOrder, NetworkEndian};

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        /// Internet control message protocol.
        Icmp = 0x01,
        /// Transmission control protocol.
        Tcp  = 0x06,
        /// User datagram protocol.
        Udp  = 0x11,
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Tcp  => write!(f, "TCP"),
            Protocol::Udp  => write!(f, "UDP"),
            Protocol::Unknown(id) => write!(f, "0x{:02x}", id),
        }
    }
}

/// A four-octet IPv4 address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Address(pub [u8; 4]);

impl Address {
    /// An unspecified address.
    pub const UNSPECIFIED: Address = Address([0x00; 4]);

    /// Construct an IPv4 address from parts.
    pub const fn new(a0: u8, a1: u8, a2: u8, a3: u8) -> Address {
        Address([a0, a1, a2, a3])
    }

    /// Construct an IPv4 address from a sequence of octets, in big-endian.
    ///
    /// # Panics
    /// The function panics if `data` is not four octets long.
    pub fn from_bytes(data: &[u8]) -> Address {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(data);
        Address(bytes)
    }

    /// Return an IPv4 address as a sequence of octets, in big-endian.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<u32> for Address {
    fn from(host: u32) -> Self {
        Address(host.to_be_bytes())
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> Self {
        u32::from_be_bytes(addr.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let bytes = self.0;
        write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

/// Field accessors of an IPv4 header.
///
/// Only what the segment layer needs to locate the transport payload of a received frame. The
/// functions take the header bytes starting at the version field.
pub mod ipv4_header {
    use byteorder::{ByteOrder, NetworkEndian};

    use super::{Address, Protocol};
    use crate::wire::{Error, Result};
    use crate::wire::field::Field;

    const VER_IHL:  usize = 0;
    const LENGTH:   Field = 2..4;
    const PROTOCOL: usize = 9;
    const SRC_ADDR: Field = 12..16;
    const DST_ADDR: Field = 16..20;

    /// Ensure that no accessor will panic on `data`.
    ///
    /// Checks the version, that the header length covers the fixed header and that the total
    /// length neither undercuts the header nor exceeds the buffer.
    pub fn check_len(data: &[u8]) -> Result<()> {
        if data.len() < DST_ADDR.end {
            return Err(Error::Truncated);
        }
        if data[VER_IHL] >> 4 != 4 {
            return Err(Error::Unsupported);
        }
        let header_len = header_len(data);
        let total_len = usize::from(total_len(data));
        if header_len < DST_ADDR.end || total_len < header_len {
            Err(Error::Malformed)
        } else if data.len() < total_len {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the header length, in octets.
    pub fn header_len(data: &[u8]) -> usize {
        usize::from(data[VER_IHL] & 0x0f) * 4
    }

    /// Return the total length field, header included.
    pub fn total_len(data: &[u8]) -> u16 {
        NetworkEndian::read_u16(&data[LENGTH])
    }

    /// Return the length of the datagram payload.
    pub fn payload_len(data: &[u8]) -> usize {
        usize::from(total_len(data)) - header_len(data)
    }

    /// Return the protocol field.
    pub fn protocol(data: &[u8]) -> Protocol {
        Protocol::from(data[PROTOCOL])
    }

    /// Return the source address field.
    pub fn src_addr(data: &[u8]) -> Address {
        Address::from_bytes(&data[SRC_ADDR])
    }

    /// Return the destination address field.
    pub fn dst_addr(data: &[u8]) -> Address {
        Address::from_bytes(&data[DST_ADDR])
    }
}

/// RFC 1071 internet checksum helpers.
pub mod checksum {
    use super::*;

    fn propagate_carries(word: u32) -> u16 {
        let sum = (word >> 16) + (word & 0xffff);
        ((sum >> 16) as u16) + (sum as u16)
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum = 0;

        // For each 32-byte chunk...
        const CHUNK_SIZE: usize = 32;
        while data.len() >= CHUNK_SIZE {
            let mut d = &data[..CHUNK_SIZE];
            // ... take by 2 bytes and sum them.
            while d.len() >= 2 {
                accum += NetworkEndian::read_u16(d) as u32;
                d = &d[2..];
            }

            data = &data[CHUNK_SIZE..];
        }

        // Sum the rest that does not fit the last 32-byte chunk,
        // taking by 2 bytes.
        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u32;
            data = &data[2..];
        }

        // Add the last remaining odd byte, if any.
        if let Some(&value) = data.first() {
            accum += (value as u32) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u32 = 0;
        for &word in checksums {
            accum += word as u32;
        }
        propagate_carries(accum)
    }

    /// Compute an IPv4 pseudo header checksum.
    ///
    /// The pseudo header is never transmitted, it only binds the transport checksum to the
    /// addresses and protocol of the datagram carrying it.
    pub fn pseudo_header(src_addr: &Address, dst_addr: &Address,
                         protocol: Protocol, length: u32) -> u16 {
        let mut proto_len = [0u8; 4];
        proto_len[1] = protocol.into();
        NetworkEndian::write_u16(&mut proto_len[2..4], length as u16);

        combine(&[
            data(src_addr.as_bytes()),
            data(dst_addr.as_bytes()),
            data(&proto_len[..])
        ])
    }

    /// The complemented transport checksum over `segment` and the pseudo header.
    ///
    /// This is the value written into the checksum field. The field itself must be zero while
    /// computing it.
    pub fn transport(segment: &[u8], protocol: Protocol, src_addr: &Address, dst_addr: &Address)
        -> u16
    {
        !combine(&[
            pseudo_header(src_addr, dst_addr, protocol, segment.len() as u32),
            data(segment),
        ])
    }
}
