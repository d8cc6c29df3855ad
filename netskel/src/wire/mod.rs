/*! Low-level packet access and construction.

# An overview over packet representations

The `wire` module deals with the packet *representation*, never with connection state. It
provides two levels of functionality.

 * First, it provides functions to extract fields from sequences of octets, and to insert fields
   into sequences of octets. This happens in the header views, e.g. [`TcpPacket`] or the
   [`ipv4_header`] accessors.
 * Second, it provides a compact, high-level representation of header data that can be created
   from parsing and emitted into a sequence of octets. This happens through the `Repr` structs,
   e.g. [`TcpRepr`].

All multi-byte fields are big-endian on the wire regardless of host order. Accessors go through
`byteorder::NetworkEndian` and never through a reinterpreted struct.

[`TcpPacket`]: struct.TcpPacket.html
[`ipv4_header`]: ipv4_header/index.html
[`TcpRepr`]: struct.TcpRepr.html

The header view guarantees that, if `check_len()` returned `Ok(())`, no field accessor or setter
will panic. When parsing untrusted input, it is *necessary* to use `new_checked` or call
`check_len`. When emitting output, the buffer length is given by `Repr::buffer_len()`.

# Examples

To emit a TCP header into an octet buffer, and then parse it back:

```rust
use netskel::wire::*;

let repr = TcpRepr {
    src_port: 49152,
    dst_port: 80,
    flags: TcpFlags::SYN,
    seq_number: TcpSeqNumber(1000),
    ack_number: TcpSeqNumber(0),
    window_len: 64240,
    payload_len: 0,
};
let mut buffer = vec![0; repr.buffer_len()];
repr.emit(&mut TcpPacket::new_unchecked(&mut buffer[..]));

let packet = TcpPacket::new_checked(&buffer[..]).expect("truncated packet");
assert_eq!(TcpRepr::parse(&packet).expect("malformed packet"), repr);
```
*/
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD

// Most header fields are self-explanatory and the module documentation is the general guide.
#![allow(missing_docs)]

mod field {
    pub(crate) type Field = ::core::ops::Range<usize>;
}

mod error;
pub(crate) mod ip;
mod tcp;

pub use self::error::{
    Error,
    Result};

pub use self::ip::{
    checksum,
    ipv4_header,
    Address as Ipv4Address,
    Protocol as IpProtocol};

pub use self::tcp::{
    Flags as TcpFlags,
    Packet as TcpPacket,
    Repr as TcpRepr,
    SeqNumber as TcpSeqNumber,
    HEADER_LEN as TCP_HEADER_LEN};

/// Length of an Ethernet II header without VLAN tags.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Length of an IPv4 header without options.
pub const IPV4_HEADER_LEN: usize = 20;
