//! The TCP segment layer of a minimal user-space network stack.
//!
//! ## Table of contents
//!
//! 1. [Design](#design-and-relevant-core-concepts)
//! 2. [The wire module](wire/index.html)
//! 3. [Network interfaces](nic/index.html)
//! 4. [The tcp layer](layer/tcp/index.html)
//!    1. [Opening and closing](layer/tcp/index.html#opening-a-connection)
//!    1. [Reading](layer/tcp/index.html#reading)
//!
//! ## Design and relevant core concepts
//!
//! The crate covers only the lifecycle subset of TCP: building outbound control segments, the
//! three-way handshake, the active and passive close and handing received payload to a blocking
//! reader. Everything around it is treated as a collaborator behind a trait. The device allocates
//! packet buffers, computes checksums and transmits; a receive thread that is not part of this
//! crate demultiplexes incoming datagrams and calls the notification methods of a
//! [`Connection`].
//!
//! There is no congestion control, no retransmission of data, no window scaling and no
//! out-of-order reassembly. Segments are assumed to arrive in order and are delivered to the
//! reader strictly in arrival order.
//!
//! A connection is shared between at least two threads, the application calling `open`, `close`
//! and `read_data` and the receive path calling `on_*`. All mutable connection data sits behind a
//! single per-connection lock. Independent connections never contend.
//!
//! [`Connection`]: layer/tcp/struct.Connection.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod layer;
pub mod nic;
pub mod wire;
