//! The process logic of protocol layers.
//!
//! ## Layering
//!
//! Each protocol layer is split into two parts; the packet logic contained in `wire` and the
//! processing part in this module. Only the transport layer is implemented here. Link and network
//! headers are left to the device, which receives buffers with enough headroom reserved for them.
pub mod tcp;
