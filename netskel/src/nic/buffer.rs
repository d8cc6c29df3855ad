//! An owned packet buffer with headroom management.
use crate::wire::IpProtocol;

/// An owned packet buffer that grows its data region towards the front.
///
/// Outgoing segments are built inside-out. The buffer is allocated for the complete frame, the
/// whole length is reserved as headroom and each layer then pushes its header in front of the
/// current data. The data region is always a suffix of the allocation.
///
/// ```text
/// +-------------------------------+------------------+
/// |           headroom            |       data       |
/// +-------------------------------+------------------+
/// ^                               ^                  ^
/// 0                               data               tail
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketBuf {
    buffer: Vec<u8>,
    data: usize,
    tail: usize,
    protocol: Option<IpProtocol>,
}

/// A request could not be fulfilled with the available room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// Not enough headroom or tailroom for the requested change.
    #[error("packet buffer too small: requested {requested}, available {available}")]
    BadSize {
        /// The number of bytes requested.
        requested: usize,
        /// The number of bytes that were available.
        available: usize,
    },
}

impl PacketBuf {
    /// Allocate a zeroed buffer of `capacity` bytes with an empty data region at the front.
    pub fn new(capacity: usize) -> Self {
        PacketBuf {
            buffer: vec![0; capacity],
            data: 0,
            tail: 0,
            protocol: None,
        }
    }

    /// Move the empty data region `len` bytes back, turning tailroom into headroom.
    ///
    /// Only valid while the data region is empty.
    pub fn reserve(&mut self, len: usize) -> Result<(), Error> {
        debug_assert_eq!(self.data, self.tail, "reserve on a buffer holding data");
        let available = self.tailroom();
        if len > available {
            return Err(Error::BadSize { requested: len, available });
        }
        self.data += len;
        self.tail += len;
        Ok(())
    }

    /// Grow the data region by `len` bytes at the front and return the new header bytes.
    pub fn push(&mut self, len: usize) -> Result<&mut [u8], Error> {
        let available = self.headroom();
        if len > available {
            return Err(Error::BadSize { requested: len, available });
        }
        self.data -= len;
        Ok(&mut self.buffer[self.data..self.data + len])
    }

    /// Shrink the data region by `len` bytes at the front, returning the removed header bytes.
    pub fn pull(&mut self, len: usize) -> Result<&[u8], Error> {
        let available = self.len();
        if len > available {
            return Err(Error::BadSize { requested: len, available });
        }
        self.data += len;
        Ok(&self.buffer[self.data - len..self.data])
    }

    /// Grow the data region by `len` bytes at the back and return them.
    pub fn put(&mut self, len: usize) -> Result<&mut [u8], Error> {
        let available = self.tailroom();
        if len > available {
            return Err(Error::BadSize { requested: len, available });
        }
        self.tail += len;
        Ok(&mut self.buffer[self.tail - len..self.tail])
    }

    /// The bytes in front of the data region.
    pub fn headroom(&self) -> usize {
        self.data
    }

    /// The bytes behind the data region.
    pub fn tailroom(&self) -> usize {
        self.buffer.len() - self.tail
    }

    /// The length of the data region.
    pub fn len(&self) -> usize {
        self.tail - self.data
    }

    /// Check if the data region is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The size of the whole allocation.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The current data region.
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.data..self.tail]
    }

    /// The current data region, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[self.data..self.tail]
    }

    /// The transport protocol stamped on the buffer, if any.
    pub fn protocol(&self) -> Option<IpProtocol> {
        self.protocol
    }

    /// Stamp the transport protocol for the network layer.
    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.protocol = Some(protocol);
    }
}
