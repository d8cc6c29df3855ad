/// The error type for parsing packets of the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An incoming packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length specified, or a length field may claim
    /// more data than the buffer holds.
    #[error("truncated packet")]
    Truncated,

    /// An incoming packet had an incorrect checksum and was dropped.
    #[error("checksum error")]
    WrongChecksum,

    /// An incoming packet was recognized but was self-contradictory.
    ///
    /// Examples: a TCP header length field smaller than the minimal header, an IPv4 total length
    /// shorter than its own header.
    #[error("malformed packet")]
    Malformed,

    /// Parsing depends on a feature we do not implement.
    ///
    /// An example is an IP version other than 4.
    #[error("unsupported option")]
    Unsupported,
}

/// The result type for the wire module.
pub type Result<T> = core::result::Result<T, Error>;
