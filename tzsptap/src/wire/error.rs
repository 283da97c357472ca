use core::fmt;

/// The error type for parsing TZSP datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// An incoming datagram could not be parsed because it was shorter than assumed.
    ///
    /// The datagram may be shorter than the fixed header, end in the middle of the tagged field
    /// chain, or contain a field whose length byte claims more data than was received. In all
    /// cases nothing beyond the received bytes was read.
    TooShort,
}

/// The result type for parsing.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TooShort => write!(f, "truncated datagram"),
        }
    }
}

impl std::error::Error for Error {}
