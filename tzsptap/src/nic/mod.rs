//! Encapsulates the datagram source and the tunnel device.
//!
//! The forwarding loop only relies on the two traits of this module. The operating system backed
//! implementations live in [`sys`], an in-memory software implementation of both is [`Loopback`].
//!
//! [`sys`]: sys/index.html
//! [`Loopback`]: struct.Loopback.html
use std::io;
use std::net::SocketAddr;

mod loopback;

#[cfg(feature = "sys")]
#[path="sys/mod.rs"]
mod sys_internal;

pub use self::loopback::Loopback;

#[cfg(feature = "sys")]
pub use self::sys_internal::exports as sys;

/// The outcome of waiting for a datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Received {
    /// Nothing arrived in time, or the wait was interrupted.
    ///
    /// Gives the caller a chance to check for shutdown before waiting again.
    NoData,

    /// One datagram was written to the start of the buffer.
    Datagram {
        /// The number of bytes received.
        ///
        /// A datagram larger than the buffer is truncated to the buffer length.
        len: usize,
        /// The sender, if known.
        from: Option<SocketAddr>,
    },
}

/// A source of datagrams, usually a bound UDP socket.
pub trait Source {
    /// Wait for one datagram and copy it into `buffer`.
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received>;

    /// Check whether an error returned by `recv` leaves the source unusable.
    ///
    /// Errors for which this returns `false` are treated as transient and the source is polled
    /// again.
    fn is_closed(&self, err: &io::Error) -> bool {
        let _ = err;
        false
    }
}

/// A virtual network interface accepting raw frames.
///
/// Every frame written is injected into the host network stack as if it had been received on the
/// interface.
pub trait Tunnel {
    /// The name of the interface on the host.
    fn name(&self) -> &str;

    /// Bring the interface up.
    fn activate(&mut self) -> io::Result<()>;

    /// Write one frame to the interface.
    fn send(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Close the interface and release all associated resources.
    ///
    /// Must be idempotent. Calls after the first have no effect and never fail.
    fn release(&mut self);
}

impl<S: Source + ?Sized> Source for &'_ mut S {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received> {
        (**self).recv(buffer)
    }

    fn is_closed(&self, err: &io::Error) -> bool {
        (**self).is_closed(err)
    }
}

impl<T: Tunnel + ?Sized> Tunnel for &'_ mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn activate(&mut self) -> io::Result<()> {
        (**self).activate()
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        (**self).send(frame)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
