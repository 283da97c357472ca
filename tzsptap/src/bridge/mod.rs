//! The forwarding loop.
//!
//! A [`Bridge`] owns one datagram [`Source`] and one [`Tunnel`]. Every iteration takes a single
//! datagram off the source, decodes it as a [`TzspFrame`] and writes the encapsulated frame, if
//! there is one, to the tunnel. Nothing a remote peer sends ends the loop: malformed datagrams are
//! dropped, failed writes are counted, and the loop goes on with the next datagram.
//!
//! ## Stopping
//!
//! The loop checks a shared [`AtomicBool`] between iterations. Sources wait a bounded time for
//! the next datagram (see [`Received::NoData`]) so a flag set from a signal handler is seen
//! within one poll interval even when no traffic arrives. Only a source that reports itself as
//! unusable ends the loop early, with an error.
//!
//! Releasing the tunnel is left to the owner of the bridge, after `run` has returned. Dropping the
//! bridge releases it as well, at most once in total.
//!
//! ## Opening the system devices
//!
//! With the `sys` feature the module also offers [`bind`] and [`open_tap`] which resolve,
//! allocate and report the startup failures in terms of this module's [`Error`].
//!
//! [`AtomicBool`]: https://doc.rust-lang.org/std/sync/atomic/struct.AtomicBool.html
//! [`Bridge`]: struct.Bridge.html
//! [`Error`]: enum.Error.html
//! [`Received::NoData`]: ../nic/enum.Received.html#variant.NoData
//! [`Source`]: ../nic/trait.Source.html
//! [`Tunnel`]: ../nic/trait.Tunnel.html
//! [`TzspFrame`]: ../wire/struct.TzspFrame.html
//! [`bind`]: fn.bind.html
//! [`open_tap`]: fn.open_tap.html
use core::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::nic::{Received, Source, Tunnel};
use crate::wire::{self, TzspFrame};

#[cfg(test)]
mod tests;

/// The size of the receive buffer.
///
/// Larger datagrams are truncated to this length by the source and will most likely fail to
/// parse or carry a cut off frame.
pub const RECV_BUFFER_LEN: usize = 10_000;

/// The default UDP port of TZSP senders.
pub const DEFAULT_PORT: u16 = 37008;

/// Forwards decapsulated frames from a source into a tunnel.
pub struct Bridge<S: Source, T: Tunnel> {
    source: S,
    tunnel: T,
    buffer: Vec<u8>,
    stats: Stats,
    released: bool,
}

/// What happened during a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No datagram arrived within the poll interval.
    Idle,

    /// Receiving failed but the source remains usable.
    ReceiveFailed,

    /// The datagram could not be decoded and was dropped.
    Malformed {
        /// The length of the datagram.
        len: usize,
        /// Why decoding failed.
        error: wire::Error,
    },

    /// The datagram was valid but carried no frame.
    Empty,

    /// A frame was written to the tunnel.
    Forwarded {
        /// The length of the frame.
        len: usize,
    },

    /// The tunnel did not accept the frame.
    WriteFailed {
        /// The length of the frame.
        len: usize,
    },
}

/// Counters over the lifetime of a bridge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Datagrams taken from the source.
    pub received: u64,
    /// Frames written to the tunnel.
    pub forwarded: u64,
    /// Datagrams dropped as malformed.
    pub malformed: u64,
    /// Well-formed datagrams without a frame.
    pub empty: u64,
    /// Frames the tunnel did not accept.
    pub write_failed: u64,
}

/// Failures ending the bridge or preventing its start.
#[derive(Debug)]
pub enum Error {
    /// The listen host could not be resolved to an address.
    Resolve {
        /// The host as given.
        host: String,
        /// The resolver error.
        err: io::Error,
    },

    /// The socket could not be opened or bound.
    Bind {
        /// The address to bind to.
        addr: SocketAddr,
        /// The system error.
        err: io::Error,
    },

    /// The source became unusable.
    Receive(io::Error),

    /// No tunnel interface could be allocated.
    Allocate {
        /// The requested name, possibly a template.
        name: String,
        /// The system error.
        err: io::Error,
    },

    /// The tunnel interface could not be brought up.
    Activate {
        /// The name of the interface.
        name: String,
        /// The system error.
        err: io::Error,
    },
}

impl<S: Source, T: Tunnel> Bridge<S, T> {
    /// Create a bridge from a source and a tunnel.
    ///
    /// Does not activate the tunnel, see [`activate`].
    ///
    /// [`activate`]: #method.activate
    pub fn new(source: S, tunnel: T) -> Self {
        Bridge {
            source,
            tunnel,
            buffer: vec![0; RECV_BUFFER_LEN],
            stats: Stats::default(),
            released: false,
        }
    }

    /// Bring the tunnel up.
    pub fn activate(&mut self) -> Result<(), Error> {
        self.tunnel.activate().map_err(|err| Error::Activate {
            name: self.tunnel.name().to_owned(),
            err,
        })
    }

    /// Run a single iteration.
    ///
    /// Returns an error only if the source became unusable. Every other failure is part of the
    /// returned `Step`.
    pub fn forward_one(&mut self) -> Result<Step, Error> {
        let (len, from) = match self.source.recv(&mut self.buffer) {
            Ok(Received::NoData) => return Ok(Step::Idle),
            Ok(Received::Datagram { len, from }) => (len, from),
            Err(err) => {
                if self.source.is_closed(&err) {
                    return Err(Error::Receive(err));
                }
                net_warn!("receive failed: {}", err);
                return Ok(Step::ReceiveFailed);
            },
        };

        self.stats.received += 1;
        match from {
            Some(from) => net_debug!("received {} bytes from {}", len, from),
            None => net_debug!("received {} bytes", len),
        }

        let frame = match TzspFrame::parse(&self.buffer[..len]) {
            Ok(frame) => frame,
            Err(error) => {
                self.stats.malformed += 1;
                net_debug!("dropping datagram of {} bytes: {}", len, error);
                return Ok(Step::Malformed { len, error });
            },
        };

        net_trace!("{}", frame);

        let payload = match frame.payload() {
            Some(payload) => payload,
            None => {
                self.stats.empty += 1;
                net_debug!("no frame in datagram of {} bytes", len);
                return Ok(Step::Empty);
            },
        };

        match self.tunnel.send(payload) {
            Ok(_) => {
                self.stats.forwarded += 1;
                Ok(Step::Forwarded { len: payload.len() })
            },
            Err(err) => {
                self.stats.write_failed += 1;
                net_warn!("writing {} bytes to {} failed: {}", payload.len(), self.tunnel.name(), err);
                Ok(Step::WriteFailed { len: payload.len() })
            },
        }
    }

    /// Forward datagrams until `shutdown` is set.
    ///
    /// The flag is checked before every iteration. Returns the counters at the time the loop
    /// ended, or the error of a source that became unusable.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<Stats, Error> {
        while !shutdown.load(Ordering::SeqCst) {
            self.forward_one()?;
        }

        Ok(self.stats)
    }

    /// The counters so far.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// A reference to the tunnel.
    pub fn tunnel(&self) -> &T {
        &self.tunnel
    }

    /// Release the tunnel.
    ///
    /// Calls after the first are no-ops, including the implicit one on drop.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }

        self.released = true;
        self.tunnel.release();
    }
}

impl<S: Source, T: Tunnel> Drop for Bridge<S, T> {
    fn drop(&mut self) {
        self.shutdown()
    }
}

/// Resolve the host and bind a socket to its first address.
#[cfg(feature = "sys")]
pub fn bind(host: &str, port: u16) -> Result<crate::nic::sys::UdpSocket, Error> {
    use std::net::ToSocketAddrs;

    let resolve_err = |err| Error::Resolve { host: host.to_owned(), err };

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| resolve_err(io::ErrorKind::NotFound.into()))?;

    crate::nic::sys::UdpSocket::bind(addr)
        .map_err(|err| Error::Bind { addr, err: err.into() })
}

/// Allocate a new tap interface.
///
/// The interface is not yet up, see [`Bridge::activate`].
///
/// [`Bridge::activate`]: struct.Bridge.html#method.activate
#[cfg(all(feature = "sys", any(target_os = "linux", target_os = "freebsd")))]
pub fn open_tap(template: &str) -> Result<crate::nic::sys::TapInterface, Error> {
    crate::nic::sys::TapInterface::new(template)
        .map_err(|err| Error::Allocate { name: template.to_owned(), err: err.into() })
}

impl<S, T> fmt::Debug for Bridge<S, T>
where
    S: Source + fmt::Debug,
    T: Tunnel + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("source", &self.source)
            .field("tunnel", &self.tunnel)
            .field("buffer_len", &self.buffer.len())
            .field("stats", &self.stats)
            .field("released", &self.released)
            .finish()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "received={} forwarded={} malformed={} empty={} write_failed={}",
            self.received, self.forwarded, self.malformed, self.empty, self.write_failed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Resolve { host, err } => write!(f, "can not resolve {}: {}", host, err),
            Error::Bind { addr, err } => write!(f, "can not bind to {}: {}", addr, err),
            Error::Receive(err) => write!(f, "receiving failed: {}", err),
            Error::Allocate { name, err } => write!(f, "can not allocate tunnel {}: {}", name, err),
            Error::Activate { name, err } => write!(f, "can not activate tunnel {}: {}", name, err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolve { err, .. }
            | Error::Bind { err, .. }
            | Error::Allocate { err, .. }
            | Error::Activate { err, .. }
            | Error::Receive(err) => Some(err),
        }
    }
}
