use core::mem;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::{RawFd, AsRawFd};
use std::time::Duration;

use libc;
use super::{wait, Errno, FdResult, IoLenResult, LibcResult};

use crate::nic::{Received, Source};

/// A bound UDP socket, usable as a datagram source.
///
/// The socket is blocking. As a [`Source`] it waits at most for its poll interval before
/// reporting that no datagram arrived, so that the caller can react to shutdown requests.
///
/// [`Source`]: ../trait.Source.html
#[derive(Debug)]
pub struct UdpSocket {
    lower: libc::c_int,
    poll: Option<Duration>,
}

impl AsRawFd for UdpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl UdpSocket {
    /// The poll interval of a newly bound socket.
    pub const DEFAULT_POLL: Duration = Duration::from_secs(1);

    /// Open a socket of the address' family and bind it.
    ///
    /// Sets `SO_REUSEADDR` before binding, so a restarted bridge can take over the port
    /// immediately.
    pub fn bind(addr: SocketAddr) -> Result<Self, Errno> {
        let family = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };

        let lower = unsafe {
            libc::socket(family, libc::SOCK_DGRAM, 0)
        };

        FdResult(lower).errno()?;

        // From here on, dropping closes the descriptor on every error path.
        let socket = UdpSocket {
            lower,
            poll: Some(Self::DEFAULT_POLL),
        };

        let on: libc::c_int = 1;
        let res = unsafe {
            libc::setsockopt(
                socket.lower,
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                &on as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t)
        };

        FdResult(res).errno()?;

        let (storage, len) = to_sockaddr(&addr);
        let res = unsafe {
            libc::bind(
                socket.lower,
                &storage as *const libc::sockaddr_storage as *const libc::sockaddr,
                len)
        };

        FdResult(res).errno()?;

        Ok(socket)
    }

    /// Change the longest time `recv` waits for a datagram.
    ///
    /// With `None` it blocks until a datagram arrives or a signal interrupts the wait.
    pub fn set_poll_interval(&mut self, poll: Option<Duration>) {
        self.poll = poll;
    }

    /// Query the address the socket is bound to.
    ///
    /// Useful to find the port chosen by the system after binding to port `0`.
    pub fn local_addr(&self) -> Result<SocketAddr, Errno> {
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let res = unsafe {
            libc::getsockname(
                self.lower,
                &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                &mut len)
        };

        FdResult(res).errno()?;

        from_sockaddr(&storage).ok_or(Errno(libc::EAFNOSUPPORT))
    }

    /// Receive a single datagram into the buffer, blocking until one arrives.
    ///
    /// Excess bytes of a datagram longer than the buffer are discarded.
    pub fn recv_from(&mut self, buffer: &mut [u8]) -> Result<(usize, Option<SocketAddr>), Errno> {
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let res = unsafe {
            libc::recvfrom(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
                &mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr,
                &mut len)
        };

        IoLenResult(res).errno()?;

        Ok((res as usize, from_sockaddr(&storage)))
    }
}

impl Source for UdpSocket {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received> {
        match wait(self.lower, self.poll) {
            Ok(true) => (),
            Ok(false) => return Ok(Received::NoData),
            Err(ref err) if err.is_retry() => return Ok(Received::NoData),
            Err(err) => return Err(err.into()),
        }

        match self.recv_from(buffer) {
            Ok((len, from)) => Ok(Received::Datagram { len, from }),
            Err(ref err) if err.is_retry() => Ok(Received::NoData),
            Err(err) => Err(err.into()),
        }
    }

    fn is_closed(&self, err: &io::Error) -> bool {
        match err.raw_os_error() {
            Some(libc::EBADF) | Some(libc::ENOTSOCK) | Some(libc::EINVAL) | Some(libc::EFAULT) => true,
            _ => false,
        }
    }
}

impl Drop for UdpSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.lower); }
    }
}

fn to_sockaddr(addr: &SocketAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };

    let len = match addr {
        SocketAddr::V4(addr) => {
            let sin = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in)
            };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = addr.port().to_be();
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(addr.ip().octets()),
            };
            #[cfg(target_os = "freebsd")] {
                sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
            }
            mem::size_of::<libc::sockaddr_in>()
        },
        SocketAddr::V6(addr) => {
            let sin6 = unsafe {
                &mut *(&mut storage as *mut libc::sockaddr_storage as *mut libc::sockaddr_in6)
            };
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = addr.port().to_be();
            sin6.sin6_flowinfo = addr.flowinfo();
            sin6.sin6_addr = libc::in6_addr {
                s6_addr: addr.ip().octets(),
            };
            sin6.sin6_scope_id = addr.scope_id();
            #[cfg(target_os = "freebsd")] {
                sin6.sin6_len = mem::size_of::<libc::sockaddr_in6>() as u8;
            }
            mem::size_of::<libc::sockaddr_in6>()
        },
    };

    (storage, len as libc::socklen_t)
}

fn from_sockaddr(storage: &libc::sockaddr_storage) -> Option<SocketAddr> {
    match libc::c_int::from(storage.ss_family) {
        libc::AF_INET => {
            let sin = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in)
            };
            let ip = Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes());
            Some(SocketAddrV4::new(ip, u16::from_be(sin.sin_port)).into())
        },
        libc::AF_INET6 => {
            let sin6 = unsafe {
                &*(storage as *const libc::sockaddr_storage as *const libc::sockaddr_in6)
            };
            let ip = Ipv6Addr::from(sin6.sin6_addr.s6_addr);
            Some(SocketAddrV6::new(
                ip,
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id).into())
        },
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sockaddr_v4() {
        let addr: SocketAddr = "10.0.0.1:37008".parse().unwrap();
        let (storage, len) = to_sockaddr(&addr);
        assert_eq!(len as usize, mem::size_of::<libc::sockaddr_in>());
        assert_eq!(from_sockaddr(&storage), Some(addr));
    }

    #[test]
    fn sockaddr_v6() {
        let addr: SocketAddr = "[fe80::1]:37008".parse().unwrap();
        let (storage, len) = to_sockaddr(&addr);
        assert_eq!(len as usize, mem::size_of::<libc::sockaddr_in6>());
        assert_eq!(from_sockaddr(&storage), Some(addr));
    }

    #[test]
    fn sockaddr_unknown_family() {
        let storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        assert_eq!(from_sockaddr(&storage), None);
    }

    #[test]
    fn poll_timeout() {
        let mut socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        socket.set_poll_interval(Some(Duration::from_millis(10)));
        let mut buffer = [0; 16];
        assert_eq!(socket.recv(&mut buffer).unwrap(), Received::NoData);
    }

    #[test]
    fn closed_errors() {
        let socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        assert!(socket.is_closed(&io::Error::from_raw_os_error(libc::EBADF)));
        assert!(!socket.is_closed(&io::Error::from_raw_os_error(libc::ECONNREFUSED)));
    }
}
