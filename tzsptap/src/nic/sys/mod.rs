#![allow(unsafe_code)]
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `linux.rs`
// * `mod.rs`
// * `tap_interface.rs`
use core::mem;
use std::{io, ptr};
use std::os::unix::io::RawFd;
use std::time::Duration;

use libc;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "freebsd")]
mod freebsd;

#[cfg(any(target_os = "linux", target_os = "freebsd"))]
mod tap_interface;
mod udp_socket;

/// Module importing all types that should be exported.
///
/// Allows keeping all the `cfg` bits inside this module by enabling a controlled glob import from
/// the super module.
pub mod exports {
    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    pub use super::tap_interface::TapInterface;
    pub use super::udp_socket::UdpSocket;
    pub use super::Errno;
}

/// Wait until given file descriptor becomes readable, but no longer than given timeout.
///
/// Returns `Ok(false)` if the timeout expired first. Without a timeout, waits indefinitely.
fn wait(fd: RawFd, duration: Option<Duration>) -> Result<bool, Errno> {
    let mut readfds;

    unsafe {
        let mut readfds_init = mem::MaybeUninit::<libc::fd_set>::uninit();
        libc::FD_ZERO(readfds_init.as_mut_ptr());
        libc::FD_SET(fd, readfds_init.as_mut_ptr());
        readfds = readfds_init.assume_init();
    }

    let mut timeout = libc::timeval { tv_sec: 0, tv_usec: 0 };
    let timeout = duration.map(|duration| {
        timeout.tv_sec = duration.as_secs() as libc::time_t;
        timeout.tv_usec = duration.subsec_micros() as libc::suseconds_t;
        &mut timeout
    });

    let timeout_ptr = timeout
        .map(|reference| reference as *mut _)
        .unwrap_or_else(ptr::null_mut);

    let res = unsafe {
        libc::select(
            fd + 1,
            &mut readfds,
            ptr::null_mut(),
            ptr::null_mut(),
            timeout_ptr)
    };

    FdResult(res).errno()?;
    Ok(res > 0)
}

/// An errno value.
///
/// This is used as the error representation of raw libc calls. It can be converted into a
/// `std::io::Error`, where it will consequently have much more extensive error information.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Errno(pub libc::c_int);

#[derive(Clone, Copy)]
struct FdResult(pub libc::c_int);

#[derive(Clone, Copy)]
struct IoLenResult(pub libc::ssize_t);

type IoctlResult = FdResult;
#[allow(non_snake_case)] // Emulate type alias also importing constructor.
fn IoctlResult(val: libc::c_int) -> IoctlResult { FdResult(val) }

/// Size of the request union following the name in an if ioctl request.
///
/// The largest member on the supported 64-bit targets is 24 bytes. Requests only ever access the
/// leading `short` flags or `int` but the kernel copies the whole structure in and out.
const IFREQ_DATA_LEN: usize = 24;

/// Base for an if ioctl request.
///
/// Contains the name of the interface and room for the request specific data.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct ifreq {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    ifr_data: [u8; IFREQ_DATA_LEN],
}

/// Trait for interpreting integer return values.
///
/// Failure signals may vary between:
/// * `-1`
/// * arbitrary negative values
/// * non-zero
trait LibcResult: Copy {
    fn is_fail(self) -> bool;

    fn errno(self) -> Result<(), Errno> {
        if self.is_fail() {
            Err(Errno::new())
        } else {
            Ok(())
        }
    }
}

impl Errno {
    /// The errno of the last failed call on this thread.
    pub fn new() -> Errno {
        Errno(io::Error::last_os_error().raw_os_error().unwrap_or(0))
    }

    /// Whether the call was interrupted or would have blocked.
    ///
    /// Both are not failures of the descriptor but of the attempt, retrying may succeed.
    pub fn is_retry(&self) -> bool {
        self.0 == libc::EINTR || self.0 == libc::EAGAIN || self.0 == libc::EWOULDBLOCK
    }
}

impl LibcResult for FdResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl LibcResult for IoLenResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl From<Errno> for io::Error {
    fn from(err: Errno) -> io::Error {
        io::Error::from_raw_os_error(err.0 as i32)
    }
}

impl ifreq {
    /// Create a request for the named interface.
    ///
    /// Fails with `EINVAL` if the name does not fit, including its terminating nul byte.
    fn new(name: &str) -> Result<Self, Errno> {
        let mut ifr_name = [0; libc::IF_NAMESIZE];

        if name.len() >= ifr_name.len() || name.as_bytes().contains(&0) {
            return Err(Errno(libc::EINVAL));
        }

        for (i, byte) in name.as_bytes().iter().enumerate() {
            ifr_name[i] = *byte as libc::c_char
        }

        Ok(ifreq {
            ifr_name,
            ifr_data: [0; IFREQ_DATA_LEN],
        })
    }

    /// The interface name, up to the first nul byte.
    fn name(&self) -> String {
        let bytes: Vec<u8> = self.ifr_name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Interpret the request data as `ifr_flags`.
    fn flags(&self) -> libc::c_short {
        let mut raw = [0; mem::size_of::<libc::c_short>()];
        let len = raw.len();
        raw.copy_from_slice(&self.ifr_data[..len]);
        libc::c_short::from_ne_bytes(raw)
    }

    /// Store `ifr_flags` into the request data.
    fn set_flags(&mut self, flags: libc::c_short) {
        let raw = flags.to_ne_bytes();
        self.ifr_data[..raw.len()].copy_from_slice(&raw);
    }
}

/// An `AF_INET` datagram socket, only used as a handle for interface ioctls.
struct ControlSocket(libc::c_int);

impl ControlSocket {
    fn new() -> Result<Self, Errno> {
        let lower = unsafe {
            libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0)
        };

        FdResult(lower).errno()?;

        Ok(ControlSocket(lower))
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.0); }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ifreq_name() {
        let ifr = ifreq::new("tap%d").unwrap();
        assert_eq!(ifr.name(), "tap%d");
        assert_eq!(ifr.flags(), 0);
    }

    #[test]
    fn ifreq_name_too_long() {
        let name = "t".repeat(libc::IF_NAMESIZE);
        assert_eq!(ifreq::new(&name).err(), Some(Errno(libc::EINVAL)));
        assert_eq!(ifreq::new("tap\0").err(), Some(Errno(libc::EINVAL)));
    }

    #[test]
    fn ifreq_flags() {
        let mut ifr = ifreq::new("tap0").unwrap();
        ifr.set_flags(0x1043);
        assert_eq!(ifr.flags(), 0x1043);
        assert_eq!(ifr.name(), "tap0");
    }

    #[test]
    fn ifreq_flags_raw() {
        let mut ifr = ifreq::new("tap0").unwrap();
        let up = libc::IFF_UP as libc::c_short;
        ifr.ifr_data[..2].copy_from_slice(&up.to_ne_bytes());
        ifr.ifr_data[2..].iter_mut().for_each(|byte| *byte = 0xff);
        assert_eq!(ifr.flags(), up);
    }

    #[test]
    fn errno_into_io() {
        let err = io::Error::from(Errno(libc::EBADF));
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }
}
