// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use std::io;
use std::os::unix::io::{RawFd, AsRawFd};

use libc;
use super::{ifreq, ControlSocket, Errno, FdResult, IoLenResult, LibcResult};

use crate::nic::Tunnel;

mod tap_traits {
    #[cfg(target_os = "linux")]
    pub(crate) use super::super::linux::{IfFlags, TunSetIf, TUN_PATH};
    #[cfg(target_os = "freebsd")]
    pub(crate) use super::super::freebsd::{IfDestroy, IfFlags, MAX_TAP_NR};

    // for other OS's, other traits might be used instead.
}

use tap_traits::*;

/// A tap interface created by this process.
///
/// Owns the file descriptor of the interface and a pre-filled `ifreq` structure with the final
/// interface name, required for the `ioctl` calls configuring it. Frames written to the descriptor
/// appear as received on the interface. The descriptor is opened in blocking mode, a write only
/// returns once the kernel accepted the frame.
///
/// The interface is released when the value is dropped, or earlier with [`Tunnel::release`].
///
/// [`Tunnel::release`]: ../trait.Tunnel.html#tymethod.release
#[derive(Debug)]
pub struct TapInterface {
    lower: libc::c_int,
    ifreq: ifreq,
    name: String,
}

impl AsRawFd for TapInterface {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl TapInterface {
    /// Create a new tap interface.
    ///
    /// The `name` is a template, a `%d` in it is replaced by the kernel with the first free
    /// number. See `ioctl` with `TUNSETIFF` for details on errors.
    #[cfg(target_os = "linux")]
    pub fn new(name: &str) -> Result<Self, Errno> {
        let mut ifreq = ifreq::new(name)?;

        let lower = unsafe {
            libc::open(
                TUN_PATH.as_ptr() as *const libc::c_char,
                libc::O_RDWR)
        };

        FdResult(lower).errno()?;

        if let Err(err) = ifreq.tun_set_tap(lower) {
            unsafe { libc::close(lower); }
            return Err(err);
        }

        Ok(TapInterface {
            lower,
            name: ifreq.name(),
            ifreq,
        })
    }

    /// Open the first free tap device.
    ///
    /// Probes `/dev/tap0` up to `/dev/tap99`, opening a device node creates the interface. The
    /// name template is not used, interfaces are always named after their device node.
    #[cfg(target_os = "freebsd")]
    pub fn new(_: &str) -> Result<Self, Errno> {
        let mut last_err = Errno(libc::ENOENT);

        for nr in 0..MAX_TAP_NR {
            let name = format!("tap{}", nr);
            let path = format!("/dev/{}\0", name);

            let lower = unsafe {
                libc::open(
                    path.as_ptr() as *const libc::c_char,
                    libc::O_RDWR)
            };

            match FdResult(lower).errno() {
                Ok(()) => return Ok(TapInterface {
                    lower,
                    ifreq: ifreq::new(&name)?,
                    name,
                }),
                Err(err) => last_err = err,
            }
        }

        Err(last_err)
    }

    /// Set the interface up, keeping all other flags.
    pub fn set_up(&mut self) -> Result<(), Errno> {
        let control = ControlSocket::new()?;
        let flags = self.ifreq.get_if_flags(control.0)?;
        self.ifreq.set_if_flags(control.0, flags | libc::IFF_UP as libc::c_short)
    }

    /// Send a single frame onto the tap from the buffer.
    pub fn send(&mut self, buffer: &[u8]) -> Result<usize, Errno> {
        if self.lower < 0 {
            return Err(Errno(libc::EBADF));
        }

        let len = unsafe {
            libc::write(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len())
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }

    /// Close the descriptor, destroying the interface.
    ///
    /// Does nothing if the interface was already closed.
    pub fn close(&mut self) {
        if self.lower < 0 {
            return;
        }

        unsafe { libc::close(self.lower); }
        self.lower = -1;

        #[cfg(target_os = "freebsd")]
        self.destroy();
    }

    /// Tap devices outlive their descriptor on FreeBSD unless destroyed explicitly.
    #[cfg(target_os = "freebsd")]
    fn destroy(&mut self) {
        let result = ControlSocket::new()
            .and_then(|control| self.ifreq.destroy_if(control.0));

        if let Err(err) = result {
            net_warn!("can not destroy tunnel device {}: {}", self.name, io::Error::from(err));
        }
    }
}

impl Tunnel for TapInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) -> io::Result<()> {
        Ok(self.set_up()?)
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        Ok(TapInterface::send(self, frame)?)
    }

    fn release(&mut self) {
        self.close()
    }
}

impl Drop for TapInterface {
    fn drop(&mut self) {
        self.close()
    }
}
