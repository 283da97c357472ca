// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use super::{ifreq, Errno, LibcResult, IoctlResult};
use libc;

/// The clone device for tun and tap interfaces.
pub(crate) static TUN_PATH: &[u8] = b"/dev/net/tun\0";

/// Adds a method to open a tap.
///
/// This is an extension trait implemented for `ifreq` in Linux.
pub(crate) trait TunSetIf {
    /// Attach to an existing interface or create a new one.
    ///
    /// On success the request holds the final interface name, with any `%d` in the requested
    /// name replaced by the kernel.
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno>;

    /// Convenience method over`set_if` when `kind` is a tap without packet information.
    fn tun_set_tap(&mut self, fd: libc::c_int) -> Result<(), Errno>;
}

/// Adds methods to read and write the interface flags.
pub(crate) trait IfFlags {
    fn get_if_flags(&mut self, fd: libc::c_int) -> Result<libc::c_short, Errno>;

    fn set_if_flags(&mut self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno>;
}

impl ifreq {
    pub(crate) const SIOCGIFFLAGS: libc::Ioctl = 0x8913;
    pub(crate) const SIOCSIFFLAGS: libc::Ioctl = 0x8914;

    pub(crate) const TUNSETIFF:    libc::Ioctl = 0x400454CA;
    pub(crate) const IFF_TAP:      libc::c_short = 0x0002;
    pub(crate) const IFF_NO_PI:    libc::c_short = 0x1000;
}

impl TunSetIf for ifreq {
    fn tun_set_if(&mut self, fd: libc::c_int, kind: libc::c_short) -> Result<(), Errno> {
        self.set_flags(kind);

        let res = unsafe {
            libc::ioctl(fd, Self::TUNSETIFF, self as *mut ifreq)
        };

        IoctlResult(res).errno()
    }

    fn tun_set_tap(&mut self, fd: libc::c_int) -> Result<(), Errno> {
        self.tun_set_if(fd, Self::IFF_TAP | Self::IFF_NO_PI)
    }
}

impl IfFlags for ifreq {
    fn get_if_flags(&mut self, fd: libc::c_int) -> Result<libc::c_short, Errno> {
        let mut request = *self;

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCGIFFLAGS, &mut request as *mut ifreq)
        };

        IoctlResult(res).errno()?;

        Ok(request.flags())
    }

    fn set_if_flags(&mut self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno> {
        let mut request = *self;
        request.set_flags(flags);

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCSIFFLAGS, &mut request as *mut ifreq)
        };

        IoctlResult(res).errno()
    }
}
