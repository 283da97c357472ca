use super::{ifreq, Errno, LibcResult, IoctlResult};
use libc;

/// The highest tap device number probed, exclusive.
pub(crate) const MAX_TAP_NR: usize = 100;

/// Adds methods to read and write the interface flags.
pub(crate) trait IfFlags {
    fn get_if_flags(&mut self, fd: libc::c_int) -> Result<libc::c_short, Errno>;

    fn set_if_flags(&mut self, fd: libc::c_int, flags: libc::c_short) -> Result<(), Errno>;
}

/// Adds a method to destroy a cloned interface.
pub(crate) trait IfDestroy {
    fn destroy_if(&mut self, fd: libc::c_int) -> Result<(), Errno>;
}

impl ifreq {
    // _IOWR('i', 17, struct ifreq) and friends, with a 32 byte `struct ifreq`.
    pub(crate) const SIOCGIFFLAGS:  libc::c_ulong = 0xc020_6911;
    pub(crate) const SIOCSIFFLAGS:  libc::c_ulong = 0x8020_6910;
    pub(crate) const SIOCIFDESTROY: libc::c_ulong = 0x8020_6979;
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

impl IfDestroy for ifreq {
    fn destroy_if(&mut self, fd: libc::c_int) -> Result<(), Errno> {
        let mut request = *self;

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCIFDESTROY, &mut request as *mut ifreq)
        };

        IoctlResult(res).errno()
    }
}
