//! Routing of termination signals into the shutdown flag.
use std::{io, mem, ptr};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once SIGINT or SIGTERM was received.
pub static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// The signals requesting a shutdown.
pub const SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

extern "C" fn request_shutdown(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install the handler for all of `SIGNALS`.
///
/// The handler is installed without `SA_RESTART` so that a blocking wait for datagrams returns
/// with `EINTR` and the flag is observed right away.
pub fn install() -> io::Result<()> {
    for &signal in SIGNALS.iter() {
        let res = unsafe {
            let mut action: libc::sigaction = mem::zeroed();
            action.sa_sigaction = request_shutdown as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, ptr::null_mut())
        };

        if res != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigterm_sets_flag() {
        install().unwrap();
        assert!(!SHUTDOWN.load(Ordering::SeqCst));

        let res = unsafe { libc::raise(libc::SIGTERM) };
        assert_eq!(res, 0);
        assert!(SHUTDOWN.load(Ordering::SeqCst));

        SHUTDOWN.store(false, Ordering::SeqCst);
    }
}
