use super::*;
use std::net::SocketAddr;
use crate::nic::Loopback;

/// Version 1, no fields, ethernet, followed by the frame.
static FRAME_ONLY: [u8; 10] =
    [0x01, 0x01, 0x00, 0x01,
     0xde, 0xad, 0xbe, 0xef, 0x00, 0x01];

/// A data field with a length running past the end.
static OVERRUN: [u8; 7] =
    [0x01, 0x00, 0x00, 0x01,
     0x0a, 0x20, 0x00];

/// Just an END field, no frame.
static END_ONLY: [u8; 5] = [0x01, 0x00, 0x00, 0x01, 0x01];

fn sender() -> Option<SocketAddr> {
    Some("192.0.2.1:37008".parse().unwrap())
}

#[test]
fn idle() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::Idle);
    assert_eq!(bridge.stats(), Stats::default());
}

#[test]
fn malformed_then_valid() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    source.push(&OVERRUN, sender());
    source.push(&FRAME_ONLY, sender());

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::Malformed {
        len: OVERRUN.len(),
        error: wire::Error::TooShort,
    });
    assert_eq!(bridge.forward_one().unwrap(), Step::Forwarded { len: 6 });

    let stats = bridge.stats();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.forwarded, 1);
    drop(bridge);

    assert_eq!(tunnel.sent(), &[FRAME_ONLY[4..].to_vec()][..]);
}

#[test]
fn short_datagram() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    source.push(&[0x01, 0x01], None);

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::Malformed {
        len: 2,
        error: wire::Error::TooShort,
    });
    drop(bridge);

    assert!(tunnel.sent().is_empty());
}

#[test]
fn empty_not_written() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    source.push(&END_ONLY, sender());

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::Empty);
    assert_eq!(bridge.stats().empty, 1);
    drop(bridge);

    assert!(tunnel.sent().is_empty());
}

#[test]
fn write_failure_continues() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    tunnel.fail_sends(1);
    source.push(&FRAME_ONLY, sender());
    source.push(&FRAME_ONLY, sender());

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::WriteFailed { len: 6 });
    assert_eq!(bridge.forward_one().unwrap(), Step::Forwarded { len: 6 });
    assert_eq!(bridge.stats().write_failed, 1);
    assert_eq!(bridge.stats().forwarded, 1);
    drop(bridge);

    assert_eq!(tunnel.sent().len(), 1);
}

#[test]
fn truncated_to_buffer() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");

    let mut datagram = vec![0; RECV_BUFFER_LEN + 100];
    datagram[..4].copy_from_slice(&FRAME_ONLY[..4]);
    source.push(&datagram, None);

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    assert_eq!(bridge.forward_one().unwrap(), Step::Forwarded {
        len: RECV_BUFFER_LEN - 4,
    });
}

#[test]
fn run_until_shutdown() {
    let shutdown = AtomicBool::new(true);
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    source.push(&FRAME_ONLY, sender());

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    // Flag is checked first, nothing is received.
    assert_eq!(bridge.run(&shutdown).unwrap(), Stats::default());
    drop(bridge);

    assert_eq!(source.pending(), 1);
}

/// Sets the flag once a number of frames were written.
struct StopAfter<'a> {
    inner: Loopback,
    remaining: usize,
    shutdown: &'a AtomicBool,
}

impl Tunnel for StopAfter<'_> {
    fn name(&self) -> &str { self.inner.name() }
    fn activate(&mut self) -> io::Result<()> { self.inner.activate() }
    fn release(&mut self) { self.inner.release() }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        let len = self.inner.send(frame)?;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.shutdown.store(true, Ordering::SeqCst);
        }
        Ok(len)
    }
}

#[test]
fn run_stops_on_flag() {
    let shutdown = AtomicBool::new(false);
    let mut source = Loopback::new("src");
    let mut tunnel = StopAfter {
        inner: Loopback::new("tap0"),
        remaining: 2,
        shutdown: &shutdown,
    };
    tunnel.inner.fail_sends(1);
    source.push(&FRAME_ONLY, sender());
    source.push(&OVERRUN, sender());
    source.push(&END_ONLY, sender());
    source.push(&FRAME_ONLY, sender());
    source.push(&FRAME_ONLY, sender());
    source.push(&FRAME_ONLY, sender());

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    let stats = bridge.run(&shutdown).unwrap();
    assert_eq!(stats, Stats {
        received: 5,
        forwarded: 2,
        malformed: 1,
        empty: 1,
        write_failed: 1,
    });
    drop(bridge);

    assert_eq!(source.pending(), 1);
    assert_eq!(tunnel.inner.sent().len(), 2);
    assert!(tunnel.inner.is_released());
}

#[test]
fn debug_omits_buffer() {
    let bridge = Bridge::new(Loopback::new("src"), Loopback::new("tap0"));
    let debug = format!("{:?}", bridge);
    assert!(debug.contains("buffer_len: 10000"));
    assert!(debug.len() < 1000);
}

#[test]
fn fatal_receive_error() {
    let shutdown = AtomicBool::new(false);
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");
    source.push(&FRAME_ONLY, sender());
    source.push(&OVERRUN, sender());
    source.release();

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    match bridge.run(&shutdown) {
        Err(Error::Receive(err)) => assert_eq!(err.kind(), io::ErrorKind::NotConnected),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn activate() {
    let mut source = Loopback::new("src");
    let mut tunnel = Loopback::new("tap0");

    let mut bridge = Bridge::new(&mut source, &mut tunnel);
    bridge.activate().unwrap();
    assert!(bridge.tunnel().is_active());

    bridge.shutdown();
    match bridge.activate() {
        Err(Error::Activate { name, .. }) => assert_eq!(name, "tap0"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn release_once() {
    /// Counts releases, unlike `Loopback`.
    struct Counting(usize);

    impl Tunnel for Counting {
        fn name(&self) -> &str { "count" }
        fn activate(&mut self) -> io::Result<()> { Ok(()) }
        fn send(&mut self, frame: &[u8]) -> io::Result<usize> { Ok(frame.len()) }
        fn release(&mut self) { self.0 += 1 }
    }

    let mut tunnel = Counting(0);
    let mut bridge = Bridge::new(Loopback::new("src"), &mut tunnel);
    bridge.shutdown();
    bridge.shutdown();
    drop(bridge);

    assert_eq!(tunnel.0, 1);
}

#[test]
fn error_display() {
    let err = Error::Allocate {
        name: "tap%d".into(),
        err: io::ErrorKind::PermissionDenied.into(),
    };
    assert!(err.to_string().starts_with("can not allocate tunnel tap%d: "));
    assert!(std::error::Error::source(&err).is_some());
}
