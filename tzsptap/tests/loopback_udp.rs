#![cfg(feature = "sys")]
use std::net;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tzsptap::bridge::{self, Bridge, Step};
use tzsptap::nic::{sys::UdpSocket, Loopback};
use tzsptap::wire::{TzspEncapsulation, TzspField, TzspFields, TzspFlags, TzspFrame, TzspPacketType, TzspRepr, TzspTag};

const FRAME: &[u8] = b"\xff\xff\xff\xff\xff\xff\x02\x00\x00\x00\x00\x01\x08\x06";

#[test]
fn forward_over_udp() {
    let socket = bridge::bind("127.0.0.1", 0).expect("Binding failed");
    let addr = socket.local_addr().expect("No local address");
    println!("Listening on {}", addr);

    let mut fields = TzspFields::new();
    fields.push(TzspField::Data { tag: TzspTag::RxChannel, data: &[6] }).unwrap();
    fields.push(TzspField::End).unwrap();
    let frame = TzspFrame::new(
        TzspRepr {
            version: 1,
            flags: TzspFlags::empty(),
            packet_type: TzspPacketType::ReceivedTagList,
            encapsulation: TzspEncapsulation::Ethernet,
        },
        fields,
        Some(FRAME));

    let mut datagram = vec![0; frame.buffer_len()];
    frame.emit(&mut datagram);

    let sender = net::UdpSocket::bind("127.0.0.1:0").expect("Sender failed");
    // A truncated datagram first, it must not stop the bridge.
    sender.send_to(&datagram[..6], addr).expect("Sending failed");
    sender.send_to(&datagram, addr).expect("Sending failed");

    let mut tunnel = Loopback::new("tap0");
    let mut bridge = Bridge::new(socket, &mut tunnel);

    let mut steps = Vec::new();
    while steps.len() < 2 {
        match bridge.forward_one().expect("Receiving failed") {
            Step::Idle => panic!("Datagram lost"),
            step => steps.push(step),
        }
    }

    assert!(matches!(steps[0], Step::Malformed { len: 6, .. }));
    assert_eq!(steps[1], Step::Forwarded { len: FRAME.len() });
    assert_eq!(bridge.stats().received, 2);
    drop(bridge);

    assert_eq!(tunnel.sent(), &[FRAME.to_vec()][..]);
    assert!(tunnel.is_released());
}

#[test]
fn shutdown_while_idle() {
    let mut socket = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).expect("Binding failed");
    socket.set_poll_interval(Some(Duration::from_millis(20)));

    let shutdown = AtomicBool::new(false);
    let mut bridge = Bridge::new(socket, Loopback::new("tap0"));
    assert_eq!(bridge.forward_one().expect("Receiving failed"), Step::Idle);

    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    let stats = bridge.run(&shutdown).expect("Running failed");
    assert_eq!(stats.received, 0);
}

#[test]
fn resolve_failure() {
    match bridge::bind("no-such-host.invalid", 0) {
        Err(bridge::Error::Resolve { host, .. }) => assert_eq!(host, "no-such-host.invalid"),
        other => panic!("Unexpected result {:?}", other.map(|_| ())),
    }
}
