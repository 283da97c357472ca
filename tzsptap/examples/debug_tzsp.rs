//! Prints every TZSP datagram arriving on a UDP port, without forwarding it.
use std::{env, process};

use tzsptap::nic::sys::UdpSocket;
use tzsptap::wire::TzspFrame;

fn main() {
    let addr = env::args().nth(1)
        .unwrap_or_else(usage_and_exit)
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut socket = UdpSocket::bind(addr)
        .expect("Couldn't bind socket");
    let mut buffer = vec![0; tzsptap::bridge::RECV_BUFFER_LEN];
    loop {
        let (len, from) = socket.recv_from(&mut buffer)
            .unwrap_or_else(|err| panic!("Error during receive {:?}", err));

        let from = from.map_or_else(|| "unknown".to_string(), |from| from.to_string());
        match TzspFrame::parse(&buffer[..len]) {
            Ok(frame) => println!("{}: {}", from, frame),
            Err(err) => println!("{}: {} ({} bytes)", from, err, len),
        }
    }
}

fn usage_and_exit<T>() -> T {
    eprintln!("Usage: debug_tzsp <addr:port>");
    process::exit(1);
}
