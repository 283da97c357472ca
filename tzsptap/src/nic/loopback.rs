//! Implementation of a software loop-back device.
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;

use super::{Received, Source, Tunnel};

/// A software device usable both as datagram source and as tunnel.
///
/// As a source it hands out a queue of datagrams, reporting `NoData` once the queue is empty. As a
/// tunnel it records every frame written to it. Sending can be made to fail for a number of frames
/// to emulate a congested interface.
#[derive(Debug)]
pub struct Loopback {
    name: String,
    incoming: VecDeque<(Vec<u8>, Option<SocketAddr>)>,
    sent: Vec<Vec<u8>>,
    fail_sends: usize,
    active: bool,
    released: bool,
}

impl Loopback {
    /// Create an empty device with the given interface name.
    pub fn new(name: &str) -> Self {
        Loopback {
            name: name.to_owned(),
            incoming: VecDeque::new(),
            sent: Vec::new(),
            fail_sends: 0,
            active: false,
            released: false,
        }
    }

    /// Queue a datagram to be received.
    pub fn push(&mut self, datagram: &[u8], from: Option<SocketAddr>) {
        self.incoming.push_back((datagram.to_vec(), from));
    }

    /// The number of datagrams not yet received.
    pub fn pending(&self) -> usize {
        self.incoming.len()
    }

    /// Let the next `count` frames sent fail.
    pub fn fail_sends(&mut self, count: usize) {
        self.fail_sends = count;
    }

    /// All frames successfully sent so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Whether `activate` was called.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the device has been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Source for Loopback {
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<Received> {
        if self.released {
            return Err(io::ErrorKind::NotConnected.into());
        }

        let (datagram, from) = match self.incoming.pop_front() {
            None => return Ok(Received::NoData),
            Some(next) => next,
        };

        let len = datagram.len().min(buffer.len());
        buffer[..len].copy_from_slice(&datagram[..len]);
        Ok(Received::Datagram { len, from })
    }

    fn is_closed(&self, err: &io::Error) -> bool {
        err.kind() == io::ErrorKind::NotConnected
    }
}

impl Tunnel for Loopback {
    fn name(&self) -> &str {
        &self.name
    }

    fn activate(&mut self) -> io::Result<()> {
        if self.released {
            return Err(io::ErrorKind::NotConnected.into());
        }
        self.active = true;
        Ok(())
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<usize> {
        if self.released {
            return Err(io::ErrorKind::NotConnected.into());
        }

        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(io::ErrorKind::WouldBlock.into());
        }

        self.sent.push(frame.to_vec());
        Ok(frame.len())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.active = false;
    }
}
