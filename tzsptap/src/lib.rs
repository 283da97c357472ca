//! Bridge TZSP encapsulated captures into a local tap interface.
//!
//! ## Table of contents
//!
//! 1. [Design](#design)
//! 2. [The wire module](wire/index.html)
//! 3. [Sources and tunnels](nic/index.html)
//! 4. [The forwarding loop](bridge/index.html)
//!
//! ## Design
//!
//! A remote sniffer wraps every captured frame into a TZSP datagram: a four byte header, a chain
//! of tagged fields with capture metadata and finally the frame itself. This crate takes such
//! datagrams off a UDP socket, strips the encapsulation and writes the frame into a tap device
//! where the host network stack sees it as live traffic.
//!
//! The datagram is the only untrusted input. Its parser in [`wire`] never allocates, never
//! copies and reports every inconsistency between the declared and the actual length as an
//! error instead of reading past the buffer. The resulting [`wire::TzspFrame`] borrows the
//! datagram and lives exactly as long as one iteration of the [`bridge`] loop.
//!
//! The operating system facing parts are hidden behind two small traits in [`nic`], one for
//! the datagram source and one for the tunnel. The real implementations live in `nic::sys` while
//! [`nic::Loopback`] plays both roles in memory.
//!
//! [`wire`]: wire/index.html
//! [`wire::TzspFrame`]: wire/struct.TzspFrame.html
//! [`bridge`]: bridge/index.html
//! [`nic`]: nic/index.html
//! [`nic::Loopback`]: nic/struct.Loopback.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod bridge;
pub mod nic;
pub mod wire;
