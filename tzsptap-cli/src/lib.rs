pub mod config;
pub mod signal;

use tracing::info;
use tzsptap::bridge::{self, Bridge, Stats};
use tzsptap::nic::Tunnel;

/// Bind the listener, create the tap and forward until a termination signal arrives.
///
/// All startup failures are returned before any datagram is read. On a clean shutdown the
/// tunnel is released before the final counters are returned.
#[cfg(any(target_os = "linux", target_os = "freebsd"))]
pub fn run(config: &config::Config) -> Result<Stats, bridge::Error> {
    let socket = bridge::bind(&config.listen, config.port)?;
    if let Ok(addr) = socket.local_addr() {
        info!("Listening on {}", addr);
    }

    let tap = bridge::open_tap(&config.interface)?;
    info!("Tunnel interface created: {}", tap.name());

    let mut forwarder = Bridge::new(socket, tap);
    forwarder.activate()?;

    let result = forwarder.run(&signal::SHUTDOWN);
    forwarder.shutdown();
    info!("Tunnel interface {} released", forwarder.tunnel().name());

    result
}

#[cfg(not(any(target_os = "linux", target_os = "freebsd")))]
pub fn run(config: &config::Config) -> Result<Stats, bridge::Error> {
    Err(bridge::Error::Allocate {
        name: config.interface.clone(),
        err: std::io::Error::new(std::io::ErrorKind::Other, "tap interfaces are not supported on this platform"),
    })
}
