//! Bridge TZSP captures into a tap interface.
//!
//! Listens for TZSP datagrams, for example sent by a MikroTik packet sniffer, and writes the
//! encapsulated frames into a freshly created tap interface. Requires the privileges to create
//! the interface. Call example:
//!
//! * `tzsptap -l 0.0.0.0 -p 37008 -i tzsp%d -v`
use std::process;

use tracing::{error, info};
use tzsptap_cli::{config, signal};

fn main() {
    let config = config::Config::from_args();

    let level = if config.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = signal::install() {
        error!("Can not install signal handlers: {}", err);
        process::exit(1);
    }

    match tzsptap_cli::run(&config) {
        Ok(stats) => info!("Shut down, {}", stats),
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        },
    }
}
