use structopt::StructOpt;

/// Receive TZSP datagrams and write the carried frames to a tap interface.
#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "tzsptap")]
pub struct Config {
    /// Host or address to listen on.
    #[structopt(short = "l", long = "listen")]
    pub listen: String,

    /// UDP port to listen on.
    #[structopt(short = "p", long = "port", default_value = "37008")]
    pub port: u16,

    /// Name of the tap interface, `%d` is replaced with the first free number (Linux only).
    #[structopt(short = "i", long = "interface", default_value = "tap%d")]
    pub interface: String,

    /// Log every datagram.
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,
}

impl Config {
    pub fn from_args() -> Self {
        StructOpt::from_args()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tzsptap::bridge::DEFAULT_PORT;

    fn parse(args: &[&str]) -> Result<Config, structopt::clap::Error> {
        Config::from_iter_safe(Some("tzsptap").into_iter().chain(args.iter().cloned()))
    }

    #[test]
    fn defaults() {
        let config = parse(&["-l", "0.0.0.0"]).unwrap();
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.interface, "tap%d");
        assert!(!config.verbose);
    }

    #[test]
    fn all_options() {
        let config = parse(&["--listen", "sniffer.local", "-p", "4000", "-i", "tzsp0", "-v"]).unwrap();
        assert_eq!(config.listen, "sniffer.local");
        assert_eq!(config.port, 4000);
        assert_eq!(config.interface, "tzsp0");
        assert!(config.verbose);
    }

    #[test]
    fn listen_required() {
        assert!(parse(&["-p", "4000"]).is_err());
    }

    #[test]
    fn invalid_port() {
        assert!(parse(&["-l", "::", "-p", "70000"]).is_err());
        assert!(parse(&["-l", "::", "-p", "tzsp"]).is_err());
    }
}
