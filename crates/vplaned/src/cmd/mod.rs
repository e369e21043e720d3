use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use vplaned_client::{ClientConfig, Endpoint};

use crate::exit::{client_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod command;
pub mod dataplanes;
pub mod store;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List dataplanes attached to the controller.
    Dataplanes,
    /// Push one configuration change to the controller store.
    Store(StoreArgs),
    /// Run a console command on one dataplane.
    DpCommand(DpCommandArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Dataplanes => dataplanes::run(connect, format),
        Command::Store(args) => store::run(args, connect, format),
        Command::DpCommand(args) => command::run(args, connect, format),
        Command::Version(args) => version::run(args),
    }
}

/// Controller endpoints and timing, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Controller store endpoint (ipc://PATH or tcp://HOST:PORT).
    #[arg(long, value_name = "ENDPOINT", env = "VPLANED_STORE_ENDPOINT", global = true)]
    pub store_endpoint: Option<String>,
    /// Controller config endpoint (ipc://PATH or tcp://HOST:PORT).
    #[arg(long, value_name = "ENDPOINT", env = "VPLANED_CONFIG_ENDPOINT", global = true)]
    pub config_endpoint: Option<String>,
    /// Receive timeout per request (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s", global = true)]
    pub timeout: String,
}

impl ConnectArgs {
    /// Environment defaults with command-line overrides applied.
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let mut config =
            ClientConfig::from_env().map_err(|err| client_error("invalid environment", err))?;
        if let Some(endpoint) = &self.store_endpoint {
            config = config.with_store_endpoint(parse_endpoint(endpoint)?);
        }
        if let Some(endpoint) = &self.config_endpoint {
            config = config.with_config_endpoint(parse_endpoint(endpoint)?);
        }
        Ok(config.with_receive_timeout(parse_duration(&self.timeout)?))
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["data", "file"])))]
pub struct StoreArgs {
    /// Space-separated config path, e.g. "interfaces dataplane dp0s3 mtu".
    pub path: String,
    /// Fully-qualified protobuf type name of the payload.
    #[arg(long = "type", value_name = "TYPE")]
    pub msg_type: String,
    /// Payload given inline.
    #[arg(long)]
    pub data: Option<String>,
    /// Read the serialized payload from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// SET or DELETE. Defaults to $COMMIT_ACTION.
    #[arg(long)]
    pub action: Option<String>,
    /// Interface the change applies to.
    #[arg(long)]
    pub interface: Option<String>,
}

#[derive(Args, Debug)]
pub struct DpCommandArgs {
    /// Dataplane id as listed by `dataplanes`.
    pub id: u32,
    /// Console command line, e.g. "netflow show".
    pub command: String,
    /// Parse the reply body as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_endpoint(input: &str) -> CliResult<Endpoint> {
    Endpoint::parse(input).map_err(|err| transport_error("invalid endpoint", err))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn connect_args_override_endpoints() {
        let args = ConnectArgs {
            store_endpoint: Some("ipc:///tmp/store.sock".to_string()),
            config_endpoint: Some("tcp://127.0.0.1:7000".to_string()),
            timeout: "250ms".to_string(),
        };
        let config = args.client_config().unwrap();
        assert_eq!(config.store_endpoint.to_string(), "ipc:///tmp/store.sock");
        assert_eq!(config.config_endpoint.to_string(), "tcp://127.0.0.1:7000");
        assert_eq!(config.receive_timeout, Duration::from_millis(250));
    }

    #[test]
    fn connect_args_reject_bad_endpoint() {
        let args = ConnectArgs {
            store_endpoint: Some("udp://nowhere".to_string()),
            config_endpoint: None,
            timeout: "1s".to_string(),
        };
        assert_eq!(args.client_config().unwrap_err().code, USAGE);
    }
}
