mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "vplaned", version, about = "vplane controller and dataplane client")]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, &cli.connect, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_subcommand() {
        let cli = Cli::try_parse_from([
            "vplaned",
            "store",
            "interfaces dataplane dp0s3 mtu",
            "--type",
            "vyatta:mtu",
            "--data",
            "x",
            "--action",
            "SET",
        ])
        .expect("store args should parse");

        match cli.command {
            Command::Store(args) => {
                assert_eq!(args.path, "interfaces dataplane dp0s3 mtu");
                assert_eq!(args.msg_type, "vyatta:mtu");
                assert_eq!(args.action.as_deref(), Some("SET"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn store_requires_exactly_one_payload_source() {
        let err = Cli::try_parse_from([
            "vplaned", "store", "a", "--type", "t", "--data", "x", "--file", "/tmp/p",
        ])
        .expect_err("conflicting payloads should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from(["vplaned", "store", "a", "--type", "t"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_dp_command_with_global_flags() {
        let cli = Cli::try_parse_from([
            "vplaned",
            "dp-command",
            "0",
            "netflow show",
            "--json",
            "--timeout",
            "500ms",
            "--config-endpoint",
            "ipc:///tmp/config.sock",
        ])
        .expect("dp-command args should parse");

        assert!(matches!(cli.command, Command::DpCommand(ref a) if a.id == 0 && a.json));
        assert_eq!(cli.connect.timeout, "500ms");
        assert_eq!(
            cli.connect.config_endpoint.as_deref(),
            Some("ipc:///tmp/config.sock")
        );
    }

    #[test]
    fn parses_dataplanes_subcommand() {
        let cli = Cli::try_parse_from(["vplaned", "--format", "json", "dataplanes"])
            .expect("dataplanes args should parse");
        assert!(matches!(cli.command, Command::Dataplanes));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
