use tracing::info;
use vplaned_client::{Connection, DataplaneChannel};

use crate::cmd::{ConnectArgs, DpCommandArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_command_output, print_json_value, OutputFormat};

pub fn run(args: DpCommandArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let config = connect.client_config()?;
    let conn = Connection::open(config.clone())
        .map_err(|err| client_error("connect failed", err))?;
    let dataplanes = conn
        .list_dataplanes()
        .map_err(|err| client_error("listing dataplanes failed", err))?;
    let _ = conn.close();

    let descriptor = dataplanes
        .iter()
        .find(|dp| dp.id == args.id)
        .ok_or_else(|| CliError::new(FAILURE, format!("dataplane {} not found", args.id)))?;

    let channel = DataplaneChannel::open(descriptor, &config)
        .map_err(|err| client_error(&format!("connecting to dataplane {} failed", args.id), err))?;
    info!(id = args.id, endpoint = %channel.endpoint(), command = %args.command, "dataplane command");

    let context = format!("'{}' on dataplane {}", args.command, args.id);
    if args.json {
        let value = channel
            .json_command(&args.command)
            .map_err(|err| client_error(&context, err))?;
        print_json_value(&value, format);
    } else {
        let body = channel
            .string_command(&args.command)
            .map_err(|err| client_error(&context, err))?;
        print_command_output(args.id, &args.command, &body, format);
    }

    let _ = channel.close();
    Ok(SUCCESS)
}
