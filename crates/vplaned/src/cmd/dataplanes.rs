use tracing::info;
use vplaned_client::Connection;

use crate::cmd::ConnectArgs;
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_dataplanes, OutputFormat};

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let config = connect.client_config()?;
    let conn = Connection::open(config).map_err(|err| client_error("connect failed", err))?;

    let dataplanes = conn
        .list_dataplanes()
        .map_err(|err| client_error("listing dataplanes failed", err))?;
    let _ = conn.close();

    info!(count = dataplanes.len(), "dataplanes");
    print_dataplanes(&dataplanes, format);
    Ok(SUCCESS)
}
