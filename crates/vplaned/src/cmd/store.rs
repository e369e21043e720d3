use std::fs;

use tracing::info;
use vplaned_client::{Action, Connection, StoreRequest};

use crate::cmd::{ConnectArgs, StoreArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_store_result, OutputFormat};

pub fn run(args: StoreArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let request = build_request(&args)?;
    let payload = resolve_payload(&args)?;

    let config = connect.client_config()?;
    let conn = Connection::open(config).map_err(|err| client_error("connect failed", err))?;
    conn.store_raw(&request, &payload)
        .map_err(|err| client_error("store failed", err))?;

    let action = request
        .action
        .or(conn.config().commit_action)
        .map_or("", Action::as_str);
    let _ = conn.close();

    info!(path = %request.path, action, "stored");
    print_store_result(
        &request.path.key(),
        action,
        &request.msg_type,
        payload.len(),
        format,
    );
    Ok(SUCCESS)
}

fn build_request(args: &StoreArgs) -> CliResult<StoreRequest> {
    let mut request = StoreRequest::new(&args.path, args.msg_type.clone())
        .map_err(|err| CliError::new(USAGE, format!("invalid path: {err}")))?;
    if let Some(action) = &args.action {
        let action = Action::parse(action)
            .map_err(|err| CliError::new(USAGE, format!("invalid --action: {err}")))?;
        request = request.with_action(action);
    }
    if let Some(interface) = args.interface.as_deref().filter(|i| !i.is_empty()) {
        request = request.with_interface(interface);
    }
    Ok(request)
}

fn resolve_payload(args: &StoreArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: &str, action: Option<&str>) -> StoreArgs {
        StoreArgs {
            path: path.to_string(),
            msg_type: "vyatta:mtu".to_string(),
            data: Some("payload".to_string()),
            file: None,
            action: action.map(str::to_string),
            interface: Some("dp0s3".to_string()),
        }
    }

    #[test]
    fn builds_request_from_args() {
        let request = build_request(&args("interfaces dataplane dp0s3 mtu", Some("DELETE"))).unwrap();
        assert_eq!(request.path.tokens().len(), 4);
        assert_eq!(request.action, Some(Action::Delete));
        assert_eq!(request.interface.as_deref(), Some("dp0s3"));
        assert_eq!(resolve_payload(&args("a", None)).unwrap(), b"payload");
    }

    #[test]
    fn rejects_bad_action_and_path() {
        assert_eq!(build_request(&args("a", Some("delete"))).unwrap_err().code, USAGE);
        assert_eq!(build_request(&args("a  b", None)).unwrap_err().code, USAGE);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut args = args("a", None);
        args.data = None;
        args.file = Some("/nonexistent/vplaned/payload.bin".into());
        let err = resolve_payload(&args).unwrap_err();
        assert!(err.message.contains("failed reading"));
    }
}
