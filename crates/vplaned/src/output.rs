use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vplaned_client::DataplaneDescriptor;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DataplanesOutput<'a> {
    dataplanes: &'a [DataplaneDescriptor],
}

#[derive(Serialize)]
struct StoreOutput<'a> {
    path: &'a str,
    action: &'a str,
    msg_type: &'a str,
    payload_size: usize,
    status: &'a str,
}

pub fn print_dataplanes(dataplanes: &[DataplaneDescriptor], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DataplanesOutput { dataplanes }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "ID",
                    "CONTROL",
                    "LOCAL",
                    "CONNECTED",
                    "INTERFACES",
                ]);
            for dp in dataplanes {
                table.add_row(vec![
                    dp.id.to_string(),
                    control_label(dp),
                    yes_no(dp.local).to_string(),
                    yes_no(dp.connected).to_string(),
                    interface_names(dp),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for dp in dataplanes {
                println!(
                    "dataplane={} control={} local={} connected={} uuid={} interfaces={}",
                    dp.id,
                    control_label(dp),
                    dp.local,
                    dp.connected,
                    dp.uuid,
                    interface_names(dp)
                );
            }
        }
    }
}

pub fn print_store_result(
    path: &str,
    action: &str,
    msg_type: &str,
    payload_size: usize,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&StoreOutput {
            path,
            action,
            msg_type,
            payload_size,
            status: "OK",
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "ACTION", "TYPE", "SIZE", "STATUS"])
                .add_row(vec![
                    path.to_string(),
                    action.to_string(),
                    msg_type.to_string(),
                    payload_size.to_string(),
                    "OK".to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{action} {path} type={msg_type} size={payload_size} status=OK");
        }
    }
}

/// Console output is printed verbatim except in JSON mode, where it is
/// wrapped so stdout is always one JSON document.
pub fn print_command_output(id: u32, command: &str, body: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "dataplane": id,
            "command": command,
            "output": body,
        })),
        OutputFormat::Table | OutputFormat::Pretty => println!("{body}"),
    }
}

pub fn print_json_value(value: &serde_json::Value, format: OutputFormat) {
    match format {
        OutputFormat::Pretty | OutputFormat::Table => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Json => print_json(value),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn control_label(dp: &DataplaneDescriptor) -> String {
    if dp.control.is_empty() {
        "(default)".to_string()
    } else {
        dp.control.clone()
    }
}

fn interface_names(dp: &DataplaneDescriptor) -> String {
    dp.interfaces
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
