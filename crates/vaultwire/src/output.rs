use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};
use vaultwire_client::Lease;

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
struct SecretOutput<'a> {
    path: &'a str,
    value: &'a str,
    lease_id: Option<&'a str>,
    ttl: Option<u64>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Render a scalar without JSON quoting.
fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn print_credentials(credentials: &[Value], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "credentials": credentials })),
        OutputFormat::Table => {
            let mut out = table(vec!["PATH", "DETAILS"]);
            for credential in credentials {
                let (path, rest) = split_path(credential);
                out.add_row(vec![path, rest]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => {
            for credential in credentials {
                let (path, rest) = split_path(credential);
                if rest.is_empty() {
                    println!("{path}");
                } else {
                    println!("{path}  {rest}");
                }
            }
        }
    }
}

/// Path of a credential entry plus its remaining fields, compactly rendered.
fn split_path(credential: &Value) -> (String, String) {
    match credential {
        Value::Object(fields) => {
            let path = fields.get("path").map(cell).unwrap_or_default();
            let rest: Map<String, Value> = fields
                .iter()
                .filter(|(key, _)| key.as_str() != "path")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let rest = if rest.is_empty() {
                String::new()
            } else {
                Value::Object(rest).to_string()
            };
            (path, rest)
        }
        other => (cell(other), String::new()),
    }
}

pub fn print_secret(path: &str, secret: &str, lease: Option<&Lease>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SecretOutput {
            path,
            value: secret,
            lease_id: lease.map(|l| l.lease_id.as_str()),
            ttl: lease.and_then(|l| l.ttl),
        }),
        OutputFormat::Table => {
            let mut out = table(vec!["PATH", "LEASE", "TTL", "VALUE"]);
            out.add_row(vec![
                path.to_string(),
                lease.map(|l| l.lease_id.clone()).unwrap_or_default(),
                lease
                    .and_then(|l| l.ttl)
                    .map(|ttl| format!("{ttl}s"))
                    .unwrap_or_default(),
                secret.to_string(),
            ]);
            println!("{out}");
        }
        OutputFormat::Pretty => println!("{secret}"),
    }
}

pub fn print_result(result: &Map<String, Value>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            let mut out = table(vec!["KEY", "VALUE"]);
            for (key, value) in result {
                out.add_row(vec![key.clone(), cell(value)]);
            }
            println!("{out}");
        }
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
        ),
    }
}
