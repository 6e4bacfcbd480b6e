use serde_json::Value;
use vaultwire_client::Params;

use crate::cmd::{parse_timeout, within, ConnectionArgs, UseArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_result, OutputFormat};

pub async fn run(args: UseArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let params = args.params.as_deref().map(parse_params).transpose()?;
    let timeout = parse_timeout(&conn.timeout)?;
    let mut client = conn.connect().await?;

    let outcome = within(
        timeout,
        "use",
        client.use_credential(&args.path, &args.operation, params),
    )
    .await;
    let _ = within(timeout, "close", client.close()).await;

    let result = outcome?.map_err(|err| client_error("use failed", err))?;
    print_result(&result, format);
    Ok(SUCCESS)
}

fn parse_params(raw: &str) -> CliResult<Params> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(_) => Err(CliError::new(USAGE, "--params must be a JSON object")),
        Err(err) => Err(CliError::new(USAGE, format!("--params is not valid JSON: {err}"))),
    }
}
