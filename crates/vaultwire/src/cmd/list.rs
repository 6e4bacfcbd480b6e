use crate::cmd::{parse_timeout, within, ConnectionArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_credentials, OutputFormat};

pub async fn run(conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&conn.timeout)?;
    let mut client = conn.connect().await?;

    let outcome = within(timeout, "list", client.list()).await;
    let _ = within(timeout, "close", client.close()).await;

    let credentials = outcome?.map_err(|err| client_error("list failed", err))?;
    print_credentials(&credentials, format);
    Ok(SUCCESS)
}
