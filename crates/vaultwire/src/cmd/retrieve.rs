use crate::cmd::{parse_timeout, within, ConnectionArgs, RetrieveArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_secret, OutputFormat};

pub async fn run(args: RetrieveArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&conn.timeout)?;
    let mut client = conn.connect().await?;

    let outcome = within(timeout, "retrieve", client.retrieve(&args.path, args.ttl)).await;
    // Single retrieve, so at most one lease is open.
    let lease = client
        .open_leases()
        .first()
        .and_then(|lease_id| client.lease(lease_id));
    let _ = within(timeout, "close", client.close()).await;

    let secret = outcome?.map_err(|err| client_error("retrieve failed", err))?;
    print_secret(&args.path, &secret, lease.as_ref(), format);
    Ok(SUCCESS)
}
