use vaultwire_frame::{HEADER_SIZE, MAX_MESSAGE_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("vaultwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: vaultwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("VAULTWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "wire: {HEADER_SIZE}-byte big-endian length prefix + JSON, max {MAX_MESSAGE_SIZE} bytes"
    );
    println!("auth: ed25519 challenge-response");

    Ok(SUCCESS)
}
