use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("wireprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: wireprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "codec: wireprims-codec (length prefix {} bytes, default max payload {} bytes)",
        wireprims_codec::LENGTH_PREFIX_SIZE,
        wireprims_codec::DEFAULT_MAX_PAYLOAD
    );
    println!(
        "build_target: {}",
        option_env!("WIREPRIMS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));

    Ok(SUCCESS)
}
