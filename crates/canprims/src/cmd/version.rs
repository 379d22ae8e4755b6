use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("canprims {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: dispatch={}, cli=true",
        cfg!(feature = "dispatch")
    );
    println!(
        "limits: max_dlc={}, max_line_length={}",
        canprims_frame::MAX_DLC,
        canprims_frame::FrameConfig::default().max_line_length
    );

    Ok(SUCCESS)
}
