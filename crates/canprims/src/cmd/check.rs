use canprims_frame::parse_frame;

use crate::cmd::CheckArgs;
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_checks, OutputFormat};

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let results: Vec<_> = args
        .frames
        .into_iter()
        .map(|text| {
            let result = parse_frame(text.trim());
            (text, result)
        })
        .collect();

    let failed = results.iter().filter(|(_, result)| result.is_err()).count();
    print_checks(&results, format);

    if failed > 0 {
        tracing::debug!(failed, total = results.len(), "malformed frame text");
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
