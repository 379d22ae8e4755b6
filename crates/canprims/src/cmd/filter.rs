use std::fs::File;
use std::io::{self, BufReader, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use canprims_dispatch::{Callback, FrameDispatcher};
use canprims_filter::{filtered, FilterList};
use canprims_frame::{parse_header, Frame, FrameError, FrameReader};

use crate::cmd::FilterArgs;
use crate::exit::{filter_error, frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{FramePrinter, OutputFormat};

pub fn run(args: FilterArgs, format: OutputFormat) -> CliResult<i32> {
    let filters = load_filters(&args)?;
    let header = args
        .id
        .as_deref()
        .map(parse_header)
        .transpose()
        .map_err(|err| CliError::new(USAGE, format!("invalid --id: {err}")))?;

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).map_err(|err| io_error(&format!("open {}", path.display()), err))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let printer = Arc::new(Mutex::new(FramePrinter::new(format)));
    let printed = Arc::new(AtomicUsize::new(0));
    let limit = args.count.unwrap_or(usize::MAX);

    let print: Callback<Frame> = {
        let printer = Arc::clone(&printer);
        let printed = Arc::clone(&printed);
        Box::new(move |frame: &Frame| {
            if printed.load(Ordering::SeqCst) >= limit {
                return;
            }
            printer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .print(frame);
            printed.fetch_add(1, Ordering::SeqCst);
        })
    };
    let callback: Callback<Frame> = if filters.is_empty() {
        print
    } else {
        tracing::debug!(filters = %filters, "filtering frames");
        Box::new(filtered(filters, print))
    };

    let dispatcher = FrameDispatcher::new();
    let _listener = match header {
        Some(header) => dispatcher.subscribe_header_optional(header, Some(callback)),
        None => dispatcher.subscribe_optional(Some(callback)),
    };

    let mut read = 0usize;
    let mut skipped = 0usize;
    for result in FrameReader::new(input) {
        match result {
            Ok(frame) => {
                read += 1;
                dispatcher.dispatch(&frame);
            }
            Err(err @ FrameError::Io(_)) => return Err(frame_error("read failed", err)),
            Err(err @ FrameError::LineTooLong { .. }) => {
                skipped += 1;
                tracing::warn!(error = %err, "skipping line");
            }
            Err(err) => {
                skipped += 1;
                tracing::warn!(error = %err, "skipping malformed frame");
            }
        }
        if printed.load(Ordering::SeqCst) >= limit {
            break;
        }
    }

    tracing::debug!(
        read,
        skipped,
        printed = printed.load(Ordering::SeqCst),
        "input finished"
    );

    printer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .finish();

    Ok(SUCCESS)
}

fn load_filters(args: &FilterArgs) -> CliResult<FilterList> {
    let mut filters: FilterList = args
        .filters
        .iter()
        .flat_map(|text| FilterList::parse(text))
        .collect();

    if let Some(path) = &args.filter_file {
        let loaded =
            FilterList::from_file(path).map_err(|err| filter_error("filter file", err))?;
        filters.extend(loaded);
    }

    Ok(filters)
}
