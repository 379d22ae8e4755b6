use std::io::IsTerminal;

use canprims_frame::{frame_to_text, hex::bytes_to_hex, Frame, FrameError, FrameWriter};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// candump text, one frame per line.
    Raw,
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
struct FrameOutput {
    text: String,
    id: u32,
    fullid: u32,
    extended: bool,
    rtr: bool,
    error: bool,
    valid: bool,
    dlc: u8,
    data: String,
}

impl From<&Frame> for FrameOutput {
    fn from(frame: &Frame) -> Self {
        let header = frame.header;
        Self {
            text: frame_to_text(frame, true),
            id: header.id(),
            fullid: header.fullid(),
            extended: header.is_extended(),
            rtr: header.is_rtr(),
            error: header.is_error(),
            valid: frame.is_valid(),
            dlc: frame.dlc,
            data: bytes_to_hex(frame.payload(), true),
        }
    }
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    input: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame: Option<FrameOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

const FRAME_COLUMNS: [&str; 6] = ["ID", "FLAGS", "DLC", "DATA", "VALID", "TEXT"];

/// Stream-friendly frame printer.
///
/// Table output collects rows and renders once in [`finish`](Self::finish);
/// the other formats print each frame immediately.
pub struct FramePrinter {
    format: OutputFormat,
    table: Option<Table>,
}

impl FramePrinter {
    pub fn new(format: OutputFormat) -> Self {
        let table = (format == OutputFormat::Table).then(|| new_table(&FRAME_COLUMNS));
        Self { format, table }
    }

    pub fn print(&mut self, frame: &Frame) {
        match self.format {
            OutputFormat::Json => print_json(&FrameOutput::from(frame)),
            OutputFormat::Pretty => println!("{}", pretty(frame)),
            OutputFormat::Raw => print_raw(frame),
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(frame_row(frame));
                }
            }
        }
    }

    /// Flush collected table rows.
    pub fn finish(&mut self) {
        if let Some(table) = self.table.take() {
            println!("{table}");
        }
    }
}

/// Print the outcome of strictly parsing each input.
pub fn print_checks(results: &[(String, Result<Frame, FrameError>)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (input, result) in results {
                print_json(&CheckOutput {
                    input,
                    ok: result.is_ok(),
                    frame: result.as_ref().ok().map(FrameOutput::from),
                    error: result.as_ref().err().map(ToString::to_string),
                });
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(&["INPUT", "ID", "FLAGS", "DLC", "DATA", "RESULT"]);
            for (input, result) in results {
                let row = match result {
                    Ok(frame) => {
                        let mut row = frame_row(frame);
                        row.truncate(4);
                        row.insert(0, input.clone());
                        row.push("ok".to_string());
                        row
                    }
                    Err(err) => vec![
                        input.clone(),
                        String::new(),
                        String::new(),
                        String::new(),
                        String::new(),
                        err.to_string(),
                    ],
                };
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (input, result) in results {
                match (format, result) {
                    (OutputFormat::Raw, Ok(frame)) => print_raw(frame),
                    (_, Ok(frame)) => println!("{input}: {}", pretty(frame)),
                    (_, Err(err)) => println!("{input}: error: {err}"),
                }
            }
        }
    }
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn frame_row(frame: &Frame) -> Vec<String> {
    vec![
        format!("{:x}", frame.header.id()),
        flags(frame),
        frame.dlc.to_string(),
        bytes_to_hex(frame.payload(), true),
        frame.is_valid().to_string(),
        frame_to_text(frame, true),
    ]
}

fn flags(frame: &Frame) -> String {
    let header = frame.header;
    let mut out = String::new();
    for (on, name) in [
        (header.is_extended(), "EXT"),
        (header.is_rtr(), "RTR"),
        (header.is_error(), "ERR"),
    ] {
        if on {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(name);
        }
    }
    if out.is_empty() {
        out.push('-');
    }
    out
}

fn pretty(frame: &Frame) -> String {
    format!(
        "id={:x} flags={} dlc={} data={}{}",
        frame.header.id(),
        flags(frame),
        frame.dlc,
        bytes_to_hex(frame.payload(), true),
        if frame.is_valid() { "" } else { " (invalid)" }
    )
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_raw(frame: &Frame) {
    let _ = FrameWriter::new(std::io::stdout().lock()).write_frame(frame);
}
