use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::exit::{io_error, CliResult};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// Which side of the codec produced a frame report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameEvent {
    FrameWritten,
    FrameRead,
}

/// One framed message as seen by the CLI.
pub struct FrameReport<'a> {
    pub event: FrameEvent,
    pub index: usize,
    pub prefix_size: bool,
    /// Bytes on the wire, when known.
    pub wire_size: Option<usize>,
    pub payload: &'a [u8],
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: FrameEvent,
    index: usize,
    framing: &'a str,
    payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    wire_size: Option<usize>,
    payload: String,
    timestamp: String,
}

pub fn print_frame(report: &FrameReport<'_>, format: OutputFormat) -> CliResult<()> {
    let line = match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: report.event,
                index: report.index,
                framing: framing_name(report.prefix_size),
                payload_size: report.payload.len(),
                wire_size: report.wire_size,
                payload: payload_preview(report.payload),
                timestamp: now_unix_seconds(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "FRAMING", "SIZE", "WIRE", "PAYLOAD"])
                .add_row(vec![
                    report.index.to_string(),
                    framing_name(report.prefix_size).to_string(),
                    report.payload.len().to_string(),
                    wire_size_text(report.wire_size),
                    payload_preview(report.payload),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!(
            "frame={} framing={} size={} wire={} payload={}",
            report.index,
            framing_name(report.prefix_size),
            report.payload.len(),
            wire_size_text(report.wire_size),
            payload_preview(report.payload)
        ),
        OutputFormat::Raw => return print_raw(report.payload),
    };

    let mut out = std::io::stdout().lock();
    writeln!(out, "{line}").map_err(|err| io_error("write report failed", err))
}

pub fn print_raw(data: &[u8]) -> CliResult<()> {
    write_raw(&mut std::io::stdout().lock(), data)
}

fn write_raw<W: Write>(out: &mut W, data: &[u8]) -> CliResult<()> {
    out.write_all(data)
        .and_then(|()| out.flush())
        .map_err(|err| io_error("write payload failed", err))
}

pub fn framing_name(prefix_size: bool) -> &'static str {
    if prefix_size {
        "length-prefixed"
    } else {
        "stream"
    }
}

fn wire_size_text(wire_size: Option<usize>) -> String {
    wire_size.map_or_else(|| "-".to_string(), |size| size.to_string())
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_falls_back_for_binary() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn raw_write_failure_is_reported() {
        let err = write_raw(&mut ClosedPipe, b"payload").unwrap_err();
        assert_eq!(err.code, crate::exit::FAILURE);
        assert!(err.message.starts_with("write payload failed"));

        let mut sink = Vec::new();
        write_raw(&mut sink, b"payload").unwrap();
        assert_eq!(sink, b"payload");
    }

    #[test]
    fn json_output_omits_unknown_wire_size() {
        let out = FrameOutput {
            kind: FrameEvent::FrameRead,
            index: 3,
            framing: framing_name(true),
            payload_size: 2,
            wire_size: None,
            payload: payload_preview(b"hi"),
            timestamp: "0".to_string(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "frame-read");
        assert_eq!(json["framing"], "length-prefixed");
        assert!(json.get("wire_size").is_none());
    }
}
