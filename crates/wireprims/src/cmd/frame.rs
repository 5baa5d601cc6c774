use std::io::{Read, Write};

use crate::cmd::{open_input, open_output, FrameArgs};
use crate::exit::{codec_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, FrameEvent, FrameReport, OutputFormat};

pub fn run(args: FrameArgs, format: OutputFormat) -> CliResult<i32> {
    let payloads = collect_payloads(&args)?;
    if args.codec.no_prefix && payloads.len() != 1 {
        return Err(CliError::new(
            USAGE,
            format!(
                "stream framing carries exactly one payload, got {}",
                payloads.len()
            ),
        ));
    }

    let codec = args.codec.payload_codec();
    let mut sink = open_output(args.output.as_deref())?;
    let mut frame = Vec::new();

    for (index, payload) in payloads.iter().enumerate() {
        frame.clear();
        codec
            .write_message(&mut frame, payload)
            .map_err(|err| codec_error("frame failed", err))?;
        sink.write_all(&frame)
            .map_err(|err| io_error("write failed", err))?;

        tracing::info!(
            index,
            payload_size = payload.len(),
            wire_size = frame.len(),
            "framed payload"
        );

        if args.output.is_some() {
            print_frame(
                &FrameReport {
                    event: FrameEvent::FrameWritten,
                    index,
                    prefix_size: codec.prefix_size(),
                    wire_size: Some(frame.len()),
                    payload,
                },
                format,
            )?;
        }
    }

    sink.flush().map_err(|err| io_error("flush failed", err))?;
    Ok(SUCCESS)
}

fn collect_payloads(args: &FrameArgs) -> CliResult<Vec<Vec<u8>>> {
    if !args.data.is_empty() {
        return Ok(args.data.iter().map(|data| data.as_bytes().to_vec()).collect());
    }

    let mut source = open_input(args.input.as_deref())?;
    let mut payload = Vec::new();
    source
        .read_to_end(&mut payload)
        .map_err(|err| io_error("read payload failed", err))?;
    Ok(vec![payload])
}
