use wireprims_codec::CodecError;

use crate::cmd::{open_input, UnframeArgs};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_frame, FrameEvent, FrameReport, OutputFormat};

pub fn run(args: UnframeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = args.codec.payload_codec();
    let mut source = open_input(args.input.as_deref())?;
    let mut payload = Vec::new();
    let mut index = 0usize;

    loop {
        if args.count.is_some_and(|count| index >= count) {
            break;
        }

        // Zero-length frames skip decode, so the previous payload must not linger.
        payload.clear();
        match codec.read_message(&mut source, &mut payload) {
            Ok(()) => {}
            Err(CodecError::ConnectionClosed) => break,
            Err(err) => return Err(codec_error(&format!("frame #{index} failed"), err)),
        }

        tracing::info!(index, payload_size = payload.len(), "read frame");

        print_frame(
            &FrameReport {
                event: FrameEvent::FrameRead,
                index,
                prefix_size: codec.prefix_size(),
                wire_size: None,
                payload: &payload,
            },
            format,
        )?;
        index = index.saturating_add(1);

        // One message per stream leg.
        if !codec.prefix_size() {
            break;
        }
    }

    tracing::debug!(frames = index, "end of input");
    Ok(SUCCESS)
}
