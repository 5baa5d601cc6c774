use clap::{Args, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use wireprims_codec::{xor_mask, Codec, CodecConfig, Reader, Writer, DEFAULT_MAX_PAYLOAD};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod frame;
pub mod unframe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wrap payloads into frames.
    Frame(FrameArgs),
    /// Read frames and print their payloads.
    Unframe(UnframeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Frame(args) => frame::run(args, format),
        Command::Unframe(args) => unframe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Framing options shared by `frame` and `unframe`.
#[derive(Args, Debug, Clone)]
pub struct CodecArgs {
    /// Treat the whole stream as one payload instead of 8-byte length prefixes.
    #[arg(long)]
    pub no_prefix: bool,
    /// XOR every payload byte with MASK (decimal or 0x-prefixed hex).
    #[arg(long, value_name = "MASK", value_parser = parse_mask)]
    pub xor: Option<u8>,
    /// Maximum payload size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

impl CodecArgs {
    /// Codec carrying raw byte payloads with these options applied.
    pub fn payload_codec(&self) -> Codec<Vec<u8>> {
        let codec = Codec::new(
            |wire: &mut Reader, payload: &mut Vec<u8>| {
                payload.clear();
                payload.extend_from_slice(wire.read_remaining());
            },
            |wire: &mut Writer, payload: &Vec<u8>| wire.write_bytes(payload),
        )
        .with_config(CodecConfig {
            prefix_size: !self.no_prefix,
            max_payload_size: self.max_payload,
        });

        if let Some(mask) = self.xor {
            codec.intercept_send(xor_mask(mask));
            codec.intercept_recv(xor_mask(mask));
        }
        codec
    }
}

#[derive(Args, Debug)]
pub struct FrameArgs {
    #[command(flatten)]
    pub codec: CodecArgs,
    /// Raw string payload; repeat for one frame per value.
    #[arg(long, conflicts_with = "input")]
    pub data: Vec<String>,
    /// Read the payload from a file instead of stdin.
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Write frames to a file instead of stdout and print a summary.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UnframeArgs {
    #[command(flatten)]
    pub codec: CodecArgs,
    /// Read frames from a file instead of stdin.
    #[arg(long, short = 'i', value_name = "PATH")]
    pub input: Option<PathBuf>,
    /// Exit after reading N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_mask(value: &str) -> Result<u8, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse::<u8>(),
    };
    parsed.map_err(|err| format!("invalid mask {value:?}: {err}"))
}

pub fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

pub fn open_output(path: Option<&Path>) -> CliResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("create {}", path.display()), err))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parses_decimal_and_hex_masks() {
        assert_eq!(parse_mask("255"), Ok(255));
        assert_eq!(parse_mask("0x5A"), Ok(0x5A));
        assert_eq!(parse_mask("0Xff"), Ok(0xFF));
        assert!(parse_mask("256").is_err());
        assert!(parse_mask("0xZZ").is_err());
    }

    #[test]
    fn payload_codec_applies_mask_both_ways() {
        let args = CodecArgs {
            no_prefix: false,
            xor: Some(0xFF),
            max_payload: 64,
        };
        let codec = args.payload_codec();
        assert_eq!(codec.send_interceptors(), 1);
        assert_eq!(codec.recv_interceptors(), 1);

        let mut wire = Vec::new();
        codec.write_message(&mut wire, &vec![0x0F]).unwrap();
        assert_eq!(wire, vec![0, 0, 0, 0, 0, 0, 0, 1, 0xF0]);

        let mut payload = vec![9, 9, 9];
        codec
            .read_message(&mut Cursor::new(wire), &mut payload)
            .unwrap();
        assert_eq!(payload, vec![0x0F]);
    }

    #[test]
    fn payload_codec_honours_stream_mode_and_limit() {
        let args = CodecArgs {
            no_prefix: true,
            xor: None,
            max_payload: 4,
        };
        let codec = args.payload_codec();
        assert!(!codec.prefix_size());
        assert_eq!(codec.config().max_payload_size, 4);
        assert!(codec.write_message(&mut Vec::new(), &vec![0; 5]).is_err());
    }
}
