mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wireprims", version, about = "Binary wire framing CLI")]
struct Cli {
    /// Output format for frame reports.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frame_subcommand() {
        let cli = Cli::try_parse_from([
            "wireprims",
            "frame",
            "--data",
            "hello",
            "--data",
            "world",
            "--xor",
            "0x5A",
        ])
        .expect("frame args should parse");

        match cli.command {
            Command::Frame(args) => {
                assert_eq!(args.data, vec!["hello", "world"]);
                assert_eq!(args.codec.xor, Some(0x5A));
                assert!(!args.codec.no_prefix);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_data_with_input_file() {
        let err = Cli::try_parse_from([
            "wireprims",
            "frame",
            "--data",
            "hello",
            "--input",
            "/tmp/payload.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_out_of_range_mask() {
        let err = Cli::try_parse_from(["wireprims", "unframe", "--xor", "300"])
            .expect_err("mask above 255 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_unframe_with_global_format() {
        let cli = Cli::try_parse_from([
            "wireprims",
            "unframe",
            "--no-prefix",
            "--count",
            "2",
            "--format",
            "raw",
        ])
        .expect("unframe args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Raw));
        assert!(matches!(
            cli.command,
            Command::Unframe(ref args) if args.codec.no_prefix && args.count == Some(2)
        ));
    }
}
